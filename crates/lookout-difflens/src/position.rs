//! Mapping from new-file line numbers to diff positions.
//!
//! The hosting API anchors inline comments by *position*: the number of
//! lines below the first `@@` header of a file's patch. The line right under
//! that header is position 1, and the count runs on through every later line
//! of the patch (context, removals, `\` markers and subsequent hunk headers
//! included) until the patch ends.

use std::collections::{BTreeMap, HashMap};

use lookout_core::ChangedFile;
use serde::Serialize;

use crate::hunk::HunkHeader;

/// Positions of the added lines of one file, keyed by new-file line number.
///
/// # Examples
///
/// ```
/// use lookout_difflens::position::map_positions;
///
/// let positions = map_positions("@@ -1,3 +1,4 @@\n+a\n+b\n+c");
/// assert_eq!(positions.get(1), Some(1));
/// assert_eq!(positions.get(3), Some(3));
/// assert_eq!(positions.get(4), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FilePositions {
    positions: BTreeMap<u32, u32>,
}

impl FilePositions {
    /// Diff position of an added line, if `line` was added by the patch.
    pub fn get(&self, line: u32) -> Option<u32> {
        self.positions.get(&line).copied()
    }

    /// Number of added lines with a position.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether no added line was found.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// `(line, position)` pairs in line order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.positions.iter().map(|(l, p)| (*l, *p))
    }
}

enum LineKind {
    Header(Option<HunkHeader>),
    Added,
    Removed,
    Marker,
    Context,
}

impl LineKind {
    fn classify(line: &str) -> Self {
        if line.starts_with("@@") {
            LineKind::Header(HunkHeader::parse(line).ok())
        } else if line.starts_with('+') {
            LineKind::Added
        } else if line.starts_with('-') {
            LineKind::Removed
        } else if line.starts_with('\\') {
            LineKind::Marker
        } else {
            LineKind::Context
        }
    }
}

#[derive(Clone, Copy)]
enum ScanState {
    /// No hunk header seen yet; line numbers are undefined.
    Preamble,
    /// Inside a hunk; `next_line` is the new-file number of the next
    /// added or context line.
    Hunk { next_line: u32 },
    /// After a header that did not parse. Positions keep counting but the
    /// line number is unknown until the next valid header.
    Unanchored,
}

/// Compute the diff position of every added line in `patch`.
///
/// A patch without any hunk header yields an empty mapping.
///
/// # Examples
///
/// ```
/// use lookout_difflens::position::map_positions;
///
/// let patch = "@@ -10,2 +10,3 @@\n context\n+added\n context";
/// let positions = map_positions(patch);
/// assert_eq!(positions.get(11), Some(2));
///
/// assert!(map_positions("+no header here").is_empty());
/// ```
pub fn map_positions(patch: &str) -> FilePositions {
    let mut positions = BTreeMap::new();
    let mut state = ScanState::Preamble;
    let mut position: u32 = 0;

    for line in patch.lines() {
        // A second file's diff ends this one.
        if line.starts_with("diff --git ") && !matches!(state, ScanState::Preamble) {
            break;
        }
        if !matches!(state, ScanState::Preamble) {
            position = position.saturating_add(1);
        }

        state = match (state, LineKind::classify(line)) {
            (_, LineKind::Header(Some(header))) => ScanState::Hunk {
                next_line: header.new_start,
            },
            (ScanState::Preamble, _) => ScanState::Preamble,
            (_, LineKind::Header(None)) => ScanState::Unanchored,
            (ScanState::Unanchored, _) => ScanState::Unanchored,
            (ScanState::Hunk { next_line }, LineKind::Added) => {
                positions.insert(next_line, position);
                advance(next_line)
            }
            (ScanState::Hunk { next_line }, LineKind::Context) => advance(next_line),
            (hunk @ ScanState::Hunk { .. }, LineKind::Removed | LineKind::Marker) => hunk,
        };
    }

    FilePositions { positions }
}

/// Step past one new-file line. Line numbers past `u32::MAX` are unknown.
fn advance(next_line: u32) -> ScanState {
    match next_line.checked_add(1) {
        Some(next_line) => ScanState::Hunk { next_line },
        None => ScanState::Unanchored,
    }
}

/// Diff positions for every file of a pull request.
///
/// # Examples
///
/// ```
/// use lookout_core::ChangedFile;
/// use lookout_difflens::position::DiffPositionIndex;
///
/// let files = vec![
///     ChangedFile::with_patch("src/lib.rs", "@@ -0,0 +1,2 @@\n+a\n+b"),
///     ChangedFile { filename: "logo.png".into(), ..ChangedFile::default() },
/// ];
/// let index = DiffPositionIndex::from_files(&files);
/// assert_eq!(index.position("src/lib.rs", 2), Some(2));
/// assert!(!index.contains_file("logo.png"));
/// ```
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct DiffPositionIndex {
    files: HashMap<String, FilePositions>,
}

impl DiffPositionIndex {
    /// Build the index from changed files, skipping files without a patch.
    pub fn from_files(files: &[ChangedFile]) -> Self {
        let mut index = Self::default();
        for file in files {
            if let Some(patch) = &file.patch {
                index.insert(&file.filename, patch);
            }
        }
        index
    }

    /// Map one file's patch and add it to the index.
    pub fn insert(&mut self, path: &str, patch: &str) {
        self.files.insert(path.to_string(), map_positions(patch));
    }

    /// Diff position of `line` in `path`, if the patch added that line.
    pub fn position(&self, path: &str, line: u32) -> Option<u32> {
        self.files.get(path).and_then(|f| f.get(line))
    }

    /// Positions of a single file.
    pub fn file(&self, path: &str) -> Option<&FilePositions> {
        self.files.get(path)
    }

    /// Whether the file had a patch.
    pub fn contains_file(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Number of files in the index.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the index holds no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
