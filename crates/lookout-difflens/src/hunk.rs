use std::fmt;

use lookout_core::LookoutError;

/// Parsed `@@ -a,b +c,d @@ section` header of a hunk.
///
/// # Examples
///
/// ```
/// use lookout_difflens::hunk::HunkHeader;
///
/// let header = HunkHeader::parse("@@ -10,4 +12,6 @@ fn main() {").unwrap();
/// assert_eq!(header.new_start, 12);
/// assert_eq!(header.new_lines, 6);
/// assert_eq!(header.section.as_deref(), Some("fn main() {"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkHeader {
    /// Starting line in the old version.
    pub old_start: u32,
    /// Number of lines in the old version.
    pub old_lines: u32,
    /// Starting line in the new version.
    pub new_start: u32,
    /// Number of lines in the new version.
    pub new_lines: u32,
    /// Trailing section heading git prints after the closing `@@`.
    pub section: Option<String>,
}

impl HunkHeader {
    /// Parse a hunk header line.
    ///
    /// Omitted lengths default to 1 (`@@ -3 +3 @@`).
    ///
    /// # Errors
    ///
    /// Returns [`LookoutError::Parse`] if the line is not a well-formed header.
    ///
    /// # Examples
    ///
    /// ```
    /// use lookout_difflens::hunk::HunkHeader;
    ///
    /// let header = HunkHeader::parse("@@ -3 +3 @@").unwrap();
    /// assert_eq!((header.old_lines, header.new_lines), (1, 1));
    /// assert!(HunkHeader::parse("@@ nonsense @@").is_err());
    /// ```
    pub fn parse(line: &str) -> Result<Self, LookoutError> {
        let rest = line
            .strip_prefix("@@ ")
            .ok_or_else(|| LookoutError::Parse(format!("invalid hunk header: {line}")))?;
        let end = rest
            .find(" @@")
            .ok_or_else(|| LookoutError::Parse(format!("invalid hunk header: {line}")))?;
        let inner = &rest[..end];
        let section = rest[end + 3..].trim();

        let Some((old, new)) = inner.split_once(' ') else {
            return Err(LookoutError::Parse(format!("invalid hunk header: {line}")));
        };
        let old = old
            .strip_prefix('-')
            .ok_or_else(|| LookoutError::Parse(format!("invalid old range in hunk: {line}")))?;
        let new = new
            .strip_prefix('+')
            .ok_or_else(|| LookoutError::Parse(format!("invalid new range in hunk: {line}")))?;

        let (old_start, old_lines) = parse_range(old, line)?;
        let (new_start, new_lines) = parse_range(new, line)?;

        Ok(Self {
            old_start,
            old_lines,
            new_start,
            new_lines,
            section: (!section.is_empty()).then(|| section.to_string()),
        })
    }
}

impl fmt::Display for HunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_lines, self.new_start, self.new_lines
        )?;
        if let Some(section) = &self.section {
            write!(f, " {section}")?;
        }
        Ok(())
    }
}

fn parse_range(range: &str, context: &str) -> Result<(u32, u32), LookoutError> {
    if let Some((start, count)) = range.split_once(',') {
        let s = start
            .parse()
            .map_err(|_| LookoutError::Parse(format!("invalid range number in: {context}")))?;
        let c = count
            .parse()
            .map_err(|_| LookoutError::Parse(format!("invalid range count in: {context}")))?;
        Ok((s, c))
    } else {
        let s = range
            .parse()
            .map_err(|_| LookoutError::Parse(format!("invalid range number in: {context}")))?;
        Ok((s, 1))
    }
}

/// A contiguous block of a file's patch text.
///
/// # Examples
///
/// ```
/// use lookout_difflens::hunk::split_hunks;
///
/// let hunks = split_hunks("@@ -1,2 +1,3 @@\n a\n+b\n c");
/// assert_eq!(hunks.len(), 1);
/// assert_eq!(hunks[0].header.new_start, 1);
/// assert_eq!(hunks[0].lines, vec![" a", "+b", " c"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    /// Parsed header.
    pub header: HunkHeader,
    /// Body lines, each still carrying its `+`, `-`, ` ` or `\` prefix.
    pub lines: Vec<String>,
}

/// Split a file patch into hunks.
///
/// Text before the first header is dropped, as are the bodies of hunks whose
/// header does not parse.
pub fn split_hunks(patch: &str) -> Vec<DiffHunk> {
    let mut hunks: Vec<DiffHunk> = Vec::new();
    let mut current: Option<DiffHunk> = None;

    for line in patch.lines() {
        if line.starts_with("@@") {
            if let Some(h) = current.take() {
                hunks.push(h);
            }
            current = HunkHeader::parse(line).ok().map(|header| DiffHunk {
                header,
                lines: Vec::new(),
            });
            continue;
        }
        if let Some(hunk) = current.as_mut() {
            hunk.lines.push(line.to_string());
        }
    }
    if let Some(h) = current.take() {
        hunks.push(h);
    }

    hunks
}
