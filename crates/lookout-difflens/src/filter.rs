//! Pre-LLM file filtering.
//!
//! Leaves lock files, generated code, vendored dependencies, minified
//! bundles, patch-less files and files matching custom patterns out of the
//! prompt, saving tokens and keeping the model on reviewable code.

use std::fmt;
use std::path::Path;

use lookout_core::ChangedFile;

/// Decides which changed files are sent to the model.
///
/// # Examples
///
/// ```
/// use lookout_difflens::filter::PathFilter;
///
/// let filter = PathFilter::default();
/// assert!(filter.should_skip("package-lock.json"));
/// assert!(!filter.should_skip("src/main.rs"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    skip_patterns: Vec<glob::Pattern>,
}

impl PathFilter {
    /// Create a filter with the built-in rules plus custom glob patterns.
    ///
    /// Patterns that are not valid globs are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use lookout_difflens::filter::PathFilter;
    ///
    /// let filter = PathFilter::from_patterns(&["docs/**".to_string()]);
    /// assert!(filter.should_skip("docs/intro.md"));
    /// assert!(filter.should_skip("Cargo.lock"));
    /// ```
    pub fn from_patterns(patterns: &[String]) -> Self {
        let skip_patterns = patterns
            .iter()
            .filter_map(|p| glob::Pattern::new(p).ok())
            .collect();
        Self { skip_patterns }
    }

    /// Check if a path is skipped by name alone.
    pub fn should_skip(&self, path: &str) -> bool {
        self.check_path(path).is_some()
    }

    /// Split files into those worth reviewing and those skipped, with reasons.
    ///
    /// # Examples
    ///
    /// ```
    /// use lookout_core::ChangedFile;
    /// use lookout_difflens::filter::{PathFilter, SkipReason};
    ///
    /// let files = vec![
    ///     ChangedFile::with_patch("src/lib.rs", "@@ -1 +1 @@\n+x"),
    ///     ChangedFile { filename: "logo.png".into(), ..ChangedFile::default() },
    /// ];
    /// let result = PathFilter::default().filter(&files);
    /// assert_eq!(result.kept.len(), 1);
    /// assert_eq!(result.skipped[0].reason, SkipReason::NoPatch);
    /// ```
    pub fn filter(&self, files: &[ChangedFile]) -> FilterResult {
        let mut kept = Vec::new();
        let mut skipped = Vec::new();

        for file in files {
            let reason = match &file.patch {
                None => Some(SkipReason::NoPatch),
                Some(patch) => self.check(&file.filename, patch),
            };
            match reason {
                Some(reason) => skipped.push(SkippedFile {
                    path: file.filename.clone(),
                    reason,
                }),
                None => kept.push(file.clone()),
            }
        }

        FilterResult { kept, skipped }
    }

    fn check(&self, path: &str, patch: &str) -> Option<SkipReason> {
        if let Some(reason) = self.check_path(path) {
            return Some(reason);
        }
        if has_minified_line(patch) {
            return Some(SkipReason::MinifiedFile);
        }
        if is_generated_by_content(patch) {
            return Some(SkipReason::GeneratedFile);
        }
        None
    }

    fn check_path(&self, path: &str) -> Option<SkipReason> {
        let file_name = Path::new(path)
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();

        if LOCK_FILES.contains(&file_name.as_str()) {
            return Some(SkipReason::LockFile);
        }
        if is_vendored(path) {
            return Some(SkipReason::VendoredCode);
        }
        if file_name.ends_with(".min.js") || file_name.ends_with(".min.css") {
            return Some(SkipReason::MinifiedFile);
        }
        if is_generated_by_name(&file_name) {
            return Some(SkipReason::GeneratedFile);
        }
        self.skip_patterns
            .iter()
            .find(|pat| pat.matches(path))
            .map(|pat| SkipReason::PatternMatch(pat.to_string()))
    }
}

/// Result of filtering changed files.
#[derive(Debug, Clone, Default)]
pub struct FilterResult {
    /// Files that passed the filter, in input order.
    pub kept: Vec<ChangedFile>,
    /// Files that were skipped, with reasons.
    pub skipped: Vec<SkippedFile>,
}

/// A file left out of the review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    /// Path of the skipped file.
    pub path: String,
    /// Why the file was skipped.
    pub reason: SkipReason,
}

/// Reason a file was skipped.
///
/// # Examples
///
/// ```
/// use lookout_difflens::filter::SkipReason;
///
/// assert_eq!(SkipReason::LockFile.to_string(), "lock file");
/// assert_eq!(SkipReason::NoPatch.to_string(), "no patch (binary or too large)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The API sent no patch text.
    NoPatch,
    /// Package manager lock file.
    LockFile,
    /// Auto-generated code.
    GeneratedFile,
    /// Third-party vendored code.
    VendoredCode,
    /// Minified or bundled file.
    MinifiedFile,
    /// Matched a custom skip pattern.
    PatternMatch(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoPatch => write!(f, "no patch (binary or too large)"),
            SkipReason::LockFile => write!(f, "lock file"),
            SkipReason::GeneratedFile => write!(f, "generated file"),
            SkipReason::VendoredCode => write!(f, "vendored code"),
            SkipReason::MinifiedFile => write!(f, "minified file"),
            SkipReason::PatternMatch(pat) => write!(f, "pattern: {pat}"),
        }
    }
}

const LOCK_FILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "Cargo.lock",
    "pnpm-lock.yaml",
    "poetry.lock",
    "Gemfile.lock",
    "composer.lock",
    "go.sum",
];

fn is_vendored(path: &str) -> bool {
    path.split('/')
        .any(|part| part == "vendor" || part == "third_party" || part == "node_modules")
}

fn has_minified_line(patch: &str) -> bool {
    patch.lines().any(|line| line.len() > 500)
}

fn is_generated_by_name(file_name: &str) -> bool {
    file_name.contains(".generated.")
        || file_name.ends_with(".g.dart")
        || file_name.ends_with(".pb.go")
        || file_name.ends_with(".pb.rs")
}

fn is_generated_by_content(patch: &str) -> bool {
    patch
        .lines()
        .filter(|line| !line.starts_with("@@"))
        .take(5)
        .any(|line| line.contains("// Code generated") || line.contains("# AUTO-GENERATED"))
}
