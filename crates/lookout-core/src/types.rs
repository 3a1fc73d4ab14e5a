use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Feedback used when a pull request has nothing the model can review.
pub const NO_CHANGES_FEEDBACK: &str = "No code changes detected.";

/// Feedback used when the LLM call or its response could not be used.
pub const REVIEW_FAILED_FEEDBACK: &str = "AI review failed: the model response could not be used.";

/// Pull request metadata relevant to a review.
///
/// # Examples
///
/// ```
/// use lookout_core::PullRequest;
///
/// let pr = PullRequest {
///     number: 42,
///     title: "Add retry to uploader".into(),
///     ..PullRequest::default()
/// };
/// assert_eq!(pr.number, 42);
/// assert!(pr.head_sha.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Pull request number.
    pub number: u64,
    /// Title line.
    pub title: String,
    /// Description body (empty when the author left none).
    pub body: String,
    /// Login of the author.
    pub author: String,
    /// SHA of the head commit, when known.
    pub head_sha: Option<String>,
    /// Branch being merged.
    pub head_ref: Option<String>,
    /// Branch merged into.
    pub base_ref: Option<String>,
}

/// A changed file as listed by the hosting API.
///
/// `patch` is absent for binary files and for diffs the API considers too
/// large to inline.
///
/// # Examples
///
/// ```
/// use lookout_core::ChangedFile;
///
/// let json = r#"{"filename":"logo.png","status":"added","additions":0,"deletions":0}"#;
/// let file: ChangedFile = serde_json::from_str(json).unwrap();
/// assert!(file.patch.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    /// Path relative to the repository root.
    pub filename: String,
    /// Change status (`added`, `modified`, `removed`, `renamed`, ...).
    #[serde(default)]
    pub status: String,
    /// Number of added lines.
    #[serde(default)]
    pub additions: u32,
    /// Number of removed lines.
    #[serde(default)]
    pub deletions: u32,
    /// Unified diff text for the file, without file headers.
    #[serde(default)]
    pub patch: Option<String>,
}

impl ChangedFile {
    /// Create a file entry carrying a patch.
    pub fn with_patch(filename: impl Into<String>, patch: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            status: "modified".into(),
            patch: Some(patch.into()),
            ..Self::default()
        }
    }
}

/// Where an existing comment lives on the pull request.
///
/// # Examples
///
/// ```
/// use lookout_core::CommentKind;
///
/// assert_eq!(CommentKind::Issue.to_string(), "issue");
/// assert_eq!(CommentKind::Review.to_string(), "review");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    /// Conversation-tab comment (`/issues/{n}/comments`).
    Issue,
    /// Inline diff comment (`/pulls/{n}/comments`).
    Review,
}

impl fmt::Display for CommentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommentKind::Issue => write!(f, "issue"),
            CommentKind::Review => write!(f, "review"),
        }
    }
}

/// A comment already present on the pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingComment {
    /// Comment identifier, unique per kind.
    pub id: u64,
    /// Which endpoint the comment belongs to.
    pub kind: CommentKind,
    /// Markdown body.
    pub body: String,
    /// Login of the comment author.
    pub author: String,
}

/// A comment the model wants anchored to a specific line of the new file.
///
/// # Examples
///
/// ```
/// use lookout_core::InlineComment;
///
/// let c = InlineComment {
///     file_path: "src/lib.rs".into(),
///     line_number: 12,
///     comment: "This can overflow".into(),
/// };
/// let json = serde_json::to_value(&c).unwrap();
/// assert_eq!(json["line_number"], 12);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineComment {
    /// Path of the file, as listed by the hosting API.
    pub file_path: String,
    /// Line number on the new-file side.
    pub line_number: u32,
    /// Comment text.
    pub comment: String,
}

/// Token counters reported by the LLM API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Tokens produced in the completion.
    #[serde(default)]
    pub completion_tokens: u64,
    /// Sum as reported by the provider.
    #[serde(default)]
    pub total_tokens: u64,
}

/// Structured outcome of one review.
///
/// # Examples
///
/// ```
/// use lookout_core::ReviewResult;
///
/// let result = ReviewResult::no_changes();
/// assert_eq!(result.feedback, "No code changes detected.");
/// assert!(!result.approve);
/// assert!(result.comments.is_empty());
/// assert!(result.suggestions.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewResult {
    /// Summary feedback for the whole pull request.
    pub feedback: String,
    /// Whether the model considers the change ready to merge.
    pub approve: bool,
    /// Line-anchored comments, in the order the model produced them.
    pub comments: Vec<InlineComment>,
    /// Free-form improvement suggestions.
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// Token counters, when the provider reported them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl ReviewResult {
    /// Result for a pull request with no reviewable changes.
    pub fn no_changes() -> Self {
        Self::neutral(NO_CHANGES_FEEDBACK)
    }

    /// Result substituted when the LLM call fails or its answer is unusable.
    ///
    /// # Examples
    ///
    /// ```
    /// use lookout_core::ReviewResult;
    ///
    /// let result = ReviewResult::failed();
    /// assert!(!result.approve);
    /// assert!(result.feedback.contains("failed"));
    /// ```
    pub fn failed() -> Self {
        Self::neutral(REVIEW_FAILED_FEEDBACK)
    }

    fn neutral(feedback: &str) -> Self {
        Self {
            feedback: feedback.to_string(),
            approve: false,
            comments: Vec::new(),
            suggestions: Vec::new(),
            usage: None,
        }
    }
}

/// Output format for command results.
///
/// # Examples
///
/// ```
/// use lookout_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text (default).
    #[default]
    Text,
    /// Machine-readable JSON.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown output format: {s}")),
        }
    }
}
