//! Write side of a review run.
//!
//! Every comment the publisher creates carries [`BOT_MARKER`], which is how a
//! later run recognizes and removes it. Failed writes are logged and counted,
//! never propagated.

use std::fmt::Write;

use lookout_core::{ExistingComment, InlineComment, ReviewConfig, ReviewResult};
use lookout_difflens::position::DiffPositionIndex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::github::HostingApi;

/// Hidden marker embedded in every comment lookout posts.
pub const BOT_MARKER: &str = "<!-- lookout-review -->";

/// What happened to one inline comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineOutcome {
    /// Created on the pull request.
    Posted,
    /// Would have been created, but dry run is on.
    DryRun,
    /// The file or line is not an added line of the diff.
    NotInDiff,
    /// The API rejected the comment.
    Failed,
}

/// Counts of an inline comment batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InlineReport {
    /// Comments created (or logged, in dry run).
    pub posted: usize,
    /// Comments not anchored to the diff, rejected, or over the cap.
    pub skipped: usize,
}

/// Context shown in the summary footer.
#[derive(Debug, Clone, Default)]
pub struct SummaryFooter<'a> {
    /// Reviewed commit, when known.
    pub commit: Option<&'a str>,
    /// Model that produced the review.
    pub model: &'a str,
}

/// Publishes a [`ReviewResult`] to a pull request.
pub struct Publisher<'a> {
    api: &'a dyn HostingApi,
    pr: u64,
    config: &'a ReviewConfig,
}

impl<'a> Publisher<'a> {
    /// Create a publisher for pull request `pr`.
    pub fn new(api: &'a dyn HostingApi, pr: u64, config: &'a ReviewConfig) -> Self {
        Self { api, pr, config }
    }

    /// Delete comments left by earlier runs, returning how many were removed.
    pub async fn delete_stale_comments(&self, existing: &[ExistingComment]) -> usize {
        let mut deleted = 0;
        for comment in existing.iter().filter(|c| is_bot_comment(&c.body)) {
            if self.config.dry_run {
                info!(
                    id = comment.id,
                    kind = %comment.kind,
                    author = %comment.author,
                    "dry run: would delete stale comment"
                );
                deleted += 1;
                continue;
            }
            match self.api.delete_comment(comment.kind, comment.id).await {
                Ok(()) => {
                    debug!(
                        id = comment.id,
                        kind = %comment.kind,
                        author = %comment.author,
                        "deleted stale comment"
                    );
                    deleted += 1;
                }
                Err(e) => warn!(id = comment.id, error = %e, "could not delete stale comment"),
            }
        }
        deleted
    }

    /// Post the summary comment. Returns whether it was posted.
    pub async fn post_summary(&self, result: &ReviewResult, footer: &SummaryFooter<'_>) -> bool {
        let body = format_summary(result, footer);
        if self.config.dry_run {
            info!(pr = self.pr, "dry run: would post summary comment");
            debug!(body = %body, "summary");
            return true;
        }
        match self.api.create_issue_comment(self.pr, &body).await {
            Ok(id) => {
                info!(pr = self.pr, id, "posted summary comment");
                true
            }
            Err(e) => {
                warn!(pr = self.pr, error = %e, "could not post summary comment");
                false
            }
        }
    }

    /// Post one inline comment at the diff position of its line.
    ///
    /// Does nothing beyond a log line when the file or line is absent from
    /// `index`.
    pub async fn post_inline_comment(
        &self,
        commit_sha: &str,
        index: &DiffPositionIndex,
        comment: &InlineComment,
    ) -> InlineOutcome {
        let Some(position) = index.position(&comment.file_path, comment.line_number) else {
            info!(
                path = %comment.file_path,
                line = comment.line_number,
                "line not in diff, skipping inline comment"
            );
            return InlineOutcome::NotInDiff;
        };

        if self.config.dry_run {
            info!(
                path = %comment.file_path,
                line = comment.line_number,
                position,
                "dry run: would post inline comment"
            );
            return InlineOutcome::DryRun;
        }

        let body = format!("{BOT_MARKER}\n{}", comment.comment);
        match self
            .api
            .create_review_comment(self.pr, commit_sha, &comment.file_path, position, &body)
            .await
        {
            Ok(_) => {
                debug!(path = %comment.file_path, position, "posted inline comment");
                InlineOutcome::Posted
            }
            Err(e) => {
                warn!(
                    path = %comment.file_path,
                    line = comment.line_number,
                    error = %e,
                    "could not post inline comment"
                );
                InlineOutcome::Failed
            }
        }
    }

    /// Post inline comments in order, up to `max_inline_comments`.
    ///
    /// Without a commit SHA nothing can be anchored and every comment is
    /// counted as skipped.
    pub async fn post_inline_comments(
        &self,
        commit_sha: Option<&str>,
        index: &DiffPositionIndex,
        comments: &[InlineComment],
    ) -> InlineReport {
        let mut report = InlineReport::default();
        let Some(sha) = commit_sha else {
            if !comments.is_empty() {
                warn!(count = comments.len(), "no commit SHA, skipping inline comments");
            }
            report.skipped = comments.len();
            return report;
        };

        let mut capped = 0;
        for comment in comments {
            if report.posted >= self.config.max_inline_comments {
                capped += 1;
                continue;
            }
            match self.post_inline_comment(sha, index, comment).await {
                InlineOutcome::Posted | InlineOutcome::DryRun => report.posted += 1,
                InlineOutcome::NotInDiff | InlineOutcome::Failed => report.skipped += 1,
            }
        }

        if capped > 0 {
            info!(
                limit = self.config.max_inline_comments,
                dropped = capped,
                "inline comment limit reached"
            );
        }
        report.skipped += capped;
        report
    }

    /// Approve the pull request when the model approves and auto-approve is
    /// enabled. Returns whether an approval was submitted.
    pub async fn approve(&self, result: &ReviewResult) -> bool {
        if !result.approve {
            return false;
        }
        if !self.config.auto_approve {
            info!(pr = self.pr, "model approved, auto-approve disabled");
            return false;
        }
        if self.config.dry_run {
            info!(pr = self.pr, "dry run: would approve pull request");
            return true;
        }
        match self.api.approve(self.pr, "Approved by lookout.").await {
            Ok(()) => {
                info!(pr = self.pr, "approved pull request");
                true
            }
            Err(e) => {
                warn!(pr = self.pr, error = %e, "could not approve pull request");
                false
            }
        }
    }
}

/// Whether a comment body was posted by lookout.
pub fn is_bot_comment(body: &str) -> bool {
    body.contains(BOT_MARKER)
}

/// Render the summary comment body.
///
/// # Examples
///
/// ```
/// use lookout_core::ReviewResult;
/// use lookout_review::publish::{format_summary, SummaryFooter, BOT_MARKER};
///
/// let footer = SummaryFooter { commit: Some("0123456789abcdef"), model: "gpt-4o" };
/// let body = format_summary(&ReviewResult::no_changes(), &footer);
/// assert!(body.starts_with(BOT_MARKER));
/// assert!(body.contains("No code changes detected."));
/// assert!(body.contains("`0123456`"));
/// ```
pub fn format_summary(result: &ReviewResult, footer: &SummaryFooter<'_>) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "{BOT_MARKER}");
    let _ = writeln!(body, "## 🤖 AI Review\n");
    let _ = writeln!(body, "{}\n", result.feedback.trim());

    if !result.suggestions.is_empty() {
        let _ = writeln!(body, "### Suggestions\n");
        for suggestion in &result.suggestions {
            let _ = writeln!(body, "- {suggestion}");
        }
        body.push('\n');
    }

    let verdict = if result.approve {
        "✅ ready to merge"
    } else {
        "💬 changes suggested"
    };
    let _ = writeln!(body, "**Verdict:** {verdict}\n");

    let _ = write!(body, "---\n<sub>Reviewed ");
    match footer.commit {
        Some(sha) => {
            let short: String = sha.chars().take(7).collect();
            let _ = write!(body, "commit `{short}`");
        }
        None => body.push_str("the current head"),
    }
    let _ = write!(body, " with `{}`", footer.model);
    if let Some(usage) = result.usage {
        let _ = write!(body, " ({} tokens)", usage.total_tokens);
    }
    body.push_str("</sub>\n");
    body
}
