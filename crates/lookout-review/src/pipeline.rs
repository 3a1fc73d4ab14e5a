use std::fmt;

use lookout_core::{LookoutConfig, ReviewResult};
use lookout_difflens::position::DiffPositionIndex;
use serde::Serialize;
use tracing::info;

use crate::fetch::Fetcher;
use crate::github::HostingApi;
use crate::llm::ChatModel;
use crate::publish::{Publisher, SummaryFooter};
use crate::reviewer::Reviewer;

/// Outcome of one review run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Pull request number.
    pub pr_number: u64,
    /// Commit the inline comments were anchored to.
    pub commit: Option<String>,
    /// Files listed by the hosting API.
    pub files_changed: usize,
    /// Files sent to the model.
    pub files_reviewed: usize,
    /// Bot comments from earlier runs that were removed.
    pub stale_deleted: usize,
    /// Whether the summary comment was posted.
    pub summary_posted: bool,
    /// Inline comments created.
    pub inline_posted: usize,
    /// Inline comments not created (not in diff, rejected, over the cap).
    pub inline_skipped: usize,
    /// Whether an approving review was submitted.
    pub approved: bool,
    /// Whether writes were only logged.
    pub dry_run: bool,
    /// The review itself.
    pub result: ReviewResult,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.dry_run { "[dry run] " } else { "" };
        writeln!(
            f,
            "{prefix}PR #{}: reviewed {} of {} files",
            self.pr_number, self.files_reviewed, self.files_changed
        )?;
        writeln!(
            f,
            "  summary: {}, inline comments: {} posted / {} skipped, stale removed: {}",
            if self.summary_posted { "posted" } else { "not posted" },
            self.inline_posted,
            self.inline_skipped,
            self.stale_deleted
        )?;
        write!(
            f,
            "  verdict: {}{}",
            if self.result.approve {
                "approve"
            } else {
                "comment"
            },
            if self.approved { " (approval submitted)" } else { "" }
        )
    }
}

/// Run a full review of pull request `pr_number`.
///
/// Fetches the pull request, reviews its diff with `model`, removes stale bot
/// comments and publishes the summary, the inline comments and, when
/// allowed, an approval. Failed calls along the way are logged and the run
/// continues with neutral values.
pub async fn run_review(
    api: &dyn HostingApi,
    model: &dyn ChatModel,
    config: &LookoutConfig,
    pr_number: u64,
) -> RunReport {
    info!(pr = pr_number, "step 1: fetching pull request");
    let fetcher = Fetcher::new(api, pr_number);
    let pr = fetcher.pull_request().await;
    let files = fetcher.files().await;
    let commit = fetcher.head_commit(&pr).await;
    let existing = fetcher.existing_comments().await;
    info!(
        files = files.len(),
        existing_comments = existing.len(),
        "fetched pull request"
    );

    // Skipped files get no positions, so no inline comment can land on them.
    info!("step 2: mapping diff positions");
    let reviewer = Reviewer::new(model, config);
    let selection = reviewer.select_files(&files);
    let index = DiffPositionIndex::from_files(&selection.kept);

    info!("step 3: reviewing changes");
    let result = reviewer.review_files(&pr, &selection.kept).await;

    info!("step 4: publishing review");
    let publisher = Publisher::new(api, pr_number, &config.review);
    let stale_deleted = if config.review.delete_stale {
        publisher.delete_stale_comments(&existing).await
    } else {
        0
    };

    let footer = SummaryFooter {
        commit: commit.as_deref(),
        model: model.model(),
    };
    let summary_posted = publisher.post_summary(&result, &footer).await;

    let inline = if config.review.inline_comments {
        publisher
            .post_inline_comments(commit.as_deref(), &index, &result.comments)
            .await
    } else {
        Default::default()
    };
    let approved = publisher.approve(&result).await;

    info!(
        inline_posted = inline.posted,
        inline_skipped = inline.skipped,
        approved,
        "review complete"
    );

    RunReport {
        pr_number,
        commit,
        files_changed: files.len(),
        files_reviewed: selection.kept.len(),
        stale_deleted,
        summary_posted,
        inline_posted: inline.posted,
        inline_skipped: inline.skipped,
        approved,
        dry_run: config.review.dry_run,
        result,
    }
}
