use lookout_core::{ChangedFile, LookoutConfig, PullRequest, ReviewResult};
use lookout_difflens::filter::{FilterResult, PathFilter};
use tracing::{debug, info, warn};

use crate::llm::ChatModel;
use crate::prompt::{build_review_prompt, parse_review_response};

/// Turns changed files into a [`ReviewResult`] with one model call.
pub struct Reviewer<'a> {
    model: &'a dyn ChatModel,
    filter: PathFilter,
    max_diff_chars: usize,
}

impl<'a> Reviewer<'a> {
    /// Create a reviewer backed by `model`.
    pub fn new(model: &'a dyn ChatModel, config: &LookoutConfig) -> Self {
        Self {
            model,
            filter: PathFilter::from_patterns(&config.review.skip_patterns),
            max_diff_chars: config.llm.max_diff_chars,
        }
    }

    /// Split files into those sent to the model and those left out.
    pub fn select_files(&self, files: &[ChangedFile]) -> FilterResult {
        let selection = self.filter.filter(files);
        for skipped in &selection.skipped {
            debug!(path = %skipped.path, reason = %skipped.reason, "skipping file");
        }
        selection
    }

    /// Filter `files` and review what remains.
    pub async fn review(&self, pr: &PullRequest, files: &[ChangedFile]) -> ReviewResult {
        let selection = self.select_files(files);
        self.review_files(pr, &selection.kept).await
    }

    /// Review files that already passed [`Reviewer::select_files`].
    ///
    /// No model call is made when `files` is empty. Any failure of the call
    /// or of the answer yields [`ReviewResult::failed`].
    pub async fn review_files(&self, pr: &PullRequest, files: &[ChangedFile]) -> ReviewResult {
        if files.iter().all(|f| f.patch.is_none()) {
            info!("no reviewable changes, skipping model call");
            return ReviewResult::no_changes();
        }

        let prompt = build_review_prompt(pr, files, self.max_diff_chars);
        info!(
            model = self.model.model(),
            files = files.len(),
            prompt_chars = prompt.len(),
            "requesting review"
        );

        let completion = match self.model.complete(&prompt).await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "model call failed");
                return ReviewResult::failed();
            }
        };

        match parse_review_response(&completion.content) {
            Ok(mut result) => {
                result.usage = completion.usage;
                info!(
                    approve = result.approve,
                    comments = result.comments.len(),
                    suggestions = result.suggestions.len(),
                    "review received"
                );
                result
            }
            Err(e) => {
                warn!(error = %e, "model response unusable");
                debug!(response = %completion.content, "raw model response");
                ReviewResult::failed()
            }
        }
    }
}
