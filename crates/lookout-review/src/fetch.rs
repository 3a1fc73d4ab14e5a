//! Read side of a review run.
//!
//! Each fetch logs a failed call and returns an empty or neutral value so a
//! broken endpoint never aborts the run.

use lookout_core::{ChangedFile, ExistingComment, PullRequest};
use tracing::{debug, warn};

use crate::github::HostingApi;

/// Fetches pull request data through a [`HostingApi`].
pub struct Fetcher<'a> {
    api: &'a dyn HostingApi,
    pr: u64,
}

impl<'a> Fetcher<'a> {
    /// Create a fetcher for pull request `pr`.
    pub fn new(api: &'a dyn HostingApi, pr: u64) -> Self {
        Self { api, pr }
    }

    /// Pull request metadata, or a placeholder carrying only the number.
    pub async fn pull_request(&self) -> PullRequest {
        match self.api.pull_request(self.pr).await {
            Ok(pr) => pr,
            Err(e) => {
                warn!(pr = self.pr, error = %e, "could not fetch pull request metadata");
                PullRequest {
                    number: self.pr,
                    ..PullRequest::default()
                }
            }
        }
    }

    /// Changed files with their patches, or none.
    pub async fn files(&self) -> Vec<ChangedFile> {
        match self.api.list_files(self.pr).await {
            Ok(files) => {
                debug!(count = files.len(), "fetched changed files");
                files
            }
            Err(e) => {
                warn!(pr = self.pr, error = %e, "could not fetch changed files");
                Vec::new()
            }
        }
    }

    /// SHA of the latest commit on the pull request.
    ///
    /// Uses the last entry of the commit list and falls back to the head SHA
    /// from the metadata when the list is empty or unavailable.
    pub async fn head_commit(&self, pr: &PullRequest) -> Option<String> {
        match self.api.list_commits(self.pr).await {
            Ok(commits) => {
                if let Some(last) = commits.into_iter().last() {
                    return Some(last);
                }
                debug!(pr = self.pr, "commit list is empty");
            }
            Err(e) => warn!(pr = self.pr, error = %e, "could not fetch commits"),
        }
        if pr.head_sha.is_none() {
            warn!(pr = self.pr, "no commit SHA available, inline comments will be skipped");
        }
        pr.head_sha.clone()
    }

    /// Issue and review comments currently on the pull request.
    ///
    /// A failing endpoint contributes nothing; the other one still counts.
    pub async fn existing_comments(&self) -> Vec<ExistingComment> {
        let mut comments = match self.api.list_issue_comments(self.pr).await {
            Ok(c) => c,
            Err(e) => {
                warn!(pr = self.pr, error = %e, "could not fetch issue comments");
                Vec::new()
            }
        };
        match self.api.list_review_comments(self.pr).await {
            Ok(c) => comments.extend(c),
            Err(e) => warn!(pr = self.pr, error = %e, "could not fetch review comments"),
        }
        comments
    }
}
