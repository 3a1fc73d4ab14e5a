//! Core types, configuration, and error handling for lookout.
//!
//! This crate provides the shared foundation used by the other lookout crates:
//! - [`LookoutError`]: unified error type using `thiserror`
//! - [`LookoutConfig`]: configuration loaded from `.lookout.toml` and the environment
//! - Shared types: [`PullRequest`], [`ChangedFile`], [`ExistingComment`],
//!   [`InlineComment`], [`ReviewResult`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{GitHubConfig, LlmConfig, LookoutConfig, ReviewConfig};
pub use error::LookoutError;
pub use types::{
    ChangedFile, CommentKind, ExistingComment, InlineComment, OutputFormat, PullRequest,
    ReviewResult, TokenUsage, NO_CHANGES_FEEDBACK, REVIEW_FAILED_FEEDBACK,
};

/// A convenience `Result` type for lookout operations.
pub type Result<T> = std::result::Result<T, LookoutError>;
