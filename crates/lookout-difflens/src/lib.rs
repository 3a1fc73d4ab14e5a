//! Patch analysis for pull request files.
//!
//! Parses hunk headers, maps new-file line numbers to the hosting API's
//! diff positions, annotates patches with line numbers for the prompt, and
//! filters out files that are not worth sending to the model.

pub mod annotate;
pub mod filter;
pub mod hunk;
pub mod position;
