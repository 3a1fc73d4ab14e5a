//! Pull request review pipeline.
//!
//! Provides the hosting-API client, the LLM client, prompt construction and
//! response parsing, and the fetch → review → publish stages that drive a
//! single review run.

pub mod fetch;
pub mod github;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod publish;
pub mod reviewer;
