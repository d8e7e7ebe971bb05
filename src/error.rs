//! Typed error conditions that callers branch on.
//!
//! Most of the codebase propagates `anyhow::Result`; this enum exists for
//! the two conditions with distinct recovery paths: a malformed document
//! is skipped at the ingestion boundary while other documents continue,
//! and an unknown tool name aborts a tool round without aborting the
//! whole query.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LecternError {
    /// The document header is missing its required `Course Title:` line.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// The model requested a tool that is not registered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}
