//! Error types for quill-agent

use thiserror::Error;

/// Result type alias using quill-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the turn engine
#[derive(Error, Debug)]
pub enum Error {
    /// Model backend error
    #[error("Model error: {0}")]
    Ai(#[from] quill_ai::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
