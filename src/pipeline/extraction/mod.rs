pub mod types;
pub mod client;
pub mod normalize;

pub use types::*;
pub use client::*;
pub use normalize::*;

use thiserror::Error;

/// Failures of a single extraction request.
///
/// Every variant means the upload produced nothing usable: no draft may be
/// built from it, and the selected images stay available for a retry.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Extraction service unreachable: {0}")]
    Transport(String),

    #[error("Extraction service returned error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("Unusable extraction response: {0}")]
    Schema(String),

    #[error("No images supplied for extraction")]
    EmptyUpload,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    /// HTTP status for `Http` failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
