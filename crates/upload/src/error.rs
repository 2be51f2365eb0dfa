//! Error types for uploads.

use bzzup_file::StoreError;
use bzzup_gateway::GatewayError;

/// Fatal upload failures. Exhausting the retry budget of the chunk pipeline
/// is not an error: it yields a partial [`UploadReport`](crate::UploadReport).
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("upload cancelled")]
    Cancelled,

    /// Reading chunks to upload failed.
    #[error("unable to read chunks after {uploaded} uploaded: {source}")]
    Source {
        uploaded: usize,
        #[source]
        source: StoreError,
    },

    /// The gateway refused the upload with a non retryable error.
    #[error("gateway rejected the upload after {uploaded} chunks: {source}")]
    Rejected {
        uploaded: usize,
        #[source]
        source: GatewayError,
    },

    /// Every attempt of a retried operation failed.
    #[error("giving up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: GatewayError,
    },

    #[error("invalid upload configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Result type for upload operations.
pub type Result<T> = core::result::Result<T, UploadError>;
