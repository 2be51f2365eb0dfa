//! Error types for gateway operations.

use bzzup_primitives::PrimitivesError;

/// Error type for gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The gateway answered with a non-success status.
    #[error("gateway error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The gateway base url or a derived url is malformed.
    #[error("invalid gateway url: {0}")]
    InvalidUrl(String),

    /// An in-flight operation was aborted before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// The chunk channel was closed by the remote side.
    #[error("chunk channel closed")]
    ChannelClosed,

    /// Local IO failure while preparing a request.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A value returned by the gateway is not a valid primitive.
    #[error(transparent)]
    Primitives(#[from] PrimitivesError),
}

impl GatewayError {
    /// Whether retrying the same operation may succeed.
    ///
    /// Connection failures, timeouts, 5xx answers, throttling and aborted
    /// operations are transient. Client errors and malformed answers are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::Transport(e) => !(e.is_builder() || e.is_decode() || e.is_redirect()),
            Self::Cancelled | Self::ChannelClosed | Self::Io(_) => true,
            Self::InvalidResponse(_) | Self::InvalidUrl(_) | Self::Primitives(_) => false,
        }
    }

    /// Whether the gateway reported the requested resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }
}

/// Result type for gateway operations.
pub type Result<T> = core::result::Result<T, GatewayError>;
