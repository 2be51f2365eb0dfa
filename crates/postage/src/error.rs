//! Error types for postage operations.

use bzzup_gateway::GatewayError;
use bzzup_primitives::BatchId;
use std::time::Duration;

/// Error type for postage batch sizing, pricing and lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum PostageError {
    /// An argument is outside its accepted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Depth outside the purchasable range.
    #[error("postage depth {depth} must be between {min} and {max}")]
    InvalidDepth { depth: u8, min: u8, max: u8 },

    /// Price computation does not fit the integer range.
    #[error("batch price overflows")]
    PriceOverflow,

    /// The user refused the purchase.
    #[error("batch purchase denied")]
    PurchaseDenied,

    /// The requested batch does not exist.
    #[error("unable to find postage batch {batch_id}")]
    NotFound { batch_id: BatchId },

    /// The requested batch exists but cannot stamp chunks.
    #[error("postage batch {batch_id} is not usable")]
    NotUsable { batch_id: BatchId },

    /// A reused batch is too small for the content.
    #[error("postage batch {batch_id} has depth {depth}, but {required} is required")]
    InsufficientDepth {
        batch_id: BatchId,
        depth: u8,
        required: u8,
    },

    /// The purchase reference did not resolve in time.
    #[error(
        "batch not available after {}, reference id {reference}",
        humantime::format_duration(*elapsed)
    )]
    ProvisioningTimeout { reference: String, elapsed: Duration },

    /// The batch did not become usable in time.
    #[error(
        "batch {batch_id} not usable after {}",
        humantime::format_duration(*elapsed)
    )]
    UsabilityTimeout { batch_id: BatchId, elapsed: Duration },

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Reading the confirmation answer failed.
    #[error("console error: {0}")]
    Console(#[from] std::io::Error),
}

/// Result type for postage operations.
pub type Result<T> = core::result::Result<T, PostageError>;
