//! Uploading to a Swarm gateway.
//!
//! - [`ChunkUploadPipeline`] - batched chunk upload resuming after failures
//! - [`with_retry`] - bounded retries of single gateway operations
//! - [`Progress`] - progress snapshots with ETA

mod error;
mod pipeline;
mod progress;
mod retry;
mod source;

pub use error::{Result, UploadError};
pub use pipeline::{ChunkUploadPipeline, PipelineConfig, UploadReport};
pub use progress::{Progress, format_hms};
pub use retry::{RetryPolicy, with_retry};
pub use source::{ChunkSource, StoreSource};
