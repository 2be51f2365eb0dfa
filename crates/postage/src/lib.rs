//! Postage batches for bzzup.
//!
//! - [`PostageBuckets`] - per-bucket collision counters and required depth
//! - [`calculate_amount`] / [`calculate_bzz_price`] - batch pricing
//! - [`BatchLifecycleManager`] - reuse or purchase of a usable batch

mod buckets;
mod error;
mod lifecycle;
mod pricing;

pub use buckets::{PostageBuckets, bucket_capacity};
pub use error::{PostageError, Result};
pub use lifecycle::{
    BatchLifecycleManager, BatchRequest, BatchState, LifecycleConfig, ReuseCapacityCheck,
};
pub use pricing::{calculate_amount, calculate_bzz_price, validate_depth};
