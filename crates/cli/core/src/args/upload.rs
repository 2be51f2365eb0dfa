//! Chunk upload tuning arguments.

use clap::Args;
use std::time::Duration;

/// Batching and retry overrides for uploads.
#[derive(Debug, Args, Clone, Default)]
#[command(next_help_heading = "Upload")]
pub struct UploadArgs {
    /// Chunks sent per request. 1 sends chunks one by one.
    #[arg(
        long = "upload.batch-size",
        value_name = "CHUNKS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub batch_size: Option<u64>,

    /// Consecutive failed attempts tolerated before giving up.
    #[arg(
        long = "upload.max-retries",
        value_name = "COUNT",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_retries: Option<u32>,

    /// Delay between two attempts (e.g. "5s", "1m").
    #[arg(long = "upload.retry-delay", value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub retry_delay: Option<Duration>,
}
