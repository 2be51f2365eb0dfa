//! Postage batch selection arguments.

use bzzup_primitives::BatchId;
use clap::Args;
use std::time::Duration;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Selects the batch an upload is stamped with: an existing one, or a new
/// one bought for the content.
#[derive(Debug, Args, Clone, Default)]
#[command(next_help_heading = "Postage")]
pub struct PostageArgs {
    /// Use an existing postage batch. Create a new one otherwise.
    #[arg(
        long = "postage",
        value_name = "BATCH_ID",
        conflicts_with_all = ["auto_purchase", "label", "ttl"]
    )]
    pub batch_id: Option<BatchId>,

    /// Purchase the new postage batch without asking for confirmation.
    #[arg(short = 'A', long)]
    pub auto_purchase: bool,

    /// Label of the new postage batch.
    #[arg(short, long)]
    pub label: Option<String>,

    /// Time to live of the new postage batch, in days.
    #[arg(
        short,
        long,
        value_name = "DAYS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub ttl: Option<u64>,
}

impl PostageArgs {
    /// Requested time to live, falling back to `default_days`.
    pub fn ttl_or(&self, default_days: u64) -> Duration {
        Duration::from_secs(self.ttl.unwrap_or(default_days).saturating_mul(SECONDS_PER_DAY))
    }
}
