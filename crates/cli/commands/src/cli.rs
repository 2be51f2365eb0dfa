//! CLI argument assembly and top-level parser.

use bzzup_cli_core::args::{GatewayArgs, LogArgs, PostageArgs, UploadArgs};
use bzzup_primitives::{BatchId, ChunkAddress};
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

/// bzzup - upload content to a Swarm gateway
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Logging configuration.
    #[command(flatten)]
    pub logs: LogArgs,

    /// Gateway connection overrides.
    #[command(flatten)]
    pub gateway: GatewayArgs,

    /// Path to a TOML configuration file.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload files and directories.
    Upload(UploadCommandArgs),

    /// Create and upload chunks locally.
    #[command(subcommand)]
    Chunk(ChunkCommands),

    /// Manage postage batches.
    #[command(subcommand)]
    Postage(PostageCommands),

    /// Manage resource funding.
    #[command(subcommand)]
    Resource(ResourceCommands),
}

/// Arguments of `upload`.
#[derive(Debug, Args)]
pub struct UploadCommandArgs {
    /// Files or directories to upload.
    #[arg(value_name = "SOURCE", required = true)]
    pub paths: Vec<PathBuf>,

    /// Index document of directory uploads.
    #[arg(short, long = "index-filename", value_name = "NAME")]
    pub index_filename: Option<String>,

    /// Offer resource downloads to everyone.
    #[arg(short, long)]
    pub offer: bool,

    /// Don't pin the resource (pinning is enabled by default).
    #[arg(long)]
    pub no_pin: bool,

    #[command(flatten)]
    pub postage: PostageArgs,

    #[command(flatten)]
    pub upload: UploadArgs,
}

/// `chunk` subcommands.
#[derive(Debug, Subcommand)]
pub enum ChunkCommands {
    /// Split a file or directory into chunk files.
    Create(ChunkCreateArgs),

    /// Upload chunk files from a directory.
    Upload(ChunkUploadArgs),
}

#[derive(Debug, Args)]
pub struct ChunkCreateArgs {
    /// File or directory to split.
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Directory receiving the chunk files, created when missing.
    #[arg(value_name = "OUTPUT_DIR")]
    pub output: PathBuf,

    /// Index file name in the root directory.
    #[arg(short, long = "index-filename", value_name = "NAME")]
    pub index_filename: Option<String>,
}

#[derive(Debug, Args)]
pub struct ChunkUploadArgs {
    /// Directory holding `<address>.chunk` files.
    #[arg(value_name = "CHUNK_DIR")]
    pub dir: PathBuf,

    #[command(flatten)]
    pub postage: PostageArgs,

    #[command(flatten)]
    pub upload: UploadArgs,
}

/// `postage` subcommands.
#[derive(Debug, Subcommand)]
pub enum PostageCommands {
    /// Create a new postage batch.
    Create(PostageCreateArgs),

    /// Get info about a postage batch.
    Info(PostageInfoArgs),
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("funding").required(true).args(["amount", "ttl"])))]
pub struct PostageCreateArgs {
    /// Postage batch depth.
    #[arg(
        short,
        long,
        value_parser = clap::value_parser!(u8).range(i64::from(bzzup_primitives::MIN_BATCH_DEPTH)..=i64::from(bzzup_primitives::MAX_BATCH_DEPTH))
    )]
    pub depth: u8,

    /// Amount per chunk, in PLUR.
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub amount: Option<u64>,

    /// Time to live to obtain, in days.
    #[arg(short, long, value_name = "DAYS", value_parser = clap::value_parser!(u64).range(1..))]
    pub ttl: Option<u64>,

    /// Custom postage batch label.
    #[arg(short, long)]
    pub label: Option<String>,
}

#[derive(Debug, Args)]
pub struct PostageInfoArgs {
    /// Postage batch id.
    #[arg(value_name = "POSTAGE_ID")]
    pub batch_id: BatchId,
}

/// `resource` subcommands.
#[derive(Debug, Subcommand)]
pub enum ResourceCommands {
    /// Fund resource budget.
    Fund(ResourceFundingArgs),

    /// Defund resource budget.
    Defund(ResourceFundingArgs),
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("budget").required(true).multiple(true).args(["pin", "traffic"])))]
pub struct ResourceFundingArgs {
    /// Resource address.
    #[arg(value_name = "RESOURCE_ID")]
    pub address: ChunkAddress,

    /// Pinning on the gateway.
    #[arg(short, long)]
    pub pin: bool,

    /// Download traffic for everyone.
    #[arg(short, long)]
    pub traffic: bool,
}
