//! CLI commands for bzzup.
//!
//! This crate provides the command-line interface:
//! - [`Cli`] - Top-level CLI parser
//! - [`Commands`] - Available subcommands
//! - [`BzzupConfig`] - Layered configuration
//! - [`CommandContext`] - Services handed to command handlers
//!
//! Configuration is loaded using Figment with the following priority
//! (highest wins):
//!
//! 1. CLI arguments
//! 2. Config file (TOML)
//! 3. Environment variables (`BZZUP_` prefix)
//! 4. Defaults

mod cli;
pub mod commands;
pub mod config;
mod context;

pub use cli::{
    ChunkCommands, ChunkCreateArgs, ChunkUploadArgs, Cli, Commands, PostageCommands,
    PostageCreateArgs, PostageInfoArgs, ResourceCommands, ResourceFundingArgs, UploadCommandArgs,
};
pub use config::BzzupConfig;
pub use context::CommandContext;

use bzzup_cli_core::{logging, version};
use clap::Parser;
use color_eyre::eyre;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Run bzzup with the process arguments.
///
/// This is the main entry point that should be called from the binary.
/// Cancelling `cancel` aborts polling and uploads in progress.
pub async fn run(cancel: CancellationToken) -> eyre::Result<()> {
    // Setup error handling
    color_eyre::install()?;

    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    logging::init_logging(&cli.logs)?;

    info!("Starting bzzup {}", version::VERSION);

    execute(cli, cancel).await
}

/// Loads the configuration for `cli` and runs its command against the
/// configured gateway.
pub async fn execute(cli: Cli, cancel: CancellationToken) -> eyre::Result<()> {
    let mut config = BzzupConfig::load(cli.config.as_deref())?;
    let upload_args = match &cli.command {
        Commands::Upload(args) => Some(&args.upload),
        Commands::Chunk(ChunkCommands::Upload(args)) => Some(&args.upload),
        _ => None,
    };
    config.apply_args(&cli.gateway, upload_args);
    config.validate()?;

    let ctx = CommandContext::connect(config, cancel)?;
    commands::dispatch(&ctx, cli.command).await
}
