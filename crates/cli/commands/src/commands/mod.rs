//! Command handlers.

pub mod chunk;
pub mod postage;
pub mod resource;
pub mod upload;

use bzzup_file::EvaluationError;
use eyre::{Result, WrapErr};

use crate::{
    CommandContext,
    cli::{ChunkCommands, Commands, PostageCommands, ResourceCommands},
};

/// Runs `command` against `ctx`.
pub async fn dispatch(ctx: &CommandContext, command: Commands) -> Result<()> {
    match command {
        Commands::Upload(args) => upload::run(ctx, args).await,
        Commands::Chunk(ChunkCommands::Create(args)) => chunk::create(ctx, args).await,
        Commands::Chunk(ChunkCommands::Upload(args)) => chunk::upload(ctx, args).await,
        Commands::Postage(PostageCommands::Create(args)) => postage::create(ctx, args).await,
        Commands::Postage(PostageCommands::Info(args)) => postage::info(ctx, args).await,
        Commands::Resource(ResourceCommands::Fund(args)) => resource::fund(ctx, args).await,
        Commands::Resource(ResourceCommands::Defund(args)) => resource::defund(ctx, args).await,
    }
}

/// Runs CPU-bound evaluation off the async workers.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> std::result::Result<T, EvaluationError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .wrap_err("evaluation task failed")?
        .wrap_err("evaluation failed")
}
