//! `chunk create` and `chunk upload`.

use bzzup_file::{LocalDirectoryChunkStore, UploadEvaluator};
use bzzup_postage::PostageBuckets;
use bzzup_upload::{ChunkSource, StoreSource};
use eyre::{Result, WrapErr};
use tracing::{info, warn};

use super::blocking;
use crate::{
    CommandContext,
    cli::{ChunkCreateArgs, ChunkUploadArgs},
};

/// Evaluates the source into chunk files under the output directory.
pub async fn create(ctx: &CommandContext, args: ChunkCreateArgs) -> Result<()> {
    let min_depth = ctx.config.postage.min_depth;
    let ChunkCreateArgs {
        source,
        output,
        index_filename,
    } = args;

    let (result, total_chunks) = blocking(move || {
        let store = LocalDirectoryChunkStore::new(output, true)?;
        let mut buckets = PostageBuckets::new(min_depth);
        let result = UploadEvaluator::new(&mut buckets)
            .with_store(&store)
            .evaluate_path(&source, index_filename.as_deref())?;
        Ok((result, buckets.total_chunks()))
    })
    .await?;

    info!(root = %result.root_address, total_chunks, required_depth = result.required_depth, "Chunks created");
    ctx.console.write_line(&format!("Created {total_chunks} chunks"));
    ctx.console
        .write_line(&format!("Root hash: {}", result.root_address));
    Ok(())
}

/// Uploads every `<address>.chunk` file of a directory.
///
/// Running out of retries is reported, not returned as an error.
pub async fn upload(ctx: &CommandContext, args: ChunkUploadArgs) -> Result<()> {
    let store = LocalDirectoryChunkStore::new(&args.dir, false)
        .wrap_err_with(|| format!("unable to open chunk directory {}", args.dir.display()))?;
    let source = StoreSource::new(&store)
        .wrap_err_with(|| format!("unable to list chunks in {}", args.dir.display()))?;

    let mut buckets = PostageBuckets::new(ctx.config.postage.min_depth);
    for address in source.addresses() {
        buckets.add_address(address);
    }
    let required_depth = buckets.required_depth();
    info!(chunks = source.len(), required_depth, "Chunk directory evaluated");

    let batch_id = ctx.usable_batch(&args.postage, required_depth).await?;
    let report = ctx.pipeline()?.upload_all(&source, &batch_id).await?;

    if !report.is_complete() {
        warn!(uploaded = report.uploaded, total = report.total, "Chunk upload incomplete");
        ctx.console.write_error_line(&format!(
            "Upload incomplete: {} of {} chunks uploaded after {} attempts",
            report.uploaded, report.total, report.attempts
        ));
    }
    Ok(())
}
