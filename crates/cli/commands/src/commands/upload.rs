//! `upload`: every source is evaluated through one accumulator so the batch
//! is sized for their combined collisions, then each source is uploaded in
//! turn.
//!
//! Files are streamed to the gateway file endpoint. Directories are sent as
//! one collection and the gateway builds their manifest. Both go through
//! bounded retries.

use bzzup_file::{EvaluationError, UploadEvaluator, content_type_for, directory_files};
use bzzup_gateway::{
    CollectionEntry, DirectoryUpload, FileUpload, Result as GatewayResult,
};
use bzzup_postage::PostageBuckets;
use bzzup_primitives::{BatchId, ChunkAddress};
use bzzup_upload::{UploadError, with_retry};
use eyre::{Result, WrapErr};
use std::{
    future::Future,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use super::blocking;
use crate::{CommandContext, cli::UploadCommandArgs};

/// An evaluated upload source.
struct Source {
    path: PathBuf,
    is_dir: bool,
    total_chunks: u64,
}

/// Sizing pass over every source. Nothing is kept but the counts.
fn evaluate(
    paths: Vec<PathBuf>,
    min_depth: u8,
    index_document: Option<String>,
) -> std::result::Result<(Vec<Source>, u8), EvaluationError> {
    let mut buckets = PostageBuckets::new(min_depth);
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let result =
            UploadEvaluator::new(&mut buckets).evaluate_path(&path, index_document.as_deref())?;
        sources.push(Source {
            is_dir: path.is_dir(),
            path,
            total_chunks: result.total_chunks,
        });
    }
    Ok((sources, buckets.required_depth()))
}

pub async fn run(ctx: &CommandContext, args: UploadCommandArgs) -> Result<()> {
    let min_depth = ctx.config.postage.min_depth;
    let paths = args.paths.clone();
    let index_document = args.index_filename.clone();
    let (sources, required_depth) =
        blocking(move || evaluate(paths, min_depth, index_document)).await?;

    let total_chunks: u64 = sources.iter().map(|s| s.total_chunks).sum();
    info!(sources = sources.len(), total_chunks, required_depth, "Upload evaluated");

    let batch_id = ctx.usable_batch(&args.postage, required_depth).await?;
    let pin = !args.no_pin;

    let mut failed = 0;
    for source in &sources {
        ctx.console
            .write_line(&format!("Uploading {}...", source.path.display()));

        let uploaded = if source.is_dir {
            upload_directory(ctx, &source.path, args.index_filename.clone(), &batch_id, pin)
                .await?
        } else {
            upload_file(ctx, &source.path, &batch_id, pin).await?
        };

        let Some(address) = uploaded else {
            failed += 1;
            continue;
        };
        ctx.console.write_line(&format!("Ref hash: {address}"));
        if args.offer {
            ctx.gateway
                .fund_resource_download(&address)
                .await
                .wrap_err_with(|| format!("unable to offer downloads of {address}"))?;
        }
    }

    eyre::ensure!(
        failed == 0,
        "{failed} of {} sources could not be uploaded",
        sources.len()
    );
    Ok(())
}

async fn upload_file(
    ctx: &CommandContext,
    path: &Path,
    batch_id: &BatchId,
    pin: bool,
) -> Result<Option<ChunkAddress>> {
    let file = FileUpload {
        path: path.to_path_buf(),
        name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
        content_type: Some(content_type_for(path).to_string()),
        pin,
    };

    let batch_id = *batch_id;
    upload_with_retry(ctx, path, || {
        let gateway = ctx.gateway.clone();
        let file = file.clone();
        async move { gateway.upload_file(&batch_id, file).await }
    })
    .await
}

async fn upload_directory(
    ctx: &CommandContext,
    path: &Path,
    index_document: Option<String>,
    batch_id: &BatchId,
    pin: bool,
) -> Result<Option<ChunkAddress>> {
    let dir = path.to_path_buf();
    let files = blocking(move || directory_files(&dir)).await?;
    let directory = DirectoryUpload {
        entries: files
            .into_iter()
            .map(|f| CollectionEntry {
                name: f.relative,
                path: f.path,
                content_type: f.content_type.to_string(),
            })
            .collect(),
        index_document,
        pin,
    };

    let batch_id = *batch_id;
    upload_with_retry(ctx, path, || {
        let gateway = ctx.gateway.clone();
        let directory = directory.clone();
        async move { gateway.upload_directory(&batch_id, directory).await }
    })
    .await
}

/// Runs one source upload under the retry policy. `None` when the gateway
/// kept failing or refused it.
async fn upload_with_retry<F, Fut>(
    ctx: &CommandContext,
    path: &Path,
    operation: F,
) -> Result<Option<ChunkAddress>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = GatewayResult<ChunkAddress>>,
{
    let outcome = with_retry(
        ctx.config.retry_policy(),
        &ctx.cancel,
        operation,
        |_, error, retrying| {
            ctx.console
                .write_error_line(&format!("Error uploading {}", path.display()));
            ctx.console.write_line(&error.to_string());
            if retrying {
                ctx.console.write_line("Retry...");
            }
        },
    )
    .await;

    match outcome {
        Ok(address) => Ok(Some(address)),
        Err(UploadError::RetriesExhausted { attempts, .. }) => {
            ctx.console.write_error_line(&format!(
                "Can't upload \"{}\" after {attempts} retries",
                path.display()
            ));
            Ok(None)
        }
        Err(UploadError::Rejected { source, .. }) => {
            warn!(path = %path.display(), error = %source, "Gateway refused the upload");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
