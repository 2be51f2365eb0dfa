//! Chunk upload pipeline.
//!
//! Chunks are sent in fixed-size batches over a channel bound to one postage
//! batch. A transient failure abandons the channel, waits, and reopens a new
//! one that resumes from the last confirmed batch: confirmed chunks are never
//! re-sent and none is skipped. The retry budget is restored every time a
//! batch goes through, so only consecutive failures exhaust it.

use bzzup_console::Console;
use bzzup_gateway::{ChunkChannel, ChunkTransport, GatewayError};
use bzzup_primitives::BatchId;
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{ChunkSource, Result, UploadError, progress::ProgressThrottle};

/// Batching and retry settings of the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Chunks per network call. `1` sends chunks one by one.
    pub batch_size: usize,
    /// Consecutive failed attempts tolerated before giving up.
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Minimum delay between two progress lines.
    pub progress_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            max_retries: 10,
            retry_delay: Duration::from_secs(5),
            progress_interval: Duration::from_secs(1),
        }
    }
}

/// Outcome of [`ChunkUploadPipeline::upload_all`].
#[derive(Debug)]
pub struct UploadReport {
    pub uploaded: usize,
    pub total: usize,
    /// Channels opened, one per attempt.
    pub attempts: u32,
    pub elapsed: Duration,
    /// Error of the last failed attempt, if any attempt failed.
    pub last_error: Option<GatewayError>,
}

impl UploadReport {
    pub fn is_complete(&self) -> bool {
        self.uploaded == self.total
    }
}

enum AttemptError {
    Transient(GatewayError),
    Fatal(UploadError),
}

/// Streams chunks to a [`ChunkTransport`] with resumable retries.
pub struct ChunkUploadPipeline {
    transport: Arc<dyn ChunkTransport>,
    console: Arc<dyn Console>,
    config: PipelineConfig,
    cancel: CancellationToken,
}

impl std::fmt::Debug for ChunkUploadPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkUploadPipeline")
            .field("config", &self.config)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl ChunkUploadPipeline {
    pub fn new(
        transport: Arc<dyn ChunkTransport>,
        console: Arc<dyn Console>,
        config: PipelineConfig,
        cancel: CancellationToken,
    ) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(UploadError::InvalidConfig("batch size must be at least 1"));
        }
        if config.max_retries == 0 {
            return Err(UploadError::InvalidConfig("max retries must be at least 1"));
        }
        Ok(Self {
            transport,
            console,
            config,
            cancel,
        })
    }

    /// Uploads every chunk of `source` stamped with `batch_id`.
    ///
    /// Running out of retries returns a report with `uploaded < total`;
    /// cancellation, unreadable chunks and rejected uploads are errors. The
    /// uploaded count is printed in every case.
    pub async fn upload_all(
        &self,
        source: &dyn ChunkSource,
        batch_id: &BatchId,
    ) -> Result<UploadReport> {
        let total = source.len();
        let start = Instant::now();
        let mut throttle = ProgressThrottle::new(start, self.config.progress_interval);
        let mut uploaded = 0;
        let mut retry = 0;
        let mut attempts = 0;
        let mut last_error = None;

        self.console
            .write_line(&format!("Start uploading {total} chunks..."));
        info!(%batch_id, total, batch_size = self.config.batch_size, "Starting chunk upload");

        while uploaded < total && retry < self.config.max_retries {
            attempts += 1;
            let outcome = self
                .attempt(source, batch_id, &mut uploaded, &mut retry, &mut throttle)
                .await;

            match outcome {
                Ok(()) => self.console.write_line(""),
                Err(AttemptError::Fatal(e)) => {
                    self.report_uploaded(uploaded);
                    return Err(e);
                }
                Err(AttemptError::Transient(e)) => {
                    retry += 1;
                    warn!(attempt = attempts, retry, uploaded, error = %e, "Chunk upload attempt failed");
                    self.console.write_error_line("Error uploading chunks");
                    self.console.write_line(&e.to_string());
                    last_error = Some(e);

                    if retry < self.config.max_retries {
                        self.console.write_line("Retry...");
                        if self.sleep_or_cancel(self.config.retry_delay).await {
                            self.report_uploaded(uploaded);
                            return Err(UploadError::Cancelled);
                        }
                    }
                }
            }
        }

        let elapsed = start.elapsed();
        self.report_uploaded(uploaded);
        if uploaded < total {
            warn!(uploaded, total, attempts, "Chunk upload incomplete, retries exhausted");
        } else {
            info!(uploaded, elapsed = %humantime::format_duration(elapsed), "Chunk upload complete");
        }

        Ok(UploadReport {
            uploaded,
            total,
            attempts,
            elapsed,
            last_error,
        })
    }

    /// One attempt: opens a channel, sends the remaining batches, and always
    /// closes the channel before returning.
    async fn attempt(
        &self,
        source: &dyn ChunkSource,
        batch_id: &BatchId,
        uploaded: &mut usize,
        retry: &mut u32,
        throttle: &mut ProgressThrottle,
    ) -> std::result::Result<(), AttemptError> {
        let channel = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(AttemptError::Fatal(UploadError::Cancelled)),
            channel = self.transport.open_channel(batch_id, self.config.batch_size) => channel,
        };
        let mut channel = channel.map_err(|e| classify(e, *uploaded))?;

        let result = self
            .send_remaining(channel.as_mut(), source, uploaded, retry, throttle)
            .await;

        if let Err(e) = channel.close().await {
            debug!(error = %e, "Closing chunk channel failed");
        }
        result
    }

    async fn send_remaining(
        &self,
        channel: &mut dyn ChunkChannel,
        source: &dyn ChunkSource,
        uploaded: &mut usize,
        retry: &mut u32,
        throttle: &mut ProgressThrottle,
    ) -> std::result::Result<(), AttemptError> {
        let total = source.len();
        while *uploaded < total {
            if let Some(progress) = throttle.tick(Instant::now(), *uploaded, total) {
                self.console.write(&format!("{progress}\r"));
            }

            let end = (*uploaded + self.config.batch_size).min(total);
            let chunks = source.load(*uploaded..end).map_err(|source| {
                AttemptError::Fatal(UploadError::Source {
                    uploaded: *uploaded,
                    source,
                })
            })?;

            let sent = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(AttemptError::Fatal(UploadError::Cancelled)),
                sent = channel.send_batch(&chunks, end == total) => sent,
            };
            sent.map_err(|e| classify(e, *uploaded))?;

            *uploaded = end;
            *retry = 0;
        }
        Ok(())
    }

    /// Returns `true` when cancelled before `delay` elapsed.
    async fn sleep_or_cancel(&self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }

    fn report_uploaded(&self, uploaded: usize) {
        self.console
            .write_line(&format!("Uploaded {uploaded} chunks successfully."));
    }
}

fn classify(error: GatewayError, uploaded: usize) -> AttemptError {
    if error.is_transient() {
        AttemptError::Transient(error)
    } else {
        AttemptError::Fatal(UploadError::Rejected {
            uploaded,
            source: error,
        })
    }
}
