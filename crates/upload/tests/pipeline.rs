use assert_matches::assert_matches;
use bzzup_console::MemoryConsole;
use bzzup_file::StoreError;
use bzzup_gateway::{ChannelScript, ScriptedTransport};
use bzzup_primitives::{BatchId, ChunkAddress, SwarmChunk};
use bzzup_upload::{ChunkSource, ChunkUploadPipeline, PipelineConfig, UploadError};
use std::{collections::HashSet, ops::Range, sync::Arc, time::Duration};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const BATCH: BatchId = BatchId::repeat_byte(0x01);

fn chunks(count: usize) -> Vec<SwarmChunk> {
    (0..count)
        .map(|i| SwarmChunk::leaf((i as u32).to_be_bytes().to_vec()).unwrap())
        .collect()
}

fn config(batch_size: usize, max_retries: u32) -> PipelineConfig {
    PipelineConfig {
        batch_size,
        max_retries,
        retry_delay: Duration::from_secs(5),
        progress_interval: Duration::from_secs(1),
    }
}

fn pipeline(
    transport: &ScriptedTransport,
    console: &MemoryConsole,
    config: PipelineConfig,
    cancel: CancellationToken,
) -> ChunkUploadPipeline {
    ChunkUploadPipeline::new(
        Arc::new(transport.clone()),
        Arc::new(console.clone()),
        config,
        cancel,
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn uploads_everything_in_batches() {
    let source = chunks(25);
    let transport = ScriptedTransport::new([]);
    let console = MemoryConsole::new();

    let report = pipeline(&transport, &console, config(10, 3), CancellationToken::new())
        .upload_all(&source, &BATCH)
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.uploaded, 25);
    assert_eq!(report.attempts, 1);
    assert!(report.last_error.is_none());
    assert_eq!(transport.batches(), vec![10, 10, 5]);
    assert_eq!(transport.final_batches(), 1);
    assert_eq!(transport.closed(), 1);

    let lines = console.output_lines();
    assert_eq!(lines.first().map(String::as_str), Some("Start uploading 25 chunks..."));
    assert_eq!(lines.last().map(String::as_str), Some("Uploaded 25 chunks successfully."));
}

#[tokio::test(start_paused = true)]
async fn retry_resumes_after_last_confirmed_batch() {
    // ten batches of three, the first channel dies after four of them
    let source = chunks(30);
    let transport = ScriptedTransport::new([ChannelScript::FailAfter(4), ChannelScript::Succeed]);
    let console = MemoryConsole::new();

    let start = Instant::now();
    let report = pipeline(&transport, &console, config(3, 10), CancellationToken::new())
        .upload_all(&source, &BATCH)
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.attempts, 2);
    assert!(report.last_error.is_some());
    assert_eq!(transport.batches(), vec![3; 10]);

    let expected: Vec<ChunkAddress> = source.iter().map(|c| *c.address()).collect();
    assert_eq!(transport.delivered(), expected);

    assert_eq!(transport.opened(), 2);
    assert_eq!(transport.closed(), 2);
    assert_eq!(transport.max_live_channels(), 1);
    assert_eq!(start.elapsed(), Duration::from_secs(5));
    assert!(console.output_lines().iter().any(|l| l == "Retry..."));
    assert_eq!(console.error_lines(), vec!["Error uploading chunks".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn progress_resets_the_retry_budget() {
    let source = chunks(8);
    let transport = ScriptedTransport::new([
        ChannelScript::FailAfter(1),
        ChannelScript::FailAfter(1),
        ChannelScript::FailAfter(1),
    ]);
    let console = MemoryConsole::new();

    // two consecutive failures would exhaust the budget
    let report = pipeline(&transport, &console, config(2, 2), CancellationToken::new())
        .upload_all(&source, &BATCH)
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.attempts, 4);
    assert_eq!(transport.delivered().len(), 8);
    assert_eq!(
        transport.delivered().into_iter().collect::<HashSet<_>>().len(),
        8
    );
}

#[tokio::test(start_paused = true)]
async fn failed_open_is_retried() {
    let source = chunks(4);
    let transport = ScriptedTransport::new([ChannelScript::FailOpen]);
    let console = MemoryConsole::new();

    let report = pipeline(&transport, &console, config(2, 3), CancellationToken::new())
        .upload_all(&source, &BATCH)
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.attempts, 2);
    assert_eq!(transport.opened(), 1);
    assert_eq!(transport.closed(), 1);
    assert_eq!(transport.batches(), vec![2, 2]);
}

#[tokio::test]
async fn empty_source_opens_nothing() {
    let transport = ScriptedTransport::new([]);
    let console = MemoryConsole::new();

    let report = pipeline(&transport, &console, config(2, 3), CancellationToken::new())
        .upload_all(&Vec::<SwarmChunk>::new(), &BATCH)
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.attempts, 0);
    assert_eq!(transport.opened(), 0);
    assert_eq!(
        console.output_lines().last().map(String::as_str),
        Some("Uploaded 0 chunks successfully.")
    );
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_report_partial_count() {
    let source = chunks(10);
    let transport = ScriptedTransport::always_failing();
    let console = MemoryConsole::new();

    let start = Instant::now();
    let report = pipeline(&transport, &console, config(5, 4), CancellationToken::new())
        .upload_all(&source, &BATCH)
        .await
        .unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.uploaded, 0);
    assert_eq!(report.attempts, 4);
    assert!(report.last_error.is_some());
    assert_eq!(transport.opened(), 4);
    assert_eq!(transport.closed(), 4);
    // no wait after the last attempt
    assert_eq!(start.elapsed(), Duration::from_secs(15));
    assert_eq!(
        console.output_lines().last().map(String::as_str),
        Some("Uploaded 0 chunks successfully.")
    );
}

#[tokio::test(start_paused = true)]
async fn partial_progress_is_kept_when_retries_run_out() {
    let source = chunks(10);
    let transport = ScriptedTransport::new([
        ChannelScript::FailAfter(2),
        ChannelScript::FailAfter(0),
        ChannelScript::FailAfter(0),
    ]);
    let console = MemoryConsole::new();

    let report = pipeline(&transport, &console, config(2, 3), CancellationToken::new())
        .upload_all(&source, &BATCH)
        .await
        .unwrap();

    assert_eq!(report.uploaded, 4);
    assert!(report.uploaded <= report.total);
    assert_eq!(report.attempts, 3);
    assert_eq!(transport.delivered().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn cancellation_closes_channel_and_errors() {
    let source = chunks(10);
    let transport = ScriptedTransport::always_failing();
    let console = MemoryConsole::new();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(7)).await;
        trigger.cancel();
    });

    let err = pipeline(&transport, &console, config(5, 10), cancel)
        .upload_all(&source, &BATCH)
        .await
        .unwrap_err();

    assert_matches!(err, UploadError::Cancelled);
    assert_eq!(transport.opened(), 2);
    assert_eq!(transport.closed(), transport.opened());
}

struct BrokenSource;

impl ChunkSource for BrokenSource {
    fn len(&self) -> usize {
        4
    }

    fn load(&self, _range: Range<usize>) -> Result<Vec<SwarmChunk>, StoreError> {
        Err(StoreError::MissingChunk(ChunkAddress::default()))
    }
}

#[tokio::test]
async fn unreadable_source_is_fatal() {
    let transport = ScriptedTransport::new([]);
    let console = MemoryConsole::new();

    let err = pipeline(&transport, &console, config(2, 10), CancellationToken::new())
        .upload_all(&BrokenSource, &BATCH)
        .await
        .unwrap_err();

    assert_matches!(err, UploadError::Source { uploaded: 0, .. });
    assert_eq!(transport.opened(), 1);
    assert_eq!(transport.closed(), 1);
}

#[test]
fn zero_batch_size_is_rejected() {
    let result = ChunkUploadPipeline::new(
        Arc::new(ScriptedTransport::new([])),
        Arc::new(MemoryConsole::new()),
        config(0, 10),
        CancellationToken::new(),
    );
    assert_matches!(result, Err(UploadError::InvalidConfig(_)));
}
