use assert_matches::assert_matches;
use bzzup_console::{Key, MemoryConsole};
use bzzup_gateway::{MockGateway, PostageBatchInfo};
use bzzup_postage::{
    BatchLifecycleManager, BatchRequest, BatchState, LifecycleConfig, PostageError,
    ReuseCapacityCheck,
};
use bzzup_primitives::BatchId;
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const DAY: Duration = Duration::from_secs(86_400);

fn manager(gateway: &MockGateway, console: &MemoryConsole) -> BatchLifecycleManager {
    manager_with(gateway, console, LifecycleConfig::default(), CancellationToken::new())
}

fn manager_with(
    gateway: &MockGateway,
    console: &MemoryConsole,
    config: LifecycleConfig,
    cancel: CancellationToken,
) -> BatchLifecycleManager {
    BatchLifecycleManager::new(
        Arc::new(gateway.clone()),
        Arc::new(console.clone()),
        config,
        cancel,
    )
}

fn purchase_request(depth: u8) -> BatchRequest {
    BatchRequest {
        required_depth: depth,
        existing: None,
        ttl: DAY,
        auto_purchase: true,
        label: Some("site".to_string()),
    }
}

fn existing_batch(id: BatchId, depth: u8, usable: bool) -> PostageBatchInfo {
    PostageBatchInfo {
        id,
        depth,
        amount: 1000,
        usable,
        label: None,
        ttl: Some(3600),
        immutable: false,
    }
}

#[tokio::test(start_paused = true)]
async fn purchase_resolves_after_pending_polls() {
    let batch_id = BatchId::repeat_byte(0x11);
    let gateway = MockGateway::new()
        .with_chain_price(24_000)
        .with_next_batch_id(batch_id)
        .with_pending_resolutions(Some(3));
    let console = MemoryConsole::new();
    let mut manager = manager(&gateway, &console);

    let start = Instant::now();
    let id = manager.get_usable_batch(&purchase_request(20)).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(id, batch_id);
    assert_eq!(manager.state(), BatchState::Usable);
    assert_eq!(gateway.resolve_calls(), 4);
    assert!(elapsed >= Duration::from_secs(15), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(16), "elapsed {elapsed:?}");

    let purchases = gateway.purchases();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].depth, 20);
    assert_eq!(purchases[0].amount, 414_720_000);
    assert_eq!(purchases[0].label.as_deref(), Some("site"));

    let output = console.output();
    assert!(output.contains("Required postage batch Depth: 20, Amount: 414720000"));
    assert!(output.contains("Waiting for batch created... (it may take a while). Done"));
    assert!(output.contains(&format!("Created postage batch: {batch_id}")));
    assert_eq!(console.prompts(), 0);
}

#[tokio::test(start_paused = true)]
async fn provisioning_times_out() {
    let gateway = MockGateway::new()
        .with_chain_price(10)
        .with_pending_resolutions(None);
    let console = MemoryConsole::new();
    let mut manager = manager(&gateway, &console);

    let start = Instant::now();
    let err = manager.get_usable_batch(&purchase_request(17)).await.unwrap_err();
    let elapsed = start.elapsed();

    assert_matches!(err, PostageError::ProvisioningTimeout { ref reference, .. } if reference == "ref-1");
    assert_eq!(manager.state(), BatchState::ProvisioningTimeout);
    assert!(elapsed >= Duration::from_secs(600));
    assert!(elapsed < Duration::from_secs(606));
    assert_eq!(gateway.resolve_calls(), 120);
}

#[tokio::test(start_paused = true)]
async fn usability_times_out() {
    let batch_id = BatchId::repeat_byte(0x22);
    let gateway = MockGateway::new()
        .with_chain_price(10)
        .with_next_batch_id(batch_id)
        .with_pending_resolutions(Some(0))
        .with_unusable_polls(usize::MAX);
    let console = MemoryConsole::new();
    let config = LifecycleConfig {
        usability_timeout: Duration::from_secs(60),
        ..Default::default()
    };
    let mut manager = manager_with(&gateway, &console, config, CancellationToken::new());

    let err = manager.get_usable_batch(&purchase_request(17)).await.unwrap_err();

    assert_matches!(err, PostageError::UsabilityTimeout { batch_id: id, .. } if id == batch_id);
    assert_eq!(manager.state(), BatchState::UsabilityTimeout);
    assert_eq!(gateway.batch_calls(), 12);
}

#[tokio::test(start_paused = true)]
async fn usability_waits_for_flag() {
    let gateway = MockGateway::new()
        .with_chain_price(10)
        .with_pending_resolutions(Some(1))
        .with_unusable_polls(2);
    let console = MemoryConsole::new();
    let mut manager = manager(&gateway, &console);

    let start = Instant::now();
    manager.get_usable_batch(&purchase_request(17)).await.unwrap();

    // one pending resolution, then two unusable answers
    assert_eq!(start.elapsed(), Duration::from_secs(15));
    assert_eq!(gateway.batch_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn confirmation_reprompts_on_invalid_key() {
    let gateway = MockGateway::new()
        .with_chain_price(10)
        .with_pending_resolutions(Some(0));
    let console = MemoryConsole::with_keys([Key::Other, Key::Enter]);
    let mut manager = manager(&gateway, &console);

    let request = BatchRequest {
        auto_purchase: false,
        ..purchase_request(17)
    };
    manager.get_usable_batch(&request).await.unwrap();

    assert_eq!(console.prompts(), 2);
    let lines = console.output_lines();
    assert_eq!(
        lines
            .iter()
            .filter(|l| l.starts_with("Confirm the batch purchase?"))
            .count(),
        2
    );
    assert!(lines.iter().any(|l| l == "Invalid selection"));
    assert_eq!(gateway.purchases().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn confirmation_denied() {
    let gateway = MockGateway::new().with_chain_price(10);
    let console = MemoryConsole::with_keys([Key::No]);
    let mut manager = manager(&gateway, &console);

    let request = BatchRequest {
        auto_purchase: false,
        ..purchase_request(17)
    };
    let err = manager.get_usable_batch(&request).await.unwrap_err();

    assert_matches!(err, PostageError::PurchaseDenied);
    assert_eq!(manager.state(), BatchState::ConfirmationDenied);
    assert!(gateway.purchases().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_polling() {
    let gateway = MockGateway::new()
        .with_chain_price(10)
        .with_pending_resolutions(None);
    let console = MemoryConsole::new();
    let cancel = CancellationToken::new();
    let mut manager =
        manager_with(&gateway, &console, LifecycleConfig::default(), cancel.clone());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        cancel.cancel();
    });

    let err = manager.get_usable_batch(&purchase_request(17)).await.unwrap_err();
    assert_matches!(err, PostageError::Cancelled);
    assert_eq!(gateway.resolve_calls(), 3);
}

#[tokio::test]
async fn reuse_missing_batch() {
    let gateway = MockGateway::new();
    let console = MemoryConsole::new();
    let mut manager = manager(&gateway, &console);
    let batch_id = BatchId::repeat_byte(0x33);

    let request = BatchRequest {
        existing: Some(batch_id),
        ..purchase_request(17)
    };
    let err = manager.get_usable_batch(&request).await.unwrap_err();

    assert_matches!(err, PostageError::NotFound { batch_id: id } if id == batch_id);
    assert_eq!(console.error_lines().len(), 1);
    assert!(console.error_lines()[0].starts_with("Unable to find postage batch"));
}

#[tokio::test]
async fn reuse_unusable_batch() {
    let batch_id = BatchId::repeat_byte(0x44);
    let gateway = MockGateway::new().with_batch(existing_batch(batch_id, 20, false));
    let console = MemoryConsole::new();
    let mut manager = manager(&gateway, &console);

    let request = BatchRequest {
        existing: Some(batch_id),
        ..purchase_request(17)
    };
    let err = manager.get_usable_batch(&request).await.unwrap_err();

    assert_matches!(err, PostageError::NotUsable { .. });
    assert!(gateway.purchases().is_empty());
}

#[tokio::test]
async fn reuse_skips_capacity_check_by_default() {
    let batch_id = BatchId::repeat_byte(0x55);
    let gateway = MockGateway::new().with_batch(existing_batch(batch_id, 17, true));
    let console = MemoryConsole::new();
    let mut manager = manager(&gateway, &console);

    let request = BatchRequest {
        existing: Some(batch_id),
        ..purchase_request(24)
    };
    let id = manager.get_usable_batch(&request).await.unwrap();

    assert_eq!(id, batch_id);
    assert_eq!(manager.state(), BatchState::Usable);
    assert!(
        console
            .output()
            .contains("Attention! Provided postage batch will be used without requirements checks!")
    );
    assert!(gateway.purchases().is_empty());
}

#[tokio::test]
async fn reuse_enforces_capacity_when_configured() {
    let batch_id = BatchId::repeat_byte(0x66);
    let gateway = MockGateway::new().with_batch(existing_batch(batch_id, 20, true));
    let console = MemoryConsole::new();
    let config = LifecycleConfig {
        reuse_capacity_check: ReuseCapacityCheck::Enforce,
        ..Default::default()
    };
    let mut manager = manager_with(&gateway, &console, config, CancellationToken::new());

    let shallow = BatchRequest {
        existing: Some(batch_id),
        ..purchase_request(21)
    };
    let err = manager.get_usable_batch(&shallow).await.unwrap_err();
    assert_matches!(
        err,
        PostageError::InsufficientDepth {
            depth: 20,
            required: 21,
            ..
        }
    );

    let fits = BatchRequest {
        existing: Some(batch_id),
        ..purchase_request(20)
    };
    assert_eq!(manager.get_usable_batch(&fits).await.unwrap(), batch_id);
    assert!(!console.output().contains("Attention!"));
}

#[tokio::test]
async fn create_batch_validates_arguments() {
    let gateway = MockGateway::new();
    let console = MemoryConsole::new();
    let mut manager = manager(&gateway, &console);

    assert_matches!(
        manager.create_batch(0, 20, None).await,
        Err(PostageError::InvalidArgument(_))
    );
    assert_matches!(
        manager.create_batch(100, 16, None).await,
        Err(PostageError::InvalidDepth { depth: 16, .. })
    );
    assert!(gateway.purchases().is_empty());
}
