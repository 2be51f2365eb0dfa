//! Postage batch lifecycle: reuse validation, purchase, and polling until the
//! batch can stamp chunks.
//!
//! ```text
//! Sizing -> PriceQuoted -> UserConfirmed | AutoApproved -> Purchasing
//!        -> AwaitingProvisioning -> AwaitingUsability -> Usable
//! ```
//!
//! Failures end in `ConfirmationDenied`, `ProvisioningTimeout` or
//! `UsabilityTimeout`.

use bzzup_console::{Console, Key};
use bzzup_gateway::{GatewayApi, GatewayError, Resolution};
use bzzup_primitives::{BatchId, BzzBalance, MIN_BATCH_DEPTH};
use serde::{Deserialize, Serialize};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{PostageError, Result, calculate_amount, calculate_bzz_price, validate_depth};

/// What to do when the user supplies an existing batch.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReuseCapacityCheck {
    /// Accept the batch without comparing its depth, warning the user.
    #[default]
    Skip,
    /// Reject batches shallower than the required depth.
    Enforce,
}

/// States of a batch acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum BatchState {
    Sizing,
    PriceQuoted,
    UserConfirmed,
    AutoApproved,
    Purchasing,
    AwaitingProvisioning,
    AwaitingUsability,
    Usable,
    ConfirmationDenied,
    ProvisioningTimeout,
    UsabilityTimeout,
}

impl BatchState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Usable | Self::ConfirmationDenied | Self::ProvisioningTimeout | Self::UsabilityTimeout
        )
    }
}

/// Timing and policy of the lifecycle.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Delay between two polls.
    pub poll_interval: Duration,
    /// Budget for a purchase reference to resolve into a batch id.
    pub provisioning_timeout: Duration,
    /// Budget for a resolved batch to become usable.
    pub usability_timeout: Duration,
    /// Chain block time, used to convert a time to live into an amount.
    pub block_time: Duration,
    pub reuse_capacity_check: ReuseCapacityCheck,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            provisioning_timeout: Duration::from_secs(600),
            usability_timeout: Duration::from_secs(600),
            block_time: Duration::from_secs(5),
            reuse_capacity_check: ReuseCapacityCheck::Skip,
        }
    }
}

/// Parameters of a batch acquisition.
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    /// Depth the content needs.
    pub required_depth: u8,
    /// Batch to reuse instead of buying one.
    pub existing: Option<BatchId>,
    /// Time to live of a newly bought batch.
    pub ttl: Duration,
    /// Skip the confirmation prompt.
    pub auto_purchase: bool,
    pub label: Option<String>,
}

/// Obtains usable postage batches.
pub struct BatchLifecycleManager {
    gateway: Arc<dyn GatewayApi>,
    console: Arc<dyn Console>,
    config: LifecycleConfig,
    cancel: CancellationToken,
    state: BatchState,
}

impl BatchLifecycleManager {
    pub fn new(
        gateway: Arc<dyn GatewayApi>,
        console: Arc<dyn Console>,
        config: LifecycleConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            gateway,
            console,
            config,
            cancel,
            state: BatchState::Sizing,
        }
    }

    /// Current state of the last acquisition.
    pub fn state(&self) -> BatchState {
        self.state
    }

    fn transition(&mut self, next: BatchState) {
        debug!(from = %self.state, to = %next, "Postage batch state change");
        self.state = next;
    }

    /// Returns a batch able to stamp content of `required_depth`, reusing
    /// `existing` when supplied and buying one otherwise.
    pub async fn get_usable_batch(&mut self, request: &BatchRequest) -> Result<BatchId> {
        self.transition(BatchState::Sizing);
        if let Some(batch_id) = request.existing {
            return self.reuse_batch(batch_id, request.required_depth).await;
        }

        let depth = request.required_depth.max(MIN_BATCH_DEPTH);
        let chain_price = self.gateway.chain_price().await?;
        let amount = calculate_amount(chain_price, request.ttl, self.config.block_time)?;
        let bzz_price = calculate_bzz_price(amount, depth)?;
        self.transition(BatchState::PriceQuoted);
        self.console.write_line(&format!(
            "Required postage batch {}",
            describe_price(depth, amount, bzz_price)
        ));

        if request.auto_purchase {
            self.transition(BatchState::AutoApproved);
        } else {
            self.confirm_purchase().await?;
            self.transition(BatchState::UserConfirmed);
        }

        let batch_id = self
            .create_batch(amount, depth, request.label.as_deref())
            .await?;
        self.console
            .write_line(&format!("Created postage batch: {batch_id}"));
        Ok(batch_id)
    }

    /// Buys a batch and waits until it is usable.
    pub async fn create_batch(
        &mut self,
        amount: u64,
        depth: u8,
        label: Option<&str>,
    ) -> Result<BatchId> {
        if amount == 0 {
            return Err(PostageError::InvalidArgument("amount must be positive".to_string()));
        }
        validate_depth(depth)?;

        self.transition(BatchState::Purchasing);
        let bzz_price = calculate_bzz_price(amount, depth)?;
        self.console.write_line(&format!(
            "Creating postage batch... {}",
            describe_price(depth, amount, bzz_price)
        ));
        let reference = self.gateway.buy_postage_batch(amount, depth, label).await?;
        info!(%reference, depth, amount, "Postage batch purchase submitted");

        self.transition(BatchState::AwaitingProvisioning);
        self.console
            .write("Waiting for batch created... (it may take a while)");
        let batch_id = match self.wait_for_provisioning(&reference).await {
            Ok(id) => id,
            Err(e) => {
                if matches!(e, PostageError::ProvisioningTimeout { .. }) {
                    self.transition(BatchState::ProvisioningTimeout);
                }
                return Err(e);
            }
        };
        self.console.write_line(". Done");

        self.transition(BatchState::AwaitingUsability);
        self.console
            .write("Waiting for batch being usable... (it may take a while)");
        if let Err(e) = self.wait_for_usability(batch_id).await {
            if matches!(e, PostageError::UsabilityTimeout { .. }) {
                self.transition(BatchState::UsabilityTimeout);
            }
            return Err(e);
        }
        self.console.write_line(". Done");

        self.transition(BatchState::Usable);
        info!(%batch_id, "Postage batch usable");
        Ok(batch_id)
    }

    async fn reuse_batch(&mut self, batch_id: BatchId, required_depth: u8) -> Result<BatchId> {
        let info = match self.gateway.get_postage_batch(&batch_id).await {
            Ok(info) => info,
            Err(e) if e.is_not_found() => {
                self.console
                    .write_error_line(&format!("Unable to find postage batch \"{batch_id}\"."));
                return Err(PostageError::NotFound { batch_id });
            }
            Err(e) => return Err(e.into()),
        };

        if !info.usable {
            self.console
                .write_error_line(&format!("Postage batch \"{batch_id}\" is not usable."));
            return Err(PostageError::NotUsable { batch_id });
        }

        match self.config.reuse_capacity_check {
            ReuseCapacityCheck::Skip => {
                warn!(%batch_id, depth = info.depth, required_depth, "Reusing batch without capacity check");
                self.console.write_line(
                    "Attention! Provided postage batch will be used without requirements checks!",
                );
            }
            ReuseCapacityCheck::Enforce if info.depth < required_depth => {
                self.console.write_error_line(&format!(
                    "Postage batch \"{batch_id}\" has not enough space."
                ));
                return Err(PostageError::InsufficientDepth {
                    batch_id,
                    depth: info.depth,
                    required: required_depth,
                });
            }
            ReuseCapacityCheck::Enforce => {}
        }

        self.transition(BatchState::Usable);
        Ok(batch_id)
    }

    async fn confirm_purchase(&mut self) -> Result<()> {
        loop {
            self.console
                .write_line("Confirm the batch purchase? Y to confirm, N to deny [Y|n]");
            let key = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(PostageError::Cancelled),
                key = self.console.read_key() => key?,
            };
            match key {
                Key::Yes | Key::Enter => return Ok(()),
                Key::No => {
                    self.transition(BatchState::ConfirmationDenied);
                    return Err(PostageError::PurchaseDenied);
                }
                Key::Other => self.console.write_line("Invalid selection"),
            }
        }
    }

    async fn wait_for_provisioning(&self, reference: &str) -> Result<BatchId> {
        let gateway = self.gateway.clone();
        self.poll_until(
            self.config.provisioning_timeout,
            || {
                let gateway = gateway.clone();
                async move { gateway.resolve_batch_reference(reference).await }
            },
            |elapsed| PostageError::ProvisioningTimeout {
                reference: reference.to_string(),
                elapsed,
            },
        )
        .await
    }

    async fn wait_for_usability(&self, batch_id: BatchId) -> Result<()> {
        let gateway = self.gateway.clone();
        self.poll_until(
            self.config.usability_timeout,
            || {
                let gateway = gateway.clone();
                async move {
                    match gateway.get_postage_batch(&batch_id).await {
                        Ok(info) if info.usable => Ok(Resolution::Ready(())),
                        Ok(_) => Ok(Resolution::Pending),
                        // a freshly resolved batch may not be indexed yet
                        Err(e) if e.is_not_found() => Ok(Resolution::Pending),
                        Err(e) => Err(e),
                    }
                }
            },
            |elapsed| PostageError::UsabilityTimeout { batch_id, elapsed },
        )
        .await
    }

    /// Polls `attempt` every poll interval until it resolves, the timeout
    /// elapses, or the token is cancelled. Transient gateway errors count as
    /// pending.
    async fn poll_until<T, F, Fut>(
        &self,
        timeout: Duration,
        mut attempt: F,
        on_timeout: impl FnOnce(Duration) -> PostageError,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<Resolution<T>, GatewayError>>,
    {
        let start = Instant::now();
        let mut polls = 0u32;
        loop {
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                warn!(polls, ?elapsed, "Polling timed out");
                return Err(on_timeout(elapsed));
            }

            polls += 1;
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(PostageError::Cancelled),
                outcome = attempt() => outcome,
            };
            match outcome {
                Ok(Resolution::Ready(value)) => {
                    debug!(polls, ?elapsed, "Polling resolved");
                    return Ok(value);
                }
                Ok(Resolution::Pending) => trace!(polls, "Still pending"),
                Err(e) if e.is_transient() => warn!(polls, error = %e, "Transient error while polling"),
                Err(e) => return Err(e.into()),
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(PostageError::Cancelled),
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }
}

fn describe_price(depth: u8, amount: u64, price: BzzBalance) -> String {
    format!("Depth: {depth}, Amount: {amount}, BZZ price: {price}")
}
