//! Services shared by command handlers.

use bzzup_cli_core::args::PostageArgs;
use bzzup_console::{Console, StdConsole};
use bzzup_gateway::{ChunkTransport, GatewayApi, HttpGateway};
use bzzup_postage::{BatchLifecycleManager, BatchRequest};
use bzzup_primitives::BatchId;
use bzzup_upload::ChunkUploadPipeline;
use eyre::{Result, WrapErr};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::BzzupConfig;

/// Gateway, console, configuration and cancellation handed to every
/// command.
#[derive(Clone)]
pub struct CommandContext {
    pub gateway: Arc<dyn GatewayApi>,
    pub transport: Arc<dyn ChunkTransport>,
    pub console: Arc<dyn Console>,
    pub config: BzzupConfig,
    pub cancel: CancellationToken,
}

impl CommandContext {
    pub fn new(
        gateway: Arc<dyn GatewayApi>,
        transport: Arc<dyn ChunkTransport>,
        console: Arc<dyn Console>,
        config: BzzupConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            gateway,
            transport,
            console,
            config,
            cancel,
        }
    }

    /// Context talking to the configured HTTP gateway on the process console.
    pub fn connect(config: BzzupConfig, cancel: CancellationToken) -> Result<Self> {
        let http = Arc::new(
            HttpGateway::new(
                &config.gateway.url,
                config.gateway.api_key.clone(),
                config.request_timeout(),
            )
            .wrap_err_with(|| format!("invalid gateway {}", config.gateway.url))?,
        );
        Ok(Self::new(
            http.clone(),
            http,
            Arc::new(StdConsole),
            config,
            cancel,
        ))
    }

    pub fn lifecycle(&self) -> BatchLifecycleManager {
        BatchLifecycleManager::new(
            self.gateway.clone(),
            self.console.clone(),
            self.config.lifecycle_config(),
            self.cancel.clone(),
        )
    }

    pub fn pipeline(&self) -> Result<ChunkUploadPipeline> {
        ChunkUploadPipeline::new(
            self.transport.clone(),
            self.console.clone(),
            self.config.pipeline_config(),
            self.cancel.clone(),
        )
        .wrap_err("invalid upload settings")
    }

    /// Obtains a usable batch for content of `required_depth`.
    pub async fn usable_batch(&self, postage: &PostageArgs, required_depth: u8) -> Result<BatchId> {
        let request = BatchRequest {
            required_depth,
            existing: postage.batch_id,
            ttl: postage.ttl_or(self.config.postage.default_ttl_days),
            auto_purchase: postage.auto_purchase,
            label: postage.label.clone(),
        };
        self.lifecycle()
            .get_usable_batch(&request)
            .await
            .wrap_err("unable to obtain a usable postage batch")
    }
}
