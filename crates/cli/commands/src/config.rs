//! Figment-based configuration loading.
//!
//! Configuration priority (highest wins):
//! 1. CLI arguments (applied after Figment load)
//! 2. Config file (TOML)
//! 3. Environment variables (`BZZUP_` prefix, `__` between nested keys)
//! 4. Defaults

use bzzup_cli_core::args::{GatewayArgs, UploadArgs};
use bzzup_postage::{LifecycleConfig, ReuseCapacityCheck};
use bzzup_primitives::{MAX_BATCH_DEPTH, MIN_BATCH_DEPTH};
use bzzup_upload::{PipelineConfig, RetryPolicy};
use eyre::{Result, WrapErr, ensure};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Default gateway endpoint.
pub const DEFAULT_GATEWAY_URL: &str = "https://gateway.etherna.io/";

/// Gateway connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            api_key: None,
            request_timeout_secs: 300,
        }
    }
}

/// Postage batch sizing and polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostageConfig {
    /// Lowest depth ever required.
    pub min_depth: u8,
    pub poll_interval_secs: u64,
    pub provisioning_timeout_secs: u64,
    pub usability_timeout_secs: u64,
    pub block_time_secs: u64,
    /// Time to live of new batches when `--ttl` is not given.
    pub default_ttl_days: u64,
    pub reuse_capacity_check: ReuseCapacityCheck,
}

impl Default for PostageConfig {
    fn default() -> Self {
        Self {
            min_depth: MIN_BATCH_DEPTH,
            poll_interval_secs: 5,
            provisioning_timeout_secs: 600,
            usability_timeout_secs: 600,
            block_time_secs: 5,
            default_ttl_days: 365,
            reuse_capacity_check: ReuseCapacityCheck::Skip,
        }
    }
}

/// Upload batching and retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub batch_size: usize,
    pub max_retries: u32,
    pub retry_delay_millis: u64,
    pub progress_interval_millis: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            max_retries: 10,
            retry_delay_millis: 5000,
            progress_interval_millis: 1000,
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BzzupConfig {
    pub gateway: GatewayConfig,
    pub postage: PostageConfig,
    pub upload: UploadConfig,
}

impl BzzupConfig {
    /// Load configuration from defaults, environment, and config file.
    /// CLI overrides should be applied separately after loading.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(BzzupConfig::default()))
            .merge(Env::prefixed("BZZUP_").split("__"));

        if let Some(path) = config_path {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            } else {
                tracing::warn!(path = %path.display(), "Config file not found, ignoring");
            }
        }

        figment.extract().wrap_err("Failed to load configuration")
    }

    /// Applies command line overrides.
    pub fn apply_args(&mut self, gateway: &GatewayArgs, upload: Option<&UploadArgs>) {
        if let Some(url) = &gateway.url {
            self.gateway.url = url.clone();
        }
        if let Some(key) = &gateway.api_key {
            self.gateway.api_key = Some(key.clone());
        }

        let Some(upload) = upload else { return };
        if let Some(batch_size) = upload.batch_size {
            self.upload.batch_size = usize::try_from(batch_size).unwrap_or(usize::MAX);
        }
        if let Some(max_retries) = upload.max_retries {
            self.upload.max_retries = max_retries;
        }
        if let Some(delay) = upload.retry_delay {
            self.upload.retry_delay_millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        }
    }

    /// Rejects values no command can work with.
    pub fn validate(&self) -> Result<()> {
        let postage = &self.postage;
        ensure!(
            (MIN_BATCH_DEPTH..=MAX_BATCH_DEPTH).contains(&postage.min_depth),
            "postage.min_depth must be between {MIN_BATCH_DEPTH} and {MAX_BATCH_DEPTH}, got {}",
            postage.min_depth
        );
        ensure!(postage.poll_interval_secs > 0, "postage.poll_interval_secs must be positive");
        ensure!(postage.block_time_secs > 0, "postage.block_time_secs must be positive");
        ensure!(postage.default_ttl_days > 0, "postage.default_ttl_days must be positive");
        ensure!(self.upload.batch_size > 0, "upload.batch_size must be at least 1");
        ensure!(self.upload.max_retries > 0, "upload.max_retries must be at least 1");
        ensure!(
            self.upload.retry_delay_millis > 0,
            "upload.retry_delay_millis must be positive"
        );
        ensure!(
            self.gateway.request_timeout_secs > 0,
            "gateway.request_timeout_secs must be positive"
        );
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.upload.retry_delay_millis)
    }

    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            poll_interval: Duration::from_secs(self.postage.poll_interval_secs),
            provisioning_timeout: Duration::from_secs(self.postage.provisioning_timeout_secs),
            usability_timeout: Duration::from_secs(self.postage.usability_timeout_secs),
            block_time: Duration::from_secs(self.postage.block_time_secs),
            reuse_capacity_check: self.postage.reuse_capacity_check,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            batch_size: self.upload.batch_size,
            max_retries: self.upload.max_retries,
            retry_delay: self.retry_delay(),
            progress_interval: Duration::from_millis(self.upload.progress_interval_millis),
        }
    }

    /// Retry budget of single file uploads.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.upload.max_retries,
            delay: self.retry_delay(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = BzzupConfig::default();
        assert_eq!(config.gateway.url, DEFAULT_GATEWAY_URL);
        assert_eq!(config.postage.min_depth, 17);
        assert_eq!(config.upload.batch_size, 500);
        assert_eq!(config.postage.reuse_capacity_check, ReuseCapacityCheck::Skip);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_layers() {
        Jail::expect_with(|jail| {
            jail.set_env("BZZUP_UPLOAD__MAX_RETRIES", "3");
            jail.set_env("BZZUP_GATEWAY__URL", "http://from-env/");
            jail.create_file(
                "bzzup.toml",
                r#"
[gateway]
url = "http://from-file/"

[postage]
reuse_capacity_check = "enforce"
"#,
            )?;

            let config = BzzupConfig::load(Some(Path::new("bzzup.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.gateway.url, "http://from-file/");
            assert_eq!(config.upload.max_retries, 3);
            assert_eq!(config.upload.batch_size, 500);
            assert_eq!(config.postage.reuse_capacity_check, ReuseCapacityCheck::Enforce);
            Ok(())
        });
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        Jail::expect_with(|_| {
            let config = BzzupConfig::load(Some(Path::new("nonexistent.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config, BzzupConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = BzzupConfig::default();
        config.apply_args(
            &GatewayArgs {
                url: Some("http://localhost:1633".to_string()),
                api_key: Some("secret".to_string()),
            },
            Some(&UploadArgs {
                batch_size: Some(1),
                max_retries: None,
                retry_delay: Some(Duration::from_secs(30)),
            }),
        );

        assert_eq!(config.gateway.url, "http://localhost:1633");
        assert_eq!(config.gateway.api_key.as_deref(), Some("secret"));
        assert_eq!(config.upload.batch_size, 1);
        assert_eq!(config.upload.max_retries, 10);
        assert_eq!(config.pipeline_config().retry_delay, Duration::from_secs(30));
        assert_eq!(config.retry_policy().delay, Duration::from_secs(30));
    }

    #[test]
    fn test_validation() {
        let mut config = BzzupConfig::default();
        config.postage.min_depth = 16;
        assert!(config.validate().is_err());

        let mut config = BzzupConfig::default();
        config.upload.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = BzzupConfig::default();
        config.postage.poll_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = BzzupConfig::default();
        config.upload.retry_delay_millis = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sub_second_retry_delay() {
        let mut config = BzzupConfig::default();
        config.apply_args(
            &GatewayArgs::default(),
            Some(&UploadArgs {
                retry_delay: Some(Duration::from_millis(1500)),
                ..Default::default()
            }),
        );
        assert_eq!(config.pipeline_config().retry_delay, Duration::from_millis(1500));
        assert_eq!(config.retry_policy().delay, Duration::from_millis(1500));

        config.apply_args(
            &GatewayArgs::default(),
            Some(&UploadArgs {
                retry_delay: Some(Duration::from_millis(500)),
                ..Default::default()
            }),
        );
        assert_eq!(config.retry_delay(), Duration::from_millis(500));
        config.validate().unwrap();

        config.apply_args(
            &GatewayArgs::default(),
            Some(&UploadArgs {
                retry_delay: Some(Duration::from_micros(10)),
                ..Default::default()
            }),
        );
        assert!(config.validate().is_err());
    }
}
