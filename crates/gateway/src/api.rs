//! Gateway traits and data types.

use async_trait::async_trait;
use bzzup_primitives::{BatchId, ChunkAddress, SwarmChunk};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use crate::Result;

/// Outcome of polling for a value the remote side produces asynchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<T> {
    /// Not available yet; poll again later.
    Pending,
    /// The value is available.
    Ready(T),
}

impl<T> Resolution<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Pending => None,
        }
    }
}

/// Postage batch record as owned by the remote ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostageBatchInfo {
    /// Batch identifier.
    pub id: BatchId,

    /// Capacity tier of the batch.
    pub depth: u8,

    /// Per-chunk balance paid, in PLUR.
    #[serde(deserialize_with = "u64_from_string_or_number")]
    pub amount: u64,

    /// Whether the batch can stamp chunks yet.
    #[serde(alias = "isUsable")]
    pub usable: bool,

    /// Optional user label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Remaining time to live in seconds, when known.
    #[serde(default, alias = "batchTTL", skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,

    /// Whether the batch is immutable.
    #[serde(default)]
    pub immutable: bool,
}

fn u64_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("amount out of range: {n}"))),
        serde_json::Value::String(s) => s
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid amount: {s}"))),
        other => Err(D::Error::custom(format!("invalid amount: {other}"))),
    }
}

/// A local file to upload as a single resource. The body is streamed from
/// `path` on every attempt.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub path: PathBuf,
    pub name: Option<String>,
    pub content_type: Option<String>,
    pub pin: bool,
}

/// One file of a collection upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionEntry {
    /// Path inside the collection, `/` separated.
    pub name: String,
    /// Local file holding the content.
    pub path: PathBuf,
    pub content_type: String,
}

/// A directory uploaded as one collection. The gateway builds the
/// collection manifest and returns its root.
#[derive(Debug, Clone)]
pub struct DirectoryUpload {
    pub entries: Vec<CollectionEntry>,
    /// Entry served for the collection root.
    pub index_document: Option<String>,
    pub pin: bool,
}

/// Remote gateway operations.
#[async_trait]
pub trait GatewayApi: Send + Sync {
    /// Current storage price, in PLUR per chunk per block.
    async fn chain_price(&self) -> Result<u64>;

    /// Starts the purchase of a batch. Returns a reference id that resolves
    /// to the final batch id once the purchase is processed.
    async fn buy_postage_batch(&self, amount: u64, depth: u8, label: Option<&str>)
    -> Result<String>;

    /// Resolves a purchase reference id into a batch id.
    async fn resolve_batch_reference(&self, reference: &str) -> Result<Resolution<BatchId>>;

    /// Fetches a batch record. A missing batch yields a not-found error.
    async fn get_postage_batch(&self, batch_id: &BatchId) -> Result<PostageBatchInfo>;

    /// Uploads a file and returns its root address.
    async fn upload_file(&self, batch_id: &BatchId, file: FileUpload) -> Result<ChunkAddress>;

    /// Uploads a directory as a collection and returns its root address.
    async fn upload_directory(
        &self,
        batch_id: &BatchId,
        directory: DirectoryUpload,
    ) -> Result<ChunkAddress>;

    async fn fund_resource_download(&self, address: &ChunkAddress) -> Result<()>;

    async fn fund_resource_pinning(&self, address: &ChunkAddress) -> Result<()>;

    async fn defund_resource_download(&self, address: &ChunkAddress) -> Result<()>;

    async fn defund_resource_pinning(&self, address: &ChunkAddress) -> Result<()>;
}

/// Opens channels that carry chunks stamped with a batch.
#[async_trait]
pub trait ChunkTransport: Send + Sync {
    /// Opens a channel bound to `batch_id`. `batch_size` is the number of
    /// chunks per [`ChunkChannel::send_batch`] call; `1` selects one chunk
    /// per request.
    async fn open_channel(
        &self,
        batch_id: &BatchId,
        batch_size: usize,
    ) -> Result<Box<dyn ChunkChannel>>;
}

/// An open chunk upload channel.
///
/// A channel is owned by one upload attempt and must be closed before the
/// next attempt opens a new one.
#[async_trait]
pub trait ChunkChannel: Send {
    /// Sends one batch of chunks. `is_final` marks the last batch.
    async fn send_batch(&mut self, chunks: &[SwarmChunk], is_final: bool) -> Result<()>;

    /// Releases the channel.
    async fn close(self: Box<Self>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_info_accepts_string_amount() {
        let json = r#"{
            "id": "0x6a8d29e0b8a05a7b6f2a7dfb1a3a7e4fc2b7d9fb9a8b6e5d4c3b2a1908f7e6d5",
            "depth": 20,
            "amount": "123456789",
            "isUsable": true,
            "label": "backup"
        }"#;

        let info: PostageBatchInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.depth, 20);
        assert_eq!(info.amount, 123_456_789);
        assert!(info.usable);
        assert_eq!(info.label.as_deref(), Some("backup"));
        assert_eq!(info.ttl, None);
    }

    #[test]
    fn test_batch_info_accepts_numeric_amount() {
        let json = r#"{
            "id": "6a8d29e0b8a05a7b6f2a7dfb1a3a7e4fc2b7d9fb9a8b6e5d4c3b2a1908f7e6d5",
            "depth": 17,
            "amount": 42,
            "usable": false,
            "batchTTL": 3600
        }"#;

        let info: PostageBatchInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.amount, 42);
        assert!(!info.usable);
        assert_eq!(info.ttl, Some(3600));
    }

    #[test]
    fn test_resolution() {
        assert!(!Resolution::<u8>::Pending.is_ready());
        assert_eq!(Resolution::Ready(3).ready(), Some(3));
        assert_eq!(Resolution::<u8>::Pending.ready(), None);
    }
}
