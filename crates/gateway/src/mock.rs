//! In-memory gateway doubles.

use async_trait::async_trait;
use bytes::Bytes;
use bzzup_primitives::{BatchId, ChunkAddress, SwarmChunk};
use parking_lot::Mutex;
use std::{collections::HashMap, collections::VecDeque, sync::Arc};

use crate::{
    ChunkChannel, ChunkTransport, DirectoryUpload, FileUpload, GatewayApi, GatewayError,
    PostageBatchInfo, Resolution, Result,
};

/// A recorded batch purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub amount: u64,
    pub depth: u8,
    pub label: Option<String>,
}

/// A recorded file upload, with the content read when it was uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: Option<String>,
    pub content_type: Option<String>,
    pub pin: bool,
    pub content: Bytes,
}

/// A recorded collection upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDirectory {
    /// Entry names in upload order.
    pub names: Vec<String>,
    pub index_document: Option<String>,
    pub pin: bool,
    /// Root address returned for the collection.
    pub reference: ChunkAddress,
}

#[derive(Debug, Default)]
struct MockState {
    chain_price: u64,
    batches: HashMap<BatchId, PostageBatchInfo>,
    purchases: Vec<Purchase>,
    purchased: Vec<BatchId>,
    next_batch_id: Option<BatchId>,
    resolve_pending: Option<usize>,
    unusable_polls: usize,
    resolve_calls: usize,
    batch_calls: usize,
    upload_failures: usize,
    uploads: Vec<UploadedFile>,
    directory_uploads: Vec<UploadedDirectory>,
    funded_download: Vec<ChunkAddress>,
    funded_pinning: Vec<ChunkAddress>,
    defunded_download: Vec<ChunkAddress>,
    defunded_pinning: Vec<ChunkAddress>,
}

/// Scriptable [`GatewayApi`] double.
///
/// Purchases create a batch with id `next_batch_id` (or a fixed default).
/// Reference resolution stays pending for a configurable number of polls
/// and the created batch stays unusable for a configurable number of polls.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain_price(self, price: u64) -> Self {
        self.state.lock().chain_price = price;
        self
    }

    /// Registers an existing batch.
    pub fn with_batch(self, info: PostageBatchInfo) -> Self {
        self.state.lock().batches.insert(info.id, info);
        self
    }

    /// Id assigned to the next purchased batch.
    pub fn with_next_batch_id(self, id: BatchId) -> Self {
        self.state.lock().next_batch_id = Some(id);
        self
    }

    /// Reference resolution answers pending this many times before
    /// resolving. `None` never resolves.
    pub fn with_pending_resolutions(self, polls: Option<usize>) -> Self {
        self.state.lock().resolve_pending = polls;
        self
    }

    /// Purchased batches report unusable for this many polls.
    pub fn with_unusable_polls(self, polls: usize) -> Self {
        self.state.lock().unusable_polls = polls;
        self
    }

    /// The next `count` file or directory uploads fail with a transient
    /// error.
    pub fn with_upload_failures(self, count: usize) -> Self {
        self.state.lock().upload_failures = count;
        self
    }

    pub fn purchases(&self) -> Vec<Purchase> {
        self.state.lock().purchases.clone()
    }

    pub fn resolve_calls(&self) -> usize {
        self.state.lock().resolve_calls
    }

    pub fn batch_calls(&self) -> usize {
        self.state.lock().batch_calls
    }

    pub fn uploads(&self) -> Vec<UploadedFile> {
        self.state.lock().uploads.clone()
    }

    pub fn directory_uploads(&self) -> Vec<UploadedDirectory> {
        self.state.lock().directory_uploads.clone()
    }

    pub fn funded_download(&self) -> Vec<ChunkAddress> {
        self.state.lock().funded_download.clone()
    }

    pub fn funded_pinning(&self) -> Vec<ChunkAddress> {
        self.state.lock().funded_pinning.clone()
    }

    pub fn defunded_download(&self) -> Vec<ChunkAddress> {
        self.state.lock().defunded_download.clone()
    }

    pub fn defunded_pinning(&self) -> Vec<ChunkAddress> {
        self.state.lock().defunded_pinning.clone()
    }

    fn purchased_id(state: &MockState) -> BatchId {
        state.next_batch_id.unwrap_or(BatchId::repeat_byte(0xBA))
    }

    fn take_failure(state: &mut MockState) -> Result<()> {
        if state.upload_failures > 0 {
            state.upload_failures -= 1;
            return Err(GatewayError::status(503, "unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl GatewayApi for MockGateway {
    async fn chain_price(&self) -> Result<u64> {
        Ok(self.state.lock().chain_price)
    }

    async fn buy_postage_batch(
        &self,
        amount: u64,
        depth: u8,
        label: Option<&str>,
    ) -> Result<String> {
        let mut state = self.state.lock();
        state.purchases.push(Purchase {
            amount,
            depth,
            label: label.map(str::to_string),
        });
        let id = Self::purchased_id(&state);
        state.purchased.push(id);
        state.batches.insert(
            id,
            PostageBatchInfo {
                id,
                depth,
                amount,
                usable: false,
                label: label.map(str::to_string),
                ttl: None,
                immutable: false,
            },
        );
        Ok(format!("ref-{}", state.purchases.len()))
    }

    async fn resolve_batch_reference(&self, _reference: &str) -> Result<Resolution<BatchId>> {
        let mut state = self.state.lock();
        state.resolve_calls += 1;
        match state.resolve_pending {
            Some(pending) if state.resolve_calls > pending => {
                Ok(Resolution::Ready(Self::purchased_id(&state)))
            }
            _ => Ok(Resolution::Pending),
        }
    }

    async fn get_postage_batch(&self, batch_id: &BatchId) -> Result<PostageBatchInfo> {
        let mut state = self.state.lock();
        state.batch_calls += 1;
        let unusable = state.unusable_polls;
        let calls = state.batch_calls;
        let purchased = state.purchased.contains(batch_id);
        let info = state
            .batches
            .get_mut(batch_id)
            .ok_or_else(|| GatewayError::status(404, "batch not found"))?;
        if purchased && !info.usable && calls > unusable {
            info.usable = true;
        }
        Ok(info.clone())
    }

    async fn upload_file(&self, _batch_id: &BatchId, file: FileUpload) -> Result<ChunkAddress> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;
        let content = Bytes::from(std::fs::read(&file.path)?);
        let address = SwarmChunk::leaf(content.clone())
            .map(|c| *c.address())
            .unwrap_or_default();
        state.uploads.push(UploadedFile {
            name: file.name,
            content_type: file.content_type,
            pin: file.pin,
            content,
        });
        Ok(address)
    }

    async fn upload_directory(
        &self,
        _batch_id: &BatchId,
        directory: DirectoryUpload,
    ) -> Result<ChunkAddress> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;
        let names: Vec<String> = directory.entries.into_iter().map(|e| e.name).collect();
        let reference = SwarmChunk::leaf(names.join("\n").into_bytes())
            .map(|c| *c.address())
            .unwrap_or_default();
        state.directory_uploads.push(UploadedDirectory {
            names,
            index_document: directory.index_document,
            pin: directory.pin,
            reference,
        });
        Ok(reference)
    }

    async fn fund_resource_download(&self, address: &ChunkAddress) -> Result<()> {
        self.state.lock().funded_download.push(*address);
        Ok(())
    }

    async fn fund_resource_pinning(&self, address: &ChunkAddress) -> Result<()> {
        self.state.lock().funded_pinning.push(*address);
        Ok(())
    }

    async fn defund_resource_download(&self, address: &ChunkAddress) -> Result<()> {
        self.state.lock().defunded_download.push(*address);
        Ok(())
    }

    async fn defund_resource_pinning(&self, address: &ChunkAddress) -> Result<()> {
        self.state.lock().defunded_pinning.push(*address);
        Ok(())
    }
}

/// Behaviour of one channel opened from a [`ScriptedTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelScript {
    /// Every batch succeeds.
    Succeed,
    /// The first `n` batches succeed, then every send fails.
    FailAfter(usize),
    /// Opening the channel fails.
    FailOpen,
}

#[derive(Debug, Default)]
struct TransportState {
    scripts: VecDeque<ChannelScript>,
    fallback: Option<ChannelScript>,
    opened: usize,
    closed: usize,
    live: usize,
    max_live: usize,
    delivered: Vec<ChunkAddress>,
    batches: Vec<usize>,
    final_batches: usize,
}

/// Scriptable [`ChunkTransport`] double recording every delivered chunk.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<TransportState>>,
}

impl ScriptedTransport {
    /// Channels follow `scripts` in order, then `Succeed`.
    pub fn new(scripts: impl IntoIterator<Item = ChannelScript>) -> Self {
        let state = TransportState {
            scripts: scripts.into_iter().collect(),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Every channel fails on its first send.
    pub fn always_failing() -> Self {
        let transport = Self::new([]);
        transport.state.lock().fallback = Some(ChannelScript::FailAfter(0));
        transport
    }

    pub fn opened(&self) -> usize {
        self.state.lock().opened
    }

    pub fn closed(&self) -> usize {
        self.state.lock().closed
    }

    /// Highest number of channels open at the same time.
    pub fn max_live_channels(&self) -> usize {
        self.state.lock().max_live
    }

    pub fn delivered(&self) -> Vec<ChunkAddress> {
        self.state.lock().delivered.clone()
    }

    /// Sizes of the batches accepted, in order.
    pub fn batches(&self) -> Vec<usize> {
        self.state.lock().batches.clone()
    }

    pub fn final_batches(&self) -> usize {
        self.state.lock().final_batches
    }
}

#[async_trait]
impl ChunkTransport for ScriptedTransport {
    async fn open_channel(
        &self,
        _batch_id: &BatchId,
        _batch_size: usize,
    ) -> Result<Box<dyn ChunkChannel>> {
        let mut state = self.state.lock();
        let script = state
            .scripts
            .pop_front()
            .or(state.fallback)
            .unwrap_or(ChannelScript::Succeed);
        if script == ChannelScript::FailOpen {
            return Err(GatewayError::status(502, "bad gateway"));
        }

        state.opened += 1;
        state.live += 1;
        state.max_live = state.max_live.max(state.live);
        let remaining = match script {
            ChannelScript::FailAfter(n) => Some(n),
            _ => None,
        };
        Ok(Box::new(ScriptedChannel {
            state: self.state.clone(),
            remaining,
        }))
    }
}

struct ScriptedChannel {
    state: Arc<Mutex<TransportState>>,
    remaining: Option<usize>,
}

#[async_trait]
impl ChunkChannel for ScriptedChannel {
    async fn send_batch(&mut self, chunks: &[SwarmChunk], is_final: bool) -> Result<()> {
        match &mut self.remaining {
            Some(0) => return Err(GatewayError::Cancelled),
            Some(n) => *n -= 1,
            None => {}
        }

        let mut state = self.state.lock();
        state.delivered.extend(chunks.iter().map(|c| *c.address()));
        state.batches.push(chunks.len());
        if is_final {
            state.final_batches += 1;
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut state = self.state.lock();
        state.closed += 1;
        state.live = state.live.saturating_sub(1);
        Ok(())
    }
}
