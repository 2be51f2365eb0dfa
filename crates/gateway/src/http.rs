//! HTTP implementation of the gateway client.

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use bzzup_primitives::{BatchId, ChunkAddress, SwarmChunk};
use futures::{TryStreamExt, stream};
use reqwest::{
    Url,
    multipart::{Form, Part},
};
use serde::{Deserialize, de::DeserializeOwned};
use std::{path::Path, time::Duration};
use tokio_util::io::ReaderStream;
use tracing::{debug, trace};

use crate::{
    ChunkChannel, ChunkTransport, DirectoryUpload, FileUpload, GatewayApi, GatewayError,
    PostageBatchInfo, Resolution, Result,
};

const API_PREFIX: &str = "api/v0.3/";

const HEADER_POSTAGE_BATCH_ID: &str = "swarm-postage-batch-id";
const HEADER_PIN: &str = "swarm-pin";
const HEADER_DEFERRED_UPLOAD: &str = "swarm-deferred-upload";
const HEADER_COLLECTION: &str = "swarm-collection";
const HEADER_INDEX_DOCUMENT: &str = "swarm-index-document";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainStateResponse {
    current_price: u64,
}

#[derive(Deserialize)]
struct ReferenceResponse {
    reference: ChunkAddress,
}

/// Gateway client speaking the gateway REST API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpGateway {
    /// Creates a client for `base_url`, authenticating with `api_key` when
    /// provided.
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url =
            Url::parse(&normalized).map_err(|e| GatewayError::InvalidUrl(format!("{base_url}: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bzzup/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    /// Returns the base url all requests are relative to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| GatewayError::InvalidUrl(format!("{path}: {e}")))
    }

    fn api_url(&self, path: &str) -> Result<Url> {
        self.url(&format!("{API_PREFIX}{path}"))
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        send(req, self.api_key.as_deref()).await
    }

    async fn send_json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        let response = self.send(req).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    async fn send_empty(&self, req: reqwest::RequestBuilder) -> Result<()> {
        self.send(req).await.map(|_| ())
    }

    /// Reads a bare identifier that may be encoded as a JSON string.
    async fn send_identifier(&self, req: reqwest::RequestBuilder) -> Result<String> {
        let response = self.send(req).await?;
        let body = response.text().await?;
        let id = serde_json::from_str::<String>(&body).unwrap_or_else(|_| body.trim().to_string());
        if id.is_empty() {
            return Err(GatewayError::InvalidResponse("empty identifier".to_string()));
        }
        Ok(id)
    }
}

/// Streams the file at `path` as a request body. The file is opened when the
/// body is first polled. Returns the body and the file length.
async fn file_body(path: &Path) -> Result<(reqwest::Body, u64)> {
    let len = tokio::fs::metadata(path).await?.len();
    let path = path.to_path_buf();
    let stream = stream::once(async move { tokio::fs::File::open(path).await })
        .map_ok(ReaderStream::new)
        .try_flatten();
    Ok((reqwest::Body::wrap_stream(stream), len))
}

async fn send(req: reqwest::RequestBuilder, api_key: Option<&str>) -> Result<reqwest::Response> {
    let req = match api_key {
        Some(key) => req.bearer_auth(key),
        None => req,
    };
    let response = req.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::status(status.as_u16(), body));
    }
    Ok(response)
}

#[async_trait]
impl GatewayApi for HttpGateway {
    async fn chain_price(&self) -> Result<u64> {
        let url = self.api_url("system/chainstate")?;
        let state: ChainStateResponse = self.send_json(self.http.get(url)).await?;
        Ok(state.current_price)
    }

    async fn buy_postage_batch(
        &self,
        amount: u64,
        depth: u8,
        label: Option<&str>,
    ) -> Result<String> {
        let mut url = self.api_url("users/current/batches")?;
        url.query_pairs_mut()
            .append_pair("depth", &depth.to_string())
            .append_pair("amount", &amount.to_string());
        if let Some(label) = label {
            url.query_pairs_mut().append_pair("label", label);
        }

        debug!(depth, amount, "Requesting postage batch purchase");
        self.send_identifier(self.http.post(url)).await
    }

    async fn resolve_batch_reference(&self, reference: &str) -> Result<Resolution<BatchId>> {
        let url = self.api_url(&format!("system/postagebatchref/{reference}"))?;
        match self.send_identifier(self.http.get(url)).await {
            Ok(id) => {
                let id = id.parse::<BatchId>().map_err(|e| {
                    GatewayError::InvalidResponse(format!("invalid batch id {id}: {e}"))
                })?;
                Ok(Resolution::Ready(id))
            }
            Err(e) if e.is_not_found() => Ok(Resolution::Pending),
            Err(e) => Err(e),
        }
    }

    async fn get_postage_batch(&self, batch_id: &BatchId) -> Result<PostageBatchInfo> {
        let url = self.api_url(&format!("users/current/batches/{}", hex::encode(batch_id)))?;
        self.send_json(self.http.get(url)).await
    }

    async fn upload_file(&self, batch_id: &BatchId, file: FileUpload) -> Result<ChunkAddress> {
        let mut url = self.url("bzz")?;
        if let Some(name) = &file.name {
            url.query_pairs_mut().append_pair("name", name);
        }

        let (body, size) = file_body(&file.path).await?;
        let mut req = self
            .http
            .post(url)
            .header(HEADER_POSTAGE_BATCH_ID, hex::encode(batch_id))
            .header(HEADER_PIN, file.pin.to_string())
            .header(HEADER_DEFERRED_UPLOAD, "true")
            .header(reqwest::header::CONTENT_LENGTH, size);
        if let Some(content_type) = &file.content_type {
            req = req.header(reqwest::header::CONTENT_TYPE, content_type);
        }

        trace!(size, name = ?file.name, "Uploading file");
        let response: ReferenceResponse = self.send_json(req.body(body)).await?;
        Ok(response.reference)
    }

    async fn upload_directory(
        &self,
        batch_id: &BatchId,
        directory: DirectoryUpload,
    ) -> Result<ChunkAddress> {
        let files = directory.entries.len();
        let mut size = 0;
        let mut form = Form::new().percent_encode_noop();
        for entry in directory.entries {
            let (body, len) = file_body(&entry.path).await?;
            size += len;
            let part = Part::stream_with_length(body, len)
                .file_name(entry.name)
                .mime_str(&entry.content_type)?;
            form = form.part("file", part);
        }

        let mut req = self
            .http
            .post(self.url("bzz")?)
            .header(HEADER_POSTAGE_BATCH_ID, hex::encode(batch_id))
            .header(HEADER_PIN, directory.pin.to_string())
            .header(HEADER_DEFERRED_UPLOAD, "true")
            .header(HEADER_COLLECTION, "true");
        if let Some(index) = &directory.index_document {
            req = req.header(HEADER_INDEX_DOCUMENT, index);
        }

        debug!(files, size, "Uploading collection");
        let response: ReferenceResponse = self.send_json(req.multipart(form)).await?;
        Ok(response.reference)
    }

    async fn fund_resource_download(&self, address: &ChunkAddress) -> Result<()> {
        let url = self.api_url(&format!("resources/{address}/offers"))?;
        self.send_empty(self.http.post(url)).await
    }

    async fn fund_resource_pinning(&self, address: &ChunkAddress) -> Result<()> {
        let url = self.api_url(&format!("resources/{address}/pin"))?;
        self.send_empty(self.http.post(url)).await
    }

    async fn defund_resource_download(&self, address: &ChunkAddress) -> Result<()> {
        let url = self.api_url(&format!("resources/{address}/offers"))?;
        self.send_empty(self.http.delete(url)).await
    }

    async fn defund_resource_pinning(&self, address: &ChunkAddress) -> Result<()> {
        let url = self.api_url(&format!("resources/{address}/pin"))?;
        self.send_empty(self.http.delete(url)).await
    }
}

#[async_trait]
impl ChunkTransport for HttpGateway {
    async fn open_channel(
        &self,
        batch_id: &BatchId,
        batch_size: usize,
    ) -> Result<Box<dyn ChunkChannel>> {
        let endpoint = if batch_size <= 1 {
            self.url("chunks")?
        } else {
            self.url("chunks/bulk-upload")?
        };

        Ok(Box::new(HttpChunkChannel {
            http: self.http.clone(),
            endpoint,
            api_key: self.api_key.clone(),
            batch_id: hex::encode(batch_id),
            single: batch_size <= 1,
            open: true,
        }))
    }
}

/// A chunk channel over plain HTTP requests, one request per batch.
#[derive(Debug)]
struct HttpChunkChannel {
    http: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
    batch_id: String,
    single: bool,
    open: bool,
}

impl HttpChunkChannel {
    async fn post(&self, body: Bytes) -> Result<()> {
        let req = self
            .http
            .post(self.endpoint.clone())
            .header(HEADER_POSTAGE_BATCH_ID, &self.batch_id)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body);
        send(req, self.api_key.as_deref()).await.map(|_| ())
    }
}

#[async_trait]
impl ChunkChannel for HttpChunkChannel {
    async fn send_batch(&mut self, chunks: &[SwarmChunk], is_final: bool) -> Result<()> {
        if !self.open {
            return Err(GatewayError::ChannelClosed);
        }

        trace!(count = chunks.len(), is_final, "Sending chunk batch");
        if self.single {
            for chunk in chunks {
                self.post(chunk.to_bytes()).await?;
            }
            Ok(())
        } else {
            self.post(encode_bulk(chunks)).await
        }
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        self.open = false;
        Ok(())
    }
}

/// Encodes chunks for the bulk endpoint: each chunk is a little-endian u16
/// length followed by `span || payload`.
pub fn encode_bulk(chunks: &[SwarmChunk]) -> Bytes {
    let size = chunks.iter().map(|c| 2 + c.size()).sum();
    let mut buf = BytesMut::with_capacity(size);
    for chunk in chunks {
        buf.put_u16_le(chunk.size() as u16);
        buf.put_slice(&chunk.to_bytes());
    }
    buf.freeze()
}
