//! Remote gateway client for bzzup.
//!
//! - [`GatewayApi`] - postage batch, resource, file and collection operations
//! - [`ChunkTransport`] / [`ChunkChannel`] - batched chunk upload channels
//! - [`HttpGateway`] - implementation over the gateway REST API
//!
//! With the `test-utils` feature, [`MockGateway`] and [`ScriptedTransport`]
//! provide in-memory doubles.

mod api;
mod error;
mod http;
#[cfg(any(test, feature = "test-utils"))]
mod mock;

pub use api::{
    ChunkChannel, ChunkTransport, CollectionEntry, DirectoryUpload, FileUpload, GatewayApi,
    PostageBatchInfo, Resolution,
};
pub use error::{GatewayError, Result};
pub use http::{HttpGateway, encode_bulk};
#[cfg(any(test, feature = "test-utils"))]
pub use mock::{
    ChannelScript, MockGateway, Purchase, ScriptedTransport, UploadedDirectory, UploadedFile,
};
