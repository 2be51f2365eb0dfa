//! Core primitive types for bzzup.
//!
//! This crate provides the content-addressing building blocks shared by every
//! other bzzup crate:
//!
//! - [`ChunkAddress`] - 32-byte content address of a chunk
//! - [`BucketId`] and [`bucket_of`] - collision bucket derived from an address
//! - [`BmtHasher`] - Binary Merkle Tree hasher producing chunk addresses
//! - [`SwarmChunk`] - a span-prefixed chunk payload together with its address
//! - [`BatchId`] and [`BzzBalance`] - postage identifiers and token amounts

mod address;
mod balance;
pub mod bmt;
mod chunk;
mod error;

pub use address::{BucketId, ChunkAddress, bucket_of};
pub use balance::{BZZ_DECIMALS, BzzBalance, PLUR_PER_BZZ};
pub use bmt::BmtHasher;
pub use chunk::SwarmChunk;
pub use error::{PrimitivesError, Result};

/// Identifier of a postage batch, assigned by the remote ledger.
pub type BatchId = alloy_primitives::B256;

/// Size of a chunk address in bytes.
pub const ADDRESS_SIZE: usize = 32;

/// Maximum payload carried by a single chunk.
pub const CHUNK_SIZE: usize = 4096;

/// Size of the little-endian span header prepended to every chunk payload.
pub const SPAN_SIZE: usize = 8;

/// Number of references that fit into one intermediate chunk.
pub const BRANCHES: usize = CHUNK_SIZE / ADDRESS_SIZE;

/// Number of leading address bits selecting a collision bucket.
pub const BUCKET_DEPTH: u8 = 16;

/// Number of collision buckets (`2^BUCKET_DEPTH`).
pub const BUCKET_COUNT: usize = 1 << BUCKET_DEPTH;

/// Smallest postage batch depth accepted by the network.
pub const MIN_BATCH_DEPTH: u8 = 17;

/// Largest postage batch depth this client will price or purchase.
pub const MAX_BATCH_DEPTH: u8 = 64;
