//! Chunk address definition and bucket derivation.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{ADDRESS_SIZE, BUCKET_COUNT, BUCKET_DEPTH, PrimitivesError, Result};

/// A 256 bit content address for a chunk in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkAddress(B256);

impl ChunkAddress {
    /// Creates a new address from raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(B256::new(bytes))
    }

    /// Creates a new address from a slice, checking the length.
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != ADDRESS_SIZE {
            return Err(PrimitivesError::size(
                "address must be exactly 32 bytes",
                slice.len(),
                ADDRESS_SIZE,
            ));
        }

        Ok(Self(B256::from_slice(slice)))
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Returns the address as a B256.
    pub const fn as_b256(&self) -> &B256 {
        &self.0
    }

    /// Checks if this address is all zeros.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns the lowercase hex representation without a `0x` prefix.
    ///
    /// This is the form used in chunk file names and gateway URLs.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_slice())
    }

    /// Returns the collision bucket this address falls into.
    pub fn bucket(&self) -> BucketId {
        bucket_of(self)
    }
}

impl From<B256> for ChunkAddress {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl From<[u8; ADDRESS_SIZE]> for ChunkAddress {
    fn from(value: [u8; ADDRESS_SIZE]) -> Self {
        Self::new(value)
    }
}

impl From<ChunkAddress> for B256 {
    fn from(value: ChunkAddress) -> Self {
        value.0
    }
}

impl AsRef<[u8]> for ChunkAddress {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl FromStr for ChunkAddress {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| PrimitivesError::InvalidHex(s.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for ChunkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Index of a collision bucket, always in `[0, BUCKET_COUNT)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketId(u32);

impl BucketId {
    /// Creates a bucket id, returning `None` when out of range.
    pub fn new(value: u32) -> Option<Self> {
        ((value as usize) < BUCKET_COUNT).then_some(Self(value))
    }

    /// Returns the raw bucket index.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns the bucket index usable for slice access.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns the collision bucket for a chunk address.
///
/// The bucket is the first [`BUCKET_DEPTH`] bits of the address, read as a
/// big-endian unsigned integer. This must match the stamping scheme used by
/// storer nodes, as the remote side enforces bucket capacity with the same
/// derivation.
pub fn bucket_of(address: &ChunkAddress) -> BucketId {
    let [b0, b1, b2, b3, ..] = address.0.0;
    let prefix = u32::from_be_bytes([b0, b1, b2, b3]);
    BucketId(prefix >> (32 - BUCKET_DEPTH as u32))
}
