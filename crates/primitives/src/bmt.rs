//! Binary Merkle Tree hashing of chunk payloads.
//!
//! A chunk payload is zero padded to [`CHUNK_SIZE`] bytes and split into 128
//! segments of 32 bytes. Segment pairs are hashed with Keccak256 and the
//! resulting digests are folded pairwise until a single root remains. The
//! chunk address is `keccak256(span_le || root)`.

use alloy_primitives::{B256, Keccak256, keccak256};

use crate::{CHUNK_SIZE, ChunkAddress, PrimitivesError, Result, SPAN_SIZE};

/// Size of a digest and of a BMT segment.
pub const SEGMENT_SIZE: usize = 32;

/// Length of the smallest unit hashed directly: two sibling segments.
const SEGMENT_PAIR_LENGTH: usize = 2 * SEGMENT_SIZE;

/// Hashes chunk payloads into [`ChunkAddress`]es.
///
/// The tree levels are evaluated with `rayon::join`, so a single hasher can
/// be shared freely between threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct BmtHasher {
    span: u64,
}

impl BmtHasher {
    /// Creates a hasher with a zero span.
    pub const fn new() -> Self {
        Self { span: 0 }
    }

    /// Creates a hasher for the given span.
    pub const fn with_span(span: u64) -> Self {
        Self { span }
    }

    /// Set the span of data to be hashed.
    pub fn set_span(&mut self, span: u64) {
        self.span = span;
    }

    /// Get the current span.
    pub const fn span(&self) -> u64 {
        self.span
    }

    /// Computes the chunk address of `data` under the current span.
    ///
    /// Fails when `data` exceeds [`CHUNK_SIZE`].
    pub fn chunk_address(&self, data: &[u8]) -> Result<ChunkAddress> {
        if data.len() > CHUNK_SIZE {
            return Err(PrimitivesError::size(
                "chunk payload exceeds maximum size",
                data.len(),
                CHUNK_SIZE,
            ));
        }

        Ok(ChunkAddress::from(self.hash_to_b256(data)))
    }

    fn hash_to_b256(&self, data: &[u8]) -> B256 {
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let len = data.len().min(CHUNK_SIZE);
        if let (Some(dst), Some(src)) = (buffer.get_mut(..len), data.get(..len)) {
            dst.copy_from_slice(src);
        }

        let root = hash_helper_parallel(&buffer);
        self.finalize(root)
    }

    fn finalize(&self, root: B256) -> B256 {
        let mut hasher = Keccak256::new();
        hasher.update(self.span.to_le_bytes());
        hasher.update(root);
        hasher.finalize()
    }
}

/// Recursively hashes a power-of-two sized buffer, splitting work across
/// threads at every level.
fn hash_helper_parallel(data: &[u8]) -> B256 {
    if data.len() <= SEGMENT_PAIR_LENGTH {
        return keccak256(data);
    }

    let (left, right) = data.split_at(data.len() / 2);
    let (left_hash, right_hash) =
        rayon::join(|| hash_helper_parallel(left), || hash_helper_parallel(right));

    let mut pair = [0u8; SEGMENT_PAIR_LENGTH];
    let (l, r) = pair.split_at_mut(SEGMENT_SIZE);
    l.copy_from_slice(left_hash.as_slice());
    r.copy_from_slice(right_hash.as_slice());

    keccak256(pair)
}

/// Encodes a span as the 8 byte little-endian header used on the wire.
pub const fn span_to_bytes(span: u64) -> [u8; SPAN_SIZE] {
    span.to_le_bytes()
}
