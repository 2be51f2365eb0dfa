//! Content chunks: a span header followed by at most [`CHUNK_SIZE`] bytes of
//! payload, addressed by the BMT hash of both.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{BmtHasher, CHUNK_SIZE, ChunkAddress, PrimitivesError, Result, SPAN_SIZE};

/// A content-addressed chunk.
///
/// For leaf chunks the span is the payload length; for intermediate chunks it
/// is the total number of bytes of file data beneath them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwarmChunk {
    address: ChunkAddress,
    span: u64,
    data: Bytes,
}

impl SwarmChunk {
    /// Creates a chunk from a payload and span, computing its address.
    pub fn new(span: u64, data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        let address = BmtHasher::with_span(span).chunk_address(&data)?;
        Ok(Self {
            address,
            span,
            data,
        })
    }

    /// Creates a leaf chunk whose span equals the payload length.
    pub fn leaf(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        Self::new(data.len() as u64, data)
    }

    /// Returns the content address.
    pub const fn address(&self) -> &ChunkAddress {
        &self.address
    }

    /// Returns the span value.
    pub const fn span(&self) -> u64 {
        self.span
    }

    /// Returns the payload without the span header.
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Returns the encoded size: span header plus payload.
    pub fn size(&self) -> usize {
        SPAN_SIZE + self.data.len()
    }

    /// Encodes the chunk as `span_le || payload`.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.size());
        buf.put_u64_le(self.span);
        buf.put_slice(&self.data);
        buf.freeze()
    }

    /// Decodes a chunk from `span_le || payload`, recomputing its address.
    pub fn from_bytes(buf: impl Into<Bytes>) -> Result<Self> {
        let buf: Bytes = buf.into();
        if buf.len() < SPAN_SIZE {
            return Err(PrimitivesError::format("chunk shorter than span header"));
        }
        if buf.len() > SPAN_SIZE + CHUNK_SIZE {
            return Err(PrimitivesError::size(
                "encoded chunk exceeds maximum size",
                buf.len(),
                SPAN_SIZE + CHUNK_SIZE,
            ));
        }

        let mut span = [0u8; SPAN_SIZE];
        if let Some(header) = buf.get(..SPAN_SIZE) {
            span.copy_from_slice(header);
        }
        Self::new(u64::from_le_bytes(span), buf.slice(SPAN_SIZE..))
    }
}
