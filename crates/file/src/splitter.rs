//! Content splitting into a chunk tree.
//!
//! Data is cut into [`CHUNK_SIZE`] leaf chunks. References to the chunks of
//! one tree level are collected until [`BRANCHES`] of them fill an
//! intermediate chunk, whose span is the sum of its children's spans. When
//! the input ends, partial levels are packed bottom-up; a level left with a
//! single reference is carried up unchanged, so the root is never an
//! intermediate chunk wrapping one child.

use bytes::{BufMut, Bytes, BytesMut};
use bzzup_postage::PostageBuckets;
use bzzup_primitives::{BRANCHES, CHUNK_SIZE, ChunkAddress, SwarmChunk};

use crate::Result;

/// Receives every chunk produced while splitting.
pub trait ChunkObserver {
    fn observe(&mut self, chunk: &SwarmChunk) -> Result<()>;
}

impl ChunkObserver for PostageBuckets {
    fn observe(&mut self, chunk: &SwarmChunk) -> Result<()> {
        self.add_address(chunk.address());
        Ok(())
    }
}

impl<T: ChunkObserver + ?Sized> ChunkObserver for &mut T {
    fn observe(&mut self, chunk: &SwarmChunk) -> Result<()> {
        (**self).observe(chunk)
    }
}

/// Collects produced chunks, mostly useful in tests.
impl ChunkObserver for Vec<SwarmChunk> {
    fn observe(&mut self, chunk: &SwarmChunk) -> Result<()> {
        self.push(chunk.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Reference {
    address: ChunkAddress,
    span: u64,
}

/// Streaming splitter building the chunk tree of one piece of content.
pub struct Splitter<O> {
    observer: O,
    buffer: BytesMut,
    levels: Vec<Vec<Reference>>,
    leaves: u64,
    chunks: u64,
}

impl<O: ChunkObserver> Splitter<O> {
    pub fn new(observer: O) -> Self {
        Self {
            observer,
            buffer: BytesMut::with_capacity(CHUNK_SIZE),
            levels: Vec::new(),
            leaves: 0,
            chunks: 0,
        }
    }

    /// Number of chunks emitted so far.
    pub fn chunks(&self) -> u64 {
        self.chunks
    }

    /// Feeds content bytes.
    pub fn write(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let take = (CHUNK_SIZE - self.buffer.len()).min(data.len());
            let (head, tail) = data.split_at(take);
            self.buffer.put_slice(head);
            data = tail;
            if self.buffer.len() == CHUNK_SIZE {
                self.flush_leaf()?;
            }
        }
        Ok(())
    }

    /// Completes the tree and returns the root address with the number of
    /// chunks emitted.
    pub fn finish(mut self) -> Result<(ChunkAddress, u64)> {
        if !self.buffer.is_empty() || self.leaves == 0 {
            self.flush_leaf()?;
        }

        let mut level = 0;
        loop {
            let refs = std::mem::take(self.level_mut(level));
            let top = self
                .levels
                .get(level + 1..)
                .is_none_or(|higher| higher.iter().all(Vec::is_empty));

            match refs.as_slice() {
                [single] if top => return Ok((single.address, self.chunks)),
                [] => {}
                [single] => self.push_reference(level + 1, *single)?,
                _ => {
                    let parent = self.pack(&refs)?;
                    self.push_reference(level + 1, parent)?;
                }
            }
            level += 1;
        }
    }

    fn flush_leaf(&mut self) -> Result<()> {
        let data: Bytes = self.buffer.split().freeze();
        let chunk = SwarmChunk::leaf(data)?;
        self.leaves += 1;
        let reference = self.emit(&chunk)?;
        self.push_reference(0, reference)
    }

    fn push_reference(&mut self, level: usize, reference: Reference) -> Result<()> {
        let refs = self.level_mut(level);
        refs.push(reference);
        if refs.len() == BRANCHES {
            let refs = std::mem::take(refs);
            let parent = self.pack(&refs)?;
            self.push_reference(level + 1, parent)?;
        }
        Ok(())
    }

    fn pack(&mut self, refs: &[Reference]) -> Result<Reference> {
        let mut payload = BytesMut::with_capacity(refs.len() * 32);
        let mut span = 0u64;
        for r in refs {
            payload.put_slice(r.address.as_bytes());
            span = span.saturating_add(r.span);
        }
        let chunk = SwarmChunk::new(span, payload.freeze())?;
        self.emit(&chunk)
    }

    fn emit(&mut self, chunk: &SwarmChunk) -> Result<Reference> {
        self.observer.observe(chunk)?;
        self.chunks += 1;
        Ok(Reference {
            address: *chunk.address(),
            span: chunk.span(),
        })
    }

    #[allow(clippy::indexing_slicing)]
    fn level_mut(&mut self, level: usize) -> &mut Vec<Reference> {
        if self.levels.len() <= level {
            self.levels.resize_with(level + 1, Vec::new);
        }
        // resized above
        &mut self.levels[level]
    }
}

/// Splits an in-memory buffer, returning the root address and chunk count.
pub fn split_bytes(data: &[u8], observer: impl ChunkObserver) -> Result<(ChunkAddress, u64)> {
    let mut splitter = Splitter::new(observer);
    splitter.write(data)?;
    splitter.finish()
}
