//! Ordered chunk sequences to upload.

use bzzup_file::{ChunkStore, StoreError};
use bzzup_primitives::{ChunkAddress, SwarmChunk};
use std::ops::Range;

/// An ordered, indexable sequence of chunks.
pub trait ChunkSource: Send + Sync {
    /// Number of chunks in the sequence.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads the chunks at positions `range`.
    fn load(&self, range: Range<usize>) -> Result<Vec<SwarmChunk>, StoreError>;
}

impl ChunkSource for Vec<SwarmChunk> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn load(&self, range: Range<usize>) -> Result<Vec<SwarmChunk>, StoreError> {
        Ok(self.get(range).map(<[SwarmChunk]>::to_vec).unwrap_or_default())
    }
}

/// Chunks of a [`ChunkStore`], in ascending address order.
pub struct StoreSource<'a> {
    store: &'a dyn ChunkStore,
    addresses: Vec<ChunkAddress>,
}

impl<'a> StoreSource<'a> {
    /// Snapshots the addresses currently held by `store`.
    pub fn new(store: &'a dyn ChunkStore) -> Result<Self, StoreError> {
        let addresses = store.addresses()?;
        Ok(Self { store, addresses })
    }

    pub fn addresses(&self) -> &[ChunkAddress] {
        &self.addresses
    }
}

impl ChunkSource for StoreSource<'_> {
    fn len(&self) -> usize {
        self.addresses.len()
    }

    fn load(&self, range: Range<usize>) -> Result<Vec<SwarmChunk>, StoreError> {
        self.addresses
            .get(range)
            .unwrap_or_default()
            .iter()
            .map(|address| {
                self.store
                    .get(address)?
                    .ok_or(StoreError::MissingChunk(*address))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzzup_file::MemoryChunkStore;

    #[test]
    fn test_store_source_follows_address_order() {
        let store = MemoryChunkStore::new();
        let chunks: Vec<_> = (0u8..5)
            .map(|i| SwarmChunk::leaf(vec![i; 10]).unwrap())
            .collect();
        for chunk in &chunks {
            store.put(chunk).unwrap();
        }

        let source = StoreSource::new(&store).unwrap();
        assert_eq!(ChunkSource::len(&source), 5);

        let loaded = source.load(1..4).unwrap();
        let mut sorted: Vec<_> = chunks.iter().map(|c| *c.address()).collect();
        sorted.sort();
        assert_eq!(
            loaded.iter().map(|c| *c.address()).collect::<Vec<_>>(),
            sorted[1..4].to_vec()
        );
    }

    #[test]
    fn test_slice_source_out_of_range_is_empty() {
        let source = vec![SwarmChunk::leaf(vec![1u8]).unwrap()];
        assert_eq!(source.load(0..1).unwrap().len(), 1);
        assert!(source.load(0..2).unwrap().is_empty());
    }
}
