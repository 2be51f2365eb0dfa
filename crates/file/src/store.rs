//! Chunk storage backends.
//!
//! The [`ChunkStore`] trait abstracts over where evaluated chunks are kept
//! until they are uploaded: a directory of `<hex address>.chunk` files, or
//! memory.

use bzzup_primitives::{ChunkAddress, SwarmChunk};
use parking_lot::RwLock;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::trace;

use crate::StoreError;

/// Extension of chunk files in a local directory store.
pub const CHUNK_FILE_EXTENSION: &str = "chunk";

/// Chunk storage backend.
pub trait ChunkStore: Send + Sync {
    /// Stores a chunk. Storing an existing chunk is a no-op.
    fn put(&self, chunk: &SwarmChunk) -> Result<(), StoreError>;

    /// Loads a chunk, or `None` when absent.
    fn get(&self, address: &ChunkAddress) -> Result<Option<SwarmChunk>, StoreError>;

    fn contains(&self, address: &ChunkAddress) -> Result<bool, StoreError>;

    fn count(&self) -> Result<u64, StoreError>;

    /// All stored addresses, in ascending order.
    fn addresses(&self) -> Result<Vec<ChunkAddress>, StoreError>;
}

/// Chunks kept as `<hex address>.chunk` files holding `span || payload`.
#[derive(Debug, Clone)]
pub struct LocalDirectoryChunkStore {
    dir: PathBuf,
}

impl LocalDirectoryChunkStore {
    /// Opens the store at `dir`, creating the directory when `create_dir`
    /// is set.
    pub fn new(dir: impl Into<PathBuf>, create_dir: bool) -> Result<Self, StoreError> {
        let dir = dir.into();
        if !dir.is_dir() {
            if !create_dir {
                return Err(StoreError::MissingDirectory(dir));
            }
            fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn chunk_path(&self, address: &ChunkAddress) -> PathBuf {
        self.dir
            .join(format!("{}.{CHUNK_FILE_EXTENSION}", address.to_hex()))
    }
}

impl ChunkStore for LocalDirectoryChunkStore {
    fn put(&self, chunk: &SwarmChunk) -> Result<(), StoreError> {
        let path = self.chunk_path(chunk.address());
        if path.exists() {
            return Ok(());
        }
        trace!(address = %chunk.address(), "Writing chunk file");
        fs::write(&path, chunk.to_bytes()).map_err(|e| StoreError::io(path, e))
    }

    fn get(&self, address: &ChunkAddress) -> Result<Option<SwarmChunk>, StoreError> {
        let path = self.chunk_path(address);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        let chunk = SwarmChunk::from_bytes(bytes)?;
        if chunk.address() != address {
            return Err(StoreError::Corrupted {
                expected: *address,
                actual: *chunk.address(),
            });
        }
        Ok(Some(chunk))
    }

    fn contains(&self, address: &ChunkAddress) -> Result<bool, StoreError> {
        Ok(self.chunk_path(address).is_file())
    }

    fn count(&self) -> Result<u64, StoreError> {
        Ok(self.addresses()?.len() as u64)
    }

    fn addresses(&self) -> Result<Vec<ChunkAddress>, StoreError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        let mut addresses = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&self.dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CHUNK_FILE_EXTENSION) {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            let address = stem
                .parse::<ChunkAddress>()
                .map_err(|_| StoreError::InvalidChunkName(path.display().to_string()))?;
            addresses.push(address);
        }
        addresses.sort_unstable();
        Ok(addresses)
    }
}

/// Chunks kept in memory.
#[derive(Debug, Default)]
pub struct MemoryChunkStore {
    chunks: RwLock<BTreeMap<ChunkAddress, SwarmChunk>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChunkStore for MemoryChunkStore {
    fn put(&self, chunk: &SwarmChunk) -> Result<(), StoreError> {
        self.chunks
            .write()
            .entry(*chunk.address())
            .or_insert_with(|| chunk.clone());
        Ok(())
    }

    fn get(&self, address: &ChunkAddress) -> Result<Option<SwarmChunk>, StoreError> {
        Ok(self.chunks.read().get(address).cloned())
    }

    fn contains(&self, address: &ChunkAddress) -> Result<bool, StoreError> {
        Ok(self.chunks.read().contains_key(address))
    }

    fn count(&self) -> Result<u64, StoreError> {
        Ok(self.chunks.read().len() as u64)
    }

    fn addresses(&self) -> Result<Vec<ChunkAddress>, StoreError> {
        Ok(self.chunks.read().keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn chunk(byte: u8) -> SwarmChunk {
        SwarmChunk::leaf(vec![byte; 100]).unwrap()
    }

    #[test]
    fn test_local_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirectoryChunkStore::new(dir.path(), false).unwrap();
        let c = chunk(1);

        store.put(&c).unwrap();
        store.put(&c).unwrap();

        assert!(store.contains(c.address()).unwrap());
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.get(c.address()).unwrap(), Some(c.clone()));
        assert!(
            dir.path()
                .join(format!("{}.chunk", c.address().to_hex()))
                .is_file()
        );
        assert_eq!(store.get(chunk(2).address()).unwrap(), None);
    }

    #[test]
    fn test_local_store_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        assert_matches!(
            LocalDirectoryChunkStore::new(&nested, false),
            Err(StoreError::MissingDirectory(_))
        );
        let store = LocalDirectoryChunkStore::new(&nested, true).unwrap();
        assert!(store.dir().is_dir());
    }

    #[test]
    fn test_local_store_lists_sorted_and_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirectoryChunkStore::new(dir.path(), false).unwrap();
        for byte in [9u8, 3, 7, 1] {
            store.put(&chunk(byte)).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        let addresses = store.addresses().unwrap();
        assert_eq!(addresses.len(), 4);
        assert!(addresses.windows(2).all(|w| w[0].to_hex() < w[1].to_hex()));
    }

    #[test]
    fn test_local_store_rejects_bad_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirectoryChunkStore::new(dir.path(), false).unwrap();
        fs::write(dir.path().join("nothex.chunk"), b"").unwrap();

        assert_matches!(store.addresses(), Err(StoreError::InvalidChunkName(_)));
    }

    #[test]
    fn test_local_store_detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirectoryChunkStore::new(dir.path(), false).unwrap();
        let c = chunk(5);
        store.put(&c).unwrap();
        fs::write(
            dir.path().join(format!("{}.chunk", c.address().to_hex())),
            chunk(6).to_bytes(),
        )
        .unwrap();

        assert_matches!(store.get(c.address()), Err(StoreError::Corrupted { .. }));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryChunkStore::new();
        let (a, b) = (chunk(1), chunk(2));
        store.put(&b).unwrap();
        store.put(&a).unwrap();
        store.put(&a).unwrap();

        assert_eq!(store.count().unwrap(), 2);
        let mut expected = vec![*a.address(), *b.address()];
        expected.sort();
        assert_eq!(store.addresses().unwrap(), expected);
        assert!(store.contains(a.address()).unwrap());
    }
}
