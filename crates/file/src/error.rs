//! Error types for splitting, evaluation and chunk storage.

use bzzup_primitives::{ChunkAddress, PrimitivesError};
use std::{io, path::PathBuf};

/// Errors raised by a [`ChunkStore`](crate::ChunkStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store directory does not exist and was not to be created.
    #[error("chunk directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),

    /// A `.chunk` file name is not a hex address.
    #[error("invalid chunk file name {0:?}")]
    InvalidChunkName(String),

    #[error("chunk {0} missing from store")]
    MissingChunk(ChunkAddress),

    /// A stored chunk does not hash to its file name.
    #[error("chunk {expected} is corrupted, content hashes to {actual}")]
    Corrupted {
        expected: ChunkAddress,
        actual: ChunkAddress,
    },

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Primitives(#[from] PrimitivesError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while evaluating content for upload.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("path {} does not exist", .0.display())]
    NotFound(PathBuf),

    /// The path is neither a regular file nor a directory.
    #[error("path {} is neither a file nor a directory", .0.display())]
    InvalidPath(PathBuf),

    /// The requested index document is not a file in the directory root.
    #[error("index document {0:?} not found in directory root")]
    MissingDocument(String),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("manifest encoding failed: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Primitives(#[from] PrimitivesError),
}

impl EvaluationError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for evaluation operations.
pub type Result<T> = core::result::Result<T, EvaluationError>;
