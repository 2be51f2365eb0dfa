//! Content preparation for bzzup uploads.
//!
//! - [`Splitter`] - cuts content into a chunk tree
//! - [`Manifest`] - maps upload paths to content references
//! - [`UploadEvaluator`] - dry-run evaluation feeding a bucket accumulator
//! - [`ChunkStore`] - local persistence of evaluated chunks
//! - [`directory_files`] - the file listing of a directory upload

mod error;
mod evaluator;
mod manifest;
mod mime;
mod splitter;
mod store;
mod walk;

pub use error::{EvaluationError, Result, StoreError};
pub use evaluator::{UploadEvaluationResult, UploadEvaluator, evaluate_paths};
pub use manifest::{Manifest, ManifestEntry};
pub use mime::{DEFAULT_CONTENT_TYPE, content_type_for};
pub use splitter::{ChunkObserver, Splitter, split_bytes};
pub use store::{CHUNK_FILE_EXTENSION, ChunkStore, LocalDirectoryChunkStore, MemoryChunkStore};
pub use walk::{DirectoryFile, directory_files};
