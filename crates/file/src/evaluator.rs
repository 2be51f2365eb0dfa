//! Upload evaluation: a dry run computing every chunk of an upload.
//!
//! Content is split exactly as it will be stored, each chunk address is fed
//! into a [`PostageBuckets`] accumulator and, when a store is attached, the
//! chunks are persisted. Nothing is transmitted.
//!
//! Several paths destined for one postage batch must share one accumulator:
//! collisions add up across files landing in the same buckets.

use bzzup_postage::PostageBuckets;
use bzzup_primitives::{ChunkAddress, SwarmChunk};
use std::{
    fs::{self, File},
    io::{self, Read},
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::{
    ChunkObserver, ChunkStore, EvaluationError, Manifest, ManifestEntry, Result, Splitter,
    content_type_for, directory_files,
};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Outcome of evaluating one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadEvaluationResult {
    /// Chunks produced by this evaluation, manifest chunks included.
    pub total_chunks: u64,
    /// Root address of the upload manifest.
    pub root_address: ChunkAddress,
    /// Depth required by the accumulator after this evaluation.
    pub required_depth: u8,
}

struct Sink<'s> {
    buckets: &'s mut PostageBuckets,
    store: Option<&'s dyn ChunkStore>,
}

impl ChunkObserver for Sink<'_> {
    fn observe(&mut self, chunk: &SwarmChunk) -> Result<()> {
        self.buckets.add_address(chunk.address());
        if let Some(store) = self.store {
            store.put(chunk)?;
        }
        Ok(())
    }
}

/// Evaluates files and directories against a shared bucket accumulator.
pub struct UploadEvaluator<'a> {
    buckets: &'a mut PostageBuckets,
    store: Option<&'a dyn ChunkStore>,
}

impl<'a> UploadEvaluator<'a> {
    pub fn new(buckets: &'a mut PostageBuckets) -> Self {
        Self {
            buckets,
            store: None,
        }
    }

    /// Persists every evaluated chunk into `store`.
    pub fn with_store(mut self, store: &'a dyn ChunkStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn buckets(&self) -> &PostageBuckets {
        self.buckets
    }

    /// Evaluates a path, dispatching on whether it is a file or a directory.
    pub fn evaluate_path(
        &mut self,
        path: &Path,
        index_document: Option<&str>,
    ) -> Result<UploadEvaluationResult> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => EvaluationError::NotFound(path.to_path_buf()),
            _ => EvaluationError::io(path, e),
        })?;

        if metadata.is_file() {
            self.evaluate_file_path(path)
        } else if metadata.is_dir() {
            self.evaluate_directory(path, index_document, None)
        } else {
            Err(EvaluationError::InvalidPath(path.to_path_buf()))
        }
    }

    /// Evaluates a single file from disk, named after its file name.
    pub fn evaluate_file_path(&mut self, path: &Path) -> Result<UploadEvaluationResult> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => EvaluationError::NotFound(path.to_path_buf()),
            _ => EvaluationError::io(path, e),
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| EvaluationError::InvalidPath(path.to_path_buf()))?;
        self.evaluate_file(file, content_type_for(path), &name)
    }

    /// Evaluates one stream as a single-file upload: the content plus a
    /// manifest indexing it under `name`.
    pub fn evaluate_file(
        &mut self,
        reader: impl Read,
        content_type: &str,
        name: &str,
    ) -> Result<UploadEvaluationResult> {
        let (reference, chunks, size) = self.split_reader(reader, Path::new(name))?;

        let mut manifest = Manifest::new();
        manifest.index_document = Some(name.to_string());
        manifest.insert(
            name,
            ManifestEntry {
                reference,
                content_type: content_type.to_string(),
                filename: name.to_string(),
                size,
            },
        );

        let (root_address, manifest_chunks) = self.split_manifest(&manifest)?;
        debug!(%root_address, name, size, chunks, "Evaluated file");
        Ok(self.result(root_address, chunks + manifest_chunks))
    }

    /// Evaluates every regular file below `dir`, walked in file name order,
    /// and the manifest indexing them by relative path.
    pub fn evaluate_directory(
        &mut self,
        dir: &Path,
        index_document: Option<&str>,
        error_document: Option<&str>,
    ) -> Result<UploadEvaluationResult> {
        let mut manifest = Manifest::new();
        let mut chunks = 0;
        for file in directory_files(dir)? {
            let reader = File::open(&file.path).map_err(|e| EvaluationError::io(&file.path, e))?;
            let (reference, file_chunks, size) = self.split_reader(reader, &file.path)?;
            chunks += file_chunks;

            manifest.insert(
                file.relative.clone(),
                ManifestEntry {
                    reference,
                    content_type: file.content_type.to_string(),
                    filename: file.file_name(),
                    size,
                },
            );
        }

        for document in [index_document, error_document].into_iter().flatten() {
            if manifest.get(document).is_none() {
                return Err(EvaluationError::MissingDocument(document.to_string()));
            }
        }
        manifest.index_document = index_document.map(str::to_string);
        manifest.error_document = error_document.map(str::to_string);

        let (root_address, manifest_chunks) = self.split_manifest(&manifest)?;
        debug!(
            %root_address,
            dir = %dir.display(),
            files = manifest.len(),
            chunks,
            "Evaluated directory"
        );
        Ok(self.result(root_address, chunks + manifest_chunks))
    }

    fn sink(&mut self) -> Sink<'_> {
        Sink {
            buckets: &mut *self.buckets,
            store: self.store,
        }
    }

    fn split_reader(
        &mut self,
        mut reader: impl Read,
        path: &Path,
    ) -> Result<(ChunkAddress, u64, u64)> {
        let mut splitter = Splitter::new(self.sink());
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let mut size = 0u64;
        loop {
            let read = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(EvaluationError::io(path, e)),
            };
            splitter.write(buf.get(..read).unwrap_or_default())?;
            size += read as u64;
        }
        let (reference, chunks) = splitter.finish()?;
        Ok((reference, chunks, size))
    }

    fn split_manifest(&mut self, manifest: &Manifest) -> Result<(ChunkAddress, u64)> {
        let bytes = manifest.to_bytes()?;
        let mut splitter = Splitter::new(self.sink());
        splitter.write(&bytes)?;
        splitter.finish()
    }

    fn result(&self, root_address: ChunkAddress, total_chunks: u64) -> UploadEvaluationResult {
        UploadEvaluationResult {
            total_chunks,
            root_address,
            required_depth: self.buckets.required_depth(),
        }
    }
}

/// Evaluates several paths through one accumulator, returning the result of
/// each path and the accumulator holding their combined collisions.
pub fn evaluate_paths(
    paths: &[PathBuf],
    min_depth: u8,
    index_document: Option<&str>,
    store: Option<&dyn ChunkStore>,
) -> Result<(Vec<UploadEvaluationResult>, PostageBuckets)> {
    let mut buckets = PostageBuckets::new(min_depth);
    let mut evaluator = UploadEvaluator::new(&mut buckets);
    if let Some(store) = store {
        evaluator = evaluator.with_store(store);
    }

    let results = paths
        .iter()
        .map(|path| evaluator.evaluate_path(path, index_document))
        .collect::<Result<Vec<_>>>()?;
    Ok((results, buckets))
}
