//! Directory listing shared by evaluation and collection uploads.

use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::{EvaluationError, Result, content_type_for};

/// A regular file below an upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryFile {
    /// Path relative to the directory, `/` separated.
    pub relative: String,
    pub path: PathBuf,
    pub content_type: &'static str,
}

impl DirectoryFile {
    /// Last component of the file path.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Lists every regular file below `dir` in file name order. Symlinks are
/// not followed.
pub fn directory_files(dir: &Path) -> Result<Vec<DirectoryFile>> {
    if !dir.exists() {
        return Err(EvaluationError::NotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(EvaluationError::InvalidPath(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        files.push(DirectoryFile {
            relative: relative_path(path.strip_prefix(dir).unwrap_or(path.as_path())),
            content_type: content_type_for(&path),
            path,
        });
    }
    Ok(files)
}

/// Relative path of a manifest entry: normal components joined by `/`.
fn relative_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_relative_path_uses_forward_slashes() {
        let path: PathBuf = ["a", "b", "c.txt"].iter().collect();
        assert_eq!(relative_path(&path), "a/b/c.txt");
        assert_eq!(relative_path(Path::new("./x")), "x");
    }

    #[test]
    fn test_directory_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/c")).unwrap();
        fs::write(dir.path().join("b/c/deep.css"), "x").unwrap();
        fs::write(dir.path().join("a.html"), "x").unwrap();
        fs::write(dir.path().join("z.bin"), "x").unwrap();

        let files = directory_files(dir.path()).unwrap();
        let relative: Vec<_> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(relative, ["a.html", "b/c/deep.css", "z.bin"]);
        assert_eq!(files[0].content_type, "text/html");
        assert_eq!(files[1].file_name(), "deep.css");
    }

    #[test]
    fn test_directory_files_rejects_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        fs::write(&file, "x").unwrap();

        assert!(matches!(directory_files(&file), Err(EvaluationError::InvalidPath(_))));
        assert!(matches!(
            directory_files(&dir.path().join("missing")),
            Err(EvaluationError::NotFound(_))
        ));
    }
}
