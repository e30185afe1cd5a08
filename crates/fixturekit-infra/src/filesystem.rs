//! Filesystem helpers used by the package builders.
//!
//! All failures are reported as [`BuilderError::Io`] carrying the offending
//! path.

use std::path::{Path, PathBuf};

use fixturekit_types::error::BuilderError;

/// Create `path` and all missing parents.
pub fn create_dir_all(path: &Path) -> Result<(), BuilderError> {
    std::fs::create_dir_all(path).map_err(BuilderError::io_at(path))
}

/// Write `contents` to `path`. The parent directory must exist.
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), BuilderError> {
    std::fs::write(path, contents).map_err(BuilderError::io_at(path))?;
    tracing::debug!(path = %path.display(), "file written");
    Ok(())
}

/// A file queued for creation relative to some base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub relative_path: PathBuf,
    pub contents: String,
}

/// Directories and files queued by a builder.
#[derive(Debug, Clone, Default)]
pub struct FileTree {
    directories: Vec<PathBuf>,
    files: Vec<PendingFile>,
}

impl FileTree {
    pub fn add_directory(&mut self, relative_path: impl Into<PathBuf>) {
        self.directories.push(relative_path.into());
    }

    /// Queue a file. With `makedirs` its parent directory is queued too.
    pub fn add_file(&mut self, relative_path: impl Into<PathBuf>, contents: impl Into<String>, makedirs: bool) {
        let relative_path = relative_path.into();
        if makedirs {
            if let Some(parent) = relative_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                self.directories.push(parent.to_path_buf());
            }
        }
        self.files.push(PendingFile {
            relative_path,
            contents: contents.into(),
        });
    }

    pub fn files(&self) -> &[PendingFile] {
        &self.files
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// Create the queued directories, then the files, below `base`.
    pub fn materialize(&self, base: &Path) -> Result<(), BuilderError> {
        for directory in &self.directories {
            create_dir_all(&base.join(directory))?;
        }
        for file in &self.files {
            write_file(&base.join(&file.relative_path), &file.contents)?;
        }
        Ok(())
    }
}
