use super::ContentAccessor;
use crate::error::ContentError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Reads project files from a local directory
pub struct LocalContent {
    root: PathBuf,
    max_file_size: u64,
}

impl LocalContent {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl ContentAccessor for LocalContent {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.exists()).unwrap_or(false)
    }

    fn read_text(&self, path: &str) -> Result<Option<String>, ContentError> {
        let Some(full_path) = self.resolve(path) else {
            return Ok(None);
        };

        let meta = match fs::metadata(&full_path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ContentError::Io {
                    path: path.to_string(),
                    source,
                })
            }
        };

        if !meta.is_file() {
            return Ok(None);
        }

        if meta.len() > self.max_file_size {
            debug!(
                path,
                size = meta.len(),
                max = self.max_file_size,
                "Skipping oversized file"
            );
            return Ok(None);
        }

        match fs::read(&full_path) {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ContentError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }
}
