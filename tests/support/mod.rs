use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Throwaway project tree on disk
pub struct Project {
    dir: TempDir,
}

#[allow(dead_code)]
impl Project {
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        for (path, content) in files {
            let full = dir.path().join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).expect("Failed to create parent dir");
            }
            fs::write(&full, content).expect("Failed to write fixture file");
        }
        Self { dir }
    }

    pub fn with_git(self) -> Self {
        fs::create_dir_all(self.dir.path().join(".git")).expect("Failed to create .git");
        fs::write(self.dir.path().join(".git/HEAD"), "ref: refs/heads/main\n")
            .expect("Failed to write HEAD");
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn path_buf(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }
}

#[allow(dead_code)]
pub fn planbox_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_planbox"))
}
