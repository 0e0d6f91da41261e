use super::{ContentAccessor, FileEntry, FileSnapshot};
use crate::error::ContentError;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

/// In-memory project used by tests and embedders that already hold file contents
pub struct MockContent {
    files: RwLock<BTreeMap<String, String>>,
}

impl MockContent {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let content = Self::new();
        for (path, text) in files {
            content.add_file(path, text);
        }
        content
    }

    pub fn add_file(&self, path: &str, content: &str) {
        let path = FileEntry::file(path, None).path;
        let mut files = self.files.write().unwrap_or_else(|e| e.into_inner());
        files.insert(path, content.to_string());
    }

    /// Snapshot of every file plus the directories implied by their paths
    pub fn snapshot(&self) -> FileSnapshot {
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        let mut dirs = BTreeSet::new();
        for path in files.keys() {
            let mut current = String::new();
            let parts: Vec<&str> = path.split('/').collect();
            for part in &parts[..parts.len().saturating_sub(1)] {
                if !current.is_empty() {
                    current.push('/');
                }
                current.push_str(part);
                dirs.insert(current.clone());
            }
        }

        let mut snapshot: FileSnapshot = dirs
            .into_iter()
            .map(FileEntry::dir)
            .chain(
                files
                    .iter()
                    .map(|(path, text)| FileEntry::file(path.as_str(), Some(text.len() as u64))),
            )
            .collect();
        snapshot.sort();
        snapshot
    }
}

impl Default for MockContent {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentAccessor for MockContent {
    fn exists(&self, path: &str) -> bool {
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        files.contains_key(path)
    }

    fn read_text(&self, path: &str) -> Result<Option<String>, ContentError> {
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        Ok(files.get(path).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_file() {
        let content = MockContent::new();
        content.add_file("requirements.txt", "flask\n");

        assert!(content.exists("requirements.txt"));
        assert_eq!(
            content.read_text("requirements.txt").unwrap().as_deref(),
            Some("flask\n")
        );
    }

    #[test]
    fn test_snapshot_includes_parent_dirs() {
        let content = MockContent::with_files(&[
            ("src/app/main.py", "print()"),
            ("requirements.txt", ""),
        ]);
        let snapshot = content.snapshot();

        let paths: Vec<&str> = snapshot.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["requirements.txt", "src", "src/app", "src/app/main.py"]
        );
        assert!(snapshot.get("src").unwrap().is_dir);
        assert_eq!(snapshot.get("src/app/main.py").unwrap().size, Some(7));
    }

    #[test]
    fn test_missing_file() {
        let content = MockContent::new();
        assert!(!content.exists("Gemfile"));
        assert!(content.read_text("Gemfile").unwrap().is_none());
    }
}
