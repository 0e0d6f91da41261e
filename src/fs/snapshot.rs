use serde::{Deserialize, Serialize};

/// A single file or directory captured by the project scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path relative to the project root, `/`-separated
    pub path: String,
    pub name: String,
    pub is_dir: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Lowercase extension without the leading dot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

impl FileEntry {
    pub fn file(path: impl Into<String>, size: Option<u64>) -> Self {
        let path = normalize(path.into());
        let name = file_name(&path).to_string();
        let extension = extension_of(&name);
        Self {
            path,
            name,
            is_dir: false,
            size,
            extension,
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        let path = normalize(path.into());
        let name = file_name(&path).to_string();
        Self {
            path,
            name,
            is_dir: true,
            size: None,
            extension: None,
        }
    }

    /// Number of parent directories between the root and this entry
    pub fn depth(&self) -> usize {
        self.path.matches('/').count()
    }

    pub fn has_extension(&self, extensions: &[&str]) -> bool {
        self.extension
            .as_deref()
            .map(|ext| extensions.contains(&ext))
            .unwrap_or(false)
    }
}

fn normalize(path: String) -> String {
    let path = path.replace('\\', "/");
    path.trim_start_matches("./").trim_matches('/').to_string()
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Ordered list of entries describing a project tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnapshot {
    entries: Vec<FileEntry>,
}

impl FileSnapshot {
    pub fn new(entries: Vec<FileEntry>) -> Self {
        Self { entries }
    }

    /// Builds a snapshot of plain files from relative paths
    pub fn from_paths<S: AsRef<str>>(paths: &[S]) -> Self {
        Self::new(
            paths
                .iter()
                .map(|p| FileEntry::file(p.as_ref(), None))
                .collect(),
        )
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter().filter(|e| !e.is_dir)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.files().any(|e| e.path == path)
    }

    /// A directory counts as present if it was captured or if any entry lives under it
    pub fn has_dir(&self, path: &str) -> bool {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        self.entries
            .iter()
            .any(|e| (e.is_dir && e.path == path) || e.path.starts_with(&prefix))
    }

    pub fn push(&mut self, entry: FileEntry) {
        self.entries.push(entry);
    }

    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.path.cmp(&b.path));
    }
}

impl FromIterator<FileEntry> for FileSnapshot {
    fn from_iter<I: IntoIterator<Item = FileEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_entry_fields() {
        let entry = FileEntry::file("./src/App.TSX", Some(42));
        assert_eq!(entry.path, "src/App.TSX");
        assert_eq!(entry.name, "App.TSX");
        assert_eq!(entry.extension.as_deref(), Some("tsx"));
        assert_eq!(entry.size, Some(42));
        assert_eq!(entry.depth(), 1);
        assert!(!entry.is_dir);
    }

    #[test]
    fn test_dotfile_has_no_extension() {
        assert_eq!(FileEntry::file(".nvmrc", None).extension, None);
        assert_eq!(FileEntry::file("Gemfile", None).extension, None);
    }

    #[test]
    fn test_windows_separators_normalized() {
        let entry = FileEntry::file("src\\main.rs", None);
        assert_eq!(entry.path, "src/main.rs");
        assert_eq!(entry.name, "main.rs");
    }

    #[test]
    fn test_has_dir_inferred_from_children() {
        let snapshot = FileSnapshot::from_paths(&["public/index.html", "README.md"]);
        assert!(snapshot.has_dir("public"));
        assert!(!snapshot.has_dir("pub"));
        assert!(snapshot.has_file("README.md"));
        assert!(!snapshot.has_file("public"));
    }

    #[test]
    fn test_sort() {
        let mut snapshot = FileSnapshot::from_paths(&["b.txt", "a.txt"]);
        snapshot.sort();
        assert_eq!(snapshot.entries()[0].path, "a.txt");
    }
}
