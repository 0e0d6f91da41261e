use crate::detection::DetectorRegistry;
use crate::error::PlanError;
use crate::fs::{FileEntry, FileSnapshot};
use ignore::{overrides::OverrideBuilder, WalkBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub max_depth: usize,
    pub max_files: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_files: 5000,
        }
    }
}

/// Version control system found at the project root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vcs {
    Git,
}

#[derive(Debug, Clone)]
pub struct ProjectScan {
    pub root: PathBuf,
    pub snapshot: FileSnapshot,
    pub vcs: Option<Vcs>,
    /// True when `max_files` cut the walk short
    pub truncated: bool,
    pub scan_time_ms: u64,
}

/// Walks a local project into a [`FileSnapshot`]
pub struct ProjectScanner {
    root: PathBuf,
    registry: Arc<DetectorRegistry>,
    config: ScanConfig,
}

impl ProjectScanner {
    pub fn new(root: PathBuf) -> Result<Self, PlanError> {
        Self::with_registry(root, Arc::new(DetectorRegistry::with_defaults()))
    }

    pub fn with_registry(
        root: PathBuf,
        registry: Arc<DetectorRegistry>,
    ) -> Result<Self, PlanError> {
        if !root.exists() {
            return Err(PlanError::Scan {
                path: root,
                message: "path does not exist".to_string(),
            });
        }
        if !root.is_dir() {
            return Err(PlanError::Scan {
                path: root,
                message: "path is not a directory".to_string(),
            });
        }

        let root = root.canonicalize().map_err(|e| PlanError::Scan {
            path: root.clone(),
            message: e.to_string(),
        })?;

        debug!(root = %root.display(), "ProjectScanner initialized");

        Ok(Self {
            root,
            registry,
            config: ScanConfig::default(),
        })
    }

    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scan(&self) -> Result<ProjectScan, PlanError> {
        let start = Instant::now();

        info!(
            root = %self.root.display(),
            max_depth = self.config.max_depth,
            max_files = self.config.max_files,
            "Starting project scan"
        );

        let mut override_builder = OverrideBuilder::new(&self.root);
        for excluded in self.registry.all_excluded_dirs() {
            override_builder
                .add(&format!("!{}/", excluded))
                .map_err(|e| self.scan_error(e))?;
        }
        let overrides = override_builder.build().map_err(|e| self.scan_error(e))?;

        let mut snapshot = FileSnapshot::default();
        let mut files_scanned = 0;
        let mut truncated = false;

        for result in WalkBuilder::new(&self.root)
            .max_depth(Some(self.config.max_depth))
            .hidden(false)
            .git_ignore(true)
            .overrides(overrides)
            // files before subdirectories so a truncated scan still sees root manifests
            .sort_by_file_path(|a, b| (a.is_dir(), a).cmp(&(b.is_dir(), b)))
            .build()
        {
            let entry = match result {
                Ok(e) => e,
                Err(err) => {
                    warn!(error = %err, "Failed to read directory entry");
                    continue;
                }
            };

            let Some(relative) = self.relative_path(entry.path()) else {
                continue;
            };
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);

            if is_dir {
                snapshot.push(FileEntry::dir(relative));
                continue;
            }

            if files_scanned >= self.config.max_files {
                warn!(
                    files_scanned,
                    max_files = self.config.max_files,
                    "Reached file limit, stopping scan"
                );
                truncated = true;
                break;
            }
            files_scanned += 1;

            let size = entry.metadata().ok().map(|m| m.len());
            snapshot.push(FileEntry::file(relative, size));
        }

        snapshot.sort();

        let vcs = self.root.join(".git").exists().then_some(Vcs::Git);
        let scan_time_ms = start.elapsed().as_millis() as u64;

        info!(
            files_scanned,
            entries = snapshot.len(),
            vcs = ?vcs,
            scan_time_ms,
            "Project scan completed"
        );

        Ok(ProjectScan {
            root: self.root.clone(),
            snapshot,
            vcs,
            truncated,
            scan_time_ms,
        })
    }

    /// `/`-separated path below the root; `None` for the root itself
    fn relative_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }

    fn scan_error(&self, error: impl ToString) -> PlanError {
        PlanError::Scan {
            path: self.root.clone(),
            message: error.to_string(),
        }
    }
}
