//! Local project scanning into a file snapshot

mod scanner;

pub use scanner::{ProjectScan, ProjectScanner, ScanConfig, Vcs};
