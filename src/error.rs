//! Error types shared by the detection and planning pipeline

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure reading an existing file through a content accessor.
///
/// A missing file is never an error: accessors report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}

impl ContentError {
    pub fn parse(path: &str, message: impl ToString) -> Self {
        ContentError::Parse {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            ContentError::Io { path, .. } | ContentError::Parse { path, .. } => path,
        }
    }
}

/// Errors surfaced by the detection engine, the synthesizer and the pipeline
#[derive(Debug, Error)]
pub enum PlanError {
    /// No detector matched the project
    #[error("No language detected in {0}")]
    NoLanguageDetected(PathBuf),

    /// Selection produced nothing from the matched set
    #[error("No valid detection result to build a plan from")]
    NoValidDetection,

    /// A detector could not read one of its inputs
    #[error("Provider '{provider}' failed: {source}")]
    ProviderIo {
        provider: String,
        #[source]
        source: ContentError,
    },

    #[error("Unknown provider: {0}. Run `planbox providers` to list available providers")]
    UnknownProvider(String),

    #[error("Failed to scan {path}: {message}")]
    Scan { path: PathBuf, message: String },

    #[error("Invalid catalog: {0}")]
    Catalog(String),
}

impl PlanError {
    /// Exit code used by the CLI for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PlanError::NoLanguageDetected(_) => 1,
            _ => 2,
        }
    }
}
