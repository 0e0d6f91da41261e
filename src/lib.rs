//! planbox - project ecosystem detection and execution plan synthesis
//!
//! planbox scores a project's files against every supported ecosystem,
//! picks one with a backend-over-frontend policy and turns the winner into an
//! [`ExecutionPlan`]: base image, environment, commands, port and the OS
//! packages needed for native builds.
//!
//! # Example Usage
//!
//! ```no_run
//! use planbox::{PlanPipeline, PlanRequest, PlanboxConfig};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = PlanPipeline::new(&PlanboxConfig::default())?;
//! let analysis = pipeline
//!     .analyze(Path::new("/srv/app"), &PlanRequest::default())
//!     .await?;
//!
//! println!("{}", analysis.plan.to_json()?);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`detection`]: scoring, the detector contract, registry, engine and selection policy
//! - [`ecosystems`]: the built-in per-ecosystem detectors
//! - [`plan`]: catalogs and the plan synthesizer
//! - [`scan`] and [`fs`]: file snapshots and read-only content access
//! - [`pipeline`]: scan, detect, select and synthesize in one call

pub mod cli;
pub mod config;
pub mod detection;
pub mod ecosystems;
pub mod error;
pub mod fs;
pub mod output;
pub mod pipeline;
pub mod plan;
pub mod scan;
pub mod util;

pub use config::{ConfigError, PlanboxConfig};
pub use detection::{
    DetectionEngine, DetectionResult, Detector, DetectorRegistry, Evidence, SelectionPolicy,
};
pub use error::{ContentError, PlanError};
pub use fs::{ContentAccessor, FileEntry, FileSnapshot, LocalContent, MockContent};
pub use output::{Commands, ExecutionPlan, PlanOptions, RuntimeSpec};
pub use pipeline::{Analysis, PlanPipeline, PlanRequest};
pub use plan::{Catalog, PlanSynthesizer};
pub use scan::{ProjectScanner, ScanConfig};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
