//! Confidence-weighted ecosystem detection
//!
//! Every detector scores the same [`FileSnapshot`](crate::fs::FileSnapshot)
//! against its own indicator table. The engine collects matched results in
//! registration order and the [`SelectionPolicy`] picks one winner.

pub mod confidence;
pub mod context;
pub mod detector;
pub mod engine;
pub mod metadata;
pub mod registry;
pub mod selector;
pub mod spec;
pub mod types;

pub use confidence::{score, ConfidenceIndicator};
pub use context::{normalize_version, DetectionContext};
pub use detector::{run_detection, shell_quote, Detector};
pub use engine::{DetectionEngine, EngineStats, DEFAULT_DETECTOR_TIMEOUT};
pub use metadata::EcosystemMetadata;
pub use registry::DetectorRegistry;
pub use selector::{SelectionPolicy, BACKEND_FRAMEWORKS, BACKEND_LANGUAGES};
pub use spec::{EcosystemSpec, FrameworkRule, Indicator, VersionPrecision, VersionSource};
pub use types::{DetectionResult, Evidence, VERSION_CONTROL_MARKER};
