use crate::config::PlanboxConfig;
use crate::detection::{DetectionEngine, DetectionResult, DetectorRegistry};
use crate::error::PlanError;
use crate::fs::{ContentAccessor, LocalContent};
use crate::output::{ExecutionPlan, PlanOptions};
use crate::plan::{Catalog, PlanSynthesizer};
use crate::scan::{ProjectScan, ProjectScanner, ScanConfig};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// What to plan and how to override the generated commands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanRequest {
    /// Runs only this detector instead of the whole registry
    pub provider: Option<String>,
    pub options: PlanOptions,
}

impl PlanRequest {
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_options(mut self, options: PlanOptions) -> Self {
        self.options = options;
        self
    }
}

/// Matched results for one project, before selection
#[derive(Debug, Clone)]
pub struct Detection {
    pub scan: ProjectScan,
    pub results: Vec<DetectionResult>,
}

/// Outcome of one full run: every match, the winner, and its plan
#[derive(Debug, Clone)]
pub struct Analysis {
    pub results: Vec<DetectionResult>,
    pub selected: DetectionResult,
    pub plan: ExecutionPlan,
    pub elapsed: Duration,
}

/// Scan, detect, select, synthesize.
///
/// Single pass with no state carried between runs. Dropping the returned
/// future cancels the whole run.
pub struct PlanPipeline {
    registry: Arc<DetectorRegistry>,
    engine: DetectionEngine,
    synthesizer: PlanSynthesizer,
    scan_config: ScanConfig,
    max_file_size: u64,
}

impl PlanPipeline {
    pub fn new(config: &PlanboxConfig) -> Result<Self, PlanError> {
        let catalog = config
            .load_catalog()
            .map_err(|e| PlanError::Catalog(e.to_string()))?;
        Ok(Self::with_catalog(config, catalog))
    }

    pub fn with_catalog(config: &PlanboxConfig, catalog: Catalog) -> Self {
        let registry = Arc::new(DetectorRegistry::with_defaults());
        let engine =
            DetectionEngine::new(Arc::clone(&registry)).with_timeout(config.detector_timeout());
        let synthesizer = PlanSynthesizer::new(Arc::new(catalog), Arc::clone(&registry))
            .with_policy(engine.policy().clone());

        Self {
            registry,
            engine,
            synthesizer,
            scan_config: config.scan_config(),
            max_file_size: config.max_file_size,
        }
    }

    pub fn registry(&self) -> &DetectorRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &DetectionEngine {
        &self.engine
    }

    pub fn synthesizer(&self) -> &PlanSynthesizer {
        &self.synthesizer
    }

    /// Scans `path` and runs the detectors, or only `provider` when given
    pub async fn detect(
        &self,
        path: &Path,
        provider: Option<&str>,
    ) -> Result<Detection, PlanError> {
        let scan = ProjectScanner::with_registry(path.to_path_buf(), Arc::clone(&self.registry))?
            .with_config(self.scan_config.clone())
            .scan()?;

        let files = Arc::new(scan.snapshot.clone());
        let content: Arc<dyn ContentAccessor> =
            Arc::new(LocalContent::new(&scan.root).with_max_file_size(self.max_file_size));

        let mut results = match provider {
            Some(name) => {
                self.engine
                    .detect_single(name, &scan.root, files, content)
                    .await?
            }
            None => self.engine.detect(&scan.root, files, content).await,
        };

        if scan.vcs.is_some() {
            for result in &mut results {
                result.evidence.mark_version_controlled();
            }
        }

        Ok(Detection { scan, results })
    }

    pub async fn analyze(&self, path: &Path, request: &PlanRequest) -> Result<Analysis, PlanError> {
        let start = Instant::now();
        info!(path = %path.display(), provider = ?request.provider, "Starting analysis");

        let detection = self.detect(path, request.provider.as_deref()).await?;
        if detection.results.is_empty() {
            return Err(PlanError::NoLanguageDetected(detection.scan.root));
        }

        let selected = self
            .engine
            .best_result(&detection.results)
            .cloned()
            .ok_or(PlanError::NoValidDetection)?;
        debug!(provider = %selected.language, confidence = selected.confidence, "Selected");

        let plan = self
            .synthesizer
            .synthesize_result(&selected, &request.options)?;

        let elapsed = start.elapsed();
        info!(
            provider = %plan.provider,
            elapsed_ms = elapsed.as_millis() as u64,
            "Analysis complete"
        );

        Ok(Analysis {
            results: detection.results,
            selected,
            plan,
            elapsed,
        })
    }
}
