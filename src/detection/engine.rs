use super::detector::Detector;
use super::registry::DetectorRegistry;
use super::selector::SelectionPolicy;
use super::types::DetectionResult;
use crate::error::{ContentError, PlanError};
use crate::fs::{ContentAccessor, FileSnapshot};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_DETECTOR_TIMEOUT: Duration = Duration::from_millis(2000);

/// Diagnostics over a result list; not used on the plan path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub count: usize,
    pub average_confidence: f64,
    pub languages: Vec<String>,
    pub frameworks: Vec<String>,
}

/// Runs every registered detector over one snapshot
pub struct DetectionEngine {
    registry: Arc<DetectorRegistry>,
    policy: SelectionPolicy,
    timeout: Duration,
}

impl DetectionEngine {
    pub fn new(registry: Arc<DetectorRegistry>) -> Self {
        Self {
            registry,
            policy: SelectionPolicy::default(),
            timeout: DEFAULT_DETECTOR_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> &Arc<DetectorRegistry> {
        &self.registry
    }

    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    /// Matched results in registration order.
    ///
    /// Detectors run concurrently on the blocking pool. One that times out,
    /// panics or fails to read its inputs contributes nothing.
    pub async fn detect(
        &self,
        path: &Path,
        files: Arc<FileSnapshot>,
        content: Arc<dyn ContentAccessor>,
    ) -> Vec<DetectionResult> {
        self.run(self.registry.list().to_vec(), path, files, content)
            .await
    }

    /// Runs only the named detector
    pub async fn detect_single(
        &self,
        provider: &str,
        path: &Path,
        files: Arc<FileSnapshot>,
        content: Arc<dyn ContentAccessor>,
    ) -> Result<Vec<DetectionResult>, PlanError> {
        let detector = self
            .registry
            .get(provider)
            .ok_or_else(|| PlanError::UnknownProvider(provider.to_string()))?;
        Ok(self.run(vec![detector], path, files, content).await)
    }

    /// Sequential variant for callers without a tokio runtime; no timeout applies
    pub fn detect_sync(
        &self,
        path: &Path,
        files: &FileSnapshot,
        content: &dyn ContentAccessor,
    ) -> Vec<DetectionResult> {
        let start = Instant::now();
        let results: Vec<DetectionResult> = self
            .registry
            .list()
            .iter()
            .filter_map(|detector| {
                let outcome = detector.detect(path, files, content);
                settle(detector.name(), outcome)
            })
            .collect();

        debug!(
            matched = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Sequential detection complete"
        );
        results
    }

    async fn run(
        &self,
        detectors: Vec<Arc<dyn Detector>>,
        path: &Path,
        files: Arc<FileSnapshot>,
        content: Arc<dyn ContentAccessor>,
    ) -> Vec<DetectionResult> {
        let start = Instant::now();
        let timeout = self.timeout;

        let tasks = detectors.into_iter().map(|detector| {
            let name = detector.name();
            let path: PathBuf = path.to_path_buf();
            let files = Arc::clone(&files);
            let content = Arc::clone(&content);

            async move {
                let handle = tokio::task::spawn_blocking(move || {
                    detector.detect(&path, &files, content.as_ref())
                });

                match tokio::time::timeout(timeout, handle).await {
                    Ok(Ok(outcome)) => settle(name, outcome),
                    Ok(Err(join_error)) => {
                        warn!(provider = name, error = %join_error, "Detector panicked, skipping");
                        None
                    }
                    Err(_) => {
                        warn!(
                            provider = name,
                            timeout_ms = timeout.as_millis() as u64,
                            "Detector timed out, skipping"
                        );
                        None
                    }
                }
            }
        });

        let results: Vec<DetectionResult> = join_all(tasks).await.into_iter().flatten().collect();

        info!(
            matched = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Detection complete"
        );
        results
    }

    pub fn best_result<'r>(&self, results: &'r [DetectionResult]) -> Option<&'r DetectionResult> {
        self.policy.select(results)
    }

    pub fn filter(results: &[DetectionResult], min_confidence: f64) -> Vec<DetectionResult> {
        results
            .iter()
            .filter(|r| r.confidence >= min_confidence)
            .cloned()
            .collect()
    }

    pub fn stats(results: &[DetectionResult]) -> EngineStats {
        if results.is_empty() {
            return EngineStats::default();
        }

        let mut languages: Vec<String> = Vec::new();
        let mut frameworks: Vec<String> = Vec::new();
        for result in results {
            if !languages.contains(&result.language) {
                languages.push(result.language.clone());
            }
            if let Some(framework) = result.framework() {
                if !frameworks.iter().any(|f| f == framework) {
                    frameworks.push(framework.to_string());
                }
            }
        }

        let total: f64 = results.iter().map(|r| r.confidence).sum();
        EngineStats {
            count: results.len(),
            average_confidence: total / results.len() as f64,
            languages,
            frameworks,
        }
    }
}

/// Keeps matched results; read failures disable only the failing detector
fn settle(
    name: &'static str,
    outcome: Result<DetectionResult, ContentError>,
) -> Option<DetectionResult> {
    match outcome {
        Ok(result) if result.matched => {
            debug!(provider = name, confidence = result.confidence, "Detector matched");
            Some(result)
        }
        Ok(result) => {
            debug!(provider = name, confidence = result.confidence, "Detector did not match");
            None
        }
        Err(source) => {
            let error = PlanError::ProviderIo {
                provider: name.to_string(),
                source,
            };
            warn!(provider = name, error = %error, "Detector failed, skipping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::spec::{weighted, EcosystemSpec, Indicator, VersionPrecision};
    use crate::fs::MockContent;
    use crate::output::{Commands, PlanOptions};

    fn engine() -> DetectionEngine {
        DetectionEngine::new(Arc::new(DetectorRegistry::with_defaults()))
    }

    fn result(language: &str, framework: &str, confidence: f64) -> DetectionResult {
        let mut result = DetectionResult::unmatched(language);
        result.matched = true;
        result.framework = framework.to_string();
        result.confidence = confidence;
        result
    }

    static SLOW: EcosystemSpec = EcosystemSpec {
        name: "slow",
        priority: 1,
        threshold: 0.1,
        indicators: &[weighted(1, Indicator::File("package.json"))],
        manifests: &[],
        version_sources: &[],
        version_precision: VersionPrecision::Major,
        default_version: "1",
        frameworks: &[],
        excluded_dirs: &[],
    };

    struct SlowDetector;

    impl Detector for SlowDetector {
        fn spec(&self) -> &'static EcosystemSpec {
            &SLOW
        }

        fn detect(
            &self,
            _path: &Path,
            _files: &FileSnapshot,
            _content: &dyn ContentAccessor,
        ) -> Result<DetectionResult, ContentError> {
            std::thread::sleep(Duration::from_millis(1500));
            Ok(result("slow", "", 1.0))
        }

        fn generate_commands(&self, _result: &DetectionResult, _options: &PlanOptions) -> Commands {
            Commands::default()
        }
    }

    fn node_project() -> Arc<MockContent> {
        Arc::new(MockContent::with_files(&[
            ("package.json", r#"{"name": "app"}"#),
            ("package-lock.json", "{}"),
            ("index.js", "console.log('hi')"),
        ]))
    }

    #[tokio::test]
    async fn test_detect_returns_only_matched() {
        let content = node_project();
        let files = Arc::new(content.snapshot());
        let results = engine().detect(Path::new("/repo"), files, content).await;

        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.matched));
        assert_eq!(results[0].language, "node");
    }

    #[tokio::test]
    async fn test_async_matches_sync() {
        let content = node_project();
        let files = Arc::new(content.snapshot());
        let engine = engine();

        let sync = engine.detect_sync(Path::new("/repo"), &files, content.as_ref());
        let async_results = engine
            .detect(Path::new("/repo"), Arc::clone(&files), content)
            .await;
        assert_eq!(sync, async_results);
    }

    #[tokio::test]
    async fn test_detect_single_unknown_provider() {
        let content = node_project();
        let files = Arc::new(content.snapshot());
        let err = engine()
            .detect_single("cobol", Path::new("/repo"), files, content)
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::UnknownProvider(name) if name == "cobol"));
    }

    #[tokio::test]
    async fn test_detect_single_runs_one() {
        let content = node_project();
        let files = Arc::new(content.snapshot());
        let results = engine()
            .detect_single("node", Path::new("/repo"), files, content)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].language, "node");
    }

    #[tokio::test]
    async fn test_timed_out_detector_is_skipped() {
        let mut registry = DetectorRegistry::new();
        registry.register(Arc::new(SlowDetector));
        registry.register(Arc::new(crate::ecosystems::NodeDetector));
        let engine =
            DetectionEngine::new(Arc::new(registry)).with_timeout(Duration::from_millis(250));

        let content = node_project();
        let files = Arc::new(content.snapshot());
        let results = engine.detect(Path::new("/repo"), files, content).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].language, "node");
    }

    #[tokio::test]
    async fn test_malformed_manifest_skips_detector() {
        let content = Arc::new(MockContent::with_files(&[
            ("package.json", "{ not json"),
            ("index.js", ""),
            ("requirements.txt", "flask\n"),
            ("app.py", ""),
        ]));
        let files = Arc::new(content.snapshot());
        let results = engine().detect(Path::new("/repo"), files, content).await;

        assert!(results.iter().all(|r| r.language != "node"));
        assert!(results.iter().any(|r| r.language == "python"));
    }

    #[test]
    fn test_filter() {
        let results = vec![result("node", "", 0.4), result("python", "", 0.8)];
        let filtered = DetectionEngine::filter(&results, 0.5);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].language, "python");
        assert_eq!(DetectionEngine::filter(&results, 0.4).len(), 2);
    }

    #[test]
    fn test_stats() {
        let results = vec![
            result("node", "Express", 0.6),
            result("staticfile", "", 0.4),
            result("node", "Express", 0.8),
        ];
        let stats = DetectionEngine::stats(&results);
        assert_eq!(stats.count, 3);
        assert!((stats.average_confidence - 0.6).abs() < 1e-9);
        assert_eq!(stats.languages, vec!["node", "staticfile"]);
        assert_eq!(stats.frameworks, vec!["Express"]);
    }

    #[test]
    fn test_stats_empty() {
        assert_eq!(DetectionEngine::stats(&[]), EngineStats::default());
    }

    #[test]
    fn test_best_result_uses_policy() {
        let results = vec![result("php", "", 0.4), result("staticfile", "", 0.9)];
        let engine = engine();
        assert_eq!(engine.best_result(&results).unwrap().language, "php");
    }
}
