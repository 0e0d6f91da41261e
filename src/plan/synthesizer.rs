use super::catalog::Catalog;
use crate::detection::{DetectionResult, DetectorRegistry, SelectionPolicy};
use crate::error::PlanError;
use crate::output::{ExecutionPlan, PlanOptions, RuntimeSpec};
use std::sync::Arc;
use tracing::{debug, info, warn};

const BUILD_ESSENTIAL: &str = "build-essential";
const VCS_PACKAGE: &str = "git";

/// Turns the selected detection result into an [`ExecutionPlan`].
///
/// Holds no ecosystem knowledge of its own: commands, environment and the
/// native-compilation check come from the winning detector, images and ports
/// from the catalog.
pub struct PlanSynthesizer {
    catalog: Arc<Catalog>,
    registry: Arc<DetectorRegistry>,
    policy: SelectionPolicy,
}

impl PlanSynthesizer {
    pub fn new(catalog: Arc<Catalog>, registry: Arc<DetectorRegistry>) -> Self {
        Self {
            catalog,
            registry,
            policy: SelectionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Selects a winner from `results` and builds its plan
    pub fn synthesize(
        &self,
        results: &[DetectionResult],
        options: &PlanOptions,
    ) -> Result<ExecutionPlan, PlanError> {
        if results.is_empty() {
            return Err(PlanError::NoValidDetection);
        }
        let selected = self
            .policy
            .select(results)
            .ok_or(PlanError::NoValidDetection)?;
        self.synthesize_result(selected, options)
    }

    /// Builds the plan for an already selected result
    pub fn synthesize_result(
        &self,
        result: &DetectionResult,
        options: &PlanOptions,
    ) -> Result<ExecutionPlan, PlanError> {
        let detector = self
            .registry
            .get(&result.language)
            .ok_or_else(|| PlanError::UnknownProvider(result.language.clone()))?;

        let image = match self.catalog.resolve_image(&result.language, &result.version) {
            Some(image) => image.to_string(),
            None => {
                warn!(
                    provider = %result.language,
                    version = %result.version,
                    "No base image in catalog"
                );
                String::new()
            }
        };

        let native = detector.needs_native_compilation(result);
        let apt = self.apt_packages(result, native);
        let commands = detector.generate_commands(result, options);
        let environment = detector.generate_environment(result);
        let port = self.catalog.port(&result.language);

        debug!(
            provider = %result.language,
            image = %image,
            port,
            native,
            apt = apt.len(),
            "Synthesized plan"
        );
        info!(provider = %result.language, framework = %result.framework, "Plan ready");

        Ok(ExecutionPlan {
            provider: result.language.clone(),
            runtime: RuntimeSpec {
                image,
                framework: result.framework().map(str::to_string),
            },
            environment,
            apt,
            commands,
            port,
            evidence: if result.evidence.is_empty() {
                None
            } else {
                Some(result.evidence.clone())
            },
        })
    }

    fn apt_packages(&self, result: &DetectionResult, native: bool) -> Vec<String> {
        let mut packages: Vec<String> = Vec::new();
        let mut push = |package: &str| {
            if !packages.iter().any(|p| p == package) {
                packages.push(package.to_string());
            }
        };

        if native {
            push(BUILD_ESSENTIAL);
            for package in self.catalog.native_packages(&result.language) {
                push(package);
            }
        }
        if result.evidence.is_version_controlled() {
            push(VCS_PACKAGE);
        }
        packages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Evidence;

    fn synthesizer() -> PlanSynthesizer {
        PlanSynthesizer::new(
            Arc::new(Catalog::builtin().unwrap()),
            Arc::new(DetectorRegistry::with_defaults()),
        )
    }

    fn result(language: &str, version: &str, confidence: f64) -> DetectionResult {
        let mut result = DetectionResult::unmatched(language);
        result.matched = true;
        result.version = version.to_string();
        result.confidence = confidence;
        result
    }

    #[test]
    fn test_empty_results() {
        let err = synthesizer()
            .synthesize(&[], &PlanOptions::default())
            .unwrap_err();
        assert!(matches!(err, PlanError::NoValidDetection));
    }

    #[test]
    fn test_backend_wins() {
        let results = vec![result("staticfile", "1.27", 0.9), result("php", "8.3", 0.4)];
        let plan = synthesizer()
            .synthesize(&results, &PlanOptions::default())
            .unwrap();

        assert_eq!(plan.provider, "php");
        assert_eq!(plan.runtime.image, "php:8.3-cli-bookworm");
        assert_eq!(plan.port, 8080);
    }

    #[test]
    fn test_image_falls_back_to_default_version() {
        let plan = synthesizer()
            .synthesize_result(&result("python", "2.7", 0.8), &PlanOptions::default())
            .unwrap();
        assert_eq!(plan.runtime.image, "python:3.12-slim-bookworm");
        assert_eq!(plan.port, 8000);
    }

    #[test]
    fn test_unresolved_image_is_empty() {
        let catalog = Catalog::from_toml_str("[ports]\ngo = 9000\n", "test").unwrap();
        let synthesizer =
            PlanSynthesizer::new(Arc::new(catalog), Arc::new(DetectorRegistry::with_defaults()));

        let plan = synthesizer
            .synthesize_result(&result("go", "1.23", 0.8), &PlanOptions::default())
            .unwrap();
        assert!(plan.runtime.image.is_empty());
        assert_eq!(plan.port, 9000);
        assert!(!plan.warnings().is_empty());
    }

    #[test]
    fn test_evidence_omitted_when_empty() {
        let plan = synthesizer()
            .synthesize_result(&result("go", "1.23", 0.8), &PlanOptions::default())
            .unwrap();
        assert!(plan.evidence.is_none());
        assert!(plan.apt.is_empty());
    }

    #[test]
    fn test_version_control_adds_git() {
        let mut detected = result("go", "1.23", 0.8);
        detected.evidence = Evidence::new("go project detected").with_files(["go.mod"]);
        detected.evidence.mark_version_controlled();

        let plan = synthesizer()
            .synthesize_result(&detected, &PlanOptions::default())
            .unwrap();
        assert_eq!(plan.apt, vec!["git"]);
        assert_eq!(plan.evidence.as_ref().unwrap().files(), ["go.mod"]);
    }

    #[test]
    fn test_unknown_provider() {
        let err = synthesizer()
            .synthesize_result(&result("cobol", "85", 1.0), &PlanOptions::default())
            .unwrap_err();
        assert!(matches!(err, PlanError::UnknownProvider(name) if name == "cobol"));
    }
}
