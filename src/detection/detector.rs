//! Detector contract and the generic, table-driven detection routine

use super::confidence::{self, ConfidenceIndicator};
use super::context::DetectionContext;
use super::metadata::EcosystemMetadata;
use super::spec::EcosystemSpec;
use super::types::{DetectionResult, Evidence};
use crate::error::ContentError;
use crate::fs::{ContentAccessor, FileSnapshot};
use crate::output::{Commands, PlanOptions};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::trace;

/// Per-ecosystem classifier.
///
/// Implementors provide an [`EcosystemSpec`] and override only the hooks where
/// the tables are not enough (package manager choice, dependency extraction,
/// metadata, commands).
pub trait Detector: Send + Sync {
    fn spec(&self) -> &'static EcosystemSpec;

    fn name(&self) -> &'static str {
        self.spec().name
    }

    fn priority(&self) -> u8 {
        self.spec().priority
    }

    fn detect(
        &self,
        path: &Path,
        files: &FileSnapshot,
        content: &dyn ContentAccessor,
    ) -> Result<DetectionResult, ContentError> {
        let ctx = DetectionContext::new(path, files, content);
        run_detection(self, &ctx)
    }

    /// Manifest dependency names (regular, dev and peer merged)
    fn dependencies(&self, _ctx: &DetectionContext) -> Result<Vec<String>, ContentError> {
        Ok(Vec::new())
    }

    fn detect_version(&self, ctx: &DetectionContext) -> Result<Option<String>, ContentError> {
        let spec = self.spec();
        ctx.version_from_sources(spec.version_sources, spec.version_precision)
    }

    fn detect_framework(
        &self,
        _ctx: &DetectionContext,
        dependencies: &[String],
    ) -> Result<Option<String>, ContentError> {
        Ok(self.spec().match_framework(dependencies).map(str::to_string))
    }

    fn package_manager(&self, _ctx: &DetectionContext) -> Result<String, ContentError> {
        Ok(String::new())
    }

    fn build_tools(&self, _ctx: &DetectionContext, package_manager: &str) -> Vec<String> {
        if package_manager.is_empty() {
            Vec::new()
        } else {
            vec![package_manager.to_string()]
        }
    }

    /// Post-scoring adjustment applied before the threshold check
    fn adjust_confidence(
        &self,
        _ctx: &DetectionContext,
        confidence: f64,
        _evidence: &mut Evidence,
    ) -> Result<f64, ContentError> {
        Ok(confidence)
    }

    fn metadata(
        &self,
        _ctx: &DetectionContext,
        _dependencies: &[String],
    ) -> Result<Option<EcosystemMetadata>, ContentError> {
        Ok(None)
    }

    fn generate_commands(&self, result: &DetectionResult, options: &PlanOptions) -> Commands;

    fn generate_environment(&self, _result: &DetectionResult) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn needs_native_compilation(&self, _result: &DetectionResult) -> bool {
        false
    }
}

/// Scores the indicator table, then fills in version, framework, package
/// manager and metadata for results that clear the threshold.
pub fn run_detection<D: Detector + ?Sized>(
    detector: &D,
    ctx: &DetectionContext,
) -> Result<DetectionResult, ContentError> {
    let spec = detector.spec();
    let mut evidence = Evidence::default();

    let mut indicators = Vec::with_capacity(spec.indicators.len());
    for indicator in spec.indicators {
        let satisfied = ctx.evaluate(indicator, &mut evidence)?;
        indicators.push(ConfidenceIndicator::new(indicator.weight, satisfied));
    }

    let raw = confidence::score(&indicators);
    let confidence = detector
        .adjust_confidence(ctx, raw, &mut evidence)?
        .clamp(0.0, 1.0);

    trace!(
        provider = spec.name,
        raw_confidence = raw,
        confidence,
        threshold = spec.threshold,
        "Scored indicators"
    );

    let mut result = DetectionResult::unmatched(spec.name);
    result.confidence = confidence;

    if confidence <= 0.0 || confidence < spec.threshold {
        result.evidence = evidence;
        return Ok(result);
    }

    let dependencies = detector.dependencies(ctx)?;
    let framework = detector.detect_framework(ctx, &dependencies)?;
    let version = detector
        .detect_version(ctx)?
        .unwrap_or_else(|| spec.default_version.to_string());
    let package_manager = detector.package_manager(ctx)?;

    result.matched = true;
    result.framework = framework.unwrap_or_default();
    result.version = version;
    result.build_tools = detector.build_tools(ctx, &package_manager);
    result.package_manager = package_manager;
    result.metadata = detector.metadata(ctx, &dependencies)?;

    let mut reason = format!("{} project detected", spec.name);
    if let Some(framework) = result.framework() {
        reason.push_str(&format!(" using {}", framework));
    }
    if !evidence.files().is_empty() {
        reason.push_str(&format!(" from {}", evidence.files().join(", ")));
    }
    evidence.set_reason(reason);
    result.evidence = evidence;

    Ok(result)
}

/// Quotes a value for use inside a generated shell command
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+".contains(c))
    {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
