//! Output formatting for plans, detection reports and the provider list
//!
//! JSON and YAML render the serde representation; the human format is a
//! boxed summary meant for terminals.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::detection::{DetectionResult, Detector, EngineStats};
use crate::output::ExecutionPlan;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format (human-friendly, version-control friendly)
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// Every matched result for one project, plus the one selection picked
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub path: PathBuf,
    pub results: Vec<DetectionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,
    pub stats: EngineStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderInfo {
    pub name: String,
    pub priority: u8,
    pub threshold: f64,
    pub default_version: String,
    pub manifests: Vec<String>,
}

impl ProviderInfo {
    pub fn from_detector(detector: &dyn Detector) -> Self {
        let spec = detector.spec();
        Self {
            name: detector.name().to_string(),
            priority: detector.priority(),
            threshold: spec.threshold,
            default_version: spec.default_version.to_string(),
            manifests: spec.manifests.iter().map(|m| m.to_string()).collect(),
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_plan(&self, plan: &ExecutionPlan) -> Result<String> {
        match self.format {
            OutputFormat::Json => plan.to_json(),
            OutputFormat::Yaml => plan.to_yaml(),
            OutputFormat::Human => Ok(self.format_plan_human(plan)),
        }
    }

    pub fn format_detection(&self, report: &DetectionReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report)
                .context("Failed to serialize detection report to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(report).context("Failed to serialize detection report to YAML")
            }
            OutputFormat::Human => Ok(self.format_detection_human(report)),
        }
    }

    pub fn format_providers(&self, providers: &[ProviderInfo]) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(providers)
                .context("Failed to serialize providers to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(providers).context("Failed to serialize providers to YAML")
            }
            OutputFormat::Human => Ok(self.format_providers_human(providers)),
        }
    }

    // Human-readable formatting methods

    fn format_plan_human(&self, plan: &ExecutionPlan) -> String {
        let mut output = String::new();
        let warnings = plan.warnings();

        if warnings.is_empty() {
            output.push_str("\u{2713} Execution Plan\n");
        } else {
            output.push_str("\u{26A0} Execution Plan (Incomplete)\n");
        }
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Provider:   {}\n", plan.provider));
        if let Some(framework) = &plan.runtime.framework {
            output.push_str(&format!("Framework:  {}\n", framework));
        }
        if plan.runtime.image.is_empty() {
            output.push_str("Image:      (unresolved)\n");
        } else {
            output.push_str(&format!("Image:      {}\n", plan.runtime.image));
        }
        output.push_str(&format!("Port:       {}\n\n", plan.port));

        output.push_str("Commands:\n");
        let phases = [
            ("Setup", &plan.commands.setup),
            ("Dev", &plan.commands.dev),
            ("Build", &plan.commands.build),
            ("Run", &plan.commands.run),
        ];
        for (i, (label, commands)) in phases.iter().enumerate() {
            let connector = if i == phases.len() - 1 {
                "\u{2514}"
            } else {
                "\u{251C}"
            };
            if commands.is_empty() {
                output.push_str(&format!(
                    "{}\u{2500} {:<7}(none)\n",
                    connector,
                    format!("{}:", label)
                ));
            } else {
                output.push_str(&format!(
                    "{}\u{2500} {:<7}{}\n",
                    connector,
                    format!("{}:", label),
                    commands.join(" && ")
                ));
            }
        }
        output.push('\n');

        if !plan.environment.is_empty() {
            output.push_str("Environment:\n");
            for (key, value) in &plan.environment {
                output.push_str(&format!("  {}={}\n", key, value));
            }
            output.push('\n');
        }

        if !plan.apt.is_empty() {
            output.push_str(&format!("Apt Packages: {}\n\n", plan.apt.join(", ")));
        }

        if let Some(evidence) = &plan.evidence {
            output.push_str("Detection Summary:\n");
            if !evidence.files().is_empty() {
                output.push_str(&format!("Files: {}\n", evidence.files().join(", ")));
            }
            output.push_str(&format!("Reasoning: {}\n", evidence.reason()));
        }

        if !warnings.is_empty() {
            output.push_str("\n\u{26A0} Warnings:\n");
            for warning in &warnings {
                output.push_str(&format!("  - {}\n", warning));
            }
        }

        output
    }

    fn format_detection_human(&self, report: &DetectionReport) -> String {
        let mut output = String::new();

        output.push_str("Detection Results\n");
        output.push_str(RULE);
        output.push_str("\n\n");
        output.push_str(&format!("Project: {}\n\n", report.path.display()));

        if report.results.is_empty() {
            output.push_str("No ecosystem detected\n");
            return output;
        }

        for result in &report.results {
            let selected = report.selected.as_deref() == Some(result.language.as_str());
            let marker = if selected { "\u{25B6}" } else { " " };
            output.push_str(&format!(
                "{} {} {}\n",
                marker,
                confidence_bar(result.confidence),
                result
            ));
            if !result.version.is_empty() {
                output.push_str(&format!("    Version:          {}\n", result.version));
            }
            if !result.package_manager.is_empty() {
                output.push_str(&format!("    Package Manager:  {}\n", result.package_manager));
            }
            if !result.evidence.files().is_empty() {
                output.push_str(&format!(
                    "    Files:            {}\n",
                    result.evidence.files().join(", ")
                ));
            }
        }

        output.push_str(&format!(
            "\nMatched {} provider(s), average confidence {:.0}%\n",
            report.stats.count,
            report.stats.average_confidence * 100.0
        ));
        output
    }

    fn format_providers_human(&self, providers: &[ProviderInfo]) -> String {
        let mut output = String::new();

        output.push_str("Available Providers\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        for provider in providers {
            output.push_str(&format!(
                "{:<12} priority {:<3} threshold {:.2}  default {}\n",
                provider.name, provider.priority, provider.threshold, provider.default_version
            ));
            if !provider.manifests.is_empty() {
                output.push_str(&format!("{:<12} manifests: {}\n", "", provider.manifests.join(", ")));
            }
        }

        output
    }
}

fn confidence_bar(confidence: f64) -> String {
    let filled = ((confidence * 10.0).round() as usize).min(10);
    "\u{2588}".repeat(filled) + &"\u{2591}".repeat(10 - filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{DetectionEngine, DetectorRegistry, Evidence};
    use crate::output::{Commands, RuntimeSpec};
    use std::collections::BTreeMap;

    fn create_test_plan() -> ExecutionPlan {
        let mut environment = BTreeMap::new();
        environment.insert("PYTHONUNBUFFERED".to_string(), "1".to_string());

        ExecutionPlan {
            provider: "python".to_string(),
            runtime: RuntimeSpec {
                image: "python:3.12-slim-bookworm".to_string(),
                framework: Some("Django".to_string()),
            },
            environment,
            apt: vec!["git".to_string()],
            commands: Commands {
                setup: vec!["pip install -r requirements.txt".to_string()],
                dev: Vec::new(),
                build: Vec::new(),
                run: vec!["gunicorn app.wsgi".to_string()],
            },
            port: 8000,
            evidence: Some(
                Evidence::new("python project detected").with_files(["requirements.txt"]),
            ),
        }
    }

    fn create_test_result(language: &str, confidence: f64) -> DetectionResult {
        let mut result = DetectionResult::unmatched(language);
        result.matched = true;
        result.confidence = confidence;
        result.version = "3.12".to_string();
        result
    }

    #[test]
    fn test_plan_json_format() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let output = formatter.format_plan(&create_test_plan()).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["provider"], "python");
        assert_eq!(parsed["runtime"]["framework"], "Django");
        assert_eq!(parsed["port"], 8000);
    }

    #[test]
    fn test_plan_yaml_format() {
        let formatter = OutputFormatter::new(OutputFormat::Yaml);
        let output = formatter.format_plan(&create_test_plan()).unwrap();
        assert!(output.contains("provider: python"));
        assert!(output.contains("port: 8000"));
    }

    #[test]
    fn test_plan_human_format() {
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let output = formatter.format_plan(&create_test_plan()).unwrap();

        assert!(output.contains("\u{2713} Execution Plan"));
        assert!(output.contains("Framework:  Django"));
        assert!(output.contains("Run:   gunicorn app.wsgi"));
        assert!(output.contains("Build: (none)"));
        assert!(output.contains("PYTHONUNBUFFERED=1"));
        assert!(output.contains("Apt Packages: git"));
        assert!(!output.contains("Warnings"));
    }

    #[test]
    fn test_plan_human_warns_on_unresolved_image() {
        let mut plan = create_test_plan();
        plan.runtime.image.clear();

        let output = OutputFormatter::new(OutputFormat::Human)
            .format_plan(&plan)
            .unwrap();
        assert!(output.contains("Image:      (unresolved)"));
        assert!(output.contains("No base image found for provider 'python'"));
    }

    #[test]
    fn test_detection_report() {
        let results = vec![create_test_result("python", 0.8), create_test_result("shell", 0.3)];
        let report = DetectionReport {
            path: PathBuf::from("/srv/app"),
            stats: DetectionEngine::stats(&results),
            selected: Some("python".to_string()),
            results,
        };

        let human = OutputFormatter::new(OutputFormat::Human)
            .format_detection(&report)
            .unwrap();
        assert!(human.contains("\u{25B6} \u{2588}\u{2588}\u{2588}\u{2588}\u{2588}\u{2588}\u{2588}\u{2588}\u{2591}\u{2591} python 80%"));
        assert!(human.contains("Matched 2 provider(s)"));

        let json = OutputFormatter::new(OutputFormat::Json)
            .format_detection(&report)
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["selected"], "python");
        assert_eq!(parsed["results"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_providers_format() {
        let registry = DetectorRegistry::with_defaults();
        let providers: Vec<ProviderInfo> = registry
            .list()
            .iter()
            .map(|d| ProviderInfo::from_detector(d.as_ref()))
            .collect();

        let human = OutputFormatter::new(OutputFormat::Human)
            .format_providers(&providers)
            .unwrap();
        assert!(human.contains("node"));
        assert!(human.contains("staticfile"));

        let json = OutputFormatter::new(OutputFormat::Json)
            .format_providers(&providers)
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["name"], "node");
        assert_eq!(parsed.as_array().unwrap().len(), registry.len());
    }
}
