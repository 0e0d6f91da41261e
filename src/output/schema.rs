use crate::detection::Evidence;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

/// Shell commands for each lifecycle phase, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commands {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub setup: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub dev: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub build: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub run: Vec<String>,
}

impl Commands {
    pub fn is_empty(&self) -> bool {
        self.setup.is_empty() && self.dev.is_empty() && self.build.is_empty() && self.run.is_empty()
    }
}

/// User-supplied overrides for generated commands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOptions {
    pub install_command: Option<String>,
    pub build_command: Option<String>,
    pub start_command: Option<String>,
}

impl PlanOptions {
    /// Replaces setup/build/run with the configured overrides
    pub fn apply(&self, mut commands: Commands) -> Commands {
        if let Some(install) = &self.install_command {
            commands.setup = vec![install.clone()];
        }
        if let Some(build) = &self.build_command {
            commands.build = vec![build.clone()];
        }
        if let Some(start) = &self.start_command {
            commands.run = vec![start.clone()];
        }
        commands
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSpec {
    /// Empty when no catalog entry matched
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
}

/// Deployment plan synthesized for the selected ecosystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub provider: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub runtime: RuntimeSpec,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub apt: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub commands: Commands,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,
}

/// Non-fatal conditions a formatter should surface alongside the plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanWarning {
    UnresolvedBaseImage { provider: String },
    NoRunCommand,
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanWarning::UnresolvedBaseImage { provider } => {
                write!(f, "No base image found for provider '{}'", provider)
            }
            PlanWarning::NoRunCommand => write!(f, "No run command could be determined"),
        }
    }
}

impl ExecutionPlan {
    pub fn warnings(&self) -> Vec<PlanWarning> {
        let mut warnings = Vec::new();
        if self.runtime.image.is_empty() {
            warnings.push(PlanWarning::UnresolvedBaseImage {
                provider: self.provider.clone(),
            });
        }
        if self.commands.run.is_empty() {
            warnings.push(PlanWarning::NoRunCommand);
        }
        warnings
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize ExecutionPlan to JSON")
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize ExecutionPlan to YAML")
    }
}

impl fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_yaml() {
            Ok(yaml) => write!(f, "{}", yaml),
            Err(e) => write!(f, "Error formatting ExecutionPlan: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_plan() -> ExecutionPlan {
        let mut environment = BTreeMap::new();
        environment.insert("NODE_ENV".to_string(), "production".to_string());

        ExecutionPlan {
            provider: "node".to_string(),
            runtime: RuntimeSpec {
                image: "node:22-bookworm-slim".to_string(),
                framework: Some("Express".to_string()),
            },
            environment,
            apt: vec!["build-essential".to_string(), "python3".to_string()],
            commands: Commands {
                setup: vec!["npm ci".to_string()],
                dev: vec!["npm run dev".to_string()],
                build: vec!["npm run build".to_string()],
                run: vec!["npm start".to_string()],
            },
            port: 3000,
            evidence: Some(
                Evidence::new("node project detected").with_files(["package.json", "index.js"]),
            ),
        }
    }

    #[test]
    fn test_json_round_trip() {
        let plan = create_plan();
        let json = plan.to_json().unwrap();
        let back: ExecutionPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(back, plan);
    }

    #[test]
    fn test_yaml_round_trip() {
        let plan = create_plan();
        let yaml = plan.to_yaml().unwrap();
        let back: ExecutionPlan = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, plan);
    }

    #[test]
    fn test_evidence_omitted_when_none() {
        let mut plan = create_plan();
        plan.evidence = None;
        let json = plan.to_json().unwrap();
        assert!(!json.contains("evidence"));
    }

    #[test]
    fn test_deserialize_with_nulls() {
        let json = r#"{
            "provider": "go",
            "runtime": null,
            "environment": null,
            "apt": null,
            "commands": {"setup": null, "run": ["./app"]},
            "port": 8080
        }"#;

        let plan: ExecutionPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.runtime.image, "");
        assert!(plan.environment.is_empty());
        assert!(plan.commands.setup.is_empty());
        assert_eq!(plan.commands.run, vec!["./app"]);
    }

    #[test]
    fn test_warnings() {
        let mut plan = create_plan();
        assert!(plan.warnings().is_empty());

        plan.runtime.image.clear();
        plan.commands.run.clear();
        let warnings = plan.warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].to_string().contains("node"));
    }

    #[test]
    fn test_plan_options_override() {
        let options = PlanOptions {
            install_command: None,
            build_command: Some("make".to_string()),
            start_command: Some("./run".to_string()),
        };
        let commands = options.apply(create_plan().commands);
        assert_eq!(commands.setup, vec!["npm ci"]);
        assert_eq!(commands.build, vec!["make"]);
        assert_eq!(commands.run, vec!["./run"]);
    }

    #[test]
    fn test_display_is_yaml() {
        let display = format!("{}", create_plan());
        assert!(display.contains("provider: node"));
        assert!(display.contains("image: node:22-bookworm-slim"));
    }
}
