//! Shell-script applications

use crate::detection::metadata::ShellMetadata;
use crate::detection::spec::weighted;
use crate::detection::{
    shell_quote, DetectionContext, DetectionResult, Detector, EcosystemMetadata, EcosystemSpec,
    Indicator, VersionPrecision,
};
use crate::error::ContentError;
use crate::output::{Commands, PlanOptions};

const ENTRY_SCRIPTS: &[&str] = &["start.sh", "run.sh", "main.sh", "entrypoint.sh"];

pub static SHELL: EcosystemSpec = EcosystemSpec {
    name: "shell",
    priority: 5,
    threshold: 0.3,
    indicators: &[
        weighted(50, Indicator::AnyFile(ENTRY_SCRIPTS)),
        weighted(30, Indicator::Extension(&["sh", "bash"])),
        weighted(
            20,
            Indicator::AnyMatches {
                files: ENTRY_SCRIPTS,
                pattern: r"\A#!",
            },
        ),
    ],
    manifests: &[],
    version_sources: &[],
    version_precision: VersionPrecision::Major,
    // Debian release of the base image
    default_version: "12",
    frameworks: &[],
    excluded_dirs: &[],
};

/// Interpreter named by a shebang line (`#!/usr/bin/env bash` → `bash`)
pub fn shebang_interpreter(script: &str) -> Option<String> {
    let line = script.lines().next()?.strip_prefix("#!")?.trim();
    let mut parts = line.split_whitespace();
    let program = parts.next()?;
    let program = if program.ends_with("/env") {
        parts.find(|p| !p.starts_with('-'))?
    } else {
        program
    };
    program.rsplit('/').next().map(str::to_string)
}

pub struct ShellDetector;

impl ShellDetector {
    fn metadata_of(result: &DetectionResult) -> Option<&ShellMetadata> {
        match &result.metadata {
            Some(EcosystemMetadata::Shell(metadata)) => Some(metadata),
            _ => None,
        }
    }
}

impl Detector for ShellDetector {
    fn spec(&self) -> &'static EcosystemSpec {
        &SHELL
    }

    fn metadata(
        &self,
        ctx: &DetectionContext,
        _dependencies: &[String],
    ) -> Result<Option<EcosystemMetadata>, ContentError> {
        let entrypoint = ctx.first_existing(ENTRY_SCRIPTS).map(str::to_string).or_else(|| {
            ctx.files_with_extension(&["sh", "bash"])
                .find(|e| e.depth() == 0)
                .map(|e| e.path.clone())
        });

        let interpreter = match &entrypoint {
            Some(entry) => ctx
                .read_text(entry)?
                .and_then(|text| shebang_interpreter(&text)),
            None => None,
        }
        .unwrap_or_else(|| "bash".to_string());

        Ok(Some(EcosystemMetadata::Shell(ShellMetadata {
            entrypoint,
            interpreter,
        })))
    }

    fn generate_commands(&self, result: &DetectionResult, options: &PlanOptions) -> Commands {
        let mut commands = Commands::default();
        if let Some(metadata) = Self::metadata_of(result) {
            if let Some(entry) = &metadata.entrypoint {
                let entry = shell_quote(entry);
                commands.build.push(format!("chmod +x {}", entry));
                commands.run.push(format!("{} {}", metadata.interpreter, entry));
            }
        }
        options.apply(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockContent;
    use std::path::Path;

    fn detect(files: &[(&str, &str)]) -> DetectionResult {
        let content = MockContent::with_files(files);
        ShellDetector
            .detect(Path::new("/repo"), &content.snapshot(), &content)
            .unwrap()
    }

    #[test]
    fn test_shebang_interpreter() {
        assert_eq!(shebang_interpreter("#!/bin/sh\necho").as_deref(), Some("sh"));
        assert_eq!(shebang_interpreter("#!/usr/bin/env bash").as_deref(), Some("bash"));
        assert_eq!(shebang_interpreter("#!/usr/bin/env -S zsh -e").as_deref(), Some("zsh"));
        assert_eq!(shebang_interpreter("echo hi"), None);
    }

    #[test]
    fn test_start_script() {
        let result = detect(&[("start.sh", "#!/bin/sh\nexec ./server\n")]);

        assert!(result.matched);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.version, "12");
        assert!(result.package_manager.is_empty());

        let commands = ShellDetector.generate_commands(&result, &PlanOptions::default());
        assert_eq!(commands.build, vec!["chmod +x start.sh"]);
        assert_eq!(commands.run, vec!["sh start.sh"]);
    }

    #[test]
    fn test_loose_script_at_root() {
        let result = detect(&[("deploy.sh", "echo deploy")]);

        assert!(result.matched);
        assert!((result.confidence - 0.3).abs() < 1e-9);
        let commands = ShellDetector.generate_commands(&result, &PlanOptions::default());
        assert_eq!(commands.run, vec!["bash deploy.sh"]);
    }

    #[test]
    fn test_no_scripts() {
        let result = detect(&[("README.md", "")]);
        assert!(!result.matched);
        assert!(ShellDetector.generate_commands(&result, &PlanOptions::default()).is_empty());
    }
}
