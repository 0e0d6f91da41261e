use super::commands::{DetectArgs, PlanArgs, ProvidersArgs};
use super::output::{DetectionReport, OutputFormat, OutputFormatter, ProviderInfo};
use crate::config::PlanboxConfig;
use crate::detection::DetectionEngine;
use crate::error::PlanError;
use crate::output::PlanOptions;
use crate::pipeline::{Detection, PlanPipeline, PlanRequest};
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Exit code for a failed command: 1 when nothing was detected, 2 otherwise
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<PlanError>()
        .map(PlanError::exit_code)
        .unwrap_or(2)
}

pub async fn handle_plan(args: &PlanArgs, config: &PlanboxConfig, quiet: bool) -> i32 {
    match run_plan(args, config, quiet).await {
        Ok(()) => 0,
        Err(e) => report_failure("Planning", &e),
    }
}

pub async fn handle_detect(args: &DetectArgs, config: &PlanboxConfig) -> i32 {
    match run_detect(args, config).await {
        Ok(()) => 0,
        Err(e) => report_failure("Detection", &e),
    }
}

pub fn handle_providers(args: &ProvidersArgs, config: &PlanboxConfig) -> i32 {
    match run_providers(args, config) {
        Ok(()) => 0,
        Err(e) => report_failure("Listing providers", &e),
    }
}

fn report_failure(action: &str, err: &anyhow::Error) -> i32 {
    let code = exit_code(err);
    error!("{} failed: {:#}", action, err);
    eprintln!("Error: {:#}", err);
    code
}

fn resolve_path(path: Option<&PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.clone()),
        None => env::current_dir().context("Failed to get current directory"),
    }
}

fn build_pipeline(config: &PlanboxConfig) -> Result<PlanPipeline> {
    config.validate()?;
    Ok(PlanPipeline::new(config)?)
}

async fn run_plan(args: &PlanArgs, config: &PlanboxConfig, quiet: bool) -> Result<()> {
    let path = resolve_path(args.path.as_ref())?;
    debug!("Project path: {}", path.display());

    let pipeline = build_pipeline(config)?;
    let request = PlanRequest {
        provider: args.provider.clone(),
        options: PlanOptions {
            install_command: args.install_cmd.clone(),
            build_command: args.build_cmd.clone(),
            start_command: args.start_cmd.clone(),
        },
    };

    let analysis = pipeline.analyze(&path, &request).await?;
    for warning in analysis.plan.warnings() {
        warn!("{}", warning);
    }

    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    let output = formatter.format_plan(&analysis.plan)?;
    write_output(&output, args.output.as_deref(), quiet)
}

async fn run_detect(args: &DetectArgs, config: &PlanboxConfig) -> Result<()> {
    let path = resolve_path(args.path.as_ref())?;
    let pipeline = build_pipeline(config)?;

    let detection = pipeline.detect(&path, args.provider.as_deref()).await?;
    if detection.results.is_empty() {
        return Err(PlanError::NoLanguageDetected(detection.scan.root).into());
    }

    let report = detection_report(&pipeline, detection, args.min_confidence);

    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    println!("{}", formatter.format_detection(&report)?);
    Ok(())
}

/// Report over the results at or above `min_confidence`; the selected
/// provider is chosen among those same results
fn detection_report(
    pipeline: &PlanPipeline,
    detection: Detection,
    min_confidence: f64,
) -> DetectionReport {
    let results = DetectionEngine::filter(&detection.results, min_confidence);
    let selected = pipeline
        .engine()
        .best_result(&results)
        .map(|r| r.language.clone());
    DetectionReport {
        path: detection.scan.root,
        stats: DetectionEngine::stats(&results),
        selected,
        results,
    }
}

fn run_providers(args: &ProvidersArgs, config: &PlanboxConfig) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let providers: Vec<ProviderInfo> = pipeline
        .registry()
        .list()
        .iter()
        .map(|d| ProviderInfo::from_detector(d.as_ref()))
        .collect();

    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    println!("{}", formatter.format_providers(&providers)?);
    Ok(())
}

fn write_output(output: &str, file: Option<&Path>, quiet: bool) -> Result<()> {
    match file {
        Some(file) => {
            fs::write(file, output)
                .with_context(|| format!("Failed to write output to {}", file.display()))?;
            info!("Output written to: {}", file.display());
            if !quiet {
                println!("Output written to: {}", file.display());
            }
        }
        None => println!("{}", output),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn test_exit_code_mapping() {
        let not_found: anyhow::Error = PlanError::NoLanguageDetected(PathBuf::from("/repo")).into();
        assert_eq!(exit_code(&not_found), 1);

        let unknown: anyhow::Error = PlanError::UnknownProvider("cobol".into()).into();
        assert_eq!(exit_code(&unknown), 2);

        let config: anyhow::Error = ConfigError::ValidationFailed("bad".into()).into();
        assert_eq!(exit_code(&config), 2);
    }

    #[test]
    fn test_exit_code_survives_context() {
        let err = anyhow::Error::from(PlanError::NoLanguageDetected(PathBuf::from("/repo")))
            .context("while planning");
        assert_eq!(exit_code(&err), 1);
    }

    #[tokio::test]
    async fn test_selected_provider_respects_min_confidence() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("index.php"), "<?php echo 'hi';").unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        fs::write(dir.path().join("about.html"), "<html></html>").unwrap();

        let pipeline = PlanPipeline::new(&PlanboxConfig::default()).unwrap();
        let detection = pipeline.detect(dir.path(), None).await.unwrap();
        let php = detection
            .results
            .iter()
            .find(|r| r.language == "php")
            .map(|r| r.confidence)
            .unwrap();

        let all = detection_report(&pipeline, detection.clone(), 0.0);
        assert_eq!(all.selected.as_deref(), Some("php"));

        let filtered = detection_report(&pipeline, detection, php + 0.01);
        assert!(filtered.results.iter().all(|r| r.language != "php"));
        assert_eq!(filtered.selected.as_deref(), Some("staticfile"));
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("plan.json");

        write_output("{}", Some(&file), true).unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "{}");
    }
}
