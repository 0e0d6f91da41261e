//! Static sites served by nginx

use crate::detection::metadata::StaticMetadata;
use crate::detection::spec::weighted;
use crate::detection::{
    shell_quote, DetectionContext, DetectionResult, Detector, EcosystemMetadata, EcosystemSpec,
    Evidence, Indicator, VersionPrecision,
};
use crate::error::ContentError;
use crate::output::{Commands, PlanOptions};
use tracing::debug;

/// Confidence multiplier when another ecosystem's manifest sits next to the site
pub const FOREIGN_MANIFEST_PENALTY: f64 = 0.3;

/// Primary manifests of the other detectors
pub const FOREIGN_MANIFESTS: &[&str] = &[
    "package.json",
    "deno.json",
    "deno.jsonc",
    "requirements.txt",
    "pyproject.toml",
    "setup.py",
    "Pipfile",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "composer.json",
    "Gemfile",
    "Cargo.toml",
];

const SITE_ROOTS: &[&str] = &["public", "dist", "site"];

pub static STATICFILE: EcosystemSpec = EcosystemSpec {
    name: "staticfile",
    priority: 1,
    threshold: 0.2,
    indicators: &[
        weighted(40, Indicator::File("index.html")),
        weighted(25, Indicator::Extension(&["html", "htm"])),
        weighted(20, Indicator::File("Staticfile")),
        weighted(
            15,
            Indicator::AnyFile(&["public/index.html", "dist/index.html", "site/index.html"]),
        ),
    ],
    manifests: &["Staticfile"],
    version_sources: &[],
    version_precision: VersionPrecision::MajorMinor,
    // nginx
    default_version: "1.27",
    frameworks: &[],
    excluded_dirs: &[],
};

pub struct StaticfileDetector;

impl StaticfileDetector {
    /// Applies when another ecosystem's manifest sits at the root and no Staticfile exists.
    /// Markup and asset files never offset a manifest, which is itself not an asset.
    fn penalty_applies(ctx: &DetectionContext) -> bool {
        !ctx.has_file("Staticfile") && FOREIGN_MANIFESTS.iter().any(|m| ctx.has_file(m))
    }

    /// `root:` from the Staticfile, else the directory holding the site's index
    fn site_root(ctx: &DetectionContext) -> Result<String, ContentError> {
        let configured = ctx.read_text("Staticfile")?.and_then(|text| {
            text.lines().find_map(|line| {
                line.trim()
                    .strip_prefix("root:")
                    .map(|root| root.trim().trim_matches('/').to_string())
                    .filter(|root| !root.is_empty())
            })
        });
        if let Some(root) = configured {
            return Ok(root);
        }
        if ctx.has_file("index.html") {
            return Ok(".".to_string());
        }
        Ok(SITE_ROOTS
            .iter()
            .find(|dir| ctx.has_file(&format!("{}/index.html", dir)))
            .map(|dir| dir.to_string())
            .unwrap_or_else(|| ".".to_string()))
    }

    fn metadata_of(result: &DetectionResult) -> Option<&StaticMetadata> {
        match &result.metadata {
            Some(EcosystemMetadata::Staticfile(metadata)) => Some(metadata),
            _ => None,
        }
    }
}

impl Detector for StaticfileDetector {
    fn spec(&self) -> &'static EcosystemSpec {
        &STATICFILE
    }

    fn adjust_confidence(
        &self,
        ctx: &DetectionContext,
        confidence: f64,
        _evidence: &mut Evidence,
    ) -> Result<f64, ContentError> {
        if confidence > 0.0 && Self::penalty_applies(ctx) {
            let penalized = confidence * FOREIGN_MANIFEST_PENALTY;
            debug!(
                confidence,
                penalized,
                "Static site shares the tree with another ecosystem's manifest"
            );
            return Ok(penalized);
        }
        Ok(confidence)
    }

    fn package_manager(&self, _ctx: &DetectionContext) -> Result<String, ContentError> {
        Ok(String::new())
    }

    fn metadata(
        &self,
        ctx: &DetectionContext,
        _dependencies: &[String],
    ) -> Result<Option<EcosystemMetadata>, ContentError> {
        Ok(Some(EcosystemMetadata::Staticfile(StaticMetadata {
            root: Self::site_root(ctx)?,
            config_file: ctx.has_file("Staticfile"),
            penalized: Self::penalty_applies(ctx),
        })))
    }

    fn generate_commands(&self, result: &DetectionResult, options: &PlanOptions) -> Commands {
        let root = Self::metadata_of(result)
            .map(|m| m.root.as_str())
            .unwrap_or(".");
        let commands = Commands {
            build: vec![
                "rm -rf /usr/share/nginx/html".to_string(),
                format!("cp -r {} /usr/share/nginx/html", shell_quote(root)),
            ],
            run: vec!["nginx -g 'daemon off;'".to_string()],
            ..Default::default()
        };
        options.apply(commands)
    }
}
