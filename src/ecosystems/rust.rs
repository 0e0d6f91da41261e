//! Rust (Cargo)

use super::parsers::{toml_dependencies, toml_str_at};
use crate::detection::metadata::RustMetadata;
use crate::detection::spec::{framework, weighted};
use crate::detection::{
    shell_quote, DetectionContext, DetectionResult, Detector, EcosystemMetadata, EcosystemSpec,
    Indicator, VersionPrecision, VersionSource,
};
use crate::error::ContentError;
use crate::output::{Commands, PlanOptions};
use std::collections::BTreeMap;

/// Crates that link against system C libraries
pub const NATIVE_CRATES: &[&str] = &[
    "openssl",
    "openssl-sys",
    "native-tls",
    "rusqlite",
    "libsqlite3-sys",
    "rdkafka",
];

pub static RUST: EcosystemSpec = EcosystemSpec {
    name: "rust",
    priority: 20,
    threshold: 0.3,
    indicators: &[
        weighted(50, Indicator::File("Cargo.toml")),
        weighted(15, Indicator::File("Cargo.lock")),
        weighted(25, Indicator::Extension(&["rs"])),
        weighted(10, Indicator::AnyFile(&["rust-toolchain.toml", "rust-toolchain"])),
    ],
    manifests: &["Cargo.toml"],
    version_sources: &[
        VersionSource::TomlKey {
            file: "rust-toolchain.toml",
            path: &["toolchain", "channel"],
        },
        VersionSource::PinFile("rust-toolchain"),
        VersionSource::TomlKey {
            file: "Cargo.toml",
            path: &["package", "rust-version"],
        },
        VersionSource::TomlKey {
            file: "Cargo.toml",
            path: &["workspace", "package", "rust-version"],
        },
    ],
    version_precision: VersionPrecision::MajorMinor,
    default_version: "1.83",
    frameworks: &[
        framework("axum", "Axum"),
        framework("actix-web", "Actix Web"),
        framework("rocket", "Rocket"),
        framework("warp", "Warp"),
        framework("poem", "Poem"),
    ],
    excluded_dirs: &["target"],
};

pub struct RustDetector;

impl RustDetector {
    fn metadata_of(result: &DetectionResult) -> Option<&RustMetadata> {
        match &result.metadata {
            Some(EcosystemMetadata::Rust(metadata)) => Some(metadata),
            _ => None,
        }
    }

    /// First `[[bin]]` target, else the package name
    fn binary_name(manifest: &toml::Table) -> Option<String> {
        let bin = manifest
            .get("bin")
            .and_then(|v| v.as_array())
            .and_then(|bins| bins.first())
            .and_then(|bin| bin.get("name"))
            .and_then(|name| name.as_str());
        bin.or_else(|| toml_str_at(manifest, &["package", "name"]))
            .map(str::to_string)
    }
}

impl Detector for RustDetector {
    fn spec(&self) -> &'static EcosystemSpec {
        &RUST
    }

    fn dependencies(&self, ctx: &DetectionContext) -> Result<Vec<String>, ContentError> {
        Ok(ctx
            .read_toml("Cargo.toml")?
            .map(|manifest| {
                toml_dependencies(
                    &manifest,
                    &[
                        &["dependencies"],
                        &["dev-dependencies"],
                        &["workspace", "dependencies"],
                    ],
                )
            })
            .unwrap_or_default())
    }

    fn package_manager(&self, _ctx: &DetectionContext) -> Result<String, ContentError> {
        Ok("cargo".to_string())
    }

    fn metadata(
        &self,
        ctx: &DetectionContext,
        dependencies: &[String],
    ) -> Result<Option<EcosystemMetadata>, ContentError> {
        let manifest = ctx.read_toml("Cargo.toml")?.unwrap_or_default();
        let native_crates = dependencies
            .iter()
            .filter(|d| NATIVE_CRATES.contains(&d.as_str()))
            .cloned()
            .collect();

        Ok(Some(EcosystemMetadata::Rust(RustMetadata {
            binary: Self::binary_name(&manifest),
            workspace: manifest.contains_key("workspace"),
            native_crates,
        })))
    }

    fn generate_commands(&self, result: &DetectionResult, options: &PlanOptions) -> Commands {
        let binary = Self::metadata_of(result).and_then(|m| m.binary.as_deref());

        let mut commands = Commands {
            setup: vec!["cargo fetch --locked".to_string()],
            dev: vec!["cargo run".to_string()],
            ..Default::default()
        };
        match binary {
            Some(bin) => {
                commands
                    .build
                    .push(format!("cargo build --release --bin {}", shell_quote(bin)));
                commands
                    .run
                    .push(shell_quote(&format!("./target/release/{}", bin)));
            }
            None => commands.build.push("cargo build --release".to_string()),
        }

        if !result.evidence.files().iter().any(|f| f == "Cargo.lock") {
            commands.setup = vec!["cargo fetch".to_string()];
        }

        options.apply(commands)
    }

    fn generate_environment(&self, _result: &DetectionResult) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("RUST_LOG".to_string(), "info".to_string());
        env
    }

    fn needs_native_compilation(&self, result: &DetectionResult) -> bool {
        Self::metadata_of(result)
            .map(|m| !m.native_crates.is_empty())
            .unwrap_or(false)
    }
}
