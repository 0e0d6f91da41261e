//! Static lookup tables consulted by the plan synthesizer
//!
//! The built-in catalog is embedded at compile time; a replacement can be
//! loaded from a TOML file with the same layout (see `PLANBOX_CATALOG`).

use crate::config::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

const BUILTIN_CATALOG: &str = include_str!("catalog.toml");

/// Port used when an ecosystem has no entry in the port table
pub const DEFAULT_PORT: u16 = 8080;

fn default_fallback_port() -> u16 {
    DEFAULT_PORT
}

/// Base images, default versions, ports and native build packages per language
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Catalog {
    #[serde(default = "default_fallback_port")]
    fallback_port: u16,
    #[serde(default)]
    ports: BTreeMap<String, u16>,
    #[serde(default)]
    default_versions: BTreeMap<String, String>,
    #[serde(default)]
    images: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    native_packages: BTreeMap<String, Vec<String>>,
}

impl Catalog {
    /// The catalog shipped with the binary
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml_str(BUILTIN_CATALOG, "<built-in>")
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::CatalogLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let catalog = Self::from_toml_str(&content, &path.display().to_string())?;
        debug!(
            path = %path.display(),
            languages = catalog.images.len(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    /// Loads `path` when given, else the built-in catalog
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::CatalogLoad {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    pub fn image(&self, language: &str, version: &str) -> Option<&str> {
        self.images
            .get(language)
            .and_then(|versions| versions.get(version))
            .map(String::as_str)
    }

    pub fn default_version(&self, language: &str) -> Option<&str> {
        self.default_versions.get(language).map(String::as_str)
    }

    /// Image for the detected version, falling back to the language's default version
    pub fn resolve_image(&self, language: &str, version: &str) -> Option<&str> {
        self.image(language, version).or_else(|| {
            let default = self.default_version(language)?;
            debug!(
                language,
                version, default, "No image for detected version, trying default"
            );
            self.image(language, default)
        })
    }

    pub fn port(&self, language: &str) -> u16 {
        self.ports
            .get(language)
            .copied()
            .unwrap_or(self.fallback_port)
    }

    pub fn native_packages(&self, language: &str) -> &[String] {
        self.native_packages
            .get(language)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.images.keys().map(String::as_str)
    }
}
