//! Ecosystem-specific facts attached to a detection result

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(default)]
    pub workspaces: bool,
    #[serde(default)]
    pub typescript: bool,
    #[serde(default)]
    pub native_modules: Vec<String>,
}

impl NodeMetadata {
    pub fn has_script(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenoMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    #[serde(default)]
    pub tasks: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PythonMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wsgi_module: Option<String>,
    #[serde(default)]
    pub manage_py: bool,
    #[serde(default)]
    pub native_packages: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default)]
    pub main_package: String,
    #[serde(default)]
    pub cgo: bool,
    #[serde(default)]
    pub workspace: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JvmMetadata {
    #[serde(default)]
    pub build_tool: String,
    #[serde(default)]
    pub wrapper: bool,
    #[serde(default)]
    pub kotlin: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhpMetadata {
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_root: Option<String>,
    #[serde(default)]
    pub artisan: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubyMetadata {
    #[serde(default)]
    pub rack: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    #[serde(default)]
    pub native_gems: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RustMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
    #[serde(default)]
    pub workspace: bool,
    #[serde(default)]
    pub native_crates: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    #[serde(default)]
    pub interpreter: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticMetadata {
    #[serde(default)]
    pub root: String,
    #[serde(default)]
    pub config_file: bool,
    #[serde(default)]
    pub penalized: bool,
}

/// Per-ecosystem metadata, tagged by ecosystem name when serialized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ecosystem", rename_all = "lowercase")]
pub enum EcosystemMetadata {
    Node(NodeMetadata),
    Deno(DenoMetadata),
    Python(PythonMetadata),
    Go(GoMetadata),
    Java(JvmMetadata),
    Php(PhpMetadata),
    Ruby(RubyMetadata),
    Rust(RustMetadata),
    Shell(ShellMetadata),
    Staticfile(StaticMetadata),
}

fn flag(key: &'static str, value: bool) -> Option<(&'static str, String)> {
    value.then(|| (key, "true".to_string()))
}

fn opt(key: &'static str, value: &Option<String>) -> Option<(&'static str, String)> {
    value.as_ref().map(|v| (key, v.clone()))
}

fn list(key: &'static str, values: &[String]) -> Option<(&'static str, String)> {
    (!values.is_empty()).then(|| (key, values.join(", ")))
}

impl EcosystemMetadata {
    /// Flattened key/value view for display and lookups
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let entries = match self {
            EcosystemMetadata::Node(m) => vec![
                opt("main", &m.main),
                list("scripts", &m.scripts.keys().cloned().collect::<Vec<_>>()),
                flag("workspaces", m.workspaces),
                flag("typescript", m.typescript),
                list("native_modules", &m.native_modules),
            ],
            EcosystemMetadata::Deno(m) => vec![
                opt("config_file", &m.config_file),
                opt("entrypoint", &m.entrypoint),
                list("tasks", &m.tasks.keys().cloned().collect::<Vec<_>>()),
            ],
            EcosystemMetadata::Python(m) => vec![
                opt("entrypoint", &m.entrypoint),
                opt("wsgi_module", &m.wsgi_module),
                flag("manage_py", m.manage_py),
                list("native_packages", &m.native_packages),
            ],
            EcosystemMetadata::Go(m) => vec![
                opt("module", &m.module),
                Some(("main_package", m.main_package.clone())),
                flag("cgo", m.cgo),
                flag("workspace", m.workspace),
            ],
            EcosystemMetadata::Java(m) => vec![
                Some(("build_tool", m.build_tool.clone())),
                flag("wrapper", m.wrapper),
                flag("kotlin", m.kotlin),
            ],
            EcosystemMetadata::Php(m) => vec![
                list("extensions", &m.extensions),
                opt("document_root", &m.document_root),
                flag("artisan", m.artisan),
            ],
            EcosystemMetadata::Ruby(m) => vec![
                flag("rack", m.rack),
                opt("entrypoint", &m.entrypoint),
                list("native_gems", &m.native_gems),
            ],
            EcosystemMetadata::Rust(m) => vec![
                opt("binary", &m.binary),
                flag("workspace", m.workspace),
                list("native_crates", &m.native_crates),
            ],
            EcosystemMetadata::Shell(m) => vec![
                opt("entrypoint", &m.entrypoint),
                Some(("interpreter", m.interpreter.clone())),
            ],
            EcosystemMetadata::Staticfile(m) => vec![
                Some(("root", m.root.clone())),
                flag("config_file", m.config_file),
                flag("penalized", m.penalized),
            ],
        };
        entries.into_iter().flatten().collect()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries()
            .into_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}
