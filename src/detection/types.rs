use super::metadata::EcosystemMetadata;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Marker appended to an evidence reason when the project is under version control
pub const VERSION_CONTROL_MARKER: &str = "version-controlled (git)";

/// Supporting files and rationale behind a detection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(default, deserialize_with = "deserialize_unique")]
    files: Vec<String>,
    #[serde(default)]
    reason: String,
}

fn deserialize_unique<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    let mut files = Vec::with_capacity(raw.len());
    for file in raw {
        if !files.contains(&file) {
            files.push(file);
        }
    }
    Ok(files)
}

impl Evidence {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            files: Vec::new(),
            reason: reason.into(),
        }
    }

    /// Adds a file, keeping first-seen order and ignoring duplicates
    pub fn add_file(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.files.contains(&path) {
            self.files.push(path);
        }
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for file in files {
            self.add_file(file);
        }
        self
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn set_reason(&mut self, reason: impl Into<String>) {
        self.reason = reason.into();
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.reason.is_empty()
    }

    pub fn mark_version_controlled(&mut self) {
        if self.is_version_controlled() {
            return;
        }
        if self.reason.is_empty() {
            self.reason = VERSION_CONTROL_MARKER.to_string();
        } else {
            self.reason = format!("{}; {}", self.reason, VERSION_CONTROL_MARKER);
        }
    }

    pub fn is_version_controlled(&self) -> bool {
        self.reason.contains(VERSION_CONTROL_MARKER)
    }
}

/// Outcome of one detector run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub matched: bool,
    pub language: String,
    #[serde(default)]
    pub framework: String,
    pub confidence: f64,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub package_manager: String,
    #[serde(default)]
    pub build_tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EcosystemMetadata>,
    #[serde(default)]
    pub evidence: Evidence,
}

impl DetectionResult {
    pub fn unmatched(language: impl Into<String>) -> Self {
        Self {
            matched: false,
            language: language.into(),
            framework: String::new(),
            confidence: 0.0,
            version: String::new(),
            package_manager: String::new(),
            build_tools: Vec::new(),
            metadata: None,
            evidence: Evidence::default(),
        }
    }

    pub fn framework(&self) -> Option<&str> {
        if self.framework.is_empty() {
            None
        } else {
            Some(&self.framework)
        }
    }
}

impl fmt::Display for DetectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.language)?;
        if let Some(framework) = self.framework() {
            write!(f, " ({})", framework)?;
        }
        write!(f, " {:.0}%", self.confidence * 100.0)
    }
}
