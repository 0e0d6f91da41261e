use super::detector::Detector;
use crate::ecosystems;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Ordered, immutable name → detector lookup
#[derive(Clone)]
pub struct DetectorRegistry {
    detectors: Vec<Arc<dyn Detector>>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    /// Every built-in ecosystem, in selection tie-break order
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ecosystems::NodeDetector));
        registry.register(Arc::new(ecosystems::DenoDetector));
        registry.register(Arc::new(ecosystems::PythonDetector));
        registry.register(Arc::new(ecosystems::GoDetector));
        registry.register(Arc::new(ecosystems::JavaDetector));
        registry.register(Arc::new(ecosystems::PhpDetector));
        registry.register(Arc::new(ecosystems::RubyDetector));
        registry.register(Arc::new(ecosystems::RustDetector));
        registry.register(Arc::new(ecosystems::ShellDetector));
        registry.register(Arc::new(ecosystems::StaticfileDetector));
        registry
    }

    /// Appends a detector; a later detector with a duplicate name is unreachable through `get`
    pub fn register(&mut self, detector: Arc<dyn Detector>) {
        self.detectors.push(detector);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Detector>> {
        self.detectors
            .iter()
            .find(|d| d.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Position of the detector in registration order
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.detectors
            .iter()
            .position(|d| d.name().eq_ignore_ascii_case(name))
    }

    pub fn list(&self) -> &[Arc<dyn Detector>] {
        &self.detectors
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn all_excluded_dirs(&self) -> Vec<&'static str> {
        let mut set = BTreeSet::new();
        for detector in &self.detectors {
            set.extend(detector.spec().excluded_dirs.iter().copied());
        }
        set.extend([".git", ".idea", ".vscode"]);
        set.into_iter().collect()
    }

    /// Primary manifests of every detector except `name`
    pub fn foreign_manifests(&self, name: &str) -> Vec<&'static str> {
        self.detectors
            .iter()
            .filter(|d| !d.name().eq_ignore_ascii_case(name))
            .flat_map(|d| d.spec().manifests.iter().copied())
            .collect()
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
