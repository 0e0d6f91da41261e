//! Declarative description of an ecosystem detector
//!
//! Each ecosystem is mostly data: a weighted indicator table, an ordered list of
//! version sources and a framework dictionary evaluated in priority order. The
//! generic detection routine in [`super::detector`] interprets these tables.

/// A boolean check against the file snapshot or a file's contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Exact relative path exists
    File(&'static str),
    /// Any of the relative paths exists
    AnyFile(&'static [&'static str]),
    /// Any file anywhere in the snapshot has one of these extensions
    Extension(&'static [&'static str]),
    /// Directory exists
    Directory(&'static str),
    /// File exists and contains the needle
    Contains {
        file: &'static str,
        needle: &'static str,
    },
    /// File exists and matches the regex
    Matches {
        file: &'static str,
        pattern: &'static str,
    },
    /// Any of the files exists and matches the regex
    AnyMatches {
        files: &'static [&'static str],
        pattern: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightedIndicator {
    pub weight: u32,
    pub indicator: Indicator,
}

pub const fn weighted(weight: u32, indicator: Indicator) -> WeightedIndicator {
    WeightedIndicator { weight, indicator }
}

/// Where to look for a runtime version, tried in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
    /// First non-empty, non-comment line of a version pin file
    PinFile(&'static str),
    /// First capture group of a regex over a file
    Pattern {
        file: &'static str,
        pattern: &'static str,
    },
    /// String at a JSON pointer (e.g. `/engines/node`)
    JsonPointer {
        file: &'static str,
        pointer: &'static str,
    },
    /// String at a dotted TOML key path
    TomlKey {
        file: &'static str,
        path: &'static [&'static str],
    },
}

/// How much of a detected version string is kept for catalog lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionPrecision {
    Major,
    MajorMinor,
}

/// Framework dictionary entry. A trailing `*` in `dependency` means prefix match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameworkRule {
    pub dependency: &'static str,
    pub framework: &'static str,
}

pub const fn framework(dependency: &'static str, framework: &'static str) -> FrameworkRule {
    FrameworkRule {
        dependency,
        framework,
    }
}

impl FrameworkRule {
    pub fn matches(&self, dependency: &str) -> bool {
        match self.dependency.strip_suffix('*') {
            Some(prefix) => dependency.starts_with(prefix),
            None => dependency.eq_ignore_ascii_case(self.dependency),
        }
    }
}

#[derive(Debug)]
pub struct EcosystemSpec {
    /// Registry name, also reported as the result's language
    pub name: &'static str,
    pub priority: u8,
    /// Minimum confidence for `matched = true`
    pub threshold: f64,
    pub indicators: &'static [WeightedIndicator],
    /// Primary manifests; other detectors treat them as foreign-ecosystem evidence
    pub manifests: &'static [&'static str],
    pub version_sources: &'static [VersionSource],
    pub version_precision: VersionPrecision,
    pub default_version: &'static str,
    /// Ordered most specific first
    pub frameworks: &'static [FrameworkRule],
    pub excluded_dirs: &'static [&'static str],
}

impl EcosystemSpec {
    pub fn total_weight(&self) -> u32 {
        self.indicators.iter().map(|i| i.weight).sum()
    }

    /// First framework, in dictionary order, whose dependency is present
    pub fn match_framework<S: AsRef<str>>(&self, dependencies: &[S]) -> Option<&'static str> {
        self.frameworks
            .iter()
            .find(|rule| dependencies.iter().any(|d| rule.matches(d.as_ref())))
            .map(|rule| rule.framework)
    }
}
