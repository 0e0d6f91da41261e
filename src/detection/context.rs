use super::spec::{Indicator, VersionPrecision, VersionSource, WeightedIndicator};
use super::types::Evidence;
use crate::error::ContentError;
use crate::fs::{ContentAccessor, FileEntry, FileSnapshot, JsonObject};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, OnceLock, PoisonError};

/// Inputs shared by every detector for one run
pub struct DetectionContext<'a> {
    pub path: &'a Path,
    pub files: &'a FileSnapshot,
    pub content: &'a dyn ContentAccessor,
}

impl<'a> DetectionContext<'a> {
    pub fn new(path: &'a Path, files: &'a FileSnapshot, content: &'a dyn ContentAccessor) -> Self {
        Self {
            path,
            files,
            content,
        }
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.files.has_file(path)
    }

    pub fn first_existing(&self, paths: &[&'static str]) -> Option<&'static str> {
        paths.iter().copied().find(|p| self.has_file(p))
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.files.has_dir(path)
    }

    pub fn files_with_extension<'s>(
        &'s self,
        extensions: &'s [&'s str],
    ) -> impl Iterator<Item = &'a FileEntry> + 's {
        let files: &'a FileSnapshot = self.files;
        files.files().filter(move |e| e.has_extension(extensions))
    }

    pub fn has_extension(&self, extensions: &[&str]) -> bool {
        self.files_with_extension(extensions).next().is_some()
    }

    /// Reads a file listed in the snapshot; files outside the snapshot count as absent
    pub fn read_text(&self, path: &str) -> Result<Option<String>, ContentError> {
        if !self.has_file(path) {
            return Ok(None);
        }
        self.content.read_text(path)
    }

    pub fn read_json(&self, path: &str) -> Result<Option<JsonObject>, ContentError> {
        if !self.has_file(path) {
            return Ok(None);
        }
        self.content.read_json(path)
    }

    pub fn read_toml(&self, path: &str) -> Result<Option<toml::Table>, ContentError> {
        if !self.has_file(path) {
            return Ok(None);
        }
        self.content.read_toml(path)
    }

    /// Evaluates one indicator, recording the files that satisfied it
    pub fn evaluate(
        &self,
        indicator: &WeightedIndicator,
        evidence: &mut Evidence,
    ) -> Result<bool, ContentError> {
        let satisfied = match indicator.indicator {
            Indicator::File(path) => {
                let found = self.has_file(path);
                if found {
                    evidence.add_file(path);
                }
                found
            }
            Indicator::AnyFile(paths) => {
                let found: Vec<&str> = paths.iter().copied().filter(|p| self.has_file(p)).collect();
                for path in &found {
                    evidence.add_file(*path);
                }
                !found.is_empty()
            }
            Indicator::Extension(extensions) => match self.files_with_extension(extensions).next() {
                Some(entry) => {
                    evidence.add_file(entry.path.clone());
                    true
                }
                None => false,
            },
            Indicator::Directory(path) => self.has_dir(path),
            Indicator::Contains { file, needle } => {
                let found = self
                    .read_text(file)?
                    .map(|text| text.contains(needle))
                    .unwrap_or(false);
                if found {
                    evidence.add_file(file);
                }
                found
            }
            Indicator::Matches { file, pattern } => {
                let re = table_regex(file, pattern)?;
                let found = self
                    .read_text(file)?
                    .is_some_and(|text| re.is_match(&text));
                if found {
                    evidence.add_file(file);
                }
                found
            }
            Indicator::AnyMatches { files, pattern } => {
                let re = table_regex(files.first().copied().unwrap_or_default(), pattern)?;
                let mut found = false;
                for file in files {
                    if self.read_text(file)?.is_some_and(|text| re.is_match(&text)) {
                        evidence.add_file(*file);
                        found = true;
                    }
                }
                found
            }
        };
        Ok(satisfied)
    }

    /// Tries each version source in order; the first one yielding a version wins
    pub fn version_from_sources(
        &self,
        sources: &[VersionSource],
        precision: VersionPrecision,
    ) -> Result<Option<String>, ContentError> {
        for source in sources {
            let raw = match *source {
                VersionSource::PinFile(file) => self.read_text(file)?.and_then(|text| {
                    text.lines()
                        .map(str::trim)
                        .find(|l| !l.is_empty() && !l.starts_with('#'))
                        .map(str::to_string)
                }),
                VersionSource::Pattern { file, pattern } => {
                    let re = table_regex(file, pattern)?;
                    self.read_text(file)?.and_then(|text| {
                        re.captures(&text)
                            .and_then(|c| c.get(1))
                            .map(|m| m.as_str().to_string())
                    })
                }
                VersionSource::JsonPointer { file, pointer } => self
                    .read_json(file)?
                    .and_then(|json| {
                        serde_json::Value::Object(json)
                            .pointer(pointer)
                            .and_then(|v| v.as_str())
                            .map(str::to_string)
                    }),
                VersionSource::TomlKey { file, path } => self.read_toml(file)?.and_then(|table| {
                    let mut value = table.get(*path.first()?)?;
                    for key in &path[1..] {
                        value = value.get(*key)?;
                    }
                    value.as_str().map(str::to_string)
                }),
            };

            if let Some(version) = raw.as_deref().and_then(|v| normalize_version(v, precision)) {
                return Ok(Some(version));
            }
        }
        Ok(None)
    }
}

/// Compiled form of a pattern from an ecosystem table, built once per process.
/// A pattern that does not compile is reported against `file` instead of
/// silently never matching.
pub(crate) fn table_regex(file: &str, pattern: &'static str) -> Result<Regex, ContentError> {
    static CACHE: OnceLock<Mutex<HashMap<&'static str, Regex>>> = OnceLock::new();
    let mut cache = CACHE
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(re) = cache.get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern)
        .map_err(|e| ContentError::parse(file, format!("invalid pattern {}: {}", pattern, e)))?;
    cache.insert(pattern, re.clone());
    Ok(re)
}

/// Extracts `major` or `major.minor` from a version constraint such as `^18.2.0` or `>=3.11`
pub fn normalize_version(raw: &str, precision: VersionPrecision) -> Option<String> {
    static VERSION_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = VERSION_REGEX
        .get_or_init(|| Regex::new(r"(\d+)(?:\.(\d+))?").expect("Invalid version regex"));
    let caps = re.captures(raw.trim())?;
    let major = caps.get(1)?.as_str();
    match (precision, caps.get(2)) {
        (VersionPrecision::Major, _) => Some(major.to_string()),
        (VersionPrecision::MajorMinor, Some(minor)) => Some(format!("{}.{}", major, minor.as_str())),
        (VersionPrecision::MajorMinor, None) => Some(major.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::spec::weighted;
    use crate::fs::MockContent;

    fn context<'a>(files: &'a FileSnapshot, content: &'a MockContent) -> DetectionContext<'a> {
        DetectionContext::new(Path::new("/repo"), files, content)
    }

    #[test]
    fn test_normalize_version() {
        assert_eq!(
            normalize_version("^18.2.0", VersionPrecision::Major).as_deref(),
            Some("18")
        );
        assert_eq!(
            normalize_version(">=3.11,<4", VersionPrecision::MajorMinor).as_deref(),
            Some("3.11")
        );
        assert_eq!(
            normalize_version("v20", VersionPrecision::MajorMinor).as_deref(),
            Some("20")
        );
        assert_eq!(normalize_version("stable", VersionPrecision::Major), None);
    }

    #[test]
    fn test_evaluate_records_evidence() {
        let content = MockContent::with_files(&[("package.json", "{}"), ("src/index.js", "")]);
        let files = content.snapshot();
        let ctx = context(&files, &content);
        let mut evidence = Evidence::default();

        let file = weighted(40, Indicator::File("package.json"));
        let ext = weighted(20, Indicator::Extension(&["js", "ts"]));
        let missing = weighted(10, Indicator::AnyFile(&["yarn.lock", "pnpm-lock.yaml"]));

        assert!(ctx.evaluate(&file, &mut evidence).unwrap());
        assert!(ctx.evaluate(&ext, &mut evidence).unwrap());
        assert!(!ctx.evaluate(&missing, &mut evidence).unwrap());
        assert_eq!(evidence.files(), &["package.json", "src/index.js"]);
    }

    #[test]
    fn test_contains_on_missing_file_is_false() {
        let content = MockContent::new();
        let files = content.snapshot();
        let ctx = context(&files, &content);
        let mut evidence = Evidence::default();

        let indicator = weighted(
            10,
            Indicator::Contains {
                file: "Staticfile",
                needle: "root",
            },
        );
        assert!(!ctx.evaluate(&indicator, &mut evidence).unwrap());
        assert!(evidence.files().is_empty());
    }

    #[test]
    fn test_invalid_table_pattern_is_an_error() {
        let content = MockContent::with_files(&[("go.mod", "go 1.22\n")]);
        let files = content.snapshot();
        let ctx = context(&files, &content);

        let sources = [VersionSource::Pattern {
            file: "go.mod",
            pattern: r"(?m)^go\s+(\d+",
        }];
        let err = ctx
            .version_from_sources(&sources, VersionPrecision::MajorMinor)
            .unwrap_err();
        assert_eq!(err.path(), "go.mod");
    }

    #[test]
    fn test_any_matches() {
        let content = MockContent::with_files(&[
            ("run.sh", "echo hi\n"),
            ("start.sh", "#!/usr/bin/env bash\necho hi\n"),
        ]);
        let files = content.snapshot();
        let ctx = context(&files, &content);
        let mut evidence = Evidence::default();

        let indicator = weighted(
            20,
            Indicator::AnyMatches {
                files: &["start.sh", "run.sh", "main.sh"],
                pattern: r"^#!",
            },
        );
        assert!(ctx.evaluate(&indicator, &mut evidence).unwrap());
        assert_eq!(evidence.files(), &["start.sh"]);
    }

    #[test]
    fn test_version_sources_short_circuit() {
        let content = MockContent::with_files(&[
            (".python-version", "# pinned\n3.11.4\n"),
            ("runtime.txt", "python-3.9.1"),
        ]);
        let files = content.snapshot();
        let ctx = context(&files, &content);

        let sources = [
            VersionSource::PinFile(".python-version"),
            VersionSource::Pattern {
                file: "runtime.txt",
                pattern: r"python-(\d+\.\d+)",
            },
        ];
        let version = ctx
            .version_from_sources(&sources, VersionPrecision::MajorMinor)
            .unwrap();
        assert_eq!(version.as_deref(), Some("3.11"));
    }

    #[test]
    fn test_version_from_json_and_toml() {
        let content = MockContent::with_files(&[
            ("package.json", r#"{"engines": {"node": ">=20.1"}}"#),
            ("Cargo.toml", "[package]\nrust-version = \"1.78\"\n"),
        ]);
        let files = content.snapshot();
        let ctx = context(&files, &content);

        let node = ctx
            .version_from_sources(
                &[VersionSource::JsonPointer {
                    file: "package.json",
                    pointer: "/engines/node",
                }],
                VersionPrecision::Major,
            )
            .unwrap();
        assert_eq!(node.as_deref(), Some("20"));

        let rust = ctx
            .version_from_sources(
                &[VersionSource::TomlKey {
                    file: "Cargo.toml",
                    path: &["package", "rust-version"],
                }],
                VersionPrecision::MajorMinor,
            )
            .unwrap();
        assert_eq!(rust.as_deref(), Some("1.78"));
    }

    #[test]
    fn test_unparseable_version_falls_through() {
        let content = MockContent::with_files(&[("rust-toolchain", "stable\n")]);
        let files = content.snapshot();
        let ctx = context(&files, &content);

        let version = ctx
            .version_from_sources(
                &[VersionSource::PinFile("rust-toolchain")],
                VersionPrecision::MajorMinor,
            )
            .unwrap();
        assert!(version.is_none());
    }
}
