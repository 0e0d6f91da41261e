//! Manifest dependency extraction shared by the ecosystem detectors

use crate::fs::JsonObject;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Ordered, de-duplicated dependency names
#[derive(Debug, Default)]
pub struct DependencySet {
    names: Vec<String>,
    seen: HashSet<String>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name.is_empty() || self.seen.contains(&name) {
            return;
        }
        self.seen.insert(name.clone());
        self.names.push(name);
    }

    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.push(name);
        }
    }

    pub fn into_vec(self) -> Vec<String> {
        self.names
    }
}

/// Keys of each JSON object section, e.g. `dependencies` and `devDependencies`
pub fn json_dependencies(json: &JsonObject, sections: &[&str]) -> Vec<String> {
    let mut deps = DependencySet::new();
    for section in sections {
        if let Some(object) = json.get(*section).and_then(|v| v.as_object()) {
            deps.extend(object.keys().cloned());
        }
    }
    deps.into_vec()
}

/// Keys of the TOML tables found at each dotted path
pub fn toml_dependencies(table: &toml::Table, sections: &[&[&str]]) -> Vec<String> {
    let mut deps = DependencySet::new();
    for path in sections {
        if let Some(section) = toml_table_at(table, path) {
            deps.extend(section.keys().cloned());
        }
    }
    deps.into_vec()
}

pub fn toml_table_at<'t>(table: &'t toml::Table, path: &[&str]) -> Option<&'t toml::Table> {
    let (first, rest) = path.split_first()?;
    let mut current = table.get(*first)?.as_table()?;
    for key in rest {
        current = current.get(*key)?.as_table()?;
    }
    Some(current)
}

pub fn toml_str_at<'t>(table: &'t toml::Table, path: &[&str]) -> Option<&'t str> {
    let (last, parents) = path.split_last()?;
    let parent = if parents.is_empty() {
        table
    } else {
        toml_table_at(table, parents)?
    };
    parent.get(*last)?.as_str()
}

/// First capture group of `pattern` on every non-comment line
pub fn line_dependencies(content: &str, pattern: &Regex) -> Vec<String> {
    let mut deps = DependencySet::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        if let Some(name) = pattern.captures(line).and_then(|c| c.get(1)) {
            deps.push(name.as_str());
        }
    }
    deps.into_vec()
}

/// Package names from a pip requirements file, lower-cased with extras stripped
pub fn requirements_txt(content: &str) -> Vec<String> {
    static REQUIREMENT_REGEX: OnceLock<Regex> = OnceLock::new();
    let pattern = REQUIREMENT_REGEX.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._-]*)").expect("Invalid requirement regex")
    });
    let mut deps = DependencySet::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
            continue;
        }
        if let Some(name) = pattern.captures(line).and_then(|c| c.get(1)) {
            deps.push(name.as_str().to_ascii_lowercase());
        }
    }
    deps.into_vec()
}

/// Name part of a PEP 508 requirement such as `Django>=4.2` or `uvicorn[standard]`
pub fn requirement_name(spec: &str) -> Option<String> {
    let end = spec
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'))
        .unwrap_or(spec.len());
    let name = spec[..end].trim();
    (!name.is_empty()).then(|| name.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_dependencies_merges_sections() {
        let json: JsonObject = serde_json::from_str(
            r#"{
                "dependencies": {"express": "^4.18.0", "react": "^18"},
                "devDependencies": {"react": "^18", "vite": "^5"}
            }"#,
        )
        .unwrap();

        let deps = json_dependencies(&json, &["dependencies", "devDependencies"]);
        assert_eq!(deps, vec!["express", "react", "vite"]);
    }

    #[test]
    fn test_toml_dependencies() {
        let table: toml::Table = toml::from_str(
            r#"
            [dependencies]
            axum = "0.7"
            tokio = { version = "1", features = ["full"] }

            [dev-dependencies]
            tempfile = "3"
            "#,
        )
        .unwrap();

        let deps = toml_dependencies(&table, &[&["dependencies"], &["dev-dependencies"]]);
        assert_eq!(deps, vec!["axum", "tokio", "tempfile"]);
        assert!(toml_dependencies(&table, &[&["workspace", "dependencies"]]).is_empty());
    }

    #[test]
    fn test_toml_str_at() {
        let table: toml::Table = toml::from_str("[toolchain]\nchannel = \"1.80\"\n").unwrap();
        assert_eq!(toml_str_at(&table, &["toolchain", "channel"]), Some("1.80"));
        assert_eq!(toml_str_at(&table, &["toolchain", "missing"]), None);
    }

    #[test]
    fn test_requirements_txt() {
        let content = "# web\nDjango>=4.2\ngunicorn==21.2.0\n-r base.txt\nuvicorn[standard]\n\ndjango\n";
        assert_eq!(requirements_txt(content), vec!["django", "gunicorn", "uvicorn"]);
    }

    #[test]
    fn test_requirement_name() {
        assert_eq!(requirement_name("FastAPI>=0.110").as_deref(), Some("fastapi"));
        assert_eq!(requirement_name("uvicorn[standard]").as_deref(), Some("uvicorn"));
        assert_eq!(requirement_name(">=1"), None);
    }

    #[test]
    fn test_line_dependencies() {
        let pattern = Regex::new(r#"^gem\s+['"]([^'"]+)['"]"#).unwrap();
        let content = "source 'https://rubygems.org'\ngem 'rails', '~> 7.1'\n# gem 'debug'\ngem \"pg\"\n";
        assert_eq!(line_dependencies(content, &pattern), vec!["rails", "pg"]);
    }
}
