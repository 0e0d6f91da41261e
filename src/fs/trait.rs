//! ContentAccessor trait definition

use crate::error::ContentError;

pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Read-only access to file contents, addressed by snapshot-relative paths.
///
/// A file that does not exist is reported as `Ok(None)`. Errors are reserved
/// for files that exist but cannot be read or parsed.
pub trait ContentAccessor: Send + Sync {
    /// Check if a file exists
    fn exists(&self, path: &str) -> bool;

    /// Read file contents as text
    fn read_text(&self, path: &str) -> Result<Option<String>, ContentError>;

    /// Read and parse a JSON object
    fn read_json(&self, path: &str) -> Result<Option<JsonObject>, ContentError> {
        let Some(text) = self.read_text(path)? else {
            return Ok(None);
        };
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(serde_json::Value::Object(map)) => Ok(Some(map)),
            Ok(_) => Err(ContentError::parse(path, "expected a JSON object")),
            Err(e) => Err(ContentError::parse(path, e)),
        }
    }

    /// Read and parse a TOML document
    fn read_toml(&self, path: &str) -> Result<Option<toml::Table>, ContentError> {
        let Some(text) = self.read_text(path)? else {
            return Ok(None);
        };
        text.parse::<toml::Table>()
            .map(Some)
            .map_err(|e| ContentError::parse(path, e.message()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockContent;

    #[test]
    fn test_read_json_missing_is_none() {
        let content = MockContent::new();
        assert!(content.read_json("package.json").unwrap().is_none());
    }

    #[test]
    fn test_read_json_object() {
        let content = MockContent::new();
        content.add_file("package.json", r#"{"name": "app"}"#);

        let json = content.read_json("package.json").unwrap().unwrap();
        assert_eq!(json.get("name").and_then(|v| v.as_str()), Some("app"));
    }

    #[test]
    fn test_read_json_rejects_non_object() {
        let content = MockContent::new();
        content.add_file("package.json", "[1, 2]");

        let err = content.read_json("package.json").unwrap_err();
        assert!(matches!(err, ContentError::Parse { .. }));
    }

    #[test]
    fn test_read_json_malformed() {
        let content = MockContent::new();
        content.add_file("package.json", "{ invalid");

        assert!(content.read_json("package.json").is_err());
    }

    #[test]
    fn test_read_toml() {
        let content = MockContent::new();
        content.add_file("Cargo.toml", "[package]\nname = \"app\"\n");

        let table = content.read_toml("Cargo.toml").unwrap().unwrap();
        assert_eq!(
            table
                .get("package")
                .and_then(|p| p.get("name"))
                .and_then(|n| n.as_str()),
            Some("app")
        );
    }
}
