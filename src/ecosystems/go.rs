//! Go modules

use super::parsers::DependencySet;
use crate::detection::metadata::GoMetadata;
use crate::detection::spec::{framework, weighted};
use crate::detection::{
    shell_quote, DetectionContext, DetectionResult, Detector, EcosystemMetadata, EcosystemSpec,
    Indicator, VersionPrecision, VersionSource,
};
use crate::error::ContentError;
use crate::output::{Commands, PlanOptions};
use std::collections::BTreeMap;

/// Modules that require cgo
pub const CGO_MODULES: &[&str] = &["github.com/mattn/go-sqlite3"];

pub static GO: EcosystemSpec = EcosystemSpec {
    name: "go",
    priority: 20,
    threshold: 0.3,
    indicators: &[
        weighted(50, Indicator::File("go.mod")),
        weighted(15, Indicator::File("go.sum")),
        weighted(25, Indicator::Extension(&["go"])),
        weighted(10, Indicator::AnyFile(&["go.work", ".go-version"])),
    ],
    manifests: &["go.mod"],
    version_sources: &[
        VersionSource::PinFile(".go-version"),
        VersionSource::Pattern {
            file: "go.work",
            pattern: r"(?m)^go\s+(\d+\.\d+)",
        },
        VersionSource::Pattern {
            file: "go.mod",
            pattern: r"(?m)^go\s+(\d+\.\d+)",
        },
    ],
    version_precision: VersionPrecision::MajorMinor,
    default_version: "1.23",
    frameworks: &[
        framework("github.com/gin-gonic/gin", "Gin"),
        framework("github.com/labstack/echo*", "Echo"),
        framework("github.com/gofiber/fiber*", "Fiber"),
        framework("github.com/go-chi/chi*", "Chi"),
        framework("github.com/gorilla/mux", "Gorilla"),
    ],
    excluded_dirs: &["vendor"],
};

/// Module paths listed in `require` directives, single-line and block form
pub fn go_mod_requires(content: &str) -> Vec<String> {
    let mut deps = DependencySet::new();
    let mut in_block = false;

    for line in content.lines() {
        let line = line.split("//").next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        if in_block {
            if line == ")" {
                in_block = false;
            } else if let Some(module) = line.split_whitespace().next() {
                deps.push(module);
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("require") {
            let rest = rest.trim();
            if rest == "(" {
                in_block = true;
            } else if let Some(module) = rest.split_whitespace().next() {
                deps.push(module);
            }
        }
    }

    deps.into_vec()
}

pub fn go_mod_module(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.trim().strip_prefix("module "))
        .map(|m| m.trim().trim_matches('"').to_string())
}

pub struct GoDetector;

impl GoDetector {
    fn metadata_of(result: &DetectionResult) -> Option<&GoMetadata> {
        match &result.metadata {
            Some(EcosystemMetadata::Go(metadata)) => Some(metadata),
            _ => None,
        }
    }

    /// `.` when the root holds `main.go`, otherwise the first `cmd/<name>` package
    fn main_package(ctx: &DetectionContext) -> String {
        if ctx.has_file("main.go") {
            return ".".to_string();
        }
        ctx.files
            .files()
            .filter(|e| e.name == "main.go" && e.path.starts_with("cmd/") && e.depth() == 2)
            .map(|e| format!("./{}", e.path.trim_end_matches("/main.go")))
            .next()
            .unwrap_or_else(|| ".".to_string())
    }

    fn imports_c(ctx: &DetectionContext, main_package: &str) -> Result<bool, ContentError> {
        let main_file = if main_package == "." {
            "main.go".to_string()
        } else {
            format!("{}/main.go", main_package.trim_start_matches("./"))
        };
        Ok(ctx
            .read_text(&main_file)?
            .map(|text| text.contains("import \"C\""))
            .unwrap_or(false))
    }
}

impl Detector for GoDetector {
    fn spec(&self) -> &'static EcosystemSpec {
        &GO
    }

    fn dependencies(&self, ctx: &DetectionContext) -> Result<Vec<String>, ContentError> {
        Ok(ctx
            .read_text("go.mod")?
            .map(|text| go_mod_requires(&text))
            .unwrap_or_default())
    }

    fn package_manager(&self, _ctx: &DetectionContext) -> Result<String, ContentError> {
        Ok("go".to_string())
    }

    fn metadata(
        &self,
        ctx: &DetectionContext,
        dependencies: &[String],
    ) -> Result<Option<EcosystemMetadata>, ContentError> {
        let module = ctx.read_text("go.mod")?.and_then(|text| go_mod_module(&text));
        let main_package = Self::main_package(ctx);
        let cgo = dependencies
            .iter()
            .any(|d| CGO_MODULES.contains(&d.as_str()))
            || Self::imports_c(ctx, &main_package)?;

        Ok(Some(EcosystemMetadata::Go(GoMetadata {
            module,
            main_package,
            cgo,
            workspace: ctx.has_file("go.work"),
        })))
    }

    fn generate_commands(&self, result: &DetectionResult, options: &PlanOptions) -> Commands {
        let package = Self::metadata_of(result)
            .map(|m| m.main_package.as_str())
            .unwrap_or(".");
        let package = shell_quote(package);

        let commands = Commands {
            setup: vec!["go mod download".to_string()],
            dev: vec![format!("go run {}", package)],
            build: vec![format!("go build -ldflags=\"-s -w\" -o app {}", package)],
            run: vec!["./app".to_string()],
        };
        options.apply(commands)
    }

    fn generate_environment(&self, result: &DetectionResult) -> BTreeMap<String, String> {
        let cgo = self.needs_native_compilation(result);
        let mut env = BTreeMap::new();
        env.insert(
            "CGO_ENABLED".to_string(),
            if cgo { "1" } else { "0" }.to_string(),
        );
        env
    }

    fn needs_native_compilation(&self, result: &DetectionResult) -> bool {
        Self::metadata_of(result).map(|m| m.cgo).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockContent;
    use std::path::Path;

    const GO_MOD: &str = r#"module example.com/api

go 1.22.1

require github.com/go-chi/chi/v5 v5.0.12

require (
	github.com/gin-gonic/gin v1.9.1 // indirect
	github.com/mattn/go-sqlite3 v1.14.22
)
"#;

    fn detect(files: &[(&str, &str)]) -> DetectionResult {
        let content = MockContent::with_files(files);
        GoDetector
            .detect(Path::new("/repo"), &content.snapshot(), &content)
            .unwrap()
    }

    #[test]
    fn test_go_mod_requires() {
        assert_eq!(
            go_mod_requires(GO_MOD),
            vec![
                "github.com/go-chi/chi/v5",
                "github.com/gin-gonic/gin",
                "github.com/mattn/go-sqlite3"
            ]
        );
        assert_eq!(go_mod_module(GO_MOD).as_deref(), Some("example.com/api"));
    }

    #[test]
    fn test_go_project() {
        let result = detect(&[("go.mod", GO_MOD), ("go.sum", ""), ("main.go", "package main")]);

        assert!(result.matched);
        assert_eq!(result.version, "1.22");
        assert_eq!(result.framework, "Gin");
        assert!(GoDetector.needs_native_compilation(&result));
        assert_eq!(
            GoDetector.generate_environment(&result).get("CGO_ENABLED").map(String::as_str),
            Some("1")
        );
    }

    #[test]
    fn test_cmd_layout() {
        let result = detect(&[
            ("go.mod", "module example.com/svc\n\ngo 1.21\n"),
            ("cmd/server/main.go", "package main"),
            ("internal/app/app.go", "package app"),
        ]);

        let commands = GoDetector.generate_commands(&result, &PlanOptions::default());
        assert_eq!(commands.build, vec!["go build -ldflags=\"-s -w\" -o app ./cmd/server"]);
        assert_eq!(commands.run, vec!["./app"]);
        assert!(!GoDetector.needs_native_compilation(&result));
    }

    #[test]
    fn test_cgo_import() {
        let result = detect(&[
            ("go.mod", "module x\n"),
            ("main.go", "package main\n\nimport \"C\"\n"),
        ]);
        assert!(GoDetector.needs_native_compilation(&result));
    }

    #[test]
    fn test_go_work_version_wins() {
        let result = detect(&[
            ("go.mod", "module x\n\ngo 1.20\n"),
            ("go.work", "go 1.22\n\nuse .\n"),
        ]);
        assert_eq!(result.version, "1.22");
    }

    #[test]
    fn test_default_version() {
        let result = detect(&[("go.mod", "module x\n"), ("main.go", "")]);
        assert_eq!(result.version, "1.23");
    }
}
