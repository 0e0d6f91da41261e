//! PHP (Composer)

use super::parsers::json_dependencies;
use crate::detection::metadata::PhpMetadata;
use crate::detection::spec::{framework, weighted};
use crate::detection::{
    shell_quote, DetectionContext, DetectionResult, Detector, EcosystemMetadata, EcosystemSpec,
    Indicator, VersionPrecision, VersionSource,
};
use crate::error::ContentError;
use crate::output::{Commands, PlanOptions};
use std::collections::BTreeMap;

/// Extensions compiled into the official PHP images
pub const BUNDLED_EXTENSIONS: &[&str] = &[
    "ctype", "curl", "date", "dom", "fileinfo", "filter", "ftp", "hash", "iconv", "json",
    "libxml", "mbstring", "mysqlnd", "openssl", "pcre", "pdo", "pdo_sqlite", "phar", "posix",
    "readline", "reflection", "session", "simplexml", "sodium", "spl", "sqlite3", "standard",
    "tokenizer", "xml", "xmlreader", "xmlwriter", "zlib",
];

pub static PHP: EcosystemSpec = EcosystemSpec {
    name: "php",
    priority: 20,
    threshold: 0.3,
    indicators: &[
        weighted(40, Indicator::File("composer.json")),
        weighted(15, Indicator::File("composer.lock")),
        weighted(30, Indicator::Extension(&["php"])),
        weighted(15, Indicator::AnyFile(&["artisan", "index.php", "public/index.php"])),
    ],
    manifests: &["composer.json"],
    version_sources: &[
        VersionSource::PinFile(".php-version"),
        VersionSource::JsonPointer {
            file: "composer.json",
            pointer: "/require/php",
        },
    ],
    version_precision: VersionPrecision::MajorMinor,
    default_version: "8.3",
    frameworks: &[
        framework("laravel/framework", "Laravel"),
        framework("symfony/framework-bundle", "Symfony"),
        framework("symfony/symfony", "Symfony"),
        framework("slim/slim", "Slim"),
        framework("codeigniter4/framework", "CodeIgniter"),
    ],
    excluded_dirs: &["vendor"],
};

pub struct PhpDetector;

impl PhpDetector {
    fn metadata_of(result: &DetectionResult) -> Option<&PhpMetadata> {
        match &result.metadata {
            Some(EcosystemMetadata::Php(metadata)) => Some(metadata),
            _ => None,
        }
    }
}

impl Detector for PhpDetector {
    fn spec(&self) -> &'static EcosystemSpec {
        &PHP
    }

    fn dependencies(&self, ctx: &DetectionContext) -> Result<Vec<String>, ContentError> {
        Ok(ctx
            .read_json("composer.json")?
            .map(|json| json_dependencies(&json, &["require", "require-dev"]))
            .unwrap_or_default())
    }

    fn package_manager(&self, _ctx: &DetectionContext) -> Result<String, ContentError> {
        Ok("composer".to_string())
    }

    fn metadata(
        &self,
        ctx: &DetectionContext,
        dependencies: &[String],
    ) -> Result<Option<EcosystemMetadata>, ContentError> {
        let extensions = dependencies
            .iter()
            .filter_map(|d| d.strip_prefix("ext-"))
            .map(|e| e.to_ascii_lowercase())
            .collect();

        let document_root = if ctx.has_file("public/index.php") {
            Some("public".to_string())
        } else if ctx.has_file("index.php") {
            Some(".".to_string())
        } else {
            None
        };

        Ok(Some(EcosystemMetadata::Php(PhpMetadata {
            extensions,
            document_root,
            artisan: ctx.has_file("artisan"),
        })))
    }

    fn generate_commands(&self, result: &DetectionResult, options: &PlanOptions) -> Commands {
        let metadata = Self::metadata_of(result);
        let document_root = metadata
            .and_then(|m| m.document_root.as_deref())
            .unwrap_or("public");
        let mut commands = Commands {
            setup: vec!["composer install --no-dev --optimize-autoloader --no-interaction".to_string()],
            ..Default::default()
        };

        let artisan = metadata.map(|m| m.artisan).unwrap_or(false);
        if result.framework() == Some("Laravel") && artisan {
            commands.dev.push("php artisan serve".to_string());
            commands.build.push("php artisan optimize".to_string());
            commands
                .run
                .push("php artisan serve --host=0.0.0.0 --port=${PORT:-8080}".to_string());
        } else {
            commands.dev.push(format!("php -S localhost:8080 -t {}", shell_quote(document_root)));
            commands.run.push(format!(
                "php -S 0.0.0.0:${{PORT:-8080}} -t {}",
                shell_quote(document_root)
            ));
        }

        options.apply(commands)
    }

    fn generate_environment(&self, result: &DetectionResult) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("COMPOSER_ALLOW_SUPERUSER".to_string(), "1".to_string());
        match result.framework() {
            Some("Laravel") => {
                env.insert("APP_ENV".to_string(), "production".to_string());
                env.insert("LOG_CHANNEL".to_string(), "stderr".to_string());
            }
            Some("Symfony") => {
                env.insert("APP_ENV".to_string(), "prod".to_string());
            }
            _ => {}
        }
        env
    }

    fn needs_native_compilation(&self, result: &DetectionResult) -> bool {
        Self::metadata_of(result)
            .map(|m| {
                m.extensions
                    .iter()
                    .any(|e| !BUNDLED_EXTENSIONS.contains(&e.as_str()))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockContent;
    use std::path::Path;

    fn detect(files: &[(&str, &str)]) -> DetectionResult {
        let content = MockContent::with_files(files);
        PhpDetector
            .detect(Path::new("/repo"), &content.snapshot(), &content)
            .unwrap()
    }

    #[test]
    fn test_laravel() {
        let result = detect(&[
            (
                "composer.json",
                r#"{"require": {"php": "^8.2", "laravel/framework": "^11.0", "ext-gd": "*", "ext-mbstring": "*"}}"#,
            ),
            ("composer.lock", "{}"),
            ("artisan", ""),
            ("public/index.php", ""),
            ("app/Models/User.php", ""),
        ]);

        assert!(result.matched);
        assert_eq!(result.framework, "Laravel");
        assert_eq!(result.version, "8.2");
        assert!(PhpDetector.needs_native_compilation(&result));

        let commands = PhpDetector.generate_commands(&result, &PlanOptions::default());
        assert_eq!(
            commands.run,
            vec!["php artisan serve --host=0.0.0.0 --port=${PORT:-8080}"]
        );
        let env = PhpDetector.generate_environment(&result);
        assert_eq!(env.get("APP_ENV").map(String::as_str), Some("production"));
    }

    #[test]
    fn test_plain_php_site() {
        let result = detect(&[("index.php", "<?php echo 'hi';")]);

        assert!(result.matched);
        assert!((result.confidence - 0.45).abs() < 1e-9);
        assert!(!PhpDetector.needs_native_compilation(&result));

        let commands = PhpDetector.generate_commands(&result, &PlanOptions::default());
        assert_eq!(commands.run, vec!["php -S 0.0.0.0:${PORT:-8080} -t ."]);
    }

    #[test]
    fn test_bundled_extensions_only() {
        let result = detect(&[
            ("composer.json", r#"{"require": {"slim/slim": "^4", "ext-json": "*"}}"#),
            ("public/index.php", ""),
        ]);
        assert_eq!(result.framework, "Slim");
        assert!(!PhpDetector.needs_native_compilation(&result));
    }
}
