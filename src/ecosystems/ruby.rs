//! Ruby (Bundler)

use super::parsers::line_dependencies;
use crate::detection::metadata::RubyMetadata;
use crate::detection::spec::{framework, weighted};
use crate::detection::{
    shell_quote, DetectionContext, DetectionResult, Detector, EcosystemMetadata, EcosystemSpec,
    Indicator, VersionPrecision, VersionSource,
};
use crate::error::ContentError;
use crate::output::{Commands, PlanOptions};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Gems with C extensions
pub const NATIVE_GEMS: &[&str] = &["nokogiri", "pg", "mysql2", "sqlite3", "bcrypt", "ffi"];

const ENTRYPOINTS: &[&str] = &["config.ru", "app.rb", "main.rb", "server.rb"];

pub static RUBY: EcosystemSpec = EcosystemSpec {
    name: "ruby",
    priority: 20,
    threshold: 0.3,
    indicators: &[
        weighted(40, Indicator::File("Gemfile")),
        weighted(15, Indicator::File("Gemfile.lock")),
        weighted(25, Indicator::Extension(&["rb"])),
        weighted(20, Indicator::AnyFile(&[".ruby-version", "config.ru"])),
    ],
    manifests: &["Gemfile"],
    version_sources: &[
        VersionSource::PinFile(".ruby-version"),
        VersionSource::Pattern {
            file: "Gemfile",
            pattern: r#"(?m)^\s*ruby\s+['"](?:~>\s*)?(\d+\.\d+)"#,
        },
        VersionSource::Pattern {
            file: "Gemfile.lock",
            pattern: r"RUBY VERSION\s+ruby (\d+\.\d+)",
        },
    ],
    version_precision: VersionPrecision::MajorMinor,
    default_version: "3.3",
    frameworks: &[
        framework("rails", "Rails"),
        framework("railties", "Rails"),
        framework("hanami", "Hanami"),
        framework("sinatra", "Sinatra"),
        framework("roda", "Roda"),
    ],
    excluded_dirs: &[".bundle", "tmp", "log"],
};

pub struct RubyDetector;

impl RubyDetector {
    fn metadata_of(result: &DetectionResult) -> Option<&RubyMetadata> {
        match &result.metadata {
            Some(EcosystemMetadata::Ruby(metadata)) => Some(metadata),
            _ => None,
        }
    }
}

impl Detector for RubyDetector {
    fn spec(&self) -> &'static EcosystemSpec {
        &RUBY
    }

    fn dependencies(&self, ctx: &DetectionContext) -> Result<Vec<String>, ContentError> {
        let Some(gemfile) = ctx.read_text("Gemfile")? else {
            return Ok(Vec::new());
        };
        static GEM_REGEX: OnceLock<Regex> = OnceLock::new();
        let pattern = GEM_REGEX
            .get_or_init(|| Regex::new(r#"^gem\s+['"]([^'"]+)['"]"#).expect("Invalid gem regex"));
        Ok(line_dependencies(&gemfile, pattern))
    }

    fn package_manager(&self, _ctx: &DetectionContext) -> Result<String, ContentError> {
        Ok("bundler".to_string())
    }

    fn metadata(
        &self,
        ctx: &DetectionContext,
        dependencies: &[String],
    ) -> Result<Option<EcosystemMetadata>, ContentError> {
        let native_gems = dependencies
            .iter()
            .filter(|d| NATIVE_GEMS.contains(&d.as_str()))
            .cloned()
            .collect();

        Ok(Some(EcosystemMetadata::Ruby(RubyMetadata {
            rack: ctx.has_file("config.ru"),
            entrypoint: ctx.first_existing(ENTRYPOINTS).map(str::to_string),
            native_gems,
        })))
    }

    fn generate_commands(&self, result: &DetectionResult, options: &PlanOptions) -> Commands {
        let metadata = Self::metadata_of(result);
        let mut commands = Commands {
            setup: vec![
                "bundle config set --local without 'development test'".to_string(),
                "bundle install --jobs 4".to_string(),
            ],
            ..Default::default()
        };

        if result.framework() == Some("Rails") {
            commands.dev.push("bin/rails server".to_string());
            commands
                .build
                .push("bundle exec rails assets:precompile".to_string());
            commands
                .run
                .push("bundle exec rails server -b 0.0.0.0 -p ${PORT:-3000}".to_string());
        } else if metadata.map(|m| m.rack).unwrap_or(false) {
            commands.dev.push("bundle exec rackup".to_string());
            commands
                .run
                .push("bundle exec rackup -o 0.0.0.0 -p ${PORT:-3000}".to_string());
        } else if let Some(entry) = metadata.and_then(|m| m.entrypoint.as_deref()) {
            commands
                .run
                .push(format!("bundle exec ruby {}", shell_quote(entry)));
        }

        options.apply(commands)
    }

    fn generate_environment(&self, result: &DetectionResult) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("BUNDLE_WITHOUT".to_string(), "development:test".to_string());
        env.insert("RACK_ENV".to_string(), "production".to_string());
        if result.framework() == Some("Rails") {
            env.insert("RAILS_ENV".to_string(), "production".to_string());
            env.insert("RAILS_LOG_TO_STDOUT".to_string(), "1".to_string());
            env.insert("RAILS_SERVE_STATIC_FILES".to_string(), "1".to_string());
        }
        env
    }

    fn needs_native_compilation(&self, result: &DetectionResult) -> bool {
        Self::metadata_of(result)
            .map(|m| !m.native_gems.is_empty())
            .unwrap_or(false)
    }
}
