//! Deno

use super::parsers::DependencySet;
use crate::detection::metadata::DenoMetadata;
use crate::detection::spec::{framework, weighted};
use crate::detection::{
    shell_quote, DetectionContext, DetectionResult, Detector, EcosystemMetadata, EcosystemSpec,
    Indicator, VersionPrecision, VersionSource,
};
use crate::error::ContentError;
use crate::fs::JsonObject;
use crate::output::{Commands, PlanOptions};
use std::collections::BTreeMap;

const CONFIG_FILES: &[&str] = &["deno.json", "deno.jsonc"];

const ENTRYPOINTS: &[&str] = &[
    "main.ts",
    "mod.ts",
    "main.tsx",
    "server.ts",
    "src/main.ts",
    "main.js",
];

pub static DENO: EcosystemSpec = EcosystemSpec {
    name: "deno",
    priority: 10,
    threshold: 0.3,
    indicators: &[
        weighted(50, Indicator::AnyFile(CONFIG_FILES)),
        weighted(15, Indicator::File("deno.lock")),
        weighted(20, Indicator::Extension(&["ts", "tsx", "js"])),
        weighted(15, Indicator::AnyFile(&["main.ts", "mod.ts"])),
    ],
    manifests: &["deno.json", "deno.jsonc"],
    version_sources: &[VersionSource::PinFile(".dvmrc")],
    version_precision: VersionPrecision::Major,
    default_version: "2",
    frameworks: &[
        framework("@fresh/core", "Fresh"),
        framework("fresh", "Fresh"),
        framework("@hono/hono", "Hono"),
        framework("hono", "Hono"),
        framework("@oak/oak", "Oak"),
        framework("oak", "Oak"),
    ],
    excluded_dirs: &["_fresh"],
};

/// Package name from an import specifier (`jsr:@hono/hono@^4`, `npm:oak@12`,
/// `https://deno.land/x/fresh@1.6.0/`)
pub fn specifier_name(specifier: &str) -> Option<String> {
    let specifier = specifier.trim();
    if let Some(rest) = specifier
        .strip_prefix("https://deno.land/x/")
        .or_else(|| specifier.strip_prefix("http://deno.land/x/"))
    {
        let name = rest.split(['@', '/']).next()?;
        return (!name.is_empty()).then(|| name.to_string());
    }

    let bare = specifier
        .strip_prefix("jsr:")
        .or_else(|| specifier.strip_prefix("npm:"))?
        .trim_start_matches('/');

    // Scoped names keep their leading '@'
    let (scope, rest) = match bare.strip_prefix('@') {
        Some(rest) => ("@", rest),
        None => ("", bare),
    };
    let mut parts = rest.splitn(2, '/');
    let first = parts.next()?.split('@').next()?;
    let name = if scope.is_empty() {
        first.to_string()
    } else {
        let package = parts.next()?.split(['@', '/']).next()?;
        format!("@{}/{}", first, package)
    };
    (!name.is_empty()).then_some(name)
}

/// Rewrites JSONC as plain JSON: `//` and `/* */` comments and trailing
/// commas are removed, string contents are left untouched
pub fn strip_jsonc(text: &str) -> String {
    let mut stripped = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            stripped.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        stripped.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        let next = chars.peek().copied();
        match (c, next) {
            ('"', _) => {
                in_string = true;
                stripped.push(c);
            }
            ('/', Some('/')) => {
                while chars.next_if(|&ch| ch != '\n').is_some() {}
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = '\0';
                for ch in chars.by_ref() {
                    if previous == '*' && ch == '/' {
                        break;
                    }
                    previous = ch;
                }
                stripped.push(' ');
            }
            _ => stripped.push(c),
        }
    }

    drop_trailing_commas(&stripped)
}

/// Removes commas directly followed (after whitespace) by `}` or `]`
fn drop_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        result.push(c);
    }
    result
}

pub struct DenoDetector;

impl DenoDetector {
    fn read_config(ctx: &DetectionContext) -> Result<Option<(&'static str, JsonObject)>, ContentError> {
        let Some(file) = ctx.first_existing(CONFIG_FILES) else {
            return Ok(None);
        };
        let Some(text) = ctx.read_text(file)? else {
            return Ok(None);
        };
        match serde_json::from_str::<serde_json::Value>(&strip_jsonc(&text)) {
            Ok(serde_json::Value::Object(config)) => Ok(Some((file, config))),
            Ok(_) => Err(ContentError::parse(file, "expected a JSON object")),
            Err(e) => Err(ContentError::parse(file, e)),
        }
    }

    fn metadata_of(result: &DetectionResult) -> Option<&DenoMetadata> {
        match &result.metadata {
            Some(EcosystemMetadata::Deno(metadata)) => Some(metadata),
            _ => None,
        }
    }
}

impl Detector for DenoDetector {
    fn spec(&self) -> &'static EcosystemSpec {
        &DENO
    }

    fn dependencies(&self, ctx: &DetectionContext) -> Result<Vec<String>, ContentError> {
        let mut deps = DependencySet::new();
        if let Some((_, config)) = Self::read_config(ctx)? {
            if let Some(imports) = config.get("imports").and_then(|v| v.as_object()) {
                deps.extend(
                    imports
                        .values()
                        .filter_map(|v| v.as_str())
                        .filter_map(specifier_name),
                );
            }
        }
        Ok(deps.into_vec())
    }

    fn package_manager(&self, _ctx: &DetectionContext) -> Result<String, ContentError> {
        Ok("deno".to_string())
    }

    fn metadata(
        &self,
        ctx: &DetectionContext,
        _dependencies: &[String],
    ) -> Result<Option<EcosystemMetadata>, ContentError> {
        let config = Self::read_config(ctx)?;
        let tasks = config
            .as_ref()
            .and_then(|(_, config)| config.get("tasks"))
            .and_then(|v| v.as_object())
            .map(|tasks| {
                tasks
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(EcosystemMetadata::Deno(DenoMetadata {
            config_file: config.map(|(file, _)| file.to_string()),
            entrypoint: ctx.first_existing(ENTRYPOINTS).map(str::to_string),
            tasks,
        })))
    }

    fn generate_commands(&self, result: &DetectionResult, options: &PlanOptions) -> Commands {
        let metadata = Self::metadata_of(result);
        let has_task = |name: &str| {
            metadata
                .map(|m| m.tasks.contains_key(name))
                .unwrap_or(false)
        };
        let entrypoint = metadata.and_then(|m| m.entrypoint.as_deref());

        let mut commands = Commands::default();
        if let Some(entry) = entrypoint {
            commands.setup.push(format!("deno cache {}", shell_quote(entry)));
        } else {
            commands.setup.push("deno install".to_string());
        }
        if has_task("dev") {
            commands.dev.push("deno task dev".to_string());
        }
        if has_task("build") {
            commands.build.push("deno task build".to_string());
        }
        if has_task("start") {
            commands.run.push("deno task start".to_string());
        } else if let Some(entry) = entrypoint {
            commands.run.push(format!("deno run --allow-all {}", shell_quote(entry)));
        }

        options.apply(commands)
    }

    fn generate_environment(&self, _result: &DetectionResult) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("DENO_NO_UPDATE_CHECK".to_string(), "1".to_string());
        env
    }
}
