//! Node.js (npm, yarn, pnpm, bun)

use super::parsers::json_dependencies;
use crate::detection::metadata::NodeMetadata;
use crate::detection::spec::{framework, weighted};
use crate::detection::{
    DetectionContext, DetectionResult, Detector, EcosystemMetadata, EcosystemSpec, Indicator,
    VersionPrecision, VersionSource,
};
use crate::error::ContentError;
use crate::output::{Commands, PlanOptions};
use std::collections::BTreeMap;

const LOCKFILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    "bun.lock",
];

const FRAMEWORK_CONFIGS: &[&str] = &[
    "next.config.js",
    "next.config.mjs",
    "next.config.ts",
    "nuxt.config.js",
    "nuxt.config.ts",
    "remix.config.js",
    "astro.config.mjs",
    "svelte.config.js",
    "gatsby-config.js",
    "nest-cli.json",
    "vite.config.js",
    "vite.config.ts",
    "angular.json",
];

const ENTRYPOINTS: &[&str] = &[
    "index.js",
    "server.js",
    "app.js",
    "main.js",
    "src/index.js",
    "src/server.js",
];

/// Packages that compile native addons at install time
pub const NATIVE_MODULES: &[&str] = &[
    "node-gyp",
    "bcrypt",
    "sharp",
    "canvas",
    "sqlite3",
    "better-sqlite3",
    "argon2",
];

pub static NODE: EcosystemSpec = EcosystemSpec {
    name: "node",
    priority: 10,
    threshold: 0.3,
    indicators: &[
        weighted(40, Indicator::File("package.json")),
        weighted(20, Indicator::AnyFile(LOCKFILES)),
        weighted(20, Indicator::Extension(&["js", "mjs", "cjs", "jsx", "ts", "tsx"])),
        weighted(10, Indicator::AnyFile(&[".nvmrc", ".node-version"])),
        weighted(10, Indicator::AnyFile(FRAMEWORK_CONFIGS)),
    ],
    manifests: &["package.json"],
    version_sources: &[
        VersionSource::PinFile(".nvmrc"),
        VersionSource::PinFile(".node-version"),
        VersionSource::JsonPointer {
            file: "package.json",
            pointer: "/engines/node",
        },
        VersionSource::JsonPointer {
            file: "package.json",
            pointer: "/volta/node",
        },
    ],
    version_precision: VersionPrecision::Major,
    default_version: "22",
    frameworks: &[
        framework("next", "Next.js"),
        framework("nuxt", "Nuxt"),
        framework("@remix-run/*", "Remix"),
        framework("astro", "Astro"),
        framework("@sveltejs/kit", "SvelteKit"),
        framework("gatsby", "Gatsby"),
        framework("@nestjs/core", "NestJS"),
        framework("express", "Express"),
        framework("fastify", "Fastify"),
        framework("koa", "Koa"),
        framework("@hapi/hapi", "Hapi"),
        framework("vite", "Vite"),
        framework("react", "React"),
        framework("vue", "Vue"),
        framework("svelte", "Svelte"),
        framework("@angular/core", "Angular"),
    ],
    excluded_dirs: &["node_modules", ".next", ".nuxt", ".svelte-kit", ".turbo", "coverage"],
};

pub struct NodeDetector;

impl NodeDetector {
    fn metadata_of(result: &DetectionResult) -> Option<&NodeMetadata> {
        match &result.metadata {
            Some(EcosystemMetadata::Node(metadata)) => Some(metadata),
            _ => None,
        }
    }

    fn install_command(package_manager: &str, has_lockfile: bool) -> Vec<String> {
        match package_manager {
            "pnpm" => vec![
                "corepack enable".to_string(),
                "pnpm install --frozen-lockfile".to_string(),
            ],
            "yarn" => vec![
                "corepack enable".to_string(),
                "yarn install --frozen-lockfile".to_string(),
            ],
            "bun" => vec!["bun install".to_string()],
            _ if has_lockfile => vec!["npm ci".to_string()],
            _ => vec!["npm install".to_string()],
        }
    }

    fn run_script(package_manager: &str, script: &str) -> String {
        match (package_manager, script) {
            ("npm", "start") | ("", "start") => "npm start".to_string(),
            ("yarn", _) => format!("yarn {}", script),
            ("", _) => format!("npm run {}", script),
            (pm, _) => format!("{} run {}", pm, script),
        }
    }
}

impl Detector for NodeDetector {
    fn spec(&self) -> &'static EcosystemSpec {
        &NODE
    }

    fn dependencies(&self, ctx: &DetectionContext) -> Result<Vec<String>, ContentError> {
        Ok(ctx
            .read_json("package.json")?
            .map(|json| {
                json_dependencies(
                    &json,
                    &["dependencies", "devDependencies", "peerDependencies"],
                )
            })
            .unwrap_or_default())
    }

    fn package_manager(&self, ctx: &DetectionContext) -> Result<String, ContentError> {
        let declared = ctx.read_json("package.json")?.and_then(|json| {
            json.get("packageManager")
                .and_then(|v| v.as_str())
                .and_then(|v| v.split('@').next())
                .map(str::to_string)
        });
        if let Some(pm) = declared.filter(|pm| ["npm", "yarn", "pnpm", "bun"].contains(&pm.as_str())) {
            return Ok(pm);
        }

        let pm = if ctx.has_file("pnpm-lock.yaml") {
            "pnpm"
        } else if ctx.has_file("yarn.lock") {
            "yarn"
        } else if ctx.has_file("bun.lockb") || ctx.has_file("bun.lock") {
            "bun"
        } else {
            "npm"
        };
        Ok(pm.to_string())
    }

    fn build_tools(&self, ctx: &DetectionContext, package_manager: &str) -> Vec<String> {
        let mut tools = vec![package_manager.to_string()];
        if ctx.has_file("tsconfig.json") {
            tools.push("typescript".to_string());
        }
        tools
    }

    fn metadata(
        &self,
        ctx: &DetectionContext,
        dependencies: &[String],
    ) -> Result<Option<EcosystemMetadata>, ContentError> {
        let json = ctx.read_json("package.json")?.unwrap_or_default();

        let scripts = json
            .get("scripts")
            .and_then(|v| v.as_object())
            .map(|scripts| {
                scripts
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        let main = json
            .get("main")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| ctx.first_existing(ENTRYPOINTS).map(str::to_string));

        let native_modules = dependencies
            .iter()
            .filter(|d| NATIVE_MODULES.contains(&d.as_str()))
            .cloned()
            .collect();

        Ok(Some(EcosystemMetadata::Node(NodeMetadata {
            scripts,
            main,
            workspaces: json.contains_key("workspaces") || ctx.has_file("pnpm-workspace.yaml"),
            typescript: ctx.has_file("tsconfig.json") || ctx.has_extension(&["ts", "tsx"]),
            native_modules,
        })))
    }

    fn generate_commands(&self, result: &DetectionResult, options: &PlanOptions) -> Commands {
        let pm = result.package_manager.as_str();
        let has_lockfile = result
            .evidence
            .files()
            .iter()
            .any(|f| LOCKFILES.contains(&f.as_str()));
        let metadata = Self::metadata_of(result);
        let has_script = |name: &str| metadata.map(|m| m.has_script(name)).unwrap_or(false);

        let mut commands = Commands {
            setup: Self::install_command(pm, has_lockfile),
            ..Default::default()
        };

        if has_script("dev") {
            commands.dev.push(Self::run_script(pm, "dev"));
        }
        if has_script("build") {
            commands.build.push(Self::run_script(pm, "build"));
        }

        if has_script("start") {
            commands.run.push(Self::run_script(pm, "start"));
        } else if result.framework() == Some("Next.js") {
            commands.run.push("npx next start".to_string());
        } else if let Some(main) = metadata.and_then(|m| m.main.as_deref()) {
            commands.run.push(format!("node {}", crate::detection::shell_quote(main)));
        }

        options.apply(commands)
    }

    fn generate_environment(&self, result: &DetectionResult) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("NODE_ENV".to_string(), "production".to_string());
        if result.framework() == Some("Next.js") {
            env.insert("NEXT_TELEMETRY_DISABLED".to_string(), "1".to_string());
        }
        env
    }

    fn needs_native_compilation(&self, result: &DetectionResult) -> bool {
        Self::metadata_of(result)
            .map(|m| !m.native_modules.is_empty())
            .unwrap_or(false)
    }
}
