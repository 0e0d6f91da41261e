//! Python (pip, poetry, uv, pipenv, pdm)

use super::parsers::{requirement_name, requirements_txt, toml_dependencies, toml_table_at, DependencySet};
use crate::detection::metadata::PythonMetadata;
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

const MANIFESTS: &[&str] = &["requirements.txt", "pyproject.toml", "setup.py", "Pipfile"];

const ENTRYPOINTS: &[&str] = &[
    "main.py",
    "app.py",
    "server.py",
    "wsgi.py",
    "asgi.py",
    "src/main.py",
    "app/main.py",
];

/// Packages that build C extensions when no wheel matches
pub const NATIVE_PACKAGES: &[&str] = &[
    "psycopg2",
    "mysqlclient",
    "lxml",
    "cffi",
    "cryptography",
    "pillow",
    "uwsgi",
];

pub static PYTHON: EcosystemSpec = EcosystemSpec {
    name: "python",
    priority: 20,
    threshold: 0.3,
    indicators: &[
        weighted(40, Indicator::AnyFile(MANIFESTS)),
        weighted(15, Indicator::AnyFile(&["poetry.lock", "Pipfile.lock", "uv.lock", "pdm.lock"])),
        weighted(25, Indicator::Extension(&["py"])),
        weighted(10, Indicator::AnyFile(&[".python-version", "runtime.txt"])),
        weighted(10, Indicator::AnyFile(&["manage.py", "app.py", "main.py", "wsgi.py"])),
    ],
    manifests: MANIFESTS,
    version_sources: &[
        VersionSource::PinFile(".python-version"),
        VersionSource::Pattern {
            file: "runtime.txt",
            pattern: r"python-(\d+\.\d+)",
        },
        VersionSource::TomlKey {
            file: "pyproject.toml",
            path: &["project", "requires-python"],
        },
        VersionSource::TomlKey {
            file: "pyproject.toml",
            path: &["tool", "poetry", "dependencies", "python"],
        },
    ],
    version_precision: VersionPrecision::MajorMinor,
    default_version: "3.12",
    frameworks: &[
        framework("django", "Django"),
        framework("fastapi", "FastAPI"),
        framework("flask", "Flask"),
        framework("starlette", "Starlette"),
        framework("tornado", "Tornado"),
        framework("sanic", "Sanic"),
        framework("streamlit", "Streamlit"),
    ],
    excluded_dirs: &["__pycache__", ".venv", "venv", ".tox", ".mypy_cache", ".pytest_cache"],
};

/// Dotted module path for a source file (`app/main.py` → `app.main`)
pub fn module_name(path: &str) -> String {
    path.trim_end_matches(".py").replace('/', ".")
}

pub struct PythonDetector;

impl PythonDetector {
    fn metadata_of(result: &DetectionResult) -> Option<&PythonMetadata> {
        match &result.metadata {
            Some(EcosystemMetadata::Python(metadata)) => Some(metadata),
            _ => None,
        }
    }

    fn pyproject_dependencies(table: &toml::Table, deps: &mut DependencySet) {
        if let Some(project) = toml_table_at(table, &["project"]) {
            let pep621 = project
                .get("dependencies")
                .and_then(|v| v.as_array())
                .into_iter()
                .flatten()
                .filter_map(|v| v.as_str())
                .filter_map(requirement_name);
            deps.extend(pep621);
        }

        let poetry = toml_dependencies(
            table,
            &[
                &["tool", "poetry", "dependencies"],
                &["tool", "poetry", "dev-dependencies"],
            ],
        );
        deps.extend(
            poetry
                .into_iter()
                .filter(|d| d != "python")
                .map(|d| d.to_ascii_lowercase()),
        );

        if let Some(groups) = toml_table_at(table, &["tool", "poetry", "group"]) {
            for group in groups.values().filter_map(|g| g.as_table()) {
                if let Some(group_deps) = group.get("dependencies").and_then(|d| d.as_table()) {
                    deps.extend(group_deps.keys().map(|k| k.to_ascii_lowercase()));
                }
            }
        }
    }

    fn setup_py_dependencies(content: &str, deps: &mut DependencySet) {
        static INSTALL_REQUIRES_REGEX: OnceLock<Regex> = OnceLock::new();
        static QUOTED_REGEX: OnceLock<Regex> = OnceLock::new();
        let block = INSTALL_REQUIRES_REGEX.get_or_init(|| {
            Regex::new(r"(?s)install_requires\s*=\s*\[(.*?)\]")
                .expect("Invalid install_requires regex")
        });
        let item = QUOTED_REGEX
            .get_or_init(|| Regex::new(r#"["']([^"']+)["']"#).expect("Invalid quoted string regex"));
        if let Some(list) = block.captures(content).and_then(|c| c.get(1)) {
            for spec in item.captures_iter(list.as_str()) {
                if let Some(name) = spec.get(1).and_then(|m| requirement_name(m.as_str())) {
                    deps.push(name);
                }
            }
        }
    }

    fn wsgi_module(ctx: &DetectionContext) -> Option<String> {
        ctx.files
            .files()
            .filter(|e| e.name == "wsgi.py" && e.depth() == 1)
            .map(|e| module_name(&e.path))
            .next()
    }
}

impl Detector for PythonDetector {
    fn spec(&self) -> &'static EcosystemSpec {
        &PYTHON
    }

    fn dependencies(&self, ctx: &DetectionContext) -> Result<Vec<String>, ContentError> {
        let mut deps = DependencySet::new();

        if let Some(requirements) = ctx.read_text("requirements.txt")? {
            deps.extend(requirements_txt(&requirements));
        }
        if let Some(pyproject) = ctx.read_toml("pyproject.toml")? {
            Self::pyproject_dependencies(&pyproject, &mut deps);
        }
        if let Some(pipfile) = ctx.read_toml("Pipfile")? {
            let pipenv = toml_dependencies(&pipfile, &[&["packages"], &["dev-packages"]]);
            deps.extend(pipenv.into_iter().map(|d| d.to_ascii_lowercase()));
        }
        if let Some(setup_py) = ctx.read_text("setup.py")? {
            Self::setup_py_dependencies(&setup_py, &mut deps);
        }

        Ok(deps.into_vec())
    }

    fn package_manager(&self, ctx: &DetectionContext) -> Result<String, ContentError> {
        if ctx.has_file("poetry.lock") {
            return Ok("poetry".to_string());
        }
        if ctx.has_file("uv.lock") {
            return Ok("uv".to_string());
        }
        if ctx.has_file("pdm.lock") {
            return Ok("pdm".to_string());
        }
        if ctx.has_file("Pipfile") {
            return Ok("pipenv".to_string());
        }
        let poetry_project = ctx
            .read_toml("pyproject.toml")?
            .map(|t| toml_table_at(&t, &["tool", "poetry"]).is_some())
            .unwrap_or(false);
        Ok(if poetry_project { "poetry" } else { "pip" }.to_string())
    }

    fn metadata(
        &self,
        ctx: &DetectionContext,
        dependencies: &[String],
    ) -> Result<Option<EcosystemMetadata>, ContentError> {
        let native_packages = dependencies
            .iter()
            .filter(|d| NATIVE_PACKAGES.contains(&d.as_str()))
            .cloned()
            .collect();

        Ok(Some(EcosystemMetadata::Python(PythonMetadata {
            entrypoint: ctx.first_existing(ENTRYPOINTS).map(str::to_string),
            wsgi_module: Self::wsgi_module(ctx),
            manage_py: ctx.has_file("manage.py"),
            native_packages,
        })))
    }

    fn generate_commands(&self, result: &DetectionResult, options: &PlanOptions) -> Commands {
        let has_requirements = result
            .evidence
            .files()
            .iter()
            .any(|f| f == "requirements.txt");

        let setup = match result.package_manager.as_str() {
            "poetry" => vec![
                "pip install poetry".to_string(),
                "poetry config virtualenvs.create false".to_string(),
                "poetry install --no-interaction --no-root".to_string(),
            ],
            "uv" => vec![
                "pip install uv".to_string(),
                "uv pip install --system -r pyproject.toml".to_string(),
            ],
            "pdm" => vec!["pip install pdm".to_string(), "pdm install --prod".to_string()],
            "pipenv" => vec![
                "pip install pipenv".to_string(),
                "pipenv install --deploy --system".to_string(),
            ],
            _ if has_requirements => vec!["pip install --no-cache-dir -r requirements.txt".to_string()],
            _ => vec!["pip install --no-cache-dir .".to_string()],
        };

        let metadata = Self::metadata_of(result);
        let entrypoint = metadata.and_then(|m| m.entrypoint.as_deref());
        let module = entrypoint.map(module_name);

        let mut commands = Commands {
            setup,
            ..Default::default()
        };

        match (result.framework(), metadata) {
            (Some("Django"), Some(m)) if m.manage_py => {
                commands.dev.push("python manage.py runserver 0.0.0.0:8000".to_string());
                commands
                    .build
                    .push("python manage.py collectstatic --noinput".to_string());
                match &m.wsgi_module {
                    Some(wsgi) => commands.run.push(format!(
                        "gunicorn {}:application --bind 0.0.0.0:${{PORT:-8000}}",
                        wsgi
                    )),
                    None => commands
                        .run
                        .push("python manage.py runserver 0.0.0.0:${PORT:-8000}".to_string()),
                }
            }
            (Some("FastAPI" | "Starlette"), _) => {
                if let Some(module) = &module {
                    commands.dev.push(format!("uvicorn {}:app --reload", module));
                    commands.run.push(format!(
                        "uvicorn {}:app --host 0.0.0.0 --port ${{PORT:-8000}}",
                        module
                    ));
                }
            }
            (Some("Flask"), _) => {
                if let Some(module) = &module {
                    commands.dev.push(format!("flask --app {} run --debug", module));
                    commands.run.push(format!(
                        "gunicorn {}:app --bind 0.0.0.0:${{PORT:-8000}}",
                        module
                    ));
                }
            }
            (Some("Streamlit"), _) => {
                if let Some(entry) = entrypoint {
                    commands.run.push(format!(
                        "streamlit run {} --server.address 0.0.0.0 --server.port ${{PORT:-8000}}",
                        shell_quote(entry)
                    ));
                }
            }
            _ => {
                if let Some(entry) = entrypoint {
                    commands.run.push(format!("python {}", shell_quote(entry)));
                }
            }
        }

        options.apply(commands)
    }

    fn generate_environment(&self, _result: &DetectionResult) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("PYTHONUNBUFFERED".to_string(), "1".to_string());
        env.insert("PYTHONDONTWRITEBYTECODE".to_string(), "1".to_string());
        env.insert("PIP_DISABLE_PIP_VERSION_CHECK".to_string(), "1".to_string());
        env
    }

    fn needs_native_compilation(&self, result: &DetectionResult) -> bool {
        Self::metadata_of(result)
            .map(|m| !m.native_packages.is_empty())
            .unwrap_or(false)
    }
}
