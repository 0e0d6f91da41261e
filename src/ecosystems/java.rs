//! JVM (Maven and Gradle, Java and Kotlin)

use super::parsers::DependencySet;
use crate::detection::metadata::JvmMetadata;
use crate::detection::spec::{framework, weighted};
use crate::detection::{
    normalize_version, DetectionContext, DetectionResult, Detector, EcosystemMetadata,
    EcosystemSpec, Indicator, VersionPrecision, VersionSource,
};
use crate::error::ContentError;
use crate::output::{Commands, PlanOptions};
use regex::Regex;
use roxmltree::Document;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const BUILD_FILES: &[&str] = &["pom.xml", "build.gradle", "build.gradle.kts"];
const GRADLE_FILES: &[&str] = &["build.gradle.kts", "build.gradle"];

const POM_VERSION_PROPERTIES: &[&str] = &[
    "java.version",
    "maven.compiler.release",
    "maven.compiler.source",
    "maven.compiler.target",
];

pub static JAVA: EcosystemSpec = EcosystemSpec {
    name: "java",
    priority: 20,
    threshold: 0.3,
    indicators: &[
        weighted(45, Indicator::AnyFile(BUILD_FILES)),
        weighted(15, Indicator::AnyFile(&["mvnw", "gradlew"])),
        weighted(25, Indicator::Extension(&["java", "kt"])),
        weighted(
            15,
            Indicator::AnyFile(&[".java-version", ".sdkmanrc", "settings.gradle", "settings.gradle.kts"]),
        ),
    ],
    manifests: BUILD_FILES,
    // pom.xml properties and Gradle toolchains are read by the detector itself
    version_sources: &[
        VersionSource::PinFile(".java-version"),
        VersionSource::Pattern {
            file: ".sdkmanrc",
            pattern: r"java\s*=\s*(\d+)",
        },
    ],
    version_precision: VersionPrecision::Major,
    default_version: "21",
    frameworks: &[
        framework("org.springframework.boot:*", "Spring Boot"),
        framework("io.quarkus:*", "Quarkus"),
        framework("io.micronaut:*", "Micronaut"),
        framework("io.micronaut.platform:*", "Micronaut"),
        framework("io.ktor:*", "Ktor"),
    ],
    excluded_dirs: &["target", "build", ".gradle", ".mvn"],
};

/// `groupId:artifactId` for every parent, dependency and plugin in a POM
pub fn pom_dependencies(path: &str, content: &str) -> Result<Vec<String>, ContentError> {
    let doc = Document::parse(content).map_err(|e| ContentError::parse(path, e))?;
    let mut deps = DependencySet::new();

    for node in doc.descendants() {
        if !(node.has_tag_name("parent") || node.has_tag_name("dependency") || node.has_tag_name("plugin")) {
            continue;
        }
        let child_text = |name: &str| {
            node.children()
                .find(|c| c.has_tag_name(name))
                .and_then(|c| c.text())
                .map(|t| t.trim().to_string())
        };
        if let (Some(group), Some(artifact)) = (child_text("groupId"), child_text("artifactId")) {
            deps.push(format!("{}:{}", group, artifact));
        }
    }

    Ok(deps.into_vec())
}

/// Java release declared in POM properties
pub fn pom_java_version(path: &str, content: &str) -> Result<Option<String>, ContentError> {
    let doc = Document::parse(content).map_err(|e| ContentError::parse(path, e))?;
    for property in POM_VERSION_PROPERTIES {
        let version = doc
            .descendants()
            .find(|n| n.has_tag_name(*property))
            .and_then(|n| n.text())
            .map(|t| t.trim().trim_start_matches("1.").to_string())
            .and_then(|v| normalize_version(&v, VersionPrecision::Major));
        if version.is_some() {
            return Ok(version);
        }
    }
    Ok(None)
}

/// `group:artifact` coordinates and applied plugin ids from a Gradle build script
pub fn gradle_dependencies(content: &str) -> Vec<String> {
    let mut deps = DependencySet::new();
    static COORDINATE_REGEX: OnceLock<Regex> = OnceLock::new();
    static PLUGIN_REGEX: OnceLock<Regex> = OnceLock::new();
    let coordinate = COORDINATE_REGEX.get_or_init(|| {
        Regex::new(r#"["']([A-Za-z0-9_.\-]+):([A-Za-z0-9_.\-]+)(?::[^"']*)?["']"#)
            .expect("Invalid Gradle coordinate regex")
    });
    let plugin = PLUGIN_REGEX.get_or_init(|| {
        Regex::new(r#"\bid\s*\(?\s*["']([A-Za-z0-9_.\-]+)["']"#).expect("Invalid Gradle plugin regex")
    });

    for caps in plugin.captures_iter(content) {
        if let Some(id) = caps.get(1) {
            deps.push(format!("{}:plugin", id.as_str()));
        }
    }
    for caps in coordinate.captures_iter(content) {
        if let (Some(group), Some(artifact)) = (caps.get(1), caps.get(2)) {
            deps.push(format!("{}:{}", group.as_str(), artifact.as_str()));
        }
    }
    deps.into_vec()
}

pub fn gradle_java_version(content: &str) -> Option<String> {
    static TOOLCHAIN_REGEXES: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = TOOLCHAIN_REGEXES.get_or_init(|| {
        [
            r"JavaLanguageVersion\.of\(\s*(\d+)\s*\)",
            r"jvmToolchain\(\s*(\d+)\s*\)",
            r#"sourceCompatibility\s*=\s*(?:JavaVersion\.VERSION_)?['"]?(?:1[._])?(\d+)"#,
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("Invalid Gradle toolchain regex"))
        .collect()
    });
    patterns.iter().find_map(|re| {
        re.captures(content)?
            .get(1)
            .map(|m| m.as_str().to_string())
    })
}

pub struct JavaDetector;

impl JavaDetector {
    fn metadata_of(result: &DetectionResult) -> Option<&JvmMetadata> {
        match &result.metadata {
            Some(EcosystemMetadata::Java(metadata)) => Some(metadata),
            _ => None,
        }
    }
}

impl Detector for JavaDetector {
    fn spec(&self) -> &'static EcosystemSpec {
        &JAVA
    }

    fn dependencies(&self, ctx: &DetectionContext) -> Result<Vec<String>, ContentError> {
        let mut deps = DependencySet::new();
        if let Some(pom) = ctx.read_text("pom.xml")? {
            deps.extend(pom_dependencies("pom.xml", &pom)?);
        }
        for file in GRADLE_FILES {
            if let Some(script) = ctx.read_text(file)? {
                deps.extend(gradle_dependencies(&script));
            }
        }
        Ok(deps.into_vec())
    }

    fn detect_version(&self, ctx: &DetectionContext) -> Result<Option<String>, ContentError> {
        let spec = self.spec();
        if let Some(version) = ctx.version_from_sources(spec.version_sources, spec.version_precision)? {
            return Ok(Some(version));
        }
        if let Some(pom) = ctx.read_text("pom.xml")? {
            if let Some(version) = pom_java_version("pom.xml", &pom)? {
                return Ok(Some(version));
            }
        }
        for file in GRADLE_FILES {
            if let Some(version) = ctx.read_text(file)?.and_then(|s| gradle_java_version(&s)) {
                return Ok(Some(version));
            }
        }
        Ok(None)
    }

    fn package_manager(&self, ctx: &DetectionContext) -> Result<String, ContentError> {
        Ok(if ctx.has_file("pom.xml") { "maven" } else { "gradle" }.to_string())
    }

    fn metadata(
        &self,
        ctx: &DetectionContext,
        _dependencies: &[String],
    ) -> Result<Option<EcosystemMetadata>, ContentError> {
        let build_tool = self.package_manager(ctx)?;
        let wrapper = if build_tool == "maven" {
            ctx.has_file("mvnw")
        } else {
            ctx.has_file("gradlew")
        };

        Ok(Some(EcosystemMetadata::Java(JvmMetadata {
            build_tool,
            wrapper,
            kotlin: ctx.has_file("build.gradle.kts") || ctx.has_extension(&["kt"]),
        })))
    }

    fn generate_commands(&self, result: &DetectionResult, options: &PlanOptions) -> Commands {
        let metadata = Self::metadata_of(result);
        let wrapper = metadata.map(|m| m.wrapper).unwrap_or(false);
        let framework = result.framework();
        let mut commands = Commands::default();

        if result.package_manager == "maven" {
            let mvn = if wrapper { "./mvnw" } else { "mvn" };
            commands.setup.push(format!("{} -B dependency:go-offline", mvn));
            commands.build.push(format!("{} -B package -DskipTests", mvn));
            match framework {
                Some("Spring Boot") => commands.dev.push(format!("{} spring-boot:run", mvn)),
                Some("Quarkus") => commands.dev.push(format!("{} quarkus:dev", mvn)),
                _ => {}
            }
            commands.run.push(match framework {
                Some("Quarkus") => "java -jar target/quarkus-app/quarkus-run.jar".to_string(),
                _ => "java $JAVA_OPTS -jar target/*.jar".to_string(),
            });
        } else {
            let gradle = if wrapper { "./gradlew" } else { "gradle" };
            commands.setup.push(format!("{} dependencies --no-daemon", gradle));
            commands.build.push(format!("{} build -x test --no-daemon", gradle));
            match framework {
                Some("Spring Boot") => commands.dev.push(format!("{} bootRun", gradle)),
                Some("Quarkus") => commands.dev.push(format!("{} quarkusDev", gradle)),
                Some("Ktor") => commands.dev.push(format!("{} run", gradle)),
                _ => {}
            }
            commands.run.push(match framework {
                Some("Quarkus") => "java -jar build/quarkus-app/quarkus-run.jar".to_string(),
                _ => "java $JAVA_OPTS -jar $(ls build/libs/*.jar | grep -v plain | head -n 1)".to_string(),
            });
        }

        options.apply(commands)
    }

    fn generate_environment(&self, _result: &DetectionResult) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert(
            "JAVA_OPTS".to_string(),
            "-XX:+UseContainerSupport -XX:MaxRAMPercentage=75.0".to_string(),
        );
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockContent;
    use std::path::Path;

    const SPRING_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
    <parent>
        <groupId>org.springframework.boot</groupId>
        <artifactId>spring-boot-starter-parent</artifactId>
        <version>3.2.0</version>
    </parent>
    <artifactId>demo</artifactId>
    <properties>
        <java.version>17</java.version>
    </properties>
    <dependencies>
        <dependency>
            <groupId>org.springframework.boot</groupId>
            <artifactId>spring-boot-starter-web</artifactId>
        </dependency>
    </dependencies>
</project>"#;

    fn detect(files: &[(&str, &str)]) -> DetectionResult {
        let content = MockContent::with_files(files);
        JavaDetector
            .detect(Path::new("/repo"), &content.snapshot(), &content)
            .unwrap()
    }

    #[test]
    fn test_spring_boot_maven() {
        let result = detect(&[
            ("pom.xml", SPRING_POM),
            ("mvnw", ""),
            ("src/main/java/com/example/App.java", ""),
        ]);

        assert!(result.matched);
        assert_eq!(result.framework, "Spring Boot");
        assert_eq!(result.version, "17");
        assert_eq!(result.package_manager, "maven");

        let commands = JavaDetector.generate_commands(&result, &PlanOptions::default());
        assert_eq!(commands.build, vec!["./mvnw -B package -DskipTests"]);
        assert_eq!(commands.dev, vec!["./mvnw spring-boot:run"]);
    }

    #[test]
    fn test_pom_dependencies() {
        let deps = pom_dependencies("pom.xml", SPRING_POM).unwrap();
        assert_eq!(
            deps,
            vec![
                "org.springframework.boot:spring-boot-starter-parent",
                "org.springframework.boot:spring-boot-starter-web"
            ]
        );
    }

    #[test]
    fn test_legacy_compiler_source() {
        let pom = "<project><properties><maven.compiler.source>1.8</maven.compiler.source></properties></project>";
        assert_eq!(pom_java_version("pom.xml", pom).unwrap().as_deref(), Some("8"));
    }

    #[test]
    fn test_malformed_pom() {
        let err = pom_dependencies("pom.xml", "<project>").unwrap_err();
        assert!(matches!(err, ContentError::Parse { .. }));
    }

    #[test]
    fn test_ktor_gradle_kotlin() {
        let result = detect(&[
            (
                "build.gradle.kts",
                "plugins {\n    id(\"io.ktor.plugin\") version \"2.3.7\"\n}\nkotlin { jvmToolchain(17) }\ndependencies {\n    implementation(\"io.ktor:ktor-server-netty:2.3.7\")\n}\n",
            ),
            ("gradlew", ""),
            ("src/main/kotlin/Application.kt", ""),
        ]);

        assert_eq!(result.framework, "Ktor");
        assert_eq!(result.version, "17");
        assert_eq!(result.package_manager, "gradle");
        assert!(matches!(
            &result.metadata,
            Some(EcosystemMetadata::Java(m)) if m.kotlin && m.wrapper
        ));
    }

    #[test]
    fn test_quarkus_gradle_groovy() {
        let result = detect(&[
            (
                "build.gradle",
                "dependencies {\n  implementation 'io.quarkus:quarkus-resteasy'\n}\njava {\n  sourceCompatibility = JavaVersion.VERSION_21\n}\n",
            ),
            ("src/main/java/App.java", ""),
        ]);

        assert_eq!(result.framework, "Quarkus");
        assert_eq!(result.version, "21");
        let commands = JavaDetector.generate_commands(&result, &PlanOptions::default());
        assert_eq!(commands.build, vec!["gradle build -x test --no-daemon"]);
        assert_eq!(commands.run, vec!["java -jar build/quarkus-app/quarkus-run.jar"]);
    }

    #[test]
    fn test_gradle_script_parsing() {
        let script = r#"
plugins { id("org.springframework.boot") version "3.2.0" }
java { toolchain { languageVersion = JavaLanguageVersion.of(21) } }
dependencies { implementation("io.ktor:ktor-server-core:2.3.7") }
"#;
        assert_eq!(gradle_java_version(script).as_deref(), Some("21"));
        assert_eq!(
            gradle_dependencies(script),
            vec!["org.springframework.boot:plugin", "io.ktor:ktor-server-core"]
        );
        assert_eq!(gradle_java_version("sourceCompatibility = '1.8'").as_deref(), Some("8"));
        assert_eq!(gradle_java_version("apply plugin: 'java'"), None);
    }

    #[test]
    fn test_java_version_file_wins() {
        let result = detect(&[("pom.xml", SPRING_POM), (".java-version", "21\n")]);
        assert_eq!(result.version, "21");
    }
}
