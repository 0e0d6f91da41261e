use super::types::DetectionResult;
use tracing::debug;

/// Languages that are always packaged around their server runtime
pub const BACKEND_LANGUAGES: &[&str] = &["java", "python", "php", "ruby", "rust", "go"];

/// Server-side frameworks that promote an otherwise frontend ecosystem
pub const BACKEND_FRAMEWORKS: &[&str] =
    &["Express", "Fastify", "NestJS", "Koa", "Hapi", "Hono", "Oak"];

/// Backend-over-frontend selection policy.
///
/// A repository with both a backend manifest and static assets is packaged
/// around the backend, even when the static-site score is higher. Ties go to
/// the earlier result, which is registration order when the results come from
/// [`super::DetectionEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPolicy {
    pub backend_languages: Vec<String>,
    pub backend_frameworks: Vec<String>,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            backend_languages: BACKEND_LANGUAGES.iter().map(|s| s.to_string()).collect(),
            backend_frameworks: BACKEND_FRAMEWORKS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SelectionPolicy {
    pub fn is_backend(&self, result: &DetectionResult) -> bool {
        self.backend_languages
            .iter()
            .any(|l| l.eq_ignore_ascii_case(&result.language))
            || result
                .framework()
                .map(|f| self.backend_frameworks.iter().any(|b| b == f))
                .unwrap_or(false)
    }

    pub fn select<'r>(&self, results: &'r [DetectionResult]) -> Option<&'r DetectionResult> {
        let backend = highest(results.iter().filter(|r| self.is_backend(r)));
        if let Some(selected) = backend {
            debug!(
                provider = %selected.language,
                confidence = selected.confidence,
                "Selected backend result"
            );
            return Some(selected);
        }

        let selected = highest(results.iter());
        if let Some(selected) = selected {
            debug!(
                provider = %selected.language,
                confidence = selected.confidence,
                "Selected highest-confidence result"
            );
        }
        selected
    }
}

/// Maximum confidence; the first of equal candidates wins
fn highest<'r>(results: impl Iterator<Item = &'r DetectionResult>) -> Option<&'r DetectionResult> {
    results.fold(None, |best: Option<&DetectionResult>, candidate| match best {
        Some(current) if candidate.confidence <= current.confidence => Some(current),
        _ => Some(candidate),
    })
}
