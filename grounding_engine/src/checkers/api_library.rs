//! API Library Checker: flags "uses X" library claims where X isn't among
//! the recorded imports, with a curated confusion table catching the
//! common case of attributing a real library's API to the wrong package
//! ("uses gorm" when the project actually imports sqlx).

use std::sync::LazyLock;
use std::collections::HashMap;

use regex::Regex;

use crate::config::ApiLibraryConfig;
use crate::types::{Severity, Violation, ViolationType};

use super::util::levenshtein;
use super::{CheckInput, Checker, CheckerContext};

/// Pairs of libraries commonly confused for one another because they serve
/// the same role in a given ecosystem.
static CONFUSION_TABLE: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    [
        ("gorm", "sqlx"), ("sqlx", "gorm"),
        ("gin", "echo"), ("echo", "gin"),
        ("logrus", "zap"), ("zap", "logrus"),
        ("flask", "django"), ("django", "flask"),
        ("requests", "httpx"), ("httpx", "requests"),
        ("axios", "fetch"), ("fetch", "axios"),
    ]
    .into_iter()
    .collect()
});

/// `uses gorm.Open`, `using the requests library`, `via axios.get`
static LIBRARY_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:uses?|using|via)\s+(?:the\s+)?([A-Za-z][A-Za-z0-9_-]*)(?:\.[A-Za-z0-9_]+)?(?:\s+library)?")
        .expect("static regex")
});

fn library_root(pkg: &str) -> String {
    pkg.rsplit('/').next().unwrap_or(pkg).to_lowercase()
}

fn imported_libraries(input: &CheckInput) -> Vec<String> {
    input
        .evidence
        .imports
        .values()
        .flatten()
        .map(|i| library_root(&i.path))
        .collect()
}

pub struct ApiLibraryChecker {
    config: ApiLibraryConfig,
}

impl ApiLibraryChecker {
    pub fn new(config: ApiLibraryConfig) -> Self {
        Self { config }
    }
}

impl Checker for ApiLibraryChecker {
    fn name(&self) -> &'static str {
        "api_library"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() {
            return Vec::new();
        }

        let imported = imported_libraries(input);
        if imported.is_empty() {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);
        let mut violations = Vec::new();
        let mut checked = 0usize;
        let mut seen = std::collections::HashSet::new();

        for m in LIBRARY_CLAIM.captures_iter(scanned) {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            let claimed = m.get(1).unwrap().as_str().to_lowercase();
            if !CONFUSION_TABLE.contains_key(claimed.as_str()) {
                continue;
            }
            if !seen.insert(claimed.clone()) {
                continue;
            }
            checked += 1;

            if imported.iter().any(|lib| lib == &claimed) {
                continue;
            }

            let confused_with = CONFUSION_TABLE.get(claimed.as_str()).copied();
            let actually_imports_confusable = confused_with
                .map(|counterpart| imported.iter().any(|lib| lib == counterpart))
                .unwrap_or(false);

            if !actually_imports_confusable {
                // Not necessarily wrong: could be a library this checker
                // doesn't confuse-track but that's still genuinely imported
                // under an alias the evidence index didn't capture.
                let close = imported
                    .iter()
                    .map(|lib| (lib, levenshtein(lib, &claimed)))
                    .min_by_key(|(_, d)| *d);
                let Some((_, distance)) = close else { continue };
                if distance > 3 {
                    continue;
                }
            }

            if let Some(severity) =
                self.config.base.effective_severity("API_LIBRARY_CONFUSION", Severity::High)
            {
                let mut violation = Violation::new(
                    ViolationType::ApiHallucination,
                    severity,
                    "API_LIBRARY_CONFUSION",
                    format!("claims the project uses {claimed}, which isn't among its recorded imports"),
                )
                .with_offset(m.get(0).unwrap().start())
                .with_phase(self.name());

                if let Some(counterpart) = confused_with.filter(|c| imported.iter().any(|lib| lib == c)) {
                    violation = violation.with_suggestion(format!("the project actually imports {counterpart}"));
                }

                violations.push(violation);
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{EvidenceIndexBuilder, Import};

    fn with_import(response: &str, path: &str) -> CheckInput {
        let mut input = super::super::test_helpers::empty_input(response);
        input.evidence = EvidenceIndexBuilder::new()
            .add_import("main.go", Import { path: path.to_string(), alias: String::new() })
            .build();
        input
    }

    #[test]
    fn matching_library_is_silent() {
        let checker = ApiLibraryChecker::new(ApiLibraryConfig::default());
        let ctx = CheckerContext::default();
        let input = with_import("this project uses gorm for the ORM layer", "github.com/jinzhu/gorm");
        assert!(checker.check(&ctx, &input).is_empty());
    }

    #[test]
    fn confused_library_is_flagged_with_correction() {
        let checker = ApiLibraryChecker::new(ApiLibraryConfig::default());
        let ctx = CheckerContext::default();
        let input = with_import("this project uses gorm for the ORM layer", "github.com/jmoiron/sqlx");
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "API_LIBRARY_CONFUSION");
        assert!(violations[0].suggestion.as_deref().unwrap().contains("sqlx"));
    }
}
