//! Phantom File Checker: flags file paths the response asserts exist (or
//! modifies, or creates) when the evidence index has no record of them at
//! all — neither shown to the model nor known to exist in the project.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::PhantomFileConfig;
use crate::types::{Severity, Violation, ViolationType};

use super::util::find_closest;
use super::{CheckInput, Checker, CheckerContext};

/// Bare path-looking tokens: `src/foo/bar.go`, `handlers.py`, `lib/util.ts`.
static FILE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9_][A-Za-z0-9_./\\-]*\.(?:go|py|ts|tsx|js|jsx|rs|java|rb|c|h|cpp|hpp)\b")
        .expect("static regex")
});

pub struct PhantomFileChecker {
    config: PhantomFileConfig,
}

impl PhantomFileChecker {
    pub fn new(config: PhantomFileConfig) -> Self {
        Self { config }
    }
}

impl Checker for PhantomFileChecker {
    fn name(&self) -> &'static str {
        "phantom_file"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);
        let mut violations = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut checked = 0usize;

        for m in FILE_TOKEN.find_iter(scanned) {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            let path = m.as_str();
            if !seen.insert(path.to_string()) {
                continue;
            }
            checked += 1;

            if input.evidence.has_known_file(path) {
                continue;
            }

            let Some(severity) = self.config.base.effective_severity("PHANTOM_FILE", Severity::Critical) else {
                continue;
            };

            let known: std::collections::HashSet<&str> =
                input.evidence.known_files.iter().map(String::as_str).collect();
            let suggestion = find_closest(path, &known)
                .map(|(name, _)| format!("did you mean {name}?"));

            let mut violation = Violation::new(
                ViolationType::PhantomFile,
                severity,
                "PHANTOM_FILE",
                format!("references {path} which does not exist in the project"),
            )
            .with_offset(m.start())
            .with_phase(self.name());

            if let Some(suggestion) = suggestion {
                violation = violation.with_suggestion(suggestion);
            }

            violations.push(violation);
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::EvidenceIndexBuilder;

    #[test]
    fn known_file_is_silent() {
        let checker = PhantomFileChecker::new(PhantomFileConfig::default());
        let ctx = CheckerContext::default();
        let mut input = super::super::test_helpers::empty_input("see src/main.go for details");
        input.evidence = EvidenceIndexBuilder::new().add_file("src/main.go", "package main").build();
        assert!(checker.check(&ctx, &input).is_empty());
    }

    #[test]
    fn unknown_file_is_flagged_with_suggestion() {
        let checker = PhantomFileChecker::new(PhantomFileConfig::default());
        let ctx = CheckerContext::default();
        let mut input = super::super::test_helpers::empty_input("see src/mains.go for details");
        input.evidence = EvidenceIndexBuilder::new()
            .known_files(vec!["src/main.go".to_string()])
            .build();
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "PHANTOM_FILE");
        assert!(violations[0].suggestion.is_some());
    }
}
