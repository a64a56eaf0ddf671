//! Grounding Checker: the general-purpose claim extractor for framework and
//! language assertions that don't have a dedicated checker of their own.
//! "This project uses Flask" is checked against the evidence index's
//! detected framework set; a claim about a framework nobody observed is
//! ungrounded, not necessarily wrong — hence `Warning`, not `Critical`.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::GroundingConfig;
use crate::types::{Severity, Violation, ViolationType};

use super::{CheckInput, Checker, CheckerContext};

const KNOWN_FRAMEWORKS: &[&str] = &[
    "flask", "django", "fastapi", "express", "gin", "echo", "fiber", "rails", "spring",
    "actix", "axum", "rocket", "nestjs", "next.js", "react", "vue", "angular",
];

/// `uses Flask`, `built with Gin`, `powered by Django`
static FRAMEWORK_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:uses?|built with|powered by|based on)\s+([A-Za-z][A-Za-z0-9._-]*)")
        .expect("static regex")
});

/// `written in Go`, `this is a Python project`
static LANGUAGE_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bwritten in\s+([A-Za-z][A-Za-z0-9+#]*)").expect("static regex")
});

pub struct GroundingChecker {
    config: GroundingConfig,
}

impl GroundingChecker {
    pub fn new(config: GroundingConfig) -> Self {
        Self { config }
    }
}

impl Checker for GroundingChecker {
    fn name(&self) -> &'static str {
        "grounding"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);
        let mut violations = Vec::new();
        let mut checked = 0usize;

        for m in FRAMEWORK_CLAIM.captures_iter(scanned) {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            let claimed = m.get(1).unwrap().as_str();
            let lower = claimed.to_lowercase();
            if !KNOWN_FRAMEWORKS.contains(&lower.as_str()) {
                continue;
            }
            checked += 1;

            if input.evidence.frameworks.contains(&lower) {
                continue;
            }

            if let Some(severity) =
                self.config.base.effective_severity("UNGROUNDED_FRAMEWORK_CLAIM", Severity::Warning)
            {
                violations.push(
                    Violation::new(
                        ViolationType::Ungrounded,
                        severity,
                        "UNGROUNDED_FRAMEWORK_CLAIM",
                        format!("claims the project uses {claimed}, which was not observed in the evidence"),
                    )
                    .with_offset(m.get(0).unwrap().start())
                    .with_phase(self.name()),
                );
            }
        }

        for m in LANGUAGE_CLAIM.captures_iter(scanned) {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            checked += 1;
            let claimed = m.get(1).unwrap().as_str().to_lowercase();

            if input.evidence.languages.is_empty() || input.evidence.languages.contains(&claimed) {
                continue;
            }

            if let Some(severity) =
                self.config.base.effective_severity("UNGROUNDED_LANGUAGE_CLAIM", Severity::Warning)
            {
                violations.push(
                    Violation::new(
                        ViolationType::Ungrounded,
                        severity,
                        "UNGROUNDED_LANGUAGE_CLAIM",
                        format!("claims the project is written in {claimed}, which doesn't match the observed language(s)"),
                    )
                    .with_offset(m.get(0).unwrap().start())
                    .with_phase(self.name()),
                );
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::EvidenceIndexBuilder;

    #[test]
    fn matching_framework_is_silent() {
        let checker = GroundingChecker::new(GroundingConfig::default());
        let ctx = CheckerContext::default();
        let mut input = super::super::test_helpers::empty_input("this project uses Gin for routing");
        input.evidence = EvidenceIndexBuilder::new().add_framework("gin").build();
        assert!(checker.check(&ctx, &input).is_empty());
    }

    #[test]
    fn mismatched_framework_is_flagged() {
        let checker = GroundingChecker::new(GroundingConfig::default());
        let ctx = CheckerContext::default();
        let mut input = super::super::test_helpers::empty_input("this project uses Django for routing");
        input.evidence = EvidenceIndexBuilder::new().add_framework("gin").build();
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "UNGROUNDED_FRAMEWORK_CLAIM");
    }

    #[test]
    fn language_claim_checked_only_when_evidence_present() {
        let checker = GroundingChecker::new(GroundingConfig::default());
        let ctx = CheckerContext::default();
        let input = super::super::test_helpers::empty_input("this service is written in Rust");
        // No languages observed at all: nothing to contradict, stays silent.
        assert!(checker.check(&ctx, &input).is_empty());
    }
}
