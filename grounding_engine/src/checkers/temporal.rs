//! Temporal Checker: flags claims that depend on project history — "added
//! in the last commit", "recently refactored", "hasn't changed since
//! v1" — that this crate has no way to verify, since the evidence index is
//! a point-in-time snapshot with no git log. Always `Warning`: these claims
//! are unverifiable, not necessarily false.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::TemporalConfig;
use crate::types::{Severity, Violation, ViolationType};

use super::{CheckInput, Checker, CheckerContext};

static TEMPORAL_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:recently|just)\s+(?:added|changed|refactored|introduced|modified|updated|removed|deprecated)\b|\b(?:added|changed|modified|introduced)\s+in\s+(?:the\s+)?(?:last|latest|previous|most\s+recent)\s+(?:commit|release|version|update)\b|\bhas(?:n't|\s+not)\s+(?:changed|been\s+touched|been\s+modified)\s+since\b",
    )
    .expect("static regex")
});

pub struct TemporalChecker {
    config: TemporalConfig,
}

impl TemporalChecker {
    pub fn new(config: TemporalConfig) -> Self {
        Self { config }
    }
}

impl Checker for TemporalChecker {
    fn name(&self) -> &'static str {
        "temporal"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);
        let mut violations = Vec::new();
        let mut checked = 0usize;

        for m in TEMPORAL_CLAIM.find_iter(scanned) {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            checked += 1;

            if let Some(severity) =
                self.config.base.effective_severity("TEMPORAL_UNVERIFIABLE", Severity::Warning)
            {
                violations.push(
                    Violation::new(
                        ViolationType::TemporalHallucination,
                        severity,
                        "TEMPORAL_UNVERIFIABLE",
                        format!("makes a history-dependent claim (\"{}\") this crate cannot verify from a point-in-time snapshot", m.as_str().trim()),
                    )
                    .with_offset(m.start())
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

    #[test]
    fn history_claim_is_flagged() {
        let checker = TemporalChecker::new(TemporalConfig::default());
        let ctx = CheckerContext::default();
        let input = super::super::test_helpers::empty_input("this function was recently refactored for clarity");
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "TEMPORAL_UNVERIFIABLE");
        assert_eq!(violations[0].severity, Severity::Warning);
    }

    #[test]
    fn non_temporal_claim_is_silent() {
        let checker = TemporalChecker::new(TemporalConfig::default());
        let ctx = CheckerContext::default();
        let input = super::super::test_helpers::empty_input("this function returns an error on failure");
        assert!(checker.check(&ctx, &input).is_empty());
    }
}
