//! Chain-of-Verification Checker (opt-in): a lightweight self-consistency
//! pass that re-runs simple claim extraction over the same response and
//! looks for direct contradictions within it — e.g. asserting a symbol
//! "does not exist" in one sentence and calling it as though it does in
//! another.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::ChainOfVerificationConfig;
use crate::types::{Severity, Violation, ViolationType};

use super::{CheckInput, Checker, CheckerContext};

static NEGATION_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:there(?:'s| is) no (?:function|method)\s+(?:called\s+)?([A-Za-z_][A-Za-z0-9_]*)|([A-Za-z_][A-Za-z0-9_]*)\(\)\s+(?:does not|doesn't)\s+exist)\b")
        .expect("static regex")
});

static AFFIRMATION_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\(\)\s+(?:returns?|takes?|handles?|validates?)").expect("static regex"));

pub struct ChainOfVerificationChecker {
    config: ChainOfVerificationConfig,
}

impl ChainOfVerificationChecker {
    pub fn new(config: ChainOfVerificationConfig) -> Self {
        Self { config }
    }
}

impl Checker for ChainOfVerificationChecker {
    fn name(&self) -> &'static str {
        "chain_of_verification"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);

        let mut negated: HashMap<String, usize> = HashMap::new();
        for m in NEGATION_CLAIM.captures_iter(scanned) {
            let name = m.get(1).or_else(|| m.get(2)).unwrap().as_str().to_string();
            negated.entry(name.to_lowercase()).or_insert_with(|| m.get(0).unwrap().start());
        }
        if negated.is_empty() {
            return Vec::new();
        }

        let mut violations = Vec::new();
        let mut seen = HashSet::new();
        let mut checked = 0usize;

        for m in AFFIRMATION_CALL.captures_iter(scanned) {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            let name = m.get(1).unwrap().as_str().to_lowercase();
            let Some(&negation_offset) = negated.get(&name) else {
                continue;
            };
            if !seen.insert(name.clone()) {
                continue;
            }
            checked += 1;

            if let Some(severity) = self
                .config
                .base
                .effective_severity("CHAIN_OF_VERIFICATION_SELF_CONTRADICTION", Severity::High)
            {
                violations.push(
                    Violation::new(
                        ViolationType::BehavioralHallucination,
                        severity,
                        "CHAIN_OF_VERIFICATION_SELF_CONTRADICTION",
                        format!(
                            "asserts {name}() doesn't exist at offset {negation_offset}, then describes its behavior as though it does"
                        ),
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

    fn enabled_config() -> ChainOfVerificationConfig {
        let mut config = ChainOfVerificationConfig::default();
        config.base.enabled = true;
        config
    }

    #[test]
    fn self_contradiction_is_flagged() {
        let checker = ChainOfVerificationChecker::new(enabled_config());
        let ctx = CheckerContext::default();
        let input = super::super::test_helpers::empty_input(
            "there is no function called ValidateScope in this codebase. ValidateScope() returns an error if the scope is invalid.",
        );
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "CHAIN_OF_VERIFICATION_SELF_CONTRADICTION");
    }

    #[test]
    fn consistent_response_is_silent() {
        let checker = ChainOfVerificationChecker::new(enabled_config());
        let ctx = CheckerContext::default();
        let input = super::super::test_helpers::empty_input("ValidateScope() returns an error if the scope is invalid.");
        assert!(checker.check(&ctx, &input).is_empty());
    }
}
