//! Multi-Sample Verifier: when the caller supplies independent re-samples
//! of the same prompt, cross-checks that a claim in the primary response
//! also appears in enough of the other samples to count as consensus
//! rather than a one-off fabrication. A no-op when no additional samples
//! were supplied — there's nothing to cross-check against.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::MultiSampleConfig;
use crate::types::{Severity, Violation, ViolationType};

use super::{CheckInput, Checker, CheckerContext};

/// Claim-shaped spans: a symbol call, or a `file:line` citation. Shared
/// shape with the Phantom Symbol / Citation checkers, kept intentionally
/// independent since this checker canonicalizes differently (by text, not
/// by evidence lookup).
static CLAIM_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*\(\)|[A-Za-z0-9_./\\-]+\.[A-Za-z0-9_]+:\d+").expect("static regex")
});

fn canonical_claims(text: &str) -> HashSet<String> {
    CLAIM_SHAPE.find_iter(text).map(|m| m.as_str().to_lowercase()).collect()
}

pub struct MultiSampleChecker {
    config: MultiSampleConfig,
}

impl MultiSampleChecker {
    pub fn new(config: MultiSampleConfig) -> Self {
        Self { config }
    }
}

impl Checker for MultiSampleChecker {
    fn name(&self) -> &'static str {
        "multi_sample"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() || input.additional_samples.is_empty() {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);
        let primary_claims: Vec<(String, usize)> = CLAIM_SHAPE
            .find_iter(scanned)
            .take(self.config.base.max_claims)
            .map(|m| (m.as_str().to_lowercase(), m.start()))
            .collect();

        if primary_claims.is_empty() {
            return Vec::new();
        }

        let sample_claim_sets: Vec<HashSet<String>> =
            input.additional_samples.iter().map(|s| canonical_claims(s)).collect();

        let mut violations = Vec::new();
        let mut seen = HashSet::new();

        for (claim, offset) in primary_claims {
            if ctx.cancellation.is_cancelled() {
                break;
            }
            if !seen.insert(claim.clone()) {
                continue;
            }

            // Count the primary response itself plus every sample that
            // independently reproduces the claim.
            let support = 1 + sample_claim_sets.iter().filter(|set| set.contains(&claim)).count();

            // Threshold-inclusive: exactly ConsensusThreshold samples agreeing
            // counts as consensus, not just strictly more.
            if support >= self.config.consensus_threshold {
                continue;
            }

            if let Some(severity) =
                self.config.base.effective_severity("MULTI_SAMPLE_NO_CONSENSUS", Severity::High)
            {
                violations.push(
                    Violation::new(
                        ViolationType::Ungrounded,
                        severity,
                        "MULTI_SAMPLE_NO_CONSENSUS",
                        format!(
                            "claim \"{claim}\" appears in only {support}/{} sampled responses",
                            1 + sample_claim_sets.len()
                        ),
                    )
                    .with_offset(offset)
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

    fn input(response: &str, samples: Vec<&str>) -> CheckInput {
        let mut input = super::super::test_helpers::empty_input(response);
        input.additional_samples = samples.into_iter().map(String::from).collect();
        input
    }

    #[test]
    fn no_samples_is_a_no_op() {
        let checker = MultiSampleChecker::new(MultiSampleConfig::default());
        let ctx = CheckerContext::default();
        let i = input("calls ValidateToken() first", vec![]);
        assert!(checker.check(&ctx, &i).is_empty());
    }

    #[test]
    fn claim_reproduced_in_enough_samples_is_silent() {
        let checker = MultiSampleChecker::new(MultiSampleConfig::default());
        let ctx = CheckerContext::default();
        let i = input(
            "calls ValidateToken() first",
            vec!["first it calls ValidateToken() to check the session", "ValidateToken() runs before anything else"],
        );
        assert!(checker.check(&ctx, &i).is_empty());
    }

    #[test]
    fn one_off_claim_fails_consensus() {
        let checker = MultiSampleChecker::new(MultiSampleConfig::default());
        let ctx = CheckerContext::default();
        let i = input(
            "calls FabricatedHelper() first",
            vec!["it validates the request", "nothing unusual happens here"],
        );
        let violations = checker.check(&ctx, &i);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "MULTI_SAMPLE_NO_CONSENSUS");
    }
}
