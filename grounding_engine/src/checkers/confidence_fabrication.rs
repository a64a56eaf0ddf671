//! Confidence Fabrication Checker: flags absolute-confidence language
//! ("definitely", "always works", "100% guaranteed") made against weak or
//! absent supporting evidence, and circular ("tautological") justifications
//! where the reason restates the claim rather than supporting it.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::ConfidenceFabricationConfig;
use crate::types::{Severity, Violation, ViolationType};

use super::util::tokenize_words;
use super::{CheckInput, Checker, CheckerContext};

static ABSOLUTE_LANGUAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:definitely|certainly|undoubtedly|guaranteed|100%|always works|never fails|absolutely (?:correct|certain))\b")
        .expect("static regex")
});

/// `<claim> because <reason>` — flagged when `reason` is just `claim`
/// restated.
static BECAUSE_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([^.\n]{8,120}?)\s+because\s+([^.\n]{8,120})").expect("static regex")
});

#[derive(PartialEq, Eq, Debug)]
enum EvidenceStrength {
    Absent,
    Partial,
    Strong,
}

fn evidence_strength(claim: &str, input: &CheckInput) -> EvidenceStrength {
    if input.tool_results.is_empty() {
        return EvidenceStrength::Absent;
    }
    let claim_tokens: std::collections::HashSet<String> = tokenize_words(claim).into_iter().collect();
    if claim_tokens.is_empty() {
        return EvidenceStrength::Absent;
    }
    let evidence_tokens: std::collections::HashSet<String> = input
        .tool_results
        .iter()
        .flat_map(|r| tokenize_words(&r.output))
        .collect();
    let overlap = claim_tokens.intersection(&evidence_tokens).count();
    let ratio = overlap as f64 / claim_tokens.len() as f64;
    if ratio >= 0.3 {
        EvidenceStrength::Strong
    } else if ratio > 0.0 {
        EvidenceStrength::Partial
    } else {
        EvidenceStrength::Absent
    }
}

/// Proper case-insensitive substring check, not a full equality — a
/// restated claim is rarely byte-identical to its reason clause.
fn is_tautological(claim: &str, reason: &str) -> bool {
    let claim_norm = claim.trim().to_lowercase();
    let reason_norm = reason.trim().to_lowercase();
    if claim_norm.len() < 8 || reason_norm.len() < 8 {
        return false;
    }
    reason_norm.contains(&claim_norm) || claim_norm.contains(&reason_norm)
}

pub struct ConfidenceFabricationChecker {
    config: ConfidenceFabricationConfig,
}

impl ConfidenceFabricationChecker {
    pub fn new(config: ConfidenceFabricationConfig) -> Self {
        Self { config }
    }
}

impl Checker for ConfidenceFabricationChecker {
    fn name(&self) -> &'static str {
        "confidence_fabrication"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);
        let mut violations = Vec::new();
        let mut checked = 0usize;

        for m in ABSOLUTE_LANGUAGE.find_iter(scanned) {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            checked += 1;

            let window_start = m.start().saturating_sub(80);
            let window = &scanned[window_start..m.end()];
            let strength = evidence_strength(window, input);
            if strength == EvidenceStrength::Strong {
                continue;
            }

            let severity_default = if strength == EvidenceStrength::Absent {
                Severity::High
            } else {
                Severity::Warning
            };

            if let Some(severity) =
                self.config.base.effective_severity("CONFIDENCE_FABRICATION_ABSOLUTE", severity_default)
            {
                violations.push(
                    Violation::new(
                        ViolationType::ConfidenceFabrication,
                        severity,
                        "CONFIDENCE_FABRICATION_ABSOLUTE",
                        format!("uses absolute-confidence language (\"{}\") without strong supporting evidence", m.as_str()),
                    )
                    .with_offset(m.start())
                    .with_phase(self.name()),
                );
            }
        }

        for m in BECAUSE_CLAUSE.captures_iter(scanned) {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            let claim = m.get(1).unwrap().as_str();
            let reason = m.get(2).unwrap().as_str();
            if !is_tautological(claim, reason) {
                continue;
            }
            checked += 1;

            if let Some(severity) =
                self.config.base.effective_severity("CONFIDENCE_FABRICATION_TAUTOLOGY", Severity::Warning)
            {
                violations.push(
                    Violation::new(
                        ViolationType::ConfidenceFabrication,
                        severity,
                        "CONFIDENCE_FABRICATION_TAUTOLOGY",
                        "justifies a claim with a restatement of itself rather than supporting evidence",
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
    use crate::checkers::ToolResult;

    #[test]
    fn absolute_language_without_evidence_is_flagged() {
        let checker = ConfidenceFabricationChecker::new(ConfidenceFabricationConfig::default());
        let ctx = CheckerContext::default();
        let input = super::super::test_helpers::empty_input("this approach definitely handles all edge cases");
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations[0].code, "CONFIDENCE_FABRICATION_ABSOLUTE");
        assert_eq!(violations[0].severity, Severity::High);
    }

    #[test]
    fn absolute_language_with_strong_evidence_is_silent() {
        let checker = ConfidenceFabricationChecker::new(ConfidenceFabricationConfig::default());
        let ctx = CheckerContext::default();
        let mut input =
            super::super::test_helpers::empty_input("the test suite definitely passes all edge cases");
        input.tool_results.push(ToolResult {
            invocation_id: "1".to_string(),
            output: "test suite passes all edge cases: 42/42 green".to_string(),
        });
        assert!(checker.check(&ctx, &input).is_empty());
    }

    #[test]
    fn tautological_justification_is_flagged() {
        let checker = ConfidenceFabricationChecker::new(ConfidenceFabricationConfig::default());
        let ctx = CheckerContext::default();
        let input = super::super::test_helpers::empty_input(
            "the cache invalidation is safe because the cache invalidation is safe",
        );
        let violations = checker.check(&ctx, &input);
        assert!(violations.iter().any(|v| v.code == "CONFIDENCE_FABRICATION_TAUTOLOGY"));
    }
}
