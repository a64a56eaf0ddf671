//! Behavioral Checker: flags claims about what the code *does* — error
//! handling, input validation, security practices — that the shown code
//! contradicts. Three curated categories, each a claim-pattern paired with
//! the code shapes that would support or contradict it.
//!
//! With `RequireCounterEvidence` off (the default) an unsupported claim —
//! one where the code context shows neither the supporting nor the
//! contradicting shape — is still worth a quiet `Warning`; turning it on
//! restricts the checker to claims the code actively contradicts.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::BehavioralConfig;
use crate::types::{Severity, Violation, ViolationType};

use super::{CheckInput, Checker, CheckerContext};

struct Category {
    name: &'static str,
    claim: Regex,
    supports: Regex,
    contradicts: Regex,
}

static CATEGORIES: LazyLock<Vec<Category>> = LazyLock::new(|| {
    vec![
        Category {
            name: "error_handling",
            claim: Regex::new(r"(?i)\bhandles?\s+(?:all\s+)?errors?\s+(?:gracefully|properly|correctly)")
                .unwrap(),
            supports: Regex::new(r"(?i)if\s+err\s*!=\s*nil|try\s*\{|except\s+\w*Error|\.catch\(")
                .unwrap(),
            contradicts: Regex::new(r"(?i)panic\(|unwrap\(\)|os\.exit|process\.exit").unwrap(),
        },
        Category {
            name: "validation",
            claim: Regex::new(r"(?i)\bvalidates?\s+(?:the\s+)?(?:user\s+)?input").unwrap(),
            supports: Regex::new(r"(?i)validate|sanitiz|\.is_valid\(|schema\.parse").unwrap(),
            contradicts: Regex::new(r"(?i)//\s*todo.*validat|no\s+validation").unwrap(),
        },
        Category {
            name: "security",
            claim: Regex::new(r"(?i)\b(?:sanitiz(?:es|ed)|escapes?|prevents?\s+injection)\b").unwrap(),
            supports: Regex::new(r"(?i)prepared\s+statement|parameteriz|escape|sanitiz|bind_param").unwrap(),
            contradicts: Regex::new(
                r#"(?i)fmt\.Sprintf\(\s*"[^"]*%s[^"]*select|"\s*\+\s*\w+\s*\+\s*"|f"select.*\{"#,
            )
            .unwrap(),
        },
    ]
});

pub struct BehavioralChecker {
    config: BehavioralConfig,
}

impl BehavioralChecker {
    pub fn new(config: BehavioralConfig) -> Self {
        Self { config }
    }
}

impl Checker for BehavioralChecker {
    fn name(&self) -> &'static str {
        "behavioral"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);
        let code: String = input
            .code_context
            .iter()
            .map(|entry| entry.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if code.is_empty() {
            return Vec::new();
        }

        let mut violations = Vec::new();
        let mut checked = 0usize;

        for category in CATEGORIES.iter() {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            let Some(m) = category.claim.find(scanned) else {
                continue;
            };
            checked += 1;

            if category.contradicts.is_match(&code) {
                if let Some(severity) = self
                    .config
                    .base
                    .effective_severity("BEHAVIORAL_CONTRADICTED", Severity::High)
                {
                    violations.push(
                        Violation::new(
                            ViolationType::BehavioralHallucination,
                            severity,
                            "BEHAVIORAL_CONTRADICTED",
                            format!("claims {} behavior, but the shown code contains a contradicting pattern", category.name),
                        )
                        .with_offset(m.start())
                        .with_phase(self.name()),
                    );
                }
                continue;
            }

            if self.config.require_counter_evidence {
                continue;
            }

            if !category.supports.is_match(&code) {
                if let Some(severity) = self
                    .config
                    .base
                    .effective_severity("BEHAVIORAL_UNSUPPORTED", Severity::Warning)
                {
                    violations.push(
                        Violation::new(
                            ViolationType::BehavioralHallucination,
                            severity,
                            "BEHAVIORAL_UNSUPPORTED",
                            format!("claims {} behavior, but the shown code shows no supporting pattern", category.name),
                        )
                        .with_offset(m.start())
                        .with_phase(self.name()),
                    );
                }
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::CodeContextEntry;

    fn with_code(response: &str, code: &str) -> CheckInput {
        let mut input = super::super::test_helpers::empty_input(response);
        input.code_context.push(CodeContextEntry { file_path: "main.go".to_string(), content: code.to_string() });
        input
    }

    #[test]
    fn supported_claim_is_silent() {
        let checker = BehavioralChecker::new(BehavioralConfig::default());
        let ctx = CheckerContext::default();
        let input = with_code(
            "this function handles errors gracefully",
            "if err != nil { return err }",
        );
        assert!(checker.check(&ctx, &input).is_empty());
    }

    #[test]
    fn contradicted_claim_is_flagged() {
        let checker = BehavioralChecker::new(BehavioralConfig::default());
        let ctx = CheckerContext::default();
        let input = with_code(
            "this function handles errors gracefully",
            "result := risky().unwrap()",
        );
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations[0].code, "BEHAVIORAL_CONTRADICTED");
    }

    #[test]
    fn unsupported_claim_is_flagged_by_default() {
        let checker = BehavioralChecker::new(BehavioralConfig::default());
        let ctx = CheckerContext::default();
        let input = with_code("this function validates user input", "x := 1 + 1");
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations[0].code, "BEHAVIORAL_UNSUPPORTED");
    }

    #[test]
    fn unsupported_claim_is_silent_when_counter_evidence_required() {
        let mut config = BehavioralConfig::default();
        config.require_counter_evidence = true;
        let checker = BehavioralChecker::new(config);
        let ctx = CheckerContext::default();
        let input = with_code("this function validates user input", "x := 1 + 1");
        assert!(checker.check(&ctx, &input).is_empty());
    }
}
