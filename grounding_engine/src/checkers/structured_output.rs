//! Structured Output Checker (opt-in): validates every fenced ```json block
//! in the response actually parses, and that an object block isn't empty —
//! catching the model hallucinating a JSON shape that isn't valid JSON at
//! all, rather than validating field-level semantics.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::StructuredOutputConfig;
use crate::types::{Severity, Violation, ViolationType};

use super::{CheckInput, Checker, CheckerContext};

static JSON_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*\n(.*?)```").expect("static regex"));

pub struct StructuredOutputChecker {
    config: StructuredOutputConfig,
}

impl StructuredOutputChecker {
    pub fn new(config: StructuredOutputConfig) -> Self {
        Self { config }
    }
}

impl Checker for StructuredOutputChecker {
    fn name(&self) -> &'static str {
        "structured_output"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);
        let mut violations = Vec::new();
        let mut checked = 0usize;

        for m in JSON_BLOCK.captures_iter(scanned) {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            let body = m.get(1).unwrap().as_str();
            checked += 1;

            match serde_json::from_str::<serde_json::Value>(body) {
                Err(e) => {
                    if let Some(severity) =
                        self.config.base.effective_severity("STRUCTURED_OUTPUT_MALFORMED", Severity::High)
                    {
                        violations.push(
                            Violation::new(
                                ViolationType::StructuralClaim,
                                severity,
                                "STRUCTURED_OUTPUT_MALFORMED",
                                format!("declares a ```json block that doesn't parse: {e}"),
                            )
                            .with_offset(m.get(0).unwrap().start())
                            .with_phase(self.name()),
                        );
                    }
                }
                Ok(serde_json::Value::Object(map)) if map.is_empty() => {
                    if let Some(severity) =
                        self.config.base.effective_severity("STRUCTURED_OUTPUT_EMPTY", Severity::Warning)
                    {
                        violations.push(
                            Violation::new(
                                ViolationType::StructuralClaim,
                                severity,
                                "STRUCTURED_OUTPUT_EMPTY",
                                "declares a ```json block that parses but contains no keys",
                            )
                            .with_offset(m.get(0).unwrap().start())
                            .with_phase(self.name()),
                        );
                    }
                }
                Ok(_) => {}
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_config() -> StructuredOutputConfig {
        let mut config = StructuredOutputConfig::default();
        config.base.enabled = true;
        config
    }

    #[test]
    fn valid_json_block_is_silent() {
        let checker = StructuredOutputChecker::new(enabled_config());
        let ctx = CheckerContext::default();
        let input = super::super::test_helpers::empty_input("```json\n{\"status\": \"ok\"}\n```");
        assert!(checker.check(&ctx, &input).is_empty());
    }

    #[test]
    fn malformed_json_block_is_flagged() {
        let checker = StructuredOutputChecker::new(enabled_config());
        let ctx = CheckerContext::default();
        let input = super::super::test_helpers::empty_input("```json\n{\"status\": \n```");
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations[0].code, "STRUCTURED_OUTPUT_MALFORMED");
    }

    #[test]
    fn disabled_by_default() {
        let checker = StructuredOutputChecker::new(StructuredOutputConfig::default());
        let ctx = CheckerContext::default();
        let input = super::super::test_helpers::empty_input("```json\n{\"status\": \n```");
        assert!(checker.check(&ctx, &input).is_empty());
    }
}
