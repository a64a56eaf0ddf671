//! Cross-Context Checker: catches a claim that attributes a real field or
//! method to the wrong occurrence of a same-named symbol — e.g. a project
//! with two distinct `Config` structs, where the response describes fields
//! that belong to one `Config` while citing the file that defines the
//! other.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::CrossContextConfig;
use crate::types::{Severity, Violation, ViolationType};

use super::{CheckInput, Checker, CheckerContext};

/// `in main.go, Config has a field Timeout`
static FIELD_IN_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bin\s+([A-Za-z0-9_./\\-]+\.[A-Za-z0-9_]+),?\s+([A-Za-z_][A-Za-z0-9_]*)\s+has\s+a\s+(?:field|method)\s+([A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("static regex")
});

pub struct CrossContextChecker {
    config: CrossContextConfig,
}

impl CrossContextChecker {
    pub fn new(config: CrossContextConfig) -> Self {
        Self { config }
    }
}

impl Checker for CrossContextChecker {
    fn name(&self) -> &'static str {
        "cross_context"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);
        let mut violations = Vec::new();
        let mut checked = 0usize;

        for m in FIELD_IN_FILE.captures_iter(scanned) {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            let file = m.get(1).unwrap().as_str();
            let symbol = m.get(2).unwrap().as_str();
            let member = m.get(3).unwrap().as_str();

            let occurrences = input.evidence.symbols_named(symbol);
            if occurrences.len() < 2 {
                // Needs at least two occurrences to even have a "wrong one".
                continue;
            }
            checked += 1;

            let has_member_somewhere = occurrences
                .iter()
                .any(|occ| occ.fields.iter().chain(occ.methods.iter()).any(|f| f == member));
            if !has_member_somewhere {
                // A phantom member entirely; the Attribute Checker's territory.
                continue;
            }

            let matches_in_claimed_file = occurrences.iter().any(|occ| {
                occ.file == file && occ.fields.iter().chain(occ.methods.iter()).any(|f| f == member)
            });

            if matches_in_claimed_file {
                continue;
            }

            if let Some(severity) =
                self.config.base.effective_severity("CROSS_CONTEXT_MEMBER_MISMATCH", Severity::High)
            {
                violations.push(
                    Violation::new(
                        ViolationType::CrossContextConfusion,
                        severity,
                        "CROSS_CONTEXT_MEMBER_MISMATCH",
                        format!(
                            "claims {symbol} in {file} has {member}, but that member belongs to a different occurrence of {symbol}"
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
    use crate::evidence::{EvidenceIndexBuilder, SymbolKind, SymbolOccurrence};

    fn config_occ(file: &str, fields: Vec<&str>) -> SymbolOccurrence {
        SymbolOccurrence {
            name: "Config".to_string(),
            kind: SymbolKind::Struct,
            file: file.to_string(),
            line: 1,
            return_types: vec![],
            parameters: vec![],
            fields: fields.into_iter().map(String::from).collect(),
            methods: vec![],
            receiver: None,
        }
    }

    #[test]
    fn field_attributed_to_correct_occurrence_is_silent() {
        let checker = CrossContextChecker::new(CrossContextConfig::default());
        let ctx = CheckerContext::default();
        let mut input =
            super::super::test_helpers::empty_input("in server/main.go, Config has a field Timeout");
        input.evidence = EvidenceIndexBuilder::new()
            .add_symbol(config_occ("server/main.go", vec!["Timeout"]))
            .add_symbol(config_occ("client/config.go", vec!["RetryLimit"]))
            .build();
        assert!(checker.check(&ctx, &input).is_empty());
    }

    #[test]
    fn field_attributed_to_wrong_occurrence_is_flagged() {
        let checker = CrossContextChecker::new(CrossContextConfig::default());
        let ctx = CheckerContext::default();
        let mut input =
            super::super::test_helpers::empty_input("in server/main.go, Config has a field RetryLimit");
        input.evidence = EvidenceIndexBuilder::new()
            .add_symbol(config_occ("server/main.go", vec!["Timeout"]))
            .add_symbol(config_occ("client/config.go", vec!["RetryLimit"]))
            .build();
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "CROSS_CONTEXT_MEMBER_MISMATCH");
    }
}
