//! Relationship Checker: validates "A imports B" and "A calls B" claims
//! against the evidence index's import and call-graph maps. Silently skips
//! a claim when either endpoint isn't present in the evidence at all — that
//! is the Phantom File/Symbol checkers' territory, not a relationship
//! mismatch.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::RelationshipConfig;
use crate::types::{Severity, Violation, ViolationType};

use super::{CheckInput, Checker, CheckerContext};

/// `main.go imports pkg/config`
static IMPORTS_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z0-9_./\\-]+\.[A-Za-z0-9_]+)\s+imports?\s+([A-Za-z0-9_./-]+)").expect("static regex")
});

/// `Handler() calls Validate()`
static CALLS_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\(\)\s+calls?\s+([A-Za-z_][A-Za-z0-9_]*)\(\)").expect("static regex")
});

pub struct RelationshipChecker {
    config: RelationshipConfig,
}

impl RelationshipChecker {
    pub fn new(config: RelationshipConfig) -> Self {
        Self { config }
    }
}

impl Checker for RelationshipChecker {
    fn name(&self) -> &'static str {
        "relationship"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);
        let mut violations = Vec::new();
        let mut checked = 0usize;

        for m in IMPORTS_CLAIM.captures_iter(scanned) {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            let file = m.get(1).unwrap().as_str();
            let pkg = m.get(2).unwrap().as_str();

            let Some(imports) = input.evidence.imports.get(file) else {
                continue;
            };
            checked += 1;

            if imports.iter().any(|i| i.path == pkg) {
                continue;
            }

            if let Some(severity) =
                self.config.base.effective_severity("RELATIONSHIP_IMPORT_NOT_FOUND", Severity::High)
            {
                violations.push(
                    Violation::new(
                        ViolationType::RelationshipHallucination,
                        severity,
                        "RELATIONSHIP_IMPORT_NOT_FOUND",
                        format!("claims {file} imports {pkg}, which isn't among its recorded imports"),
                    )
                    .with_offset(m.get(0).unwrap().start())
                    .with_phase(self.name()),
                );
            }
        }

        for m in CALLS_CLAIM.captures_iter(scanned) {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            let caller = m.get(1).unwrap().as_str();
            let callee = m.get(2).unwrap().as_str();

            if !input.evidence.has_known_symbol(caller) || !input.evidence.has_known_symbol(callee) {
                continue;
            }

            let Some(calls) = input.evidence.calls_within.get(caller) else {
                continue;
            };
            checked += 1;

            if calls.iter().any(|c| c == callee) {
                continue;
            }

            if let Some(severity) =
                self.config.base.effective_severity("RELATIONSHIP_CALL_NOT_FOUND", Severity::High)
            {
                violations.push(
                    Violation::new(
                        ViolationType::RelationshipHallucination,
                        severity,
                        "RELATIONSHIP_CALL_NOT_FOUND",
                        format!("claims {caller}() calls {callee}(), which isn't among its recorded calls"),
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
    use crate::evidence::{EvidenceIndexBuilder, Import, SymbolKind, SymbolOccurrence};

    fn sym(name: &str) -> SymbolOccurrence {
        SymbolOccurrence {
            name: name.to_string(),
            kind: SymbolKind::Function,
            file: "main.go".to_string(),
            line: 1,
            return_types: vec![],
            parameters: vec![],
            fields: vec![],
            methods: vec![],
            receiver: None,
        }
    }

    #[test]
    fn recorded_import_is_silent() {
        let checker = RelationshipChecker::new(RelationshipConfig::default());
        let ctx = CheckerContext::default();
        let mut input = super::super::test_helpers::empty_input("main.go imports pkg/config");
        input.evidence = EvidenceIndexBuilder::new()
            .add_import("main.go", Import { path: "pkg/config".to_string(), alias: "config".to_string() })
            .build();
        assert!(checker.check(&ctx, &input).is_empty());
    }

    #[test]
    fn unrecorded_import_is_flagged() {
        let checker = RelationshipChecker::new(RelationshipConfig::default());
        let ctx = CheckerContext::default();
        let mut input = super::super::test_helpers::empty_input("main.go imports pkg/database");
        input.evidence = EvidenceIndexBuilder::new()
            .add_import("main.go", Import { path: "pkg/config".to_string(), alias: "config".to_string() })
            .build();
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "RELATIONSHIP_IMPORT_NOT_FOUND");
    }

    #[test]
    fn unrecorded_call_is_flagged_when_both_symbols_known() {
        let checker = RelationshipChecker::new(RelationshipConfig::default());
        let ctx = CheckerContext::default();
        let mut input = super::super::test_helpers::empty_input("Handler() calls Validate()");
        input.evidence = EvidenceIndexBuilder::new()
            .add_symbol(sym("Handler"))
            .add_symbol(sym("Validate"))
            .add_call("Handler", "Authorize")
            .build();
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "RELATIONSHIP_CALL_NOT_FOUND");
    }

    #[test]
    fn call_skipped_when_callee_unknown() {
        let checker = RelationshipChecker::new(RelationshipConfig::default());
        let ctx = CheckerContext::default();
        let mut input = super::super::test_helpers::empty_input("Handler() calls Ghost()");
        input.evidence = EvidenceIndexBuilder::new().add_symbol(sym("Handler")).build();
        assert!(checker.check(&ctx, &input).is_empty());
    }
}
