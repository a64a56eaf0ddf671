//! Structural Claim Checker (opt-in): validates directory/tree-shaped
//! listings in the response — `├── handlers/auth.go` style lines — against
//! the evidence index, the same way a prose citation is checked, just for
//! tree-drawing notation instead of a sentence.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::StructuralClaimConfig;
use crate::types::{Severity, Violation, ViolationType};

use super::{CheckInput, Checker, CheckerContext};

/// `├── handlers/auth.go`, `└── main.go`, `|-- config/`
static TREE_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[\s│|]*(?:├──|└──|\|--|`--)\s*([A-Za-z0-9_./\\-]+)\s*$").expect("static regex")
});

pub struct StructuralClaimChecker {
    config: StructuralClaimConfig,
}

impl StructuralClaimChecker {
    pub fn new(config: StructuralClaimConfig) -> Self {
        Self { config }
    }
}

impl Checker for StructuralClaimChecker {
    fn name(&self) -> &'static str {
        "structural_claim"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);
        let mut violations = Vec::new();
        let mut checked = 0usize;

        for m in TREE_ENTRY.captures_iter(scanned) {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            let entry = m.get(1).unwrap().as_str();
            // Directories (trailing slash) aren't tracked as files; skip them.
            if entry.ends_with('/') {
                continue;
            }
            checked += 1;

            if input.evidence.has_known_file(entry) {
                continue;
            }

            if let Some(severity) =
                self.config.base.effective_severity("STRUCTURAL_CLAIM_PHANTOM_ENTRY", Severity::High)
            {
                violations.push(
                    Violation::new(
                        ViolationType::StructuralClaim,
                        severity,
                        "STRUCTURAL_CLAIM_PHANTOM_ENTRY",
                        format!("lists {entry} in a directory tree, but it doesn't exist in the project"),
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

    fn enabled_config() -> StructuralClaimConfig {
        let mut config = StructuralClaimConfig::default();
        config.base.enabled = true;
        config
    }

    #[test]
    fn known_entry_is_silent() {
        let checker = StructuralClaimChecker::new(enabled_config());
        let ctx = CheckerContext::default();
        let mut input =
            super::super::test_helpers::empty_input("project layout:\n├── main.go\n└── handlers/auth.go\n");
        input.evidence = EvidenceIndexBuilder::new()
            .known_files(vec!["main.go".to_string(), "handlers/auth.go".to_string()])
            .build();
        assert!(checker.check(&ctx, &input).is_empty());
    }

    #[test]
    fn phantom_entry_is_flagged() {
        let checker = StructuralClaimChecker::new(enabled_config());
        let ctx = CheckerContext::default();
        let mut input = super::super::test_helpers::empty_input("project layout:\n├── ghost.go\n");
        input.evidence = EvidenceIndexBuilder::new().known_files(vec!["main.go".to_string()]).build();
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "STRUCTURAL_CLAIM_PHANTOM_ENTRY");
    }
}
