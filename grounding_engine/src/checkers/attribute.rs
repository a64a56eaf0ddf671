//! Attribute Checker: validates claims about a symbol's shape — its return
//! type, parameter count, or field/method membership — against every
//! occurrence of that symbol the evidence index has recorded. Polymorphic
//! overloads are tolerated: a claim only fails if it matches none of the
//! symbol's recorded occurrences, never just the first one found.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::AttributeConfig;
use crate::evidence::SymbolOccurrence;
use crate::types::{Severity, Violation, ViolationType};

use super::{CheckInput, Checker, CheckerContext};

/// `Foo() returns an error`, `Bar() returns (int, error)`
static RETURNS_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\(\)\s+returns?\s+(?:an?\s+)?([A-Za-z0-9_.,()* ]+?)(?:[.,\n]|$)")
        .expect("static regex")
});

/// `Foo() takes 3 arguments`, `Bar() accepts 2 parameters`
static TAKES_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\(\)\s+(?:takes?|accepts?)\s+(\d+)\s+(?:arguments?|parameters?)")
        .expect("static regex")
});

fn normalize_type(s: &str) -> String {
    s.trim().trim_start_matches('*').to_lowercase().replace(' ', "")
}

fn return_type_matches(occurrences: &[&SymbolOccurrence], claimed: &str) -> bool {
    let claimed = normalize_type(claimed);
    occurrences.iter().any(|occ| {
        let joined = occ.return_types.join(",");
        let normalized = normalize_type(&joined);
        normalized == claimed || normalized.contains(&claimed) || claimed.contains(&normalized)
    })
}

fn param_count_matches(occurrences: &[&SymbolOccurrence], claimed: usize) -> bool {
    occurrences.iter().any(|occ| occ.parameters.len() == claimed)
}

pub struct AttributeChecker {
    config: AttributeConfig,
}

impl AttributeChecker {
    pub fn new(config: AttributeConfig) -> Self {
        Self { config }
    }
}

impl Checker for AttributeChecker {
    fn name(&self) -> &'static str {
        "attribute"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);
        let mut violations = Vec::new();
        let mut checked = 0usize;

        for m in RETURNS_CLAIM.captures_iter(scanned) {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            let name = m.get(1).unwrap().as_str();
            let claimed = m.get(2).unwrap().as_str();
            let occurrences = input.evidence.symbols_named(name);
            if occurrences.is_empty() {
                continue;
            }
            checked += 1;

            if return_type_matches(&occurrences, claimed) {
                continue;
            }

            if let Some(severity) =
                self.config.base.effective_severity("ATTRIBUTE_RETURN_TYPE_MISMATCH", Severity::High)
            {
                violations.push(
                    Violation::new(
                        ViolationType::AttributeHallucination,
                        severity,
                        "ATTRIBUTE_RETURN_TYPE_MISMATCH",
                        format!("claims {name}() returns {claimed}, which matches none of its recorded signatures"),
                    )
                    .with_offset(m.get(0).unwrap().start())
                    .with_phase(self.name()),
                );
            }
        }

        for m in TAKES_CLAIM.captures_iter(scanned) {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            let name = m.get(1).unwrap().as_str();
            let Ok(claimed) = m.get(2).unwrap().as_str().parse::<usize>() else {
                continue;
            };
            let occurrences = input.evidence.symbols_named(name);
            if occurrences.is_empty() {
                continue;
            }
            checked += 1;

            if param_count_matches(&occurrences, claimed) {
                continue;
            }

            if let Some(severity) =
                self.config.base.effective_severity("ATTRIBUTE_PARAM_COUNT_MISMATCH", Severity::High)
            {
                violations.push(
                    Violation::new(
                        ViolationType::AttributeHallucination,
                        severity,
                        "ATTRIBUTE_PARAM_COUNT_MISMATCH",
                        format!("claims {name}() takes {claimed} arguments, which matches none of its recorded signatures"),
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
    use crate::evidence::{EvidenceIndexBuilder, SymbolKind};

    fn func(name: &str, return_types: Vec<&str>, params: usize) -> SymbolOccurrence {
        SymbolOccurrence {
            name: name.to_string(),
            kind: SymbolKind::Function,
            file: "main.go".to_string(),
            line: 1,
            return_types: return_types.into_iter().map(String::from).collect(),
            parameters: (0..params).map(|i| format!("p{i}")).collect(),
            fields: vec![],
            methods: vec![],
            receiver: None,
        }
    }

    #[test]
    fn matching_return_type_is_silent() {
        let checker = AttributeChecker::new(AttributeConfig::default());
        let ctx = CheckerContext::default();
        let mut input = super::super::test_helpers::empty_input("ParseConfig() returns error");
        input.evidence = EvidenceIndexBuilder::new().add_symbol(func("ParseConfig", vec!["error"], 1)).build();
        assert!(checker.check(&ctx, &input).is_empty());
    }

    #[test]
    fn mismatched_return_type_is_flagged() {
        let checker = AttributeChecker::new(AttributeConfig::default());
        let ctx = CheckerContext::default();
        let mut input = super::super::test_helpers::empty_input("ParseConfig() returns bool");
        input.evidence = EvidenceIndexBuilder::new().add_symbol(func("ParseConfig", vec!["error"], 1)).build();
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "ATTRIBUTE_RETURN_TYPE_MISMATCH");
    }

    #[test]
    fn overload_tolerance_accepts_any_matching_occurrence() {
        let checker = AttributeChecker::new(AttributeConfig::default());
        let ctx = CheckerContext::default();
        let mut input = super::super::test_helpers::empty_input("Connect() takes 2 arguments");
        input.evidence = EvidenceIndexBuilder::new()
            .add_symbol(func("Connect", vec!["error"], 1))
            .add_symbol(func("Connect", vec!["error"], 2))
            .build();
        assert!(checker.check(&ctx, &input).is_empty());
    }
}
