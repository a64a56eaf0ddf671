//! Phantom Symbol Checker: flags function/type/method names the response
//! treats as real when the evidence index has never seen them defined or
//! listed as known. A small stop-list filters out common English words that
//! happen to look like identifiers (`Server`, `Request`, `Error`) unless
//! they're call-shaped (`Foo()`), which strongly signals a genuine symbol
//! reference.

use std::sync::LazyLock;
use std::collections::HashSet;

use regex::Regex;

use crate::config::PhantomSymbolConfig;
use crate::types::{Severity, Violation, ViolationType};

use super::util::find_closest;
use super::{CheckInput, Checker, CheckerContext};

static CALL_SHAPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]{2,})\(\)").expect("static regex"));

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "if", "for", "while", "return", "new", "this", "self", "true", "false", "null", "nil",
        "error", "request", "response", "server", "client", "string", "int", "bool", "map",
        "list", "array", "object", "data", "value", "result", "context", "config",
    ]
    .into_iter()
    .collect()
});

pub struct PhantomSymbolChecker {
    config: PhantomSymbolConfig,
}

impl PhantomSymbolChecker {
    pub fn new(config: PhantomSymbolConfig) -> Self {
        Self { config }
    }
}

impl Checker for PhantomSymbolChecker {
    fn name(&self) -> &'static str {
        "phantom_symbol"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);
        let mut violations = Vec::new();
        let mut seen = HashSet::new();
        let mut checked = 0usize;

        for m in CALL_SHAPED.captures_iter(scanned) {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            let whole = m.get(0).unwrap();
            let name = m.get(1).unwrap().as_str();
            if STOP_WORDS.contains(name.to_lowercase().as_str()) {
                continue;
            }
            if !seen.insert(name.to_string()) {
                continue;
            }
            checked += 1;

            if input.evidence.has_known_symbol(name) {
                continue;
            }

            let Some(severity) = self.config.base.effective_severity("PHANTOM_SYMBOL", Severity::Critical) else {
                continue;
            };

            let known: HashSet<&str> = input.evidence.known_symbols.iter().map(String::as_str).collect();
            let suggestion = find_closest(name, &known).map(|(found, _)| format!("did you mean {found}?"));

            let mut violation = Violation::new(
                ViolationType::PhantomSymbol,
                severity,
                "PHANTOM_SYMBOL",
                format!("calls {name}() which is not defined anywhere in the project"),
            )
            .with_offset(whole.start())
            .with_phase(self.name());

            if let Some(suggestion) = suggestion {
                violation = violation.with_suggestion(suggestion);
            }

            violations.push(violation);
        }

        violations
    }
}
