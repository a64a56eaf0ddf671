//! Language Checker: flags responses that reach for another language's
//! idioms or frameworks entirely — "add a WSGI middleware" for a Go
//! project, "use a goroutine" for a Python one — which signals the model
//! confused the project's language rather than misnaming a single symbol.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::LanguageConfig;
use crate::types::{Severity, Violation, ViolationType};

use super::{CheckInput, Checker, CheckerContext};

/// Patterns that strongly identify a *different* language than the key,
/// keyed by the project's declared language.
static FOREIGN_PATTERNS: LazyLock<HashMap<&'static str, Regex>> = LazyLock::new(|| {
    let mut m = HashMap::new();
    m.insert(
        "go",
        Regex::new(r"(?i)\b(?:wsgi|asgi|pip install|def __init__|self\.\w+\s*=|import numpy|using System;|public static void main)\b")
            .unwrap(),
    );
    m.insert(
        "python",
        Regex::new(r"(?i)\b(?:goroutine|go func|package main|import \(|using System;|public static void main)\b")
            .unwrap(),
    );
    m.insert(
        "javascript",
        Regex::new(r"(?i)\b(?:goroutine|def __init__|using System;|public static void main|fn main\(\))\b")
            .unwrap(),
    );
    m.insert(
        "typescript",
        Regex::new(r"(?i)\b(?:goroutine|def __init__|using System;|public static void main|fn main\(\))\b")
            .unwrap(),
    );
    m
});

pub struct LanguageChecker {
    config: LanguageConfig,
}

impl LanguageChecker {
    pub fn new(config: LanguageConfig) -> Self {
        Self { config }
    }
}

impl Checker for LanguageChecker {
    fn name(&self) -> &'static str {
        "language"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() {
            return Vec::new();
        }

        let project_language = input.project_language.to_lowercase();
        let Some(pattern) = FOREIGN_PATTERNS.get(project_language.as_str()) else {
            return Vec::new();
        };

        let scanned = input.scanned_response(self.config.base.scan_limit);
        let mut violations = Vec::new();
        let mut checked = 0usize;

        for m in pattern.find_iter(scanned) {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            checked += 1;

            if let Some(severity) = self.config.base.effective_severity("WRONG_LANGUAGE_IDIOM", Severity::High)
            {
                violations.push(
                    Violation::new(
                        ViolationType::WrongLanguage,
                        severity,
                        "WRONG_LANGUAGE_IDIOM",
                        format!(
                            "uses \"{}\", an idiom foreign to a {} project",
                            m.as_str(),
                            input.project_language
                        ),
                    )
                    .with_offset(m.start())
                    .with_phase(self.name()),
                );
            }
        }

        violations
    }
}
