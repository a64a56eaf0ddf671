//! Phantom Package Checker: flags import paths the response asserts exist
//! when they're neither a known project package nor a recognized standard
//! library entry for the project's language. Never excuses a project-shaped
//! path (`pkg/...`, `internal/...`) as stdlib just because it resembles one.

use std::sync::LazyLock;
use std::collections::HashSet;

use regex::Regex;

use crate::config::PhantomPackageConfig;
use crate::types::{Severity, Violation, ViolationType};

use super::util::find_closest;
use super::{CheckInput, Checker, CheckerContext};

/// `import "pkg/foo/bar"`, `import foo from 'pkg/foo'`, `require("pkg/foo")`
static IMPORT_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:import|require)\s*\(?\s*"?([A-Za-z0-9_./-]+)"?\)?"#).expect("static regex")
});

pub struct PhantomPackageChecker {
    config: PhantomPackageConfig,
}

impl PhantomPackageChecker {
    pub fn new(config: PhantomPackageConfig) -> Self {
        Self { config }
    }
}

impl Checker for PhantomPackageChecker {
    fn name(&self) -> &'static str {
        "phantom_package"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);
        let mut violations = Vec::new();
        let mut seen = HashSet::new();
        let mut checked = 0usize;

        for m in IMPORT_CLAIM.captures_iter(scanned) {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            let whole = m.get(0).unwrap();
            let pkg = m.get(1).unwrap().as_str();
            if !seen.insert(pkg.to_string()) {
                continue;
            }
            checked += 1;

            if input.evidence.package_exists(pkg, &input.project_language) {
                continue;
            }

            let Some(severity) = self.config.base.effective_severity("PHANTOM_PACKAGE", Severity::Critical) else {
                continue;
            };

            let known: HashSet<&str> = input.evidence.known_packages.iter().map(String::as_str).collect();
            let suggestion = find_closest(pkg, &known).map(|(found, _)| format!("did you mean {found}?"))
                .or_else(|| {
                    let suggestions = input.evidence.suggest_packages(self.config.max_suggestions);
                    if suggestions.is_empty() {
                        None
                    } else {
                        Some(format!("known packages include: {}", suggestions.join(", ")))
                    }
                });

            let mut violation = Violation::new(
                ViolationType::PhantomPackage,
                severity,
                "PHANTOM_PACKAGE",
                format!("imports {pkg} which does not exist in the project or its language's standard library"),
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
