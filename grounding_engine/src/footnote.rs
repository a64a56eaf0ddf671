//! Footnote / reprompt composer: turns a [`CheckResult`] into the two
//! strings a caller actually shows a user or feeds back to the model — a
//! human-readable warning footnote, and a reprompt instruction listing what
//! needs fixing.

use crate::types::{CheckResult, Severity, Violation};

/// Cap on how many violations get spelled out by message; beyond this the
/// footnote collapses into a count so a response riddled with violations
/// doesn't produce an unreadable wall of text.
const MAX_DETAILED_VIOLATIONS: usize = 5;

/// Composes a structured warning footnote when the result is grounded
/// (`criticalCount == 0`) but carries warning-or-higher violations worth
/// surfacing to the reader. Returns `None` when there's nothing to footnote.
pub fn generate_footnote(result: &CheckResult) -> Option<String> {
    let notable: Vec<&Violation> =
        result.violations.iter().filter(|v| v.severity >= Severity::Warning).collect();
    if notable.is_empty() {
        return None;
    }

    let mut out = String::from("⚠ This response has unverified claims:\n");
    for v in notable.iter().take(MAX_DETAILED_VIOLATIONS) {
        out.push_str("- ");
        out.push_str(&v.message);
        if let Some(location) = &v.location {
            out.push_str(" (");
            out.push_str(location);
            out.push(')');
        }
        out.push('\n');
    }
    if notable.len() > MAX_DETAILED_VIOLATIONS {
        out.push_str(&format!("- and {} more\n", notable.len() - MAX_DETAILED_VIOLATIONS));
    }

    Some(out)
}

/// Composes the instruction a caller feeds back into the next generation
/// turn when a response was rejected. `None` when the result doesn't
/// warrant one (nothing above warning severity).
pub fn generate_reprompt(result: &CheckResult) -> Option<String> {
    let critical: Vec<&Violation> =
        result.violations.iter().filter(|v| v.severity >= Severity::High).collect();
    if critical.is_empty() {
        return None;
    }

    let mut out = String::from(
        "Your previous response contained claims that don't match the evidence you were given. Correct the following before responding again:\n",
    );
    for v in &critical {
        out.push_str("- [");
        out.push_str(&v.code);
        out.push_str("] ");
        out.push_str(&v.message);
        if let Some(expected) = &v.expected {
            out.push_str(" — expected: ");
            out.push_str(expected);
        }
        if let Some(suggestion) = &v.suggestion {
            out.push_str(" — suggestion: ");
            out.push_str(suggestion);
        }
        out.push('\n');
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ViolationType;

    fn result_with(violations: Vec<Violation>) -> CheckResult {
        let critical_count = violations.iter().filter(|v| v.severity == Severity::Critical).count();
        let warning_count = violations.iter().filter(|v| v.severity == Severity::Warning).count();
        CheckResult {
            grounded: critical_count == 0,
            confidence: 1.0,
            violations,
            critical_count,
            warning_count,
            checks_run: 1,
            check_duration_ms: 0,
            citations_found: 0,
            citations_valid: 0,
        }
    }

    #[test]
    fn clean_result_has_no_footnote() {
        assert!(generate_footnote(&result_with(Vec::new())).is_none());
    }

    #[test]
    fn warnings_produce_a_footnote() {
        let v = Violation::new(ViolationType::Ungrounded, Severity::Warning, "NO_CITATIONS", "no citations given");
        let footnote = generate_footnote(&result_with(vec![v])).unwrap();
        assert!(footnote.contains("no citations given"));
    }

    #[test]
    fn many_violations_collapse_into_a_count() {
        let violations = (0..8)
            .map(|i| {
                Violation::new(ViolationType::PhantomFile, Severity::High, "PHANTOM_FILE", format!("file {i} missing"))
            })
            .collect();
        let footnote = generate_footnote(&result_with(violations)).unwrap();
        assert!(footnote.contains("and 3 more"));
    }

    #[test]
    fn only_critical_or_high_triggers_a_reprompt() {
        let v = Violation::new(ViolationType::Ungrounded, Severity::Warning, "NO_CITATIONS", "no citations given");
        assert!(generate_reprompt(&result_with(vec![v])).is_none());

        let v = Violation::new(ViolationType::PhantomFile, Severity::Critical, "PHANTOM_FILE", "cites a file that doesn't exist")
            .with_suggestion("did you mean main.go?");
        let reprompt = generate_reprompt(&result_with(vec![v])).unwrap();
        assert!(reprompt.contains("PHANTOM_FILE"));
        assert!(reprompt.contains("did you mean main.go?"));
    }
}
