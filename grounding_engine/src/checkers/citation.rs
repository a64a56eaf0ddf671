//! Citation Checker: validates every `file:line`-shaped citation in a
//! response against the evidence index. A response that makes no citations
//! at all only gets the `NO_CITATIONS` advisory when it actually talks about
//! code ("the X function", "this code", "in file X") — a response with
//! nothing to cite in the first place isn't hallucinating by omission.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::CitationConfig;
use crate::types::{Severity, Violation, ViolationType};

use super::{CheckInput, Checker, CheckerContext};

/// `path/to/file.go:42` or `path/to/file.go:42-50` (range form).
static COLON_CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z0-9_./\\-]+\.[A-Za-z0-9_]+):(\d+)(?:-(\d+))?").expect("static regex")
});

/// `(file.go, line 42)`, `(see file.go line 42)`, `(file.go, lines 42-50)`
static PAREN_CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*(?:see\s+)?([A-Za-z0-9_./\\-]+\.[A-Za-z0-9_]+),?\s*lines?\s*(\d+)(?:-(\d+))?\s*\)")
        .expect("static regex")
});

/// `in file.go at line 42`, `in file.go on lines 42-50`
static PROSE_CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:in|from)\s+([A-Za-z0-9_./\\-]+\.[A-Za-z0-9_]+)\s+(?:at|on)?\s*lines?\s*(\d+)(?:-(\d+))?")
        .expect("static regex")
});

/// `line 42 of file.go`, `line 42 in file.go` — number-before-file prose order.
static LINE_FIRST_PROSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bline\s+(\d+)\s+(?:of|in)\s+([A-Za-z0-9_./\\-]+\.[A-Za-z0-9_]+)").expect("static regex")
});

/// Spec §4.3(c): "the X function", "this code", "in file X" — the response
/// is actually making a code claim, so the absence of any citation for it is
/// worth flagging. Small talk with no citations should stay silent.
static CODE_CLAIM_INDICATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bthe\s+[A-Za-z_][A-Za-z0-9_]*\s+function\b|\bthis\s+code\b|\bin\s+file\s+[A-Za-z0-9_./\\-]+")
        .expect("static regex")
});

struct RawCitation {
    file: String,
    line: u64,
    line_end: Option<u64>,
    offset: usize,
}

fn try_push(
    out: &mut Vec<RawCitation>,
    seen_offsets: &mut HashSet<usize>,
    max: usize,
    offset: usize,
    file: &str,
    line: &str,
    line_end: Option<&str>,
) -> bool {
    if out.len() >= max {
        return false;
    }
    if !seen_offsets.insert(offset) {
        return true;
    }
    let Ok(line) = line.parse::<u64>() else {
        return true;
    };
    let line_end = line_end.and_then(|s| s.parse::<u64>().ok());
    out.push(RawCitation { file: file.to_string(), line, line_end, offset });
    true
}

fn extract_citations(text: &str, max: usize) -> Vec<RawCitation> {
    let mut seen_offsets = HashSet::new();
    let mut out = Vec::new();

    'file_line: for pattern in [&*COLON_CITATION, &*PAREN_CITATION, &*PROSE_CITATION] {
        for m in pattern.captures_iter(text) {
            let whole = m.get(0).unwrap();
            let file = m.get(1).unwrap().as_str();
            let line = m.get(2).unwrap().as_str();
            let line_end = m.get(3).map(|g| g.as_str());
            if !try_push(&mut out, &mut seen_offsets, max, whole.start(), file, line, line_end) {
                break 'file_line;
            }
        }
    }

    for m in LINE_FIRST_PROSE.captures_iter(text) {
        let whole = m.get(0).unwrap();
        let line = m.get(1).unwrap().as_str();
        let file = m.get(2).unwrap().as_str();
        if !try_push(&mut out, &mut seen_offsets, max, whole.start(), file, line, None) {
            break;
        }
    }

    out.sort_by_key(|c| c.offset);
    out
}

/// Raw `(found, valid)` counts for the `CheckResult` summary fields,
/// independent of whatever severities the citation checker's config would
/// emit violations at. A citation is valid when its file is known and its
/// line (or, for a range, both ends) falls within `[1, fileLines]`.
pub(crate) fn citation_counts(input: &CheckInput, scan_limit: usize, max_claims: usize) -> (usize, usize) {
    let scanned = input.scanned_response(scan_limit);
    let citations = extract_citations(scanned, max_claims);
    let found = citations.len();
    let valid = citations
        .iter()
        .filter(|c| {
            input.evidence.has_known_file(&c.file)
                && match input.evidence.file_lines(&c.file) {
                    Some(lines) => {
                        let end = c.line_end.unwrap_or(c.line);
                        c.line >= 1 && end >= c.line && end <= lines
                    }
                    None => true,
                }
        })
        .count();
    (found, valid)
}

pub struct CitationChecker {
    config: CitationConfig,
}

impl CitationChecker {
    pub fn new(config: CitationConfig) -> Self {
        Self { config }
    }
}

impl Checker for CitationChecker {
    fn name(&self) -> &'static str {
        "citation"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);
        let citations = extract_citations(scanned, self.config.base.max_claims);

        if citations.is_empty() {
            if !CODE_CLAIM_INDICATOR.is_match(scanned) {
                return Vec::new();
            }
            return match self.config.base.effective_severity("NO_CITATIONS", Severity::Warning) {
                Some(severity) => vec![Violation::new(
                    ViolationType::NoCitations,
                    severity,
                    "NO_CITATIONS",
                    "response makes a code claim but no file:line citations to verify it against",
                )
                .with_phase(self.name())],
                None => Vec::new(),
            };
        }

        let mut violations = Vec::new();

        for citation in citations {
            if ctx.cancellation.is_cancelled() {
                break;
            }

            if !input.evidence.has_known_file(&citation.file) {
                if let Some(severity) =
                    self.config.base.effective_severity("CITATION_FILE_NOT_FOUND", Severity::Critical)
                {
                    violations.push(
                        Violation::new(
                            ViolationType::CitationInvalid,
                            severity,
                            "CITATION_FILE_NOT_FOUND",
                            format!("cites {} which does not exist in the project", citation.file),
                        )
                        .with_offset(citation.offset)
                        .with_phase(self.name()),
                    );
                }
                continue;
            }

            if !input.evidence.has_file(&citation.file) {
                if let Some(severity) =
                    self.config.base.effective_severity("CITATION_NOT_IN_CONTEXT", Severity::Warning)
                {
                    violations.push(
                        Violation::new(
                            ViolationType::CitationInvalid,
                            severity,
                            "CITATION_NOT_IN_CONTEXT",
                            format!("cites {} which exists but was not shown to the model", citation.file),
                        )
                        .with_location(&citation.file, citation.line)
                        .with_offset(citation.offset)
                        .with_phase(self.name()),
                    );
                }
                continue;
            }

            if let Some(total_lines) = input.evidence.file_lines(&citation.file) {
                let end = citation.line_end.unwrap_or(citation.line);
                let out_of_range = citation.line == 0 || end < citation.line || end > total_lines;
                if out_of_range {
                    if let Some(severity) = self
                        .config
                        .base
                        .effective_severity("CITATION_LINE_OUT_OF_RANGE", Severity::Critical)
                    {
                        let message = if citation.line_end.is_some() {
                            format!(
                                "cites {}:{}-{} but the file only has {} lines",
                                citation.file, citation.line, end, total_lines
                            )
                        } else {
                            format!(
                                "cites {}:{} but the file only has {} lines",
                                citation.file, citation.line, total_lines
                            )
                        };
                        violations.push(
                            Violation::new(
                                ViolationType::CitationInvalid,
                                severity,
                                "CITATION_LINE_OUT_OF_RANGE",
                                message,
                            )
                            .with_expected(format!("1..={total_lines}"))
                            .with_location(&citation.file, citation.line)
                            .with_offset(citation.offset)
                            .with_phase(self.name()),
                        );
                    }
                }
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::EvidenceIndexBuilder;

    fn input_with(response: &str) -> CheckInput {
        let mut input = super::super::test_helpers::empty_input(response);
        input.evidence = EvidenceIndexBuilder::new()
            .add_file("src/main.go", "line one\nline two\nline three\n")
            .build();
        input
    }

    #[test]
    fn valid_citation_is_silent() {
        let checker = CitationChecker::new(CitationConfig::default());
        let ctx = CheckerContext::default();
        let input = input_with("see src/main.go:2 for the implementation");
        assert!(checker.check(&ctx, &input).is_empty());
    }

    #[test]
    fn line_beyond_file_length_is_flagged_as_critical() {
        let checker = CitationChecker::new(CitationConfig::default());
        let ctx = CheckerContext::default();
        let input = input_with("see src/main.go:99 for the implementation");
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "CITATION_LINE_OUT_OF_RANGE");
        assert_eq!(violations[0].severity, Severity::Critical);
    }

    #[test]
    fn range_citation_beyond_file_length_is_flagged() {
        let checker = CitationChecker::new(CitationConfig::default());
        let ctx = CheckerContext::default();
        let input = input_with("see src/main.go:2-99 for the implementation");
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "CITATION_LINE_OUT_OF_RANGE");
    }

    #[test]
    fn inverted_range_is_flagged() {
        let checker = CitationChecker::new(CitationConfig::default());
        let ctx = CheckerContext::default();
        let input = input_with("see src/main.go:3-1 for the implementation");
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "CITATION_LINE_OUT_OF_RANGE");
    }

    #[test]
    fn number_before_file_prose_order_is_recognized() {
        let checker = CitationChecker::new(CitationConfig::default());
        let ctx = CheckerContext::default();
        let input = input_with("the bug is on line 99 of src/main.go");
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "CITATION_LINE_OUT_OF_RANGE");
    }

    #[test]
    fn nonexistent_file_is_critical() {
        let checker = CitationChecker::new(CitationConfig::default());
        let ctx = CheckerContext::default();
        let input = input_with("see src/ghost.go:10 for the implementation");
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations[0].code, "CITATION_FILE_NOT_FOUND");
        assert_eq!(violations[0].severity, Severity::Critical);
    }

    #[test]
    fn no_citations_with_code_claim_yields_warning_advisory() {
        let checker = CitationChecker::new(CitationConfig::default());
        let ctx = CheckerContext::default();
        let input = input_with("let me explain the validate function for you");
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "NO_CITATIONS");
        assert_eq!(violations[0].severity, Severity::Warning);
    }

    #[test]
    fn no_citations_without_code_claim_is_silent() {
        let checker = CitationChecker::new(CitationConfig::default());
        let ctx = CheckerContext::default();
        let input = input_with("thanks, that all makes sense, have a good day");
        assert!(checker.check(&ctx, &input).is_empty());
    }
}
