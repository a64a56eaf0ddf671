//! Quantitative Checker: validates numeric claims ("handles 50 requests per
//! second", "about a dozen retries", "main.go has about 200 lines") against
//! numbers appearing in the tool output / code context evidence, or, when
//! the claim names a concrete evidence subject (a file's line count, a
//! language's file count, a test count), against that subject directly.
//! Asymmetric hedge tolerance applies to "approximately"-qualified claims;
//! genuinely vague quantities ("several", "many") are exempt entirely.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::QuantitativeConfig;
use crate::types::{Severity, Violation, ViolationType};

use super::{CheckInput, Checker, CheckerContext};

static NUMBER_WORDS: LazyLock<HashMap<&'static str, f64>> = LazyLock::new(|| {
    [
        ("one", 1.0), ("two", 2.0), ("three", 3.0), ("four", 4.0), ("five", 5.0),
        ("six", 6.0), ("seven", 7.0), ("eight", 8.0), ("nine", 9.0), ("ten", 10.0),
        ("eleven", 11.0), ("twelve", 12.0), ("dozen", 12.0), ("twenty", 20.0),
        ("thirty", 30.0), ("forty", 40.0), ("fifty", 50.0), ("hundred", 100.0),
        ("thousand", 1000.0),
    ]
    .into_iter()
    .collect()
});

static VAGUE_QUANTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:several|many|some|a\s+few|numerous|various)\b").expect("static regex"));

/// `(approximately|about|roughly|~)? <number>(k|K|M|G)? <unit>`
static NUMERIC_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(approximately|about|roughly|~)?\s*([\d,]+(?:\.\d+)?)\s*(k|m|g)?\b",
    )
    .expect("static regex")
});

/// `main.go has about 200 lines`, `server.py contains 45 lines`
static FILE_LINE_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b([A-Za-z0-9_./\\-]+\.[A-Za-z0-9_]+)\s+(?:has|contains|is)\s+(approximately|about|roughly|~)?\s*([\d,]+)\s*lines?\b",
    )
    .expect("static regex")
});

/// `12 go files`, `about 3 test files`, `50 python functions`
static SUBJECT_COUNT_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(approximately|about|roughly|~)?\s*([\d,]+)\s*(test|go|golang|python|js|javascript|rust|java|typescript)\s+(files?|functions?|symbols?|tests?)\b",
    )
    .expect("static regex")
});

const LANGUAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("go", ".go"), ("golang", ".go"), ("python", ".py"), ("js", ".js"),
    ("javascript", ".js"), ("rust", ".rs"), ("java", ".java"), ("typescript", ".ts"),
];

fn parse_number(raw: &str, suffix: Option<&str>) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let mut value: f64 = cleaned.parse().ok()?;
    match suffix.map(|s| s.to_lowercase()) {
        Some(ref s) if s == "k" => value *= 1_000.0,
        Some(ref s) if s == "m" => value *= 1_000_000.0,
        Some(ref s) if s == "g" => value *= 1_000_000_000.0,
        _ => {}
    }
    Some(value)
}

fn word_numbers(text: &str) -> Vec<(f64, usize)> {
    let mut out = Vec::new();
    for (word, value) in NUMBER_WORDS.iter() {
        let pattern = format!(r"(?i)\b{}\b", regex::escape(word));
        if let Ok(re) = Regex::new(&pattern) {
            for m in re.find_iter(text) {
                out.push((*value, m.start()));
            }
        }
    }
    out
}

/// Numbers appearing anywhere in the tool results / code context, the
/// fallback reference set for a quantitative claim with no specific
/// evidence subject attached to it.
fn evidence_numbers(input: &CheckInput) -> Vec<f64> {
    let mut numbers = Vec::new();
    let mut source = String::new();
    for r in &input.tool_results {
        source.push_str(&r.output);
        source.push('\n');
    }
    for c in &input.code_context {
        source.push_str(&c.content);
        source.push('\n');
    }
    for m in NUMERIC_CLAIM.captures_iter(&source) {
        if let Some(n) = parse_number(m.get(2).unwrap().as_str(), m.get(3).map(|g| g.as_str())) {
            numbers.push(n);
        }
    }
    numbers
}

/// Resolves a `<subject> <unit>` pair ("go" + "files", "test" + "functions")
/// against the evidence index's file/symbol sets. Returns `None` when the
/// subject/unit combination has no evidence-backed count to compare against.
fn subject_count(input: &CheckInput, subject: &str, unit: &str) -> Option<f64> {
    let subject = subject.to_lowercase();
    let unit = unit.to_lowercase();

    if unit.starts_with("file") {
        if subject == "test" {
            return Some(
                input.evidence.files.iter().filter(|f| f.to_lowercase().contains("test")).count() as f64,
            );
        }
        let ext = LANGUAGE_EXTENSIONS.iter().find(|(name, _)| *name == subject).map(|(_, ext)| *ext)?;
        return Some(input.evidence.files.iter().filter(|f| f.to_lowercase().ends_with(ext)).count() as f64);
    }

    if unit.starts_with("function") || unit.starts_with("symbol") || unit.starts_with("test") {
        if subject == "test" || unit.starts_with("test") {
            return Some(
                input.evidence.symbols.iter().filter(|s| s.to_lowercase().contains("test")).count() as f64,
            );
        }
        return Some(input.evidence.symbols.len() as f64);
    }

    None
}

/// A single extracted numeric claim, tagged with whatever specific evidence
/// subject it names (a file's line count, a language's file count); claims
/// with no named subject fall back to the generic evidence-number pool.
struct Claim {
    claimed: f64,
    hedged: bool,
    offset: usize,
    subject_actual: Option<f64>,
    subject_desc: Option<String>,
}

pub struct QuantitativeChecker {
    config: QuantitativeConfig,
}

impl QuantitativeChecker {
    pub fn new(config: QuantitativeConfig) -> Self {
        Self { config }
    }

    fn within_tolerance(&self, claimed: f64, hedged: bool, actual: f64) -> bool {
        if claimed == actual {
            return true;
        }
        if !hedged {
            return (claimed - actual).abs() <= self.config.exact_tolerance as f64;
        }
        if claimed >= actual {
            actual * (1.0 + self.config.approx_over_pct) >= claimed
        } else {
            actual * (1.0 - self.config.approx_under_pct) <= claimed
        }
    }
}

impl Checker for QuantitativeChecker {
    fn name(&self) -> &'static str {
        "quantitative"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);
        if VAGUE_QUANTITY.is_match(scanned) && NUMERIC_CLAIM.find_iter(scanned).count() == 0 {
            return Vec::new();
        }

        let mut claimed_offsets = std::collections::HashSet::new();
        let mut claims = Vec::new();

        for m in FILE_LINE_CLAIM.captures_iter(scanned) {
            let whole = m.get(0).unwrap();
            let file = m.get(1).unwrap().as_str();
            let Some(n) = parse_number(m.get(3).unwrap().as_str(), None) else { continue };
            let hedged = m.get(2).is_some();
            let number_at = m.get(3).unwrap().start();
            claimed_offsets.insert(number_at);
            claims.push(Claim {
                claimed: n,
                hedged,
                offset: whole.start(),
                subject_actual: input.evidence.file_lines(file).map(|l| l as f64),
                subject_desc: Some(format!("{file}'s line count")),
            });
        }

        for m in SUBJECT_COUNT_CLAIM.captures_iter(scanned) {
            let number_at = m.get(2).unwrap().start();
            if claimed_offsets.contains(&number_at) {
                continue;
            }
            let Some(n) = parse_number(m.get(2).unwrap().as_str(), None) else { continue };
            let hedged = m.get(1).is_some();
            let subject = m.get(3).unwrap().as_str();
            let unit = m.get(4).unwrap().as_str();
            claimed_offsets.insert(number_at);
            claims.push(Claim {
                claimed: n,
                hedged,
                offset: m.get(0).unwrap().start(),
                subject_actual: subject_count(input, subject, unit),
                subject_desc: Some(format!("{subject} {unit}")),
            });
        }

        let reference = evidence_numbers(input);

        for m in NUMERIC_CLAIM.captures_iter(scanned) {
            let number_at = m.get(2).unwrap().start();
            if claimed_offsets.contains(&number_at) {
                continue;
            }
            let Some(n) = parse_number(m.get(2).unwrap().as_str(), m.get(3).map(|g| g.as_str())) else {
                continue;
            };
            let hedged = m.get(1).is_some();
            claims.push(Claim {
                claimed: n,
                hedged,
                offset: m.get(0).unwrap().start(),
                subject_actual: None,
                subject_desc: None,
            });
        }
        for (n, offset) in word_numbers(scanned) {
            if claimed_offsets.contains(&offset) {
                continue;
            }
            claims.push(Claim { claimed: n, hedged: false, offset, subject_actual: None, subject_desc: None });
        }

        if reference.is_empty() && claims.iter().all(|c| c.subject_actual.is_none() && c.subject_desc.is_none()) {
            return Vec::new();
        }

        let mut violations = Vec::new();
        let mut checked = 0usize;

        for claim in claims {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            checked += 1;

            let (matches_any, message) = if let Some(actual) = claim.subject_actual {
                let ok = self.within_tolerance(claim.claimed, claim.hedged, actual);
                let desc = claim.subject_desc.as_deref().unwrap_or("the evidence");
                (ok, format!("claims {} of {} against an actual value of {actual}", desc, claim.claimed))
            } else if claim.subject_desc.is_some() {
                // A named subject with no resolvable evidence count: nothing to compare against.
                continue;
            } else {
                let ok = reference.iter().any(|&actual| self.within_tolerance(claim.claimed, claim.hedged, actual));
                (ok, format!("claims a figure of {} that doesn't match any number in the evidence", claim.claimed))
            };

            if matches_any {
                continue;
            }

            if let Some(severity) =
                self.config.base.effective_severity("QUANTITATIVE_MISMATCH", Severity::Warning)
            {
                violations.push(
                    Violation::new(ViolationType::QuantitativeHallucination, severity, "QUANTITATIVE_MISMATCH", message)
                        .with_offset(claim.offset)
                        .with_phase(self.name()),
                );
            }
        }

        violations.sort_by_key(|v| v.location_offset);
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::ToolResult;
    use crate::evidence::EvidenceIndexBuilder;

    fn with_evidence(response: &str, tool_output: &str) -> CheckInput {
        let mut input = super::super::test_helpers::empty_input(response);
        input.tool_results.push(ToolResult { invocation_id: "1".to_string(), output: tool_output.to_string() });
        input
    }

    #[test]
    fn exact_match_is_silent() {
        let checker = QuantitativeChecker::new(QuantitativeConfig::default());
        let ctx = CheckerContext::default();
        let input = with_evidence("the benchmark handled 50 requests per second", "throughput: 50 req/s");
        assert!(checker.check(&ctx, &input).is_empty());
    }

    #[test]
    fn hedged_claim_within_tolerance_is_silent() {
        let checker = QuantitativeChecker::new(QuantitativeConfig::default());
        let ctx = CheckerContext::default();
        let input = with_evidence("approximately 55 requests per second", "throughput: 50 req/s");
        assert!(checker.check(&ctx, &input).is_empty());
    }

    #[test]
    fn unhedged_mismatch_is_flagged() {
        let checker = QuantitativeChecker::new(QuantitativeConfig::default());
        let ctx = CheckerContext::default();
        let input = with_evidence("the benchmark handled 500 requests per second", "throughput: 50 req/s");
        let violations = checker.check(&ctx, &input);
        assert!(!violations.is_empty());
        assert_eq!(violations[0].code, "QUANTITATIVE_MISMATCH");
    }

    #[test]
    fn vague_quantity_without_numbers_is_exempt() {
        let checker = QuantitativeChecker::new(QuantitativeConfig::default());
        let ctx = CheckerContext::default();
        let input = with_evidence("it retries several times on failure", "retries: 3");
        assert!(checker.check(&ctx, &input).is_empty());
    }

    #[test]
    fn file_line_count_mismatch_against_evidence_is_flagged() {
        let checker = QuantitativeChecker::new(QuantitativeConfig::default());
        let ctx = CheckerContext::default();
        let mut input = super::super::test_helpers::empty_input("main.go has 250 lines");
        input.evidence = EvidenceIndexBuilder::new().add_file("main.go", "x\n".repeat(180)).build();
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "QUANTITATIVE_MISMATCH");
    }

    #[test]
    fn file_line_count_within_tolerance_is_silent() {
        let checker = QuantitativeChecker::new(QuantitativeConfig::default());
        let ctx = CheckerContext::default();
        let mut input = super::super::test_helpers::empty_input("main.go has about 180 lines");
        input.evidence = EvidenceIndexBuilder::new().add_file("main.go", "x\n".repeat(180)).build();
        assert!(checker.check(&ctx, &input).is_empty());
    }

    #[test]
    fn go_file_count_checked_against_evidence_file_set() {
        let checker = QuantitativeChecker::new(QuantitativeConfig::default());
        let ctx = CheckerContext::default();
        let mut input = super::super::test_helpers::empty_input("the project has 5 go files");
        input.evidence = EvidenceIndexBuilder::new()
            .add_file("main.go", "package main\n")
            .add_file("util.go", "package main\n")
            .build();
        let violations = checker.check(&ctx, &input);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "QUANTITATIVE_MISMATCH");
    }
}
