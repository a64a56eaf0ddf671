//! Core type definitions for the grounding engine.
//!
//! - [`Severity`] ranks how strongly a violation should weigh in the verdict.
//! - [`ViolationType`] enumerates the 22 kinds of hallucination this crate detects.
//! - [`Violation`] is the atomic unit of checker output.
//! - [`CheckResult`] is the aggregate verdict produced by the orchestrator.

use serde::{Deserialize, Serialize};

/// How strongly a violation should weigh in the final verdict.
///
/// Ordered `Info < Warning < High < Critical` so that `Ord` matches escalation
/// order; callers that want "most severe first" sort with `.rev()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Confidence penalty this severity subtracts from the running score.
    pub fn confidence_penalty(&self) -> f64 {
        match self {
            Self::Critical => 0.30,
            Self::High => 0.25,
            Self::Warning => 0.10,
            Self::Info => 0.0,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The 22 enumerated kinds of hallucination this crate can detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationType {
    FileNotFound,
    PhantomFile,
    PhantomSymbol,
    PhantomPackage,
    Ungrounded,
    CitationInvalid,
    NoCitations,
    LineNumberFabrication,
    AttributeHallucination,
    RelationshipHallucination,
    BehavioralHallucination,
    QuantitativeHallucination,
    FabricatedCode,
    ApiHallucination,
    TemporalHallucination,
    CrossContextConfusion,
    ConfidenceFabrication,
    SemanticDrift,
    StructuralClaim,
    LanguageConfusion,
    GenericPattern,
    WrongLanguage,
}

impl ViolationType {
    /// Priority bucket from the ordering table (§3): lower sorts first.
    pub fn priority(&self) -> u8 {
        match self {
            Self::SemanticDrift => 0,
            Self::PhantomFile | Self::FabricatedCode => 1,
            Self::StructuralClaim
            | Self::PhantomSymbol
            | Self::AttributeHallucination
            | Self::RelationshipHallucination
            | Self::BehavioralHallucination
            | Self::ApiHallucination
            | Self::CrossContextConfusion
            | Self::PhantomPackage => 2,
            Self::LanguageConfusion
            | Self::LineNumberFabrication
            | Self::QuantitativeHallucination
            | Self::ConfidenceFabrication => 3,
            Self::GenericPattern | Self::TemporalHallucination => 4,
            Self::FileNotFound
            | Self::Ungrounded
            | Self::CitationInvalid
            | Self::NoCitations
            | Self::WrongLanguage => 5,
        }
    }
}

impl std::fmt::Display for ViolationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_value(self).unwrap_or_default();
        write!(f, "{}", json.as_str().unwrap_or("unknown"))
    }
}

/// A single detected hallucination, emitted by exactly one checker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub violation_type: ViolationType,
    pub severity: Severity,
    /// Stable, machine-readable code (e.g. `"PHANTOM_PACKAGE"`); part of the
    /// external metric/log cardinality contract.
    pub code: String,
    pub message: String,
    /// The substring of the response that triggered this violation.
    pub evidence: Option<String>,
    /// What the evidence actually shows, when applicable.
    pub expected: Option<String>,
    /// `file:line` the violation points at, if any.
    pub location: Option<String>,
    /// Character offset into the response where the triggering claim starts.
    pub location_offset: usize,
    pub suggestion: Option<String>,
    /// Which checker phase produced this (usually the checker's `name()`).
    pub phase: String,
    pub retry_count: u32,
}

impl Violation {
    pub fn new(
        violation_type: ViolationType,
        severity: Severity,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            severity,
            code: code.into(),
            message: message.into(),
            evidence: None,
            expected: None,
            location: None,
            location_offset: 0,
            suggestion: None,
            phase: String::new(),
            retry_count: 0,
        }
    }

    pub fn with_location(mut self, file: impl AsRef<str>, line: u64) -> Self {
        self.location = Some(format!("{}:{}", file.as_ref(), line));
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.location_offset = offset;
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = phase.into();
        self
    }

    /// Total order for the final merged violation list: priority asc,
    /// severity desc, location_offset asc. Ties (e.g. within priority 2)
    /// fall back to a stable sort, so the checker registry order in
    /// `checkers::build_checker_registry` fixes the tiebreak.
    pub fn ordering_key(&self) -> (u8, std::cmp::Reverse<Severity>, usize) {
        (self.violation_type.priority(), std::cmp::Reverse(self.severity), self.location_offset)
    }
}

/// Aggregate verdict produced by [`crate::grounder::Grounder::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub grounded: bool,
    pub confidence: f64,
    pub violations: Vec<Violation>,
    pub critical_count: usize,
    pub warning_count: usize,
    pub checks_run: usize,
    pub check_duration_ms: u64,
    pub citations_found: usize,
    pub citations_valid: usize,
}

impl CheckResult {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ord_matches_escalation() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn priority_table_matches_spec_buckets() {
        assert_eq!(ViolationType::SemanticDrift.priority(), 0);
        assert_eq!(ViolationType::PhantomFile.priority(), 1);
        assert_eq!(ViolationType::FabricatedCode.priority(), 1);
        assert_eq!(ViolationType::PhantomSymbol.priority(), 2);
        assert_eq!(ViolationType::PhantomPackage.priority(), 2);
        assert_eq!(ViolationType::LineNumberFabrication.priority(), 3);
        assert_eq!(ViolationType::TemporalHallucination.priority(), 4);
        assert_eq!(ViolationType::FileNotFound.priority(), 5);
        assert_eq!(ViolationType::WrongLanguage.priority(), 5);
    }

    #[test]
    fn violation_builder_chains() {
        let v = Violation::new(
            ViolationType::PhantomPackage,
            Severity::Critical,
            "PHANTOM_PACKAGE",
            "package does not exist",
        )
        .with_location("main.go", 10)
        .with_offset(42)
        .with_suggestion("did you mean pkg/config?");

        assert_eq!(v.location.as_deref(), Some("main.go:10"));
        assert_eq!(v.location_offset, 42);
        assert!(v.suggestion.is_some());
    }

    #[test]
    fn ordering_key_distinguishes_all_four_severities() {
        let mk = |severity| {
            Violation::new(ViolationType::PhantomSymbol, severity, "X", "x").ordering_key()
        };
        let mut keys = vec![
            mk(Severity::Info),
            mk(Severity::Warning),
            mk(Severity::High),
            mk(Severity::Critical),
        ];
        keys.sort();
        assert_eq!(
            keys.iter().map(|k| k.1 .0).collect::<Vec<_>>(),
            vec![Severity::Critical, Severity::High, Severity::Warning, Severity::Info]
        );
    }

    #[test]
    fn confidence_penalty_matches_grounder_weights() {
        assert_eq!(Severity::Critical.confidence_penalty(), 0.30);
        assert_eq!(Severity::High.confidence_penalty(), 0.25);
        assert_eq!(Severity::Warning.confidence_penalty(), 0.10);
        assert_eq!(Severity::Info.confidence_penalty(), 0.0);
    }
}
