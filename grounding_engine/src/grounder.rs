//! Orchestrator: fans the configured checker set plus the TMS verifier out
//! over a single response, merges their violations, and classifies the
//! result. Grounded in the teacher's `CheckEngine::check` dispatch loop —
//! same rayon fan-out, same `catch_unwind` isolation per invocation, same
//! "a panicking checker degrades to zero violations rather than crashing
//! the run" contract.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use rayon::prelude::*;

use crate::checkers::{build_checker_registry, CheckInput, Checker, CheckerContext};
use crate::config::Config;
use crate::metrics::{self, MetricsSink};
use crate::tms::TmsChecker;
use crate::types::{CheckResult, Severity, Violation};

/// Priority bucket at or below which a violation is serious enough to gate
/// regeneration on its own (§4.5). Priorities 0–2 cover semantic drift,
/// phantom files/fabricated code, and the cluster of structural/behavioral
/// hallucination kinds.
const REJECT_PRIORITY_CEILING: u8 = 2;

pub struct Grounder {
    config: Config,
    checkers: Vec<Box<dyn Checker>>,
    tms: TmsChecker,
}

impl Grounder {
    pub fn new(config: Config) -> Self {
        let checkers = build_checker_registry(&config);
        let tms = TmsChecker::new(config.tms.clone());
        Self { config, checkers, tms }
    }

    /// Runs every enabled checker plus the TMS verifier over `input`,
    /// merges and sorts the violations, and computes the confidence-based
    /// verdict. Panics inside an individual checker are isolated: that
    /// checker contributes zero violations and a `tracing::warn!` is
    /// emitted, but the overall call still returns a `CheckResult`.
    pub fn validate(&self, input: &CheckInput) -> CheckResult {
        self.validate_with_sink(input, metrics::default_sink())
    }

    pub fn validate_with_sink(&self, input: &CheckInput, sink: &dyn MetricsSink) -> CheckResult {
        let start = Instant::now();
        let ctx = CheckerContext::default();

        let per_checker: Vec<Vec<Violation>> = self
            .checkers
            .par_iter()
            .map(|checker| self.run_one(checker.as_ref(), &ctx, input, sink))
            .collect();

        let mut violations: Vec<Violation> = per_checker.into_iter().flatten().collect();
        violations.extend(self.run_one(&self.tms, &ctx, input, sink));

        violations.sort_by_key(Violation::ordering_key);

        for v in &violations {
            metrics::record_violation(sink, &v.code, v.severity, &v.violation_type.to_string());
        }

        let critical_count = violations.iter().filter(|v| v.severity >= Severity::High).count();
        let warning_count = violations.iter().filter(|v| v.severity == Severity::Warning).count();

        let mut confidence = 1.0f64;
        for v in &violations {
            confidence -= v.severity.confidence_penalty();
        }
        confidence = confidence.max(0.0);
        metrics::record_confidence(sink, confidence);

        let (citations_found, citations_valid) = crate::checkers::citation::citation_counts(
            input,
            self.config.citation.base.scan_limit,
            self.config.citation.base.max_claims,
        );

        CheckResult {
            grounded: critical_count == 0,
            confidence,
            critical_count,
            warning_count,
            checks_run: self.checkers.len() + 1,
            check_duration_ms: start.elapsed().as_millis() as u64,
            citations_found,
            citations_valid,
            violations,
        }
    }

    fn run_one(&self, checker: &dyn Checker, ctx: &CheckerContext, input: &CheckInput, sink: &dyn MetricsSink) -> Vec<Violation> {
        let checker_start = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| checker.check(ctx, input)));
        let elapsed = checker_start.elapsed().as_secs_f64();
        metrics::record_check(sink, checker.name(), elapsed);

        match result {
            Ok(violations) => violations,
            Err(panic_info) => {
                let payload = if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else if let Some(s) = panic_info.downcast_ref::<&str>() {
                    (*s).to_owned()
                } else {
                    "unknown panic".to_owned()
                };
                tracing::warn!(checker = checker.name(), panic = %payload, "checker panicked; degrading to zero violations");
                Vec::new()
            }
        }
    }

    /// True iff the response should be regenerated rather than shown, per
    /// §4.5: a priority ≤ 2 violation at high/critical severity, or any
    /// critical violation at all, or confidence below the configured floor.
    pub fn should_reject(&self, result: &CheckResult) -> bool {
        self.should_reject_with_sink(result, metrics::default_sink())
    }

    pub fn should_reject_with_sink(&self, result: &CheckResult, sink: &dyn MetricsSink) -> bool {
        let reason = if result.critical_count > 0 {
            Some("critical_violation")
        } else if result.confidence < self.config.reject_confidence_floor {
            Some("low_confidence")
        } else if result
            .violations
            .iter()
            .any(|v| v.violation_type.priority() <= REJECT_PRIORITY_CEILING && v.severity >= Severity::High)
        {
            Some("high_priority_violation")
        } else {
            None
        };

        match reason {
            Some(reason) => {
                metrics::record_rejection(sink, reason);
                true
            }
            None => false,
        }
    }

    /// Delegates to [`crate::footnote::generate_footnote`].
    pub fn generate_footnote(&self, result: &CheckResult) -> Option<String> {
        crate::footnote::generate_footnote(result)
    }

    /// Delegates to [`crate::footnote::generate_reprompt`], recording a
    /// reprompt-issued metric whenever one is actually composed.
    pub fn generate_reprompt(&self, result: &CheckResult) -> Option<String> {
        self.generate_reprompt_with_sink(result, metrics::default_sink())
    }

    pub fn generate_reprompt_with_sink(&self, result: &CheckResult, sink: &dyn MetricsSink) -> Option<String> {
        let reprompt = crate::footnote::generate_reprompt(result);
        if reprompt.is_some() {
            metrics::record_reprompt(sink);
        }
        reprompt
    }
}
