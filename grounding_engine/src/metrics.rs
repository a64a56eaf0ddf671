//! Metrics surface: a sink-agnostic trait plus one in-process default
//! implementation. The crate only records; shipping these numbers to
//! Prometheus or OTel is a caller concern, so this module depends on
//! neither — a caller wanting that bridge implements [`MetricsSink`] itself.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

use crate::types::Severity;

/// Fixed-bucket histogram upper bounds, seconds. Matches the coarse
/// granularity the default sink needs for dashboards, not a general-purpose
/// histogram implementation.
const DURATION_BUCKETS_SECONDS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0];

/// Abstract recorder every instrument in §4.6 is expressed against. The
/// default implementation is process-wide and lazily initialized exactly
/// once via [`std::sync::OnceLock`]; callers may supply their own sink to
/// bridge into an external metrics backend.
pub trait MetricsSink: Send + Sync {
    fn incr_counter(&self, name: &str, labels: &[(&str, &str)], delta: u64);
    fn observe_histogram(&self, name: &str, labels: &[(&str, &str)], value: f64);
    fn set_gauge(&self, name: &str, labels: &[(&str, &str)], value: f64);
}

/// Discards every recording. For callers who don't want recording overhead.
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn incr_counter(&self, _name: &str, _labels: &[(&str, &str)], _delta: u64) {}
    fn observe_histogram(&self, _name: &str, _labels: &[(&str, &str)], _value: f64) {}
    fn set_gauge(&self, _name: &str, _labels: &[(&str, &str)], _value: f64) {}
}

fn label_key(name: &str, labels: &[(&str, &str)]) -> String {
    let mut sorted: Vec<&(&str, &str)> = labels.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);
    let mut key = name.to_string();
    for (k, v) in sorted {
        key.push(',');
        key.push_str(k);
        key.push('=');
        key.push_str(v);
    }
    key
}

/// Atomic counters plus a fixed-bucket histogram, keyed by a sorted label
/// string. Process-wide; constructed once via [`default_sink`].
#[derive(Default)]
pub struct InProcessMetricsSink {
    counters: Mutex<HashMap<String, AtomicU64>>,
    histograms: Mutex<HashMap<String, Vec<f64>>>,
    gauges: Mutex<HashMap<String, f64>>,
}

impl InProcessMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter, for tests and diagnostics. `0` if never
    /// recorded.
    pub fn counter_value(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        let key = label_key(name, labels);
        self.counters.lock().expect("metrics mutex poisoned").get(&key).map(|c| c.load(Ordering::Relaxed)).unwrap_or(0)
    }

    /// Number of observations recorded into a histogram bucket set.
    pub fn histogram_count(&self, name: &str, labels: &[(&str, &str)]) -> usize {
        let key = label_key(name, labels);
        self.histograms.lock().expect("metrics mutex poisoned").get(&key).map(Vec::len).unwrap_or(0)
    }

    pub fn gauge_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        let key = label_key(name, labels);
        self.gauges.lock().expect("metrics mutex poisoned").get(&key).copied()
    }
}

impl MetricsSink for InProcessMetricsSink {
    fn incr_counter(&self, name: &str, labels: &[(&str, &str)], delta: u64) {
        let key = label_key(name, labels);
        let mut counters = self.counters.lock().expect("metrics mutex poisoned");
        counters.entry(key).or_insert_with(|| AtomicU64::new(0)).fetch_add(delta, Ordering::Relaxed);
    }

    fn observe_histogram(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        let key = label_key(name, labels);
        let mut histograms = self.histograms.lock().expect("metrics mutex poisoned");
        histograms.entry(key).or_default().push(value);
    }

    fn set_gauge(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        let key = label_key(name, labels);
        let mut gauges = self.gauges.lock().expect("metrics mutex poisoned");
        gauges.insert(key, value);
    }
}

/// Histogram bucket boundaries the default sink uses for check-duration
/// observations. Exposed so a `MetricsSink` implementation bridging to an
/// external backend can register matching buckets.
pub fn duration_buckets() -> &'static [f64] {
    DURATION_BUCKETS_SECONDS
}

static DEFAULT_SINK: OnceLock<InProcessMetricsSink> = OnceLock::new();

/// The process-wide default sink, lazily initialized exactly once.
pub fn default_sink() -> &'static InProcessMetricsSink {
    DEFAULT_SINK.get_or_init(InProcessMetricsSink::new)
}

/// Instrument names that form the external metric-schema contract (§6).
/// Kept as named constants rather than inline string literals so a rename
/// here is a compile error everywhere it's used.
pub mod instruments {
    pub const CHECKS_TOTAL: &str = "grounding_checks_total";
    pub const CHECK_DURATION_SECONDS: &str = "grounding_check_duration_seconds";
    pub const VIOLATIONS_TOTAL: &str = "grounding_violations_total";
    pub const REPROMPTS_TOTAL: &str = "grounding_reprompts_total";
    pub const REJECTIONS_TOTAL: &str = "grounding_rejections_total";
    pub const CONFIDENCE: &str = "grounding_confidence";
    pub const CONSENSUS_RATE: &str = "grounding_consensus_rate";
    pub const CIRCUIT_BREAKER_STATE: &str = "grounding_circuit_breaker_state";

    /// `grounding_<category>_total`, one per violation category.
    pub fn category_total(category: &str) -> String {
        format!("grounding_{category}_total")
    }
}

/// Records the fixed set of per-`Validate`-call instruments a `Grounder`
/// reports. Kept as free functions over `&dyn MetricsSink` rather than
/// methods on `Grounder` itself, so `grounder.rs` doesn't need to know the
/// exact label shape of every instrument.
pub fn record_check(sink: &dyn MetricsSink, checker: &str, duration_seconds: f64) {
    sink.incr_counter(instruments::CHECKS_TOTAL, &[("checker", checker)], 1);
    sink.observe_histogram(instruments::CHECK_DURATION_SECONDS, &[("checker", checker)], duration_seconds);
}

pub fn record_violation(sink: &dyn MetricsSink, code: &str, severity: Severity, category: &str) {
    sink.incr_counter(instruments::VIOLATIONS_TOTAL, &[("code", code), ("severity", severity.as_str())], 1);
    sink.incr_counter(&instruments::category_total(category), &[], 1);
}

pub fn record_rejection(sink: &dyn MetricsSink, reason: &str) {
    sink.incr_counter(instruments::REJECTIONS_TOTAL, &[("reason", reason)], 1);
}

pub fn record_reprompt(sink: &dyn MetricsSink) {
    sink.incr_counter(instruments::REPROMPTS_TOTAL, &[], 1);
}

pub fn record_confidence(sink: &dyn MetricsSink, confidence: f64) {
    sink.set_gauge(instruments::CONFIDENCE, &[], confidence);
}

pub fn record_consensus_rate(sink: &dyn MetricsSink, rate: f64) {
    sink.observe_histogram(instruments::CONSENSUS_RATE, &[], rate);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_accumulates_across_calls() {
        let sink = InProcessMetricsSink::new();
        record_check(&sink, "citation", 0.002);
        record_check(&sink, "citation", 0.004);
        assert_eq!(sink.counter_value(instruments::CHECKS_TOTAL, &[("checker", "citation")]), 2);
        assert_eq!(sink.histogram_count(instruments::CHECK_DURATION_SECONDS, &[("checker", "citation")]), 2);
    }

    #[test]
    fn violation_counter_is_keyed_by_code_and_severity() {
        let sink = InProcessMetricsSink::new();
        record_violation(&sink, "PHANTOM_FILE", Severity::Critical, "phantom-file");
        assert_eq!(sink.counter_value(instruments::VIOLATIONS_TOTAL, &[("code", "PHANTOM_FILE"), ("severity", "critical")]), 1);
        assert_eq!(sink.counter_value(&instruments::category_total("phantom-file"), &[]), 1);
    }

    #[test]
    fn gauge_holds_last_value() {
        let sink = InProcessMetricsSink::new();
        record_confidence(&sink, 0.9);
        record_confidence(&sink, 0.4);
        assert_eq!(sink.gauge_value(instruments::CONFIDENCE, &[]), Some(0.4));
    }

    #[test]
    fn label_order_does_not_affect_key() {
        let sink = InProcessMetricsSink::new();
        sink.incr_counter("x", &[("a", "1"), ("b", "2")], 1);
        sink.incr_counter("x", &[("b", "2"), ("a", "1")], 1);
        assert_eq!(sink.counter_value("x", &[("a", "1"), ("b", "2")]), 2);
    }

    #[test]
    fn noop_sink_records_nothing_observable() {
        let sink = NoopMetricsSink;
        record_check(&sink, "citation", 0.01);
        record_confidence(&sink, 0.5);
    }

    #[test]
    fn default_sink_is_a_single_shared_instance() {
        let a = default_sink() as *const InProcessMetricsSink;
        let b = default_sink() as *const InProcessMetricsSink;
        assert_eq!(a, b);
    }
}
