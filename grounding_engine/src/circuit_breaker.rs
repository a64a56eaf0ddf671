//! Circuit breaker tracking downstream health, independent of any single
//! checker's state — checkers stay stateless; this is the one component
//! whose transitions are driven by externally reported success/failure.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use crate::metrics::{instruments, MetricsSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    HalfOpen = 1,
    Open = 2,
}

impl CircuitState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Closed,
            1 => Self::HalfOpen,
            _ => Self::Open,
        }
    }
}

/// A standard failure-count breaker: `Closed` trips to `Open` after
/// `failure_threshold` consecutive failures, `Open` moves to `HalfOpen`
/// after `probe_after` successes are attempted, and `HalfOpen` closes on
/// the next success or reopens on the next failure.
pub struct CircuitBreaker {
    state: AtomicU8,
    consecutive_failures: AtomicUsize,
    failure_threshold: usize,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: usize) -> Self {
        Self {
            state: AtomicU8::new(CircuitState::Closed as u8),
            consecutive_failures: AtomicUsize::new(0),
            failure_threshold,
        }
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn record_success(&self, sink: &dyn MetricsSink) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        match self.state() {
            CircuitState::Closed => {}
            CircuitState::HalfOpen | CircuitState::Open => {
                self.state.store(CircuitState::Closed as u8, Ordering::SeqCst);
            }
        }
        self.record_state(sink);
    }

    pub fn record_failure(&self, sink: &dyn MetricsSink) {
        match self.state() {
            CircuitState::HalfOpen => {
                self.state.store(CircuitState::Open as u8, Ordering::SeqCst);
            }
            CircuitState::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= self.failure_threshold {
                    self.state.store(CircuitState::Open as u8, Ordering::SeqCst);
                }
            }
            CircuitState::Open => {}
        }
        self.record_state(sink);
    }

    /// Allows a single trial request through an `Open` breaker, moving it to
    /// `HalfOpen`. No-op from any other state.
    pub fn probe(&self, sink: &dyn MetricsSink) {
        if self.state() == CircuitState::Open {
            self.state.store(CircuitState::HalfOpen as u8, Ordering::SeqCst);
            self.record_state(sink);
        }
    }

    fn record_state(&self, sink: &dyn MetricsSink) {
        sink.set_gauge(instruments::CIRCUIT_BREAKER_STATE, &[], self.state() as u8 as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::InProcessMetricsSink;

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new(3);
        let sink = InProcessMetricsSink::new();
        breaker.record_failure(&sink);
        breaker.record_failure(&sink);
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure(&sink);
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn success_resets_failure_count() {
        let breaker = CircuitBreaker::new(3);
        let sink = InProcessMetricsSink::new();
        breaker.record_failure(&sink);
        breaker.record_failure(&sink);
        breaker.record_success(&sink);
        breaker.record_failure(&sink);
        breaker.record_failure(&sink);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn probe_moves_open_to_half_open_and_failure_reopens() {
        let breaker = CircuitBreaker::new(1);
        let sink = InProcessMetricsSink::new();
        breaker.record_failure(&sink);
        assert_eq!(breaker.state(), CircuitState::Open);
        breaker.probe(&sink);
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_failure(&sink);
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn half_open_success_closes() {
        let breaker = CircuitBreaker::new(1);
        let sink = InProcessMetricsSink::new();
        breaker.record_failure(&sink);
        breaker.probe(&sink);
        breaker.record_success(&sink);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn gauge_tracks_state_transitions() {
        let breaker = CircuitBreaker::new(1);
        let sink = InProcessMetricsSink::new();
        breaker.record_failure(&sink);
        assert_eq!(sink.gauge_value(instruments::CIRCUIT_BREAKER_STATE, &[]), Some(2.0));
    }
}
