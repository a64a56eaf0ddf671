//! Anti-hallucination validation pipeline for LLM responses.
//!
//! Ingests a free-form response (together with the evidence the model was
//! shown and the question it was asked) and emits a structured verdict
//! classifying it as grounded, warned, or rejected, plus a precise list of
//! violations. Downstream callers use the verdict to reject/regenerate,
//! attach warning footnotes, or drive per-category observability.
//!
//! This crate has no CLI and no wire format — its only surface is the
//! in-process [`grounder::Grounder`] entry point, the [`types`] it returns,
//! and the [`metrics`] schema those calls record into. Prompt assembly, LLM
//! invocation, the retry loop, session state, and tool execution are the
//! caller's responsibility.

pub mod checkers;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod evidence;
pub mod footnote;
pub mod grounder;
pub mod metrics;
pub mod tms;
pub mod types;

pub use checkers::{CheckInput, CheckerContext, CodeContextEntry, ToolResult};
pub use config::Config;
pub use error::{GroundingError, GroundingResult};
pub use evidence::{EvidenceIndex, EvidenceIndexBuilder};
pub use grounder::Grounder;
pub use metrics::{InProcessMetricsSink, MetricsSink, NoopMetricsSink};
pub use types::{CheckResult, Severity, Violation, ViolationType};
