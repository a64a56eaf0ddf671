//! Checker trait, shared input/context types, and the checker registry.
//!
//! Every checker implements [`Checker`] over a single `(CheckerContext,
//! CheckInput)` pair. Checkers are stateless after construction — all
//! context is passed via parameters — and must be `Send + Sync` so the
//! orchestrator can fan them out with rayon.

pub mod api_library;
pub mod attribute;
pub mod behavioral;
pub mod chain_of_verification;
pub mod citation;
pub mod confidence_fabrication;
pub mod cross_context;
pub mod fabricated_code;
pub mod grounding;
pub mod language;
pub mod line_number;
pub mod multi_sample;
pub mod phantom_file;
pub mod phantom_package;
pub mod phantom_symbol;
pub mod quantitative;
pub mod relationship;
pub mod semantic_drift;
pub mod structural_claim;
pub mod structured_output;
pub mod temporal;
pub(crate) mod util;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::evidence::EvidenceIndex;
use crate::types::Violation;

/// A single tool invocation the model observed, used by the Confidence
/// Fabrication Checker to bucket evidence strength.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub invocation_id: String,
    pub output: String,
}

/// One file's content shown to the model, independent of the evidence
/// index's own file-content map — kept separate so checkers needing raw
/// per-file iteration don't have to destructure the index.
#[derive(Debug, Clone)]
pub struct CodeContextEntry {
    pub file_path: String,
    pub content: String,
}

/// Everything a checker needs to validate one response. Immutable for the
/// duration of a `Validate` call — see the Shared Resources discipline.
#[derive(Debug, Clone)]
pub struct CheckInput {
    pub response: String,
    pub user_question: String,
    pub project_root: String,
    pub project_language: String,
    pub code_context: Vec<CodeContextEntry>,
    pub tool_results: Vec<ToolResult>,
    pub evidence: EvidenceIndex,
    /// Populated only when the caller wants the Multi-Sample Verifier to
    /// run: additional independently-sampled responses to the same prompt.
    pub additional_samples: Vec<String>,
}

impl CheckInput {
    /// The response text truncated to `limit` chars, per the per-checker
    /// scan bound (§4.2 invariant 4). Operates on chars, not bytes, so it
    /// never splits a multi-byte codepoint.
    pub fn scanned_response(&self, limit: usize) -> &str {
        match self.response.char_indices().nth(limit) {
            Some((byte_idx, _)) => &self.response[..byte_idx],
            None => &self.response,
        }
    }
}

/// Cooperative cancellation signal shared across every checker invocation in
/// one `Validate` call. Checked at least once per claim; observing it
/// cancelled means "stop and return what you have", never an error.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-invocation context threaded through every checker call.
#[derive(Debug, Clone, Default)]
pub struct CheckerContext {
    pub cancellation: CancellationToken,
}

/// Every checker implements this trait.
///
/// Contract (§4.2):
/// 1. No mutation of `input` or its evidence.
/// 2. Checks `ctx.cancellation` between claims; returns accumulated
///    violations, never a partial/corrupted one, on observing it set.
/// 3. Deterministic: identical inputs produce an identical violation list.
/// 4. Scans `input.response` only up to its own configured `scan_limit`.
/// 5. Stops claim extraction at `max_claims` even under adversarial input.
/// 6. Empty/missing evidence yields an empty result, never an error.
/// 7. `Send + Sync`: safe for concurrent invocation across independent
///    inputs.
pub trait Checker: Send + Sync {
    /// Stable short name used in metrics and logs.
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation>;
}

/// Builds the full checker set, respecting each checker's `Enabled` flag.
/// Disabled checkers are simply omitted — `Grounder::validate` never has to
/// special-case them.
///
/// Registration order fixes the stable tie-break among violations sharing a
/// priority bucket (see the ordering decision in `DESIGN.md`).
#[must_use]
pub fn build_checker_registry(config: &Config) -> Vec<Box<dyn Checker>> {
    let mut registry: Vec<Box<dyn Checker>> = Vec::new();

    macro_rules! register {
        ($enabled:expr, $checker:expr) => {
            if $enabled {
                registry.push(Box::new($checker));
            }
        };
    }

    register!(config.citation.base.enabled, citation::CitationChecker::new(config.citation.clone()));
    register!(config.line_number.base.enabled, line_number::LineNumberChecker::new(config.line_number.clone()));
    register!(config.phantom_file.base.enabled, phantom_file::PhantomFileChecker::new(config.phantom_file.clone()));
    register!(config.phantom_symbol.base.enabled, phantom_symbol::PhantomSymbolChecker::new(config.phantom_symbol.clone()));
    register!(config.phantom_package.base.enabled, phantom_package::PhantomPackageChecker::new(config.phantom_package.clone()));
    register!(config.grounding.base.enabled, grounding::GroundingChecker::new(config.grounding.clone()));
    register!(config.attribute.base.enabled, attribute::AttributeChecker::new(config.attribute.clone()));
    register!(config.relationship.base.enabled, relationship::RelationshipChecker::new(config.relationship.clone()));
    register!(config.behavioral.base.enabled, behavioral::BehavioralChecker::new(config.behavioral.clone()));
    register!(config.api_library.base.enabled, api_library::ApiLibraryChecker::new(config.api_library.clone()));
    register!(config.quantitative.base.enabled, quantitative::QuantitativeChecker::new(config.quantitative.clone()));
    register!(config.fabricated_code.base.enabled, fabricated_code::FabricatedCodeChecker::new(config.fabricated_code.clone()));
    register!(config.temporal.base.enabled, temporal::TemporalChecker::new(config.temporal.clone()));
    register!(config.cross_context.base.enabled, cross_context::CrossContextChecker::new(config.cross_context.clone()));
    register!(config.confidence_fabrication.base.enabled, confidence_fabrication::ConfidenceFabricationChecker::new(config.confidence_fabrication.clone()));
    register!(config.semantic_drift.base.enabled, semantic_drift::SemanticDriftChecker::new(config.semantic_drift.clone()));
    register!(config.language.base.enabled, language::LanguageChecker::new(config.language.clone()));
    register!(config.multi_sample.base.enabled, multi_sample::MultiSampleChecker::new(config.multi_sample.clone()));
    register!(config.structured_output.base.enabled, structured_output::StructuredOutputChecker::new(config.structured_output.clone()));
    register!(config.structural_claim.base.enabled, structural_claim::StructuralClaimChecker::new(config.structural_claim.clone()));
    register!(config.chain_of_verification.base.enabled, chain_of_verification::ChainOfVerificationChecker::new(config.chain_of_verification.clone()));

    registry
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;
    use crate::evidence::EvidenceIndexBuilder;

    pub fn empty_input(response: &str) -> CheckInput {
        CheckInput {
            response: response.to_string(),
            user_question: String::new(),
            project_root: String::new(),
            project_language: "go".to_string(),
            code_context: Vec::new(),
            tool_results: Vec::new(),
            evidence: EvidenceIndexBuilder::new().build(),
            additional_samples: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanned_response_respects_char_boundary_not_byte_boundary() {
        let input = test_helpers::empty_input("héllo world");
        // 'é' is 2 bytes; limit=2 chars should yield "hé", not split mid-codepoint.
        assert_eq!(input.scanned_response(2), "hé");
    }

    #[test]
    fn cancellation_token_defaults_to_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn build_checker_registry_honors_disabled_checkers() {
        let mut config = Config::default();
        config.citation.base.enabled = false;
        let registry = build_checker_registry(&config);
        assert!(!registry.iter().any(|c| c.name() == "citation"));
        // Opt-in checkers stay out unless explicitly enabled.
        assert!(!registry.iter().any(|c| c.name() == "structured_output"));
    }
}
