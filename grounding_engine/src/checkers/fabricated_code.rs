//! Fabricated Code Checker: classifies every fenced code block in the
//! response as verbatim, modified, or fabricated relative to the code
//! context shown to the model, using token-overlap similarity (backed by
//! the shared Levenshtein helper for close-match reporting).

use std::sync::LazyLock;

use regex::Regex;

use crate::config::FabricatedCodeConfig;
use crate::types::{Severity, Violation, ViolationType};

use super::util::token_overlap_similarity;
use super::{CheckInput, Checker, CheckerContext};

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*\n(.*?)```").expect("static regex"));

pub struct FabricatedCodeChecker {
    config: FabricatedCodeConfig,
}

impl FabricatedCodeChecker {
    pub fn new(config: FabricatedCodeConfig) -> Self {
        Self { config }
    }
}

impl Checker for FabricatedCodeChecker {
    fn name(&self) -> &'static str {
        "fabricated_code"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() || input.code_context.is_empty() {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);
        let mut violations = Vec::new();
        let mut checked = 0usize;

        for m in FENCED_BLOCK.captures_iter(scanned) {
            if ctx.cancellation.is_cancelled() || checked >= self.config.base.max_claims {
                break;
            }
            let block = m.get(1).unwrap().as_str();
            if block.trim().len() < 20 {
                // Too short to meaningfully classify (e.g. a one-line snippet).
                continue;
            }
            checked += 1;

            let best_similarity = input
                .code_context
                .iter()
                .map(|entry| token_overlap_similarity(block, &entry.content))
                .fold(0.0_f64, f64::max);

            if best_similarity >= self.config.similarity_threshold {
                continue;
            }

            const FABRICATION_FLOOR: f64 = 0.3;

            if best_similarity < FABRICATION_FLOOR {
                if let Some(severity) =
                    self.config.base.effective_severity("FABRICATED_CODE_BLOCK", Severity::High)
                {
                    violations.push(
                        Violation::new(
                            ViolationType::FabricatedCode,
                            severity,
                            "FABRICATED_CODE_BLOCK",
                            "presents a code block with essentially no overlap with any code shown in context",
                        )
                        .with_offset(m.get(0).unwrap().start())
                        .with_phase(self.name()),
                    );
                }
            } else if let Some(severity) =
                self.config.base.effective_severity("FABRICATED_CODE_MODIFIED", Severity::Warning)
            {
                violations.push(
                    Violation::new(
                        ViolationType::FabricatedCode,
                        severity,
                        "FABRICATED_CODE_MODIFIED",
                        "presents a code block that partially overlaps known code but diverges past the similarity threshold",
                    )
                    .with_offset(m.get(0).unwrap().start())
                    .with_phase(self.name()),
                );
            }
        }

        violations
    }
}
