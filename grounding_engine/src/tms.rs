//! Truth-maintenance-system verifier: builds a small belief graph out of the
//! evidence the model was shown and the claims its response makes, then
//! propagates IN/OUT status to a fixpoint. A claim is IN only if every node
//! in at least one of its justifications is IN; anything left OUT after
//! propagation is unsupported by the evidence as presented.
//!
//! This is deliberately general even though today's claim extraction only
//! produces single-level justifications (a claim depends directly on one
//! evidence node) — the propagation loop supports claims justified by other
//! claims, which the checker contract (`CheckInput`) doesn't yet need but
//! the belief-graph shape should not foreclose.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::checkers::{CheckInput, Checker, CheckerContext};
use crate::config::TmsConfig;
use crate::types::{Severity, Violation, ViolationType};

/// One proposition in the belief universe: either an evidence fact (whose
/// initial truth is fixed by the evidence index) or a claim extracted from
/// the response (whose truth is derived).
#[derive(Debug, Clone)]
struct Node {
    in_belief: bool,
    is_evidence: bool,
}

/// A claim is IN if ANY of its justifications has ALL of its required
/// supports IN — the standard ATMS "OR of ANDs" semantics.
#[derive(Debug, Clone)]
struct Justification {
    claim: String,
    supports: Vec<String>,
}

#[derive(Debug, Default)]
pub struct BeliefUniverse {
    nodes: HashMap<String, Node>,
    justifications: Vec<Justification>,
}

impl BeliefUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_evidence(&mut self, id: impl Into<String>, in_belief: bool) {
        self.nodes.insert(id.into(), Node { in_belief, is_evidence: true });
    }

    pub fn add_claim(&mut self, id: impl Into<String>) {
        self.nodes.entry(id.into()).or_insert(Node { in_belief: false, is_evidence: false });
    }

    pub fn justify(&mut self, claim: impl Into<String>, supports: Vec<String>) {
        self.justifications.push(Justification { claim: claim.into(), supports });
    }

    pub fn is_in(&self, id: &str) -> bool {
        self.nodes.get(id).map(|n| n.in_belief).unwrap_or(false)
    }

    /// Propagates justifications to a fixpoint, capped at `max_iterations`.
    /// Returns the number of iterations actually used.
    pub fn propagate(&mut self, max_iterations: usize) -> usize {
        let mut iterations = 0;
        loop {
            if iterations >= max_iterations {
                break;
            }
            iterations += 1;
            let mut changed = false;

            for justification in &self.justifications {
                if self.nodes.get(&justification.claim).map(|n| n.is_evidence).unwrap_or(false) {
                    continue;
                }
                let satisfied = justification.supports.iter().all(|s| self.is_in(s));
                if satisfied && !self.is_in(&justification.claim) {
                    if let Some(node) = self.nodes.get_mut(&justification.claim) {
                        node.in_belief = true;
                        changed = true;
                    }
                }
            }

            if !changed {
                break;
            }
        }
        iterations
    }

    /// Claims (non-evidence nodes) left OUT after propagation.
    pub fn unsupported_claims(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, n)| !n.is_evidence && !n.in_belief)
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

static FILE_CITATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z0-9_./\\-]+\.[A-Za-z0-9_]+):(\d+)").expect("static regex"));
static SYMBOL_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]{2,})\(\)").expect("static regex"));

const KNOWN_FRAMEWORKS: &[&str] = &[
    "flask", "django", "fastapi", "express", "gin", "echo", "fiber", "rails", "spring",
    "actix", "axum", "rocket", "nestjs", "next.js", "react", "vue", "angular",
];

/// `uses Flask`, `built with Gin`, `powered by Django`
static FRAMEWORK_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:uses?|built with|powered by|based on)\s+([A-Za-z][A-Za-z0-9._-]*)")
        .expect("static regex")
});

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Which belief category a claim falls under — drives both its
/// justification shape and, per §4.4, its severity when unsupported
/// (framework claims are critical, everything else is a warning).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClaimKind {
    File,
    Symbol,
    Framework,
}

impl ClaimKind {
    fn severity(self) -> Severity {
        match self {
            ClaimKind::Framework => Severity::Critical,
            ClaimKind::File | ClaimKind::Symbol => Severity::Warning,
        }
    }
}

struct ExtractedClaim {
    id: String,
    kind: ClaimKind,
    offset: usize,
    description: String,
}

fn extract_claims(text: &str, max: usize) -> Vec<ExtractedClaim> {
    let mut out = Vec::new();

    for m in FILE_CITATION.captures_iter(text) {
        if out.len() >= max {
            return out;
        }
        let file = m.get(1).unwrap().as_str();
        out.push(ExtractedClaim {
            id: format!("claim:file:{}", file.to_lowercase()),
            kind: ClaimKind::File,
            offset: m.get(0).unwrap().start(),
            description: format!("cites {file}"),
        });
    }

    for m in SYMBOL_CALL.captures_iter(text) {
        if out.len() >= max {
            return out;
        }
        let name = m.get(1).unwrap().as_str();
        out.push(ExtractedClaim {
            id: format!("claim:symbol:{}", name.to_lowercase()),
            kind: ClaimKind::Symbol,
            offset: m.get(0).unwrap().start(),
            description: format!("calls {name}()"),
        });
    }

    for m in FRAMEWORK_CLAIM.captures_iter(text) {
        if out.len() >= max {
            return out;
        }
        let claimed = m.get(1).unwrap().as_str();
        let lower = claimed.to_lowercase();
        if !KNOWN_FRAMEWORKS.contains(&lower.as_str()) {
            continue;
        }
        out.push(ExtractedClaim {
            id: format!("claim:framework:{lower}"),
            kind: ClaimKind::Framework,
            offset: m.get(0).unwrap().start(),
            description: format!("claims the project uses {claimed}"),
        });
    }

    out
}

/// Builds the belief universe for one `(CheckInput, scanned text)` pair and
/// propagates it. Exposed separately from the `Checker` impl so `grounder`
/// can reuse the same universe for diagnostics without re-scanning.
///
/// Returns the universe plus, per unsupported claim still OUT after
/// propagation, its id, source offset, human description and severity.
pub fn build_and_propagate(
    input: &CheckInput,
    scanned: &str,
    max_claims: usize,
    max_iterations: usize,
) -> (BeliefUniverse, Vec<(String, usize, String, Severity)>) {
    let mut universe = BeliefUniverse::new();
    let claims = extract_claims(scanned, max_claims);
    let mut descriptions = Vec::new();

    for claim in &claims {
        universe.add_claim(claim.id.clone());

        match claim.kind {
            ClaimKind::File => {
                // claim.id is "claim:file:<lowercased file>"; recover the raw file text.
                let file = claim.id.trim_start_matches("claim:file:");
                let full_path_belief = format!("file:{file}");
                let basename_belief = format!("basename:{}", basename(file));
                universe.add_evidence(full_path_belief.clone(), input.evidence.has_known_file(file));
                universe.add_evidence(basename_belief.clone(), input.evidence.has_known_file(basename(file)));
                universe.justify(claim.id.clone(), vec![full_path_belief]);
                universe.justify(claim.id.clone(), vec![basename_belief]);
            }
            ClaimKind::Symbol => {
                let symbol = claim.id.trim_start_matches("claim:symbol:");
                let symbol_belief = format!("symbol:{symbol}");
                universe.add_evidence(symbol_belief.clone(), input.evidence.has_known_symbol(symbol));
                universe.justify(claim.id.clone(), vec![symbol_belief]);
            }
            ClaimKind::Framework => {
                let framework = claim.id.trim_start_matches("claim:framework:");
                let framework_belief = format!("framework:{framework}");
                universe.add_evidence(framework_belief.clone(), input.evidence.frameworks.contains(framework));
                universe.justify(claim.id.clone(), vec![framework_belief]);
            }
        }

        descriptions.push((claim.id.clone(), claim.offset, claim.description.clone(), claim.kind.severity()));
    }

    universe.propagate(max_iterations);
    descriptions.sort_by_key(|(_, offset, _, _)| *offset);
    (universe, descriptions)
}

pub struct TmsChecker {
    config: TmsConfig,
}

impl TmsChecker {
    pub fn new(config: TmsConfig) -> Self {
        Self { config }
    }
}

impl Checker for TmsChecker {
    fn name(&self) -> &'static str {
        "tms"
    }

    fn check(&self, ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);
        let (universe, descriptions) =
            build_and_propagate(input, scanned, self.config.base.max_claims, self.config.max_iterations);

        let mut violations = Vec::new();

        for (id, offset, description, default_severity) in descriptions {
            if ctx.cancellation.is_cancelled() {
                break;
            }
            if universe.is_in(&id) {
                continue;
            }

            if let Some(severity) =
                self.config.base.effective_severity("TMS_UNSUPPORTED_CLAIM", default_severity)
            {
                violations.push(
                    Violation::new(
                        ViolationType::Ungrounded,
                        severity,
                        "TMS_UNSUPPORTED_CLAIM",
                        format!("claim \"{description}\" has no justification left standing after belief propagation"),
                    )
                    .with_offset(offset)
                    .with_phase(self.name()),
                );
            }
        }

        violations
    }
}
