//! Configuration resolution for the grounding engine.
//!
//! Three-level resolution order:
//! 1. Built-in defaults (calibrated per §4.3 of the design doc).
//! 2. An optional `grounding.toml` file, one table per checker.
//! 3. Explicit programmatic overrides the caller applies after loading.
//!
//! Every checker gets a [`CheckerBase`] (enabled flag, scan-length limit,
//! claim cap, per-code severity overrides) plus whatever extra thresholds
//! its algorithm needs.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GroundingError, GroundingResult};
use crate::types::Severity;

/// Per-code severity override, or `Off` to silence that code while leaving
/// the checker itself enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityOverride {
    Critical,
    High,
    Warning,
    Info,
    Off,
}

fn parse_severity_override(s: &str) -> Option<SeverityOverride> {
    match s.to_lowercase().as_str() {
        "critical" => Some(SeverityOverride::Critical),
        "high" => Some(SeverityOverride::High),
        "warning" | "warn" => Some(SeverityOverride::Warning),
        "info" => Some(SeverityOverride::Info),
        "off" | "disabled" | "false" => Some(SeverityOverride::Off),
        _ => None,
    }
}

/// Common configuration every checker carries, per the Checker Contract
/// (§4.2): an enablement flag, the scan-length truncation bound, the claim
/// cap, and per-code severity overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerBase {
    pub enabled: bool,
    /// Responses longer than this are scanned only up to the bound.
    pub scan_limit: usize,
    /// `MaxClaimsToCheck`: extraction stops after this many unique claims.
    pub max_claims: usize,
    pub severity_overrides: HashMap<String, SeverityOverride>,
}

impl Default for CheckerBase {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_limit: 15_000,
            max_claims: 200,
            severity_overrides: HashMap::new(),
        }
    }
}

impl CheckerBase {
    /// `false` silences the checker entirely: it must return no violations.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Resolves the effective severity for a violation code, honoring any
    /// per-code override. `None` means the code is silenced (`Off`) and the
    /// caller should skip emitting the violation altogether.
    #[must_use]
    pub fn effective_severity(&self, code: &str, default: Severity) -> Option<Severity> {
        match self.severity_overrides.get(code) {
            Some(SeverityOverride::Critical) => Some(Severity::Critical),
            Some(SeverityOverride::High) => Some(Severity::High),
            Some(SeverityOverride::Warning) => Some(Severity::Warning),
            Some(SeverityOverride::Info) => Some(Severity::Info),
            Some(SeverityOverride::Off) => None,
            None => Some(default),
        }
    }
}

macro_rules! checker_config {
    ($name:ident { $($field:ident : $ty:ty = $default:expr),* $(,)? }) => {
        #[derive(Debug, Clone, Serialize, Deserialize)]
        pub struct $name {
            pub base: CheckerBase,
            $(pub $field: $ty,)*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    base: CheckerBase::default(),
                    $($field: $default,)*
                }
            }
        }
    };
}

checker_config!(CitationConfig {});
checker_config!(LineNumberConfig {
    line_tolerance: i64 = 5,
    strict_mode: bool = false,
});
checker_config!(PhantomFileConfig {
    max_suggestions: usize = 10,
});
checker_config!(PhantomSymbolConfig {
    max_suggestions: usize = 10,
});
checker_config!(PhantomPackageConfig {
    max_suggestions: usize = 10,
});
checker_config!(GroundingConfig {});
checker_config!(AttributeConfig {});
checker_config!(RelationshipConfig {});
checker_config!(BehavioralConfig {
    require_counter_evidence: bool = false,
});
checker_config!(QuantitativeConfig {
    exact_tolerance: i64 = 0,
    approx_over_pct: f64 = 0.15,
    approx_under_pct: f64 = 0.30,
});
checker_config!(FabricatedCodeConfig {
    similarity_threshold: f64 = 0.75,
});
checker_config!(ApiLibraryConfig {});
checker_config!(TemporalConfig {});
checker_config!(CrossContextConfig {});
checker_config!(ConfidenceFabricationConfig {});
checker_config!(SemanticDriftConfig {
    critical_threshold: f64 = 0.7,
    high_threshold: f64 = 0.5,
    warning_threshold: f64 = 0.3,
    min_response_len: usize = 20,
    min_keyword_count: usize = 2,
    weight_keyword: f64 = 0.5,
    weight_topic: f64 = 0.3,
    weight_type: f64 = 0.2,
});
checker_config!(LanguageConfig {});
checker_config!(MultiSampleConfig {
    consensus_threshold: usize = 2,
});
checker_config!(StructuredOutputConfig {});
checker_config!(StructuralClaimConfig {});
checker_config!(ChainOfVerificationConfig {});
checker_config!(TmsConfig {
    max_iterations: usize = 100,
});

impl Default for StructuredOutputConfig {
    fn default() -> Self {
        Self {
            base: CheckerBase {
                enabled: false,
                ..CheckerBase::default()
            },
        }
    }
}

impl Default for StructuralClaimConfig {
    fn default() -> Self {
        Self {
            base: CheckerBase {
                enabled: false,
                ..CheckerBase::default()
            },
        }
    }
}

impl Default for ChainOfVerificationConfig {
    fn default() -> Self {
        Self {
            base: CheckerBase {
                enabled: false,
                ..CheckerBase::default()
            },
        }
    }
}

/// The composite configuration: one sub-struct per checker plus a handful of
/// orchestrator-level knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub citation: CitationConfig,
    pub line_number: LineNumberConfig,
    pub phantom_file: PhantomFileConfig,
    pub phantom_symbol: PhantomSymbolConfig,
    pub phantom_package: PhantomPackageConfig,
    pub grounding: GroundingConfig,
    pub attribute: AttributeConfig,
    pub relationship: RelationshipConfig,
    pub behavioral: BehavioralConfig,
    pub quantitative: QuantitativeConfig,
    pub fabricated_code: FabricatedCodeConfig,
    pub api_library: ApiLibraryConfig,
    pub temporal: TemporalConfig,
    pub cross_context: CrossContextConfig,
    pub confidence_fabrication: ConfidenceFabricationConfig,
    pub semantic_drift: SemanticDriftConfig,
    pub language: LanguageConfig,
    pub multi_sample: MultiSampleConfig,
    /// Opt-in; disabled by default.
    pub structured_output: StructuredOutputConfig,
    /// Opt-in; disabled by default.
    pub structural_claim: StructuralClaimConfig,
    /// Opt-in; disabled by default.
    pub chain_of_verification: ChainOfVerificationConfig,
    pub tms: TmsConfig,

    /// `ShouldReject` fires when confidence drops below this floor, even
    /// absent a priority-2-or-lower violation.
    pub reject_confidence_floor: f64,
    /// Bound on the rayon thread pool used to fan out checkers; `0` means
    /// use rayon's default (host core count).
    pub max_worker_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            citation: CitationConfig::default(),
            line_number: LineNumberConfig::default(),
            phantom_file: PhantomFileConfig::default(),
            phantom_symbol: PhantomSymbolConfig::default(),
            phantom_package: PhantomPackageConfig::default(),
            grounding: GroundingConfig::default(),
            attribute: AttributeConfig::default(),
            relationship: RelationshipConfig::default(),
            behavioral: BehavioralConfig::default(),
            quantitative: QuantitativeConfig::default(),
            fabricated_code: FabricatedCodeConfig::default(),
            api_library: ApiLibraryConfig::default(),
            temporal: TemporalConfig::default(),
            cross_context: CrossContextConfig::default(),
            confidence_fabrication: ConfidenceFabricationConfig::default(),
            semantic_drift: SemanticDriftConfig::default(),
            language: LanguageConfig::default(),
            multi_sample: MultiSampleConfig::default(),
            structured_output: StructuredOutputConfig::default(),
            structural_claim: StructuralClaimConfig::default(),
            chain_of_verification: ChainOfVerificationConfig::default(),
            tms: TmsConfig::default(),
            reject_confidence_floor: 0.5,
            max_worker_threads: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// TOML overlay
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct TomlBaseSection {
    enabled: Option<bool>,
    scan_limit: Option<usize>,
    max_claims: Option<usize>,
    severity: Option<HashMap<String, String>>,
}

fn apply_base(base: &mut CheckerBase, section: &TomlBaseSection) {
    if let Some(v) = section.enabled {
        base.enabled = v;
    }
    if let Some(v) = section.scan_limit {
        base.scan_limit = v;
    }
    if let Some(v) = section.max_claims {
        base.max_claims = v;
    }
    if let Some(ref overrides) = section.severity {
        for (code, value) in overrides {
            if let Some(parsed) = parse_severity_override(value) {
                base.severity_overrides.insert(code.clone(), parsed);
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TomlLineNumberSection {
    #[serde(flatten)]
    base: TomlBaseSection,
    line_tolerance: Option<i64>,
    strict_mode: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlSuggestSection {
    #[serde(flatten)]
    base: TomlBaseSection,
    max_suggestions: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlBehavioralSection {
    #[serde(flatten)]
    base: TomlBaseSection,
    require_counter_evidence: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlQuantitativeSection {
    #[serde(flatten)]
    base: TomlBaseSection,
    exact_tolerance: Option<i64>,
    approx_over_pct: Option<f64>,
    approx_under_pct: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlFabricatedCodeSection {
    #[serde(flatten)]
    base: TomlBaseSection,
    similarity_threshold: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlSemanticDriftSection {
    #[serde(flatten)]
    base: TomlBaseSection,
    critical_threshold: Option<f64>,
    high_threshold: Option<f64>,
    warning_threshold: Option<f64>,
    min_response_len: Option<usize>,
    min_keyword_count: Option<usize>,
    weight_keyword: Option<f64>,
    weight_topic: Option<f64>,
    weight_type: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlMultiSampleSection {
    #[serde(flatten)]
    base: TomlBaseSection,
    consensus_threshold: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlTmsSection {
    #[serde(flatten)]
    base: TomlBaseSection,
    max_iterations: Option<usize>,
}

/// Raw structure of `grounding.toml`: every section and field is optional so
/// the file only needs to name what it overrides.
#[derive(Debug, Default, Deserialize)]
struct TomlConfigFile {
    citation: Option<TomlBaseSection>,
    line_number: Option<TomlLineNumberSection>,
    phantom_file: Option<TomlSuggestSection>,
    phantom_symbol: Option<TomlSuggestSection>,
    phantom_package: Option<TomlSuggestSection>,
    grounding: Option<TomlBaseSection>,
    attribute: Option<TomlBaseSection>,
    relationship: Option<TomlBaseSection>,
    behavioral: Option<TomlBehavioralSection>,
    quantitative: Option<TomlQuantitativeSection>,
    fabricated_code: Option<TomlFabricatedCodeSection>,
    api_library: Option<TomlBaseSection>,
    temporal: Option<TomlBaseSection>,
    cross_context: Option<TomlBaseSection>,
    confidence_fabrication: Option<TomlBaseSection>,
    semantic_drift: Option<TomlSemanticDriftSection>,
    language: Option<TomlBaseSection>,
    multi_sample: Option<TomlMultiSampleSection>,
    structured_output: Option<TomlBaseSection>,
    structural_claim: Option<TomlBaseSection>,
    chain_of_verification: Option<TomlBaseSection>,
    tms: Option<TomlTmsSection>,
    reject_confidence_floor: Option<f64>,
    max_worker_threads: Option<usize>,
}

fn apply_toml_file(config: &mut Config, file: &TomlConfigFile) {
    if let Some(ref s) = file.citation {
        apply_base(&mut config.citation.base, s);
    }
    if let Some(ref s) = file.line_number {
        apply_base(&mut config.line_number.base, &s.base);
        if let Some(v) = s.line_tolerance {
            config.line_number.line_tolerance = v;
        }
        if let Some(v) = s.strict_mode {
            config.line_number.strict_mode = v;
        }
    }
    if let Some(ref s) = file.phantom_file {
        apply_base(&mut config.phantom_file.base, &s.base);
        if let Some(v) = s.max_suggestions {
            config.phantom_file.max_suggestions = v;
        }
    }
    if let Some(ref s) = file.phantom_symbol {
        apply_base(&mut config.phantom_symbol.base, &s.base);
        if let Some(v) = s.max_suggestions {
            config.phantom_symbol.max_suggestions = v;
        }
    }
    if let Some(ref s) = file.phantom_package {
        apply_base(&mut config.phantom_package.base, &s.base);
        if let Some(v) = s.max_suggestions {
            config.phantom_package.max_suggestions = v;
        }
    }
    if let Some(ref s) = file.grounding {
        apply_base(&mut config.grounding.base, s);
    }
    if let Some(ref s) = file.attribute {
        apply_base(&mut config.attribute.base, s);
    }
    if let Some(ref s) = file.relationship {
        apply_base(&mut config.relationship.base, s);
    }
    if let Some(ref s) = file.behavioral {
        apply_base(&mut config.behavioral.base, &s.base);
        if let Some(v) = s.require_counter_evidence {
            config.behavioral.require_counter_evidence = v;
        }
    }
    if let Some(ref s) = file.quantitative {
        apply_base(&mut config.quantitative.base, &s.base);
        if let Some(v) = s.exact_tolerance {
            config.quantitative.exact_tolerance = v;
        }
        if let Some(v) = s.approx_over_pct {
            config.quantitative.approx_over_pct = v;
        }
        if let Some(v) = s.approx_under_pct {
            config.quantitative.approx_under_pct = v;
        }
    }
    if let Some(ref s) = file.fabricated_code {
        apply_base(&mut config.fabricated_code.base, &s.base);
        if let Some(v) = s.similarity_threshold {
            config.fabricated_code.similarity_threshold = v;
        }
    }
    if let Some(ref s) = file.api_library {
        apply_base(&mut config.api_library.base, s);
    }
    if let Some(ref s) = file.temporal {
        apply_base(&mut config.temporal.base, s);
    }
    if let Some(ref s) = file.cross_context {
        apply_base(&mut config.cross_context.base, s);
    }
    if let Some(ref s) = file.confidence_fabrication {
        apply_base(&mut config.confidence_fabrication.base, s);
    }
    if let Some(ref s) = file.semantic_drift {
        apply_base(&mut config.semantic_drift.base, &s.base);
        if let Some(v) = s.critical_threshold {
            config.semantic_drift.critical_threshold = v;
        }
        if let Some(v) = s.high_threshold {
            config.semantic_drift.high_threshold = v;
        }
        if let Some(v) = s.warning_threshold {
            config.semantic_drift.warning_threshold = v;
        }
        if let Some(v) = s.min_response_len {
            config.semantic_drift.min_response_len = v;
        }
        if let Some(v) = s.min_keyword_count {
            config.semantic_drift.min_keyword_count = v;
        }
        if let Some(v) = s.weight_keyword {
            config.semantic_drift.weight_keyword = v;
        }
        if let Some(v) = s.weight_topic {
            config.semantic_drift.weight_topic = v;
        }
        if let Some(v) = s.weight_type {
            config.semantic_drift.weight_type = v;
        }
    }
    if let Some(ref s) = file.language {
        apply_base(&mut config.language.base, s);
    }
    if let Some(ref s) = file.multi_sample {
        apply_base(&mut config.multi_sample.base, &s.base);
        if let Some(v) = s.consensus_threshold {
            config.multi_sample.consensus_threshold = v;
        }
    }
    if let Some(ref s) = file.structured_output {
        apply_base(&mut config.structured_output.base, s);
    }
    if let Some(ref s) = file.structural_claim {
        apply_base(&mut config.structural_claim.base, s);
    }
    if let Some(ref s) = file.chain_of_verification {
        apply_base(&mut config.chain_of_verification.base, s);
    }
    if let Some(ref s) = file.tms {
        apply_base(&mut config.tms.base, &s.base);
        if let Some(v) = s.max_iterations {
            config.tms.max_iterations = v;
        }
    }
    if let Some(v) = file.reject_confidence_floor {
        config.reject_confidence_floor = v;
    }
    if let Some(v) = file.max_worker_threads {
        config.max_worker_threads = v;
    }
}

impl Config {
    /// Resolves defaults overlaid with `<root>/grounding.toml`, if present.
    /// Caller-supplied programmatic overrides are expected to be applied
    /// afterward by mutating the returned `Config` directly.
    pub fn load_from_project(root: &Path) -> GroundingResult<Self> {
        let mut config = Self::default();

        let path = root.join("grounding.toml");
        if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|source| GroundingError::ConfigRead {
                path: path.display().to_string(),
                source,
            })?;
            let file: TomlConfigFile = toml::from_str(&text)?;
            apply_toml_file(&mut config, &file);
            tracing::info!(path = %path.display(), "loaded grounding config overlay");
        }

        Ok(config)
    }

    /// Deterministic SHA-256 fingerprint over canonical (sorted-key) JSON, so
    /// a caller can correlate a `CheckResult` with the exact config that
    /// produced it regardless of `HashMap` iteration order.
    #[must_use]
    pub fn config_hash(&self) -> String {
        use sha2::{Digest, Sha256};

        let value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        let canonical = canonical_json(&value);
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }
}

fn canonical_json(value: &serde_json::Value) -> String {
    let mut buf = String::new();
    write_canonical(value, &mut buf);
    buf
}

fn write_canonical(value: &serde_json::Value, buf: &mut String) {
    use std::fmt::Write;

    match value {
        serde_json::Value::Null => buf.push_str("null"),
        serde_json::Value::Bool(b) => {
            let _ = write!(buf, "{b}");
        }
        serde_json::Value::Number(n) => {
            let _ = write!(buf, "{n}");
        }
        serde_json::Value::String(s) => {
            let _ = write!(buf, "{}", serde_json::to_string(s).unwrap_or_default());
        }
        serde_json::Value::Array(arr) => {
            buf.push('[');
            for (i, v) in arr.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                write_canonical(v, buf);
            }
            buf.push(']');
        }
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            buf.push('{');
            for (i, k) in keys.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                let _ = write!(buf, "{}:", serde_json::to_string(k).unwrap_or_default());
                write_canonical(&map[*k], buf);
            }
            buf.push('}');
        }
    }
}
