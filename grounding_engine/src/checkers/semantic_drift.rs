//! Semantic Drift Checker: flags a response that has drifted away from what
//! the user actually asked. Classifies the question's shape (list / how /
//! where / why / what / describe / unknown), then scores three independent
//! signals — keyword overlap, topic mismatch, and question-type mismatch —
//! into one weighted drift score.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::SemanticDriftConfig;
use crate::types::{Severity, Violation, ViolationType};

use super::util::tokenize_words;
use super::{CheckInput, Checker, CheckerContext};

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "the", "a", "an", "is", "are", "was", "were", "to", "of", "in", "on", "for", "and",
        "or", "this", "that", "it", "with", "as", "be", "can", "do", "does", "i", "you",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuestionKind {
    List,
    How,
    Where,
    Why,
    What,
    Describe,
    Unknown,
}

fn classify_question(question: &str) -> QuestionKind {
    let lower = question.trim().to_lowercase();
    if lower.starts_with("list") || lower.contains("what are all") {
        QuestionKind::List
    } else if lower.starts_with("how") {
        QuestionKind::How
    } else if lower.starts_with("where") {
        QuestionKind::Where
    } else if lower.starts_with("why") {
        QuestionKind::Why
    } else if lower.starts_with("describe") || lower.starts_with("explain") {
        QuestionKind::Describe
    } else if lower.starts_with("what") {
        QuestionKind::What
    } else {
        QuestionKind::Unknown
    }
}

fn keywords(text: &str) -> HashSet<String> {
    tokenize_words(text).into_iter().filter(|w| !STOP_WORDS.contains(w.as_str()) && w.len() > 2).collect()
}

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*(?:[-*]|\d+[.)])\s").unwrap());
static STEP_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:first|then|next|finally|step)\b").unwrap());
static LOCATION_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:in|at|inside|within)\s+[\w./\\-]+\.[\w]+|/[\w./-]+").unwrap());
static CAUSAL_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:because|since|due to|as a result|caused by)\b").unwrap());

fn type_mismatch(kind: QuestionKind, response: &str) -> f64 {
    let matched = match kind {
        QuestionKind::List => LIST_MARKER.is_match(response),
        QuestionKind::How => STEP_WORDS.is_match(response),
        QuestionKind::Where => LOCATION_WORDS.is_match(response),
        QuestionKind::Why => CAUSAL_WORDS.is_match(response),
        QuestionKind::Describe | QuestionKind::What | QuestionKind::Unknown => true,
    };
    if matched {
        0.0
    } else {
        1.0
    }
}

pub struct SemanticDriftChecker {
    config: SemanticDriftConfig,
}

impl SemanticDriftChecker {
    pub fn new(config: SemanticDriftConfig) -> Self {
        Self { config }
    }
}

impl Checker for SemanticDriftChecker {
    fn name(&self) -> &'static str {
        "semantic_drift"
    }

    fn check(&self, _ctx: &CheckerContext, input: &CheckInput) -> Vec<Violation> {
        if !self.config.base.is_enabled() {
            return Vec::new();
        }
        if input.response.len() < self.config.min_response_len || input.user_question.trim().is_empty() {
            return Vec::new();
        }

        let question_keywords = keywords(&input.user_question);
        if question_keywords.len() < self.config.min_keyword_count {
            return Vec::new();
        }

        let scanned = input.scanned_response(self.config.base.scan_limit);
        let response_keywords = keywords(scanned);

        let overlap = question_keywords.intersection(&response_keywords).count();
        let keyword_overlap = overlap as f64 / question_keywords.len() as f64;
        let topic_mismatch = 1.0 - keyword_overlap;

        let kind = classify_question(&input.user_question);
        let type_mismatch_score = type_mismatch(kind, scanned);

        let score = self.config.weight_keyword * (1.0 - keyword_overlap)
            + self.config.weight_topic * topic_mismatch
            + self.config.weight_type * type_mismatch_score;

        let severity = if score >= self.config.critical_threshold {
            Some(Severity::Critical)
        } else if score >= self.config.high_threshold {
            Some(Severity::High)
        } else if score >= self.config.warning_threshold {
            Some(Severity::Warning)
        } else {
            None
        };

        let Some(default_severity) = severity else {
            return Vec::new();
        };

        match self.config.base.effective_severity("SEMANTIC_DRIFT", default_severity) {
            Some(severity) => vec![Violation::new(
                ViolationType::SemanticDrift,
                severity,
                "SEMANTIC_DRIFT",
                format!("response drifts from the question asked (drift score {score:.2})"),
            )
            .with_phase(self.name())],
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(question: &str, response: &str) -> CheckInput {
        let mut input = super::super::test_helpers::empty_input(response);
        input.user_question = question.to_string();
        input
    }

    #[test]
    fn on_topic_response_is_silent() {
        let checker = SemanticDriftChecker::new(SemanticDriftConfig::default());
        let ctx = CheckerContext::default();
        let i = input(
            "how do I configure the retry timeout for the HTTP client?",
            "First, set the retry timeout field on the HTTP client config struct. Then pass it to the constructor.",
        );
        assert!(checker.check(&ctx, &i).is_empty());
    }

    #[test]
    fn list_question_without_list_markers_drifts() {
        let checker = SemanticDriftChecker::new(SemanticDriftConfig::default());
        let ctx = CheckerContext::default();
        let i = input(
            "list all the configuration options available for the database connection pool",
            "The weather today is quite pleasant for a walk outside in the park.",
        );
        let violations = checker.check(&ctx, &i);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "SEMANTIC_DRIFT");
    }

    #[test]
    fn classify_question_covers_all_kinds() {
        assert_eq!(classify_question("list the files"), QuestionKind::List);
        assert_eq!(classify_question("how does this work"), QuestionKind::How);
        assert_eq!(classify_question("where is this defined"), QuestionKind::Where);
        assert_eq!(classify_question("why did this fail"), QuestionKind::Why);
        assert_eq!(classify_question("describe the architecture"), QuestionKind::Describe);
        assert_eq!(classify_question("what is this"), QuestionKind::What);
        assert_eq!(classify_question("tell me more"), QuestionKind::Unknown);
    }
}
