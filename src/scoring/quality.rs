//! Prompt quality assessment.
//!
//! Four sub-signals, each in [0, 1]:
//! - **specificity**: concrete values, constraint words, domain vocabulary
//! - **context adequacy**: enough surrounding material to act on
//! - **clarity**: sentence length stays readable
//! - **completeness**: output and format expectations are stated
//!
//! The combined score is the equal-weight average of the four, so identical
//! input always produces the identical score.

use crate::error::{PromptforgeError, Result};
use crate::types::TaskType;
use serde::{Deserialize, Serialize};

/// Per-signal breakdown of a quality assessment
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QualitySignals {
    pub specificity: f64,
    pub context_adequacy: f64,
    pub clarity: f64,
    pub completeness: f64,
}

impl QualitySignals {
    /// Equal-weight average of the four sub-signals
    pub fn combined(&self) -> f64 {
        ((self.specificity + self.context_adequacy + self.clarity + self.completeness) / 4.0)
            .clamp(0.0, 1.0)
    }
}

const CONSTRAINT_WORDS: &[&str] = &[
    "must", "should", "exactly", "at least", "at most", "only", "never", "always", "require",
    "constraint", "limit", "within",
];

const COMPLETENESS_WORDS: &[&str] = &[
    "format", "output", "example", "return", "include", "structure", "step", "json", "list",
    "table",
];

/// Analyze a prompt into its quality sub-signals.
///
/// Fails with `InvalidInput` when the text is empty after trimming.
pub fn analyze(text: &str, task_type: TaskType) -> Result<QualitySignals> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(PromptforgeError::InvalidInput(
            "prompt text is empty".to_string(),
        ));
    }

    Ok(QualitySignals {
        specificity: specificity(trimmed, task_type),
        context_adequacy: context_adequacy(trimmed),
        clarity: clarity(trimmed),
        completeness: completeness(trimmed),
    })
}

/// Combined quality score in [0, 1]
pub fn assess_quality(text: &str, task_type: TaskType) -> Result<f64> {
    Ok(analyze(text, task_type)?.combined())
}

/// Vocabulary that marks a prompt as concrete for its task type
fn domain_markers(task_type: TaskType) -> &'static [&'static str] {
    match task_type {
        TaskType::Coding => &[
            "function", "rust", "python", "typescript", "error", "test", "api", "class", "input",
        ],
        TaskType::Creative => &["tone", "audience", "style", "genre", "character", "theme"],
        TaskType::Analysis => &[
            "metric",
            "trend",
            "dataset",
            "correlation",
            "summary",
            "insight",
        ],
        TaskType::Qa => &["why", "how", "explain", "context", "background", "compare"],
    }
}

fn specificity(text: &str, task_type: TaskType) -> f64 {
    let lower = text.to_lowercase();
    let has_numbers = text.chars().any(|c| c.is_ascii_digit()) as usize;
    let constraints = CONSTRAINT_WORDS
        .iter()
        .filter(|w| lower.contains(*w))
        .count();
    let domain = domain_markers(task_type)
        .iter()
        .filter(|w| lower.contains(*w))
        .count();

    ((has_numbers + constraints + domain) as f64 / 5.0).min(1.0)
}

fn context_adequacy(text: &str) -> f64 {
    // saturates at ~60 words; one-liners score low
    let words = text.split_whitespace().count();
    (words as f64 / 60.0).min(1.0)
}

fn clarity(text: &str) -> f64 {
    let sentences = text
        .split(['.', '!', '?', '\n'])
        .filter(|s| !s.trim().is_empty())
        .count()
        .max(1);
    let words = text.split_whitespace().count();
    let avg_sentence_len = words as f64 / sentences as f64;

    if avg_sentence_len <= 20.0 {
        1.0
    } else {
        (1.0 - (avg_sentence_len - 20.0) / 40.0).clamp(0.2, 1.0)
    }
}

fn completeness(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let hits = COMPLETENESS_WORDS
        .iter()
        .filter(|w| lower.contains(*w))
        .count();

    (hits as f64 / 3.0).min(1.0)
}
