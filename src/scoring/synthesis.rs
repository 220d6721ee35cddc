//! Optimized-prompt synthesis.
//!
//! Appends task-type-specific improvement directives to the original text as
//! structured guidance. Directive selection draws from the injected RNG, so
//! a fixed seed reproduces the exact candidate; the improvement tags recorded
//! on the result are derived from the directives actually applied.

use crate::error::{PromptforgeError, Result};
use crate::types::TaskType;
use rand::seq::SliceRandom;
use rand::Rng;

/// An improvement directive plus the tag recorded in `improvements_made`
#[derive(Debug, Clone, Copy)]
pub struct Directive {
    pub guidance: &'static str,
    pub tag: &'static str,
}

const CODING_DIRECTIVES: &[Directive] = &[
    Directive {
        guidance: "Specify the programming language and framework",
        tag: "added_specificity",
    },
    Directive {
        guidance: "Include error handling requirements",
        tag: "included_requirements",
    },
    Directive {
        guidance: "Request code documentation and comments",
        tag: "requested_explanation",
    },
    Directive {
        guidance: "Define expected input/output formats",
        tag: "specified_format",
    },
    Directive {
        guidance: "Specify performance requirements",
        tag: "added_constraints",
    },
];

const CREATIVE_DIRECTIVES: &[Directive] = &[
    Directive {
        guidance: "Define the target audience and tone",
        tag: "added_context",
    },
    Directive {
        guidance: "Specify length and format requirements",
        tag: "specified_format",
    },
    Directive {
        guidance: "Include style and genre preferences",
        tag: "added_specificity",
    },
    Directive {
        guidance: "Request specific themes or elements",
        tag: "included_requirements",
    },
    Directive {
        guidance: "Define the intended use case",
        tag: "improved_clarity",
    },
];

const ANALYSIS_DIRECTIVES: &[Directive] = &[
    Directive {
        guidance: "Specify the type of analysis required",
        tag: "added_specificity",
    },
    Directive {
        guidance: "Define the expected output format",
        tag: "specified_format",
    },
    Directive {
        guidance: "Include methodology preferences",
        tag: "included_requirements",
    },
    Directive {
        guidance: "Request specific metrics or insights",
        tag: "added_constraints",
    },
    Directive {
        guidance: "Specify data interpretation requirements",
        tag: "requested_explanation",
    },
];

const QA_DIRECTIVES: &[Directive] = &[
    Directive {
        guidance: "Provide context and background information",
        tag: "added_context",
    },
    Directive {
        guidance: "Specify the level of detail required",
        tag: "added_constraints",
    },
    Directive {
        guidance: "Include relevant constraints or assumptions",
        tag: "included_requirements",
    },
    Directive {
        guidance: "Request supporting evidence or examples",
        tag: "requested_explanation",
    },
    Directive {
        guidance: "Define the target audience for the response",
        tag: "improved_clarity",
    },
];

/// Directive catalogue for a task type
pub fn catalogue(task_type: TaskType) -> &'static [Directive] {
    match task_type {
        TaskType::Coding => CODING_DIRECTIVES,
        TaskType::Creative => CREATIVE_DIRECTIVES,
        TaskType::Analysis => ANALYSIS_DIRECTIVES,
        TaskType::Qa => QA_DIRECTIVES,
    }
}

/// Synthesized candidate: rewritten text plus ordered improvement tags
#[derive(Debug, Clone)]
pub struct SynthesizedPrompt {
    pub text: String,
    pub improvements_made: Vec<String>,
}

/// Build an optimized candidate by appending 2–4 directives as guidance.
///
/// The original text is kept verbatim as a prefix; directives follow as a
/// bullet list separated by a blank line. Fails with `InvalidInput` when the
/// original is empty after trimming.
pub fn synthesize_optimized_text<R: Rng>(
    original: &str,
    task_type: TaskType,
    rng: &mut R,
) -> Result<SynthesizedPrompt> {
    let trimmed = original.trim();
    if trimmed.is_empty() {
        return Err(PromptforgeError::InvalidInput(
            "prompt text is empty".to_string(),
        ));
    }

    let directives = catalogue(task_type);
    let take = rng.gen_range(2..=4usize).min(directives.len());
    let selected: Vec<&Directive> = directives.choose_multiple(rng, take).collect();

    let mut text = String::with_capacity(trimmed.len() + take * 48 + 2);
    text.push_str(trimmed);
    text.push_str("\n\n");
    for (i, directive) in selected.iter().enumerate() {
        if i > 0 {
            text.push('\n');
        }
        text.push_str("- ");
        text.push_str(directive.guidance);
    }

    let mut improvements_made = Vec::with_capacity(take);
    for directive in &selected {
        let tag = directive.tag.to_string();
        if !improvements_made.contains(&tag) {
            improvements_made.push(tag);
        }
    }

    Ok(SynthesizedPrompt {
        text,
        improvements_made,
    })
}
