//! Scoring primitives for prompt quality assessment and synthesis.
//!
//! Pure functions, deterministic given their inputs: quality analysis takes
//! no randomness at all, and synthesis takes the RNG as an argument so a
//! fixed seed reproduces the exact candidate.
//!
//! - **quality**: sub-signal analysis and the combined quality score
//! - **synthesis**: task-type directive catalogues and candidate generation

pub mod quality;
pub mod synthesis;

pub use quality::{analyze, assess_quality, QualitySignals};
pub use synthesis::{catalogue, synthesize_optimized_text, Directive, SynthesizedPrompt};
