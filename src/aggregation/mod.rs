//! Aggregation layer: human feedback and operational telemetry.
//!
//! Both aggregators are single-writer, multiple-reader stores. They own
//! their entries outright and reference optimizations and models only by
//! identifier, so deleting an optimization never cascades here.

pub mod feedback;
pub mod performance;

pub use feedback::{FeedbackAggregator, FeedbackFilter, FeedbackSummary, RaterSummary};
pub use performance::{PerformanceAggregator, PerformanceRollup, RollupRange};
