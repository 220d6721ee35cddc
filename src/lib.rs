//! Promptforge - Prompt-Optimization Scoring and Feedback-Aggregation Engine
//!
//! A Rust engine that turns raw prompts into optimized candidates with
//! quantified quality signals, and aggregates the feedback and telemetry
//! those optimizations generate:
//! - Deterministic scoring primitives (seedable RNG, no ambient randomness)
//! - Optimization processing with timeout-bounded scoring and atomic publish
//! - Feedback aggregation with last-write-wins idempotence per session
//! - Time-windowed performance rollups for dashboard charting
//! - Model health classification from operational snapshots
//!
//! # Architecture
//!
//! The engine is organized into layers:
//! - **Types**: Core data structures (PromptOptimization, FeedbackSession, ...)
//! - **Scoring**: Pure quality assessment and candidate synthesis
//! - **Optimizer**: The processor and the reward-scorer boundary trait
//! - **Aggregation**: Feedback and performance stores with summaries/rollups
//! - **Registry**: Latest-state model health snapshots
//! - **Api**: HTTP JSON surface for the dashboard
//!
//! # Example
//!
//! ```ignore
//! use promptforge_core::{EngineConfig, OptimizationProcessor, TaskType};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EngineConfig::load()?;
//!     let processor = OptimizationProcessor::new(config);
//!
//!     let record = processor
//!         .optimize("Write code for sorting", TaskType::Coding)
//!         .await?;
//!     println!("expected lift: {:.0}%",
//!         record.optimized_prompt.expected_performance_lift * 100.0);
//!
//!     Ok(())
//! }
//! ```

pub mod aggregation;
pub mod api;
pub mod config;
pub mod error;
pub mod optimizer;
pub mod registry;
pub mod scoring;
pub mod types;

// Re-export commonly used types
pub use aggregation::{FeedbackAggregator, FeedbackFilter, PerformanceAggregator, RollupRange};
pub use config::EngineConfig;
pub use error::{PromptforgeError, Result};
pub use optimizer::{LocalRewardModel, OptimizationProcessor, RewardScorer};
pub use registry::ModelHealthRegistry;
pub use types::{
    FeedbackSession, ModelSnapshot, ModelStatus, OptimizationStatus, PerformanceSample,
    PromptOptimization, TaskType,
};
