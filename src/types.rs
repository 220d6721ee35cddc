//! Core data structures for the optimization engine
//!
//! Wire field names follow the dashboard contract: snake_case throughout,
//! with the record identifier serialized as `optimization_id`.

use crate::error::PromptforgeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Task type classification for incoming prompts
///
/// Closed enumeration: unknown values are rejected with
/// [`PromptforgeError::UnsupportedTaskType`], never silently coerced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Coding,
    Creative,
    Analysis,
    Qa,
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskType::Coding => write!(f, "coding"),
            TaskType::Creative => write!(f, "creative"),
            TaskType::Analysis => write!(f, "analysis"),
            TaskType::Qa => write!(f, "qa"),
        }
    }
}

impl FromStr for TaskType {
    type Err = PromptforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coding" => Ok(TaskType::Coding),
            "creative" => Ok(TaskType::Creative),
            "analysis" => Ok(TaskType::Analysis),
            "qa" => Ok(TaskType::Qa),
            other => Err(PromptforgeError::UnsupportedTaskType(other.to_string())),
        }
    }
}

/// Lifecycle state of an optimization record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStatus {
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for OptimizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptimizationStatus::Processing => write!(f, "processing"),
            OptimizationStatus::Completed => write!(f, "completed"),
            OptimizationStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Assessment of the prompt as submitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginalPrompt {
    pub text: String,
    pub task_type: TaskType,
    pub context_length: usize,
    /// Combined quality score in [0, 1]
    pub quality_score: f64,
}

/// The synthesized candidate and its quality signals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedPrompt {
    pub text: String,
    /// Ordered improvement tags, derived from the applied directives
    pub improvements_made: Vec<String>,
    pub confidence_score: f64,
    pub expected_performance_lift: f64,
}

/// Reward sub-scores reported by the scorer, each in [0, 1]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RewardComponents {
    pub task_performance: f64,
    pub human_preference: f64,
    pub efficiency: f64,
}

impl RewardComponents {
    /// Arithmetic mean of the three components
    pub fn mean(&self) -> f64 {
        (self.task_performance + self.human_preference + self.efficiency) / 3.0
    }
}

/// Telemetry describing the scorer's effort for one record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationProcess {
    pub model_version: String,
    pub iterations_performed: u32,
    pub convergence_time_ms: u64,
    pub reward_components: RewardComponents,
}

/// Downstream evaluation metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub downstream_accuracy: f64,
    /// 1–5 scale satisfaction estimate
    pub user_satisfaction: f64,
    pub response_quality: f64,
}

/// Significance statistics attached to an evaluation
///
/// Invariants: `p_value` in (0, 1), `effect_size >= 0`, and
/// `confidence_interval.0 <= confidence_interval.1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticalSignificance {
    pub p_value: f64,
    pub effect_size: f64,
    /// Ordered (lo, hi) pair, serialized as a two-element array
    pub confidence_interval: (f64, f64),
}

/// Evaluation block of an optimization record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResults {
    pub ab_test_id: String,
    pub performance_metrics: EvaluationMetrics,
    pub statistical_significance: StatisticalSignificance,
}

/// Automated quality scores for the candidate text, each in [0, 1]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AutomatedScores {
    pub clarity: f64,
    pub completeness: f64,
    pub specificity: f64,
}

/// Feedback attached to an optimization record
///
/// `human_ratings` stays empty at creation; discrete feedback flows through
/// the feedback aggregator keyed by `optimization_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackData {
    pub human_ratings: Vec<u8>,
    pub automated_scores: AutomatedScores,
    pub collected_at: DateTime<Utc>,
}

/// Latency breakdown for one optimization request
///
/// `total_response_time_ms >= model_inference_time_ms` holds by construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LatencyBreakdown {
    pub optimization_latency_ms: u64,
    pub model_inference_time_ms: u64,
    pub total_response_time_ms: u64,
}

/// The unit of work: one prompt optimization with its evaluation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptOptimization {
    #[serde(rename = "optimization_id")]
    pub id: String,
    pub original_prompt: OriginalPrompt,
    pub optimized_prompt: OptimizedPrompt,
    pub process: OptimizationProcess,
    pub evaluation: EvaluationResults,
    pub feedback: FeedbackData,
    pub performance: LatencyBreakdown,
    pub status: OptimizationStatus,
    /// Diagnostic populated only when `status` is `Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PromptOptimization {
    /// Whether the record has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            OptimizationStatus::Completed | OptimizationStatus::Failed
        )
    }
}

/// Per-dimension quality ratings on a feedback session, each in [0, 5]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QualityRatings {
    pub clarity: f64,
    pub relevance: f64,
    pub completeness: f64,
}

/// One human review of one optimization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackSession {
    pub session_id: String,
    pub optimization_id: String,
    /// Overall rating in {1..5}
    pub human_rating: u8,
    pub feedback_text: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub quality_ratings: QualityRatings,
}

/// One time bucket of operational telemetry from the collector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSample {
    pub timestamp: DateTime<Utc>,
    pub optimizations_processed: u64,
    /// Percentage improvement over the interval (may be negative)
    pub average_improvement: f64,
    /// Percentage in [0, 100]
    pub success_rate: f64,
    pub latency_p95: f64,
}

/// Operational status derived from a model's performance snapshot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Healthy,
    Degraded,
    Error,
}

impl std::fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelStatus::Healthy => write!(f, "healthy"),
            ModelStatus::Degraded => write!(f, "degraded"),
            ModelStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for ModelStatus {
    type Err = PromptforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "healthy" => Ok(ModelStatus::Healthy),
            "degraded" => Ok(ModelStatus::Degraded),
            "error" => Ok(ModelStatus::Error),
            other => Err(PromptforgeError::InvalidInput(format!(
                "unknown model status: {}",
                other
            ))),
        }
    }
}

/// Performance snapshot for one model
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelPerformance {
    pub throughput: f64,
    pub latency_p95: f64,
    /// Fraction in [0, 1]
    pub accuracy: f64,
    /// Percentage in [0, 100]
    pub uptime: f64,
}

/// Latest known operational state of a model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub model_id: String,
    pub name: String,
    pub version: String,
    pub status: ModelStatus,
    pub performance: ModelPerformance,
    pub last_updated: DateTime<Utc>,
}

/// Generate a fresh optimization record identifier
pub fn new_optimization_id() -> String {
    format!("OPT-{}", Uuid::new_v4())
}

/// Generate a short A/B test identifier
pub fn new_ab_test_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("ABT-{}", &id[..6])
}
