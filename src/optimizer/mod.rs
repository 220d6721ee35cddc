//! Prompt optimization processing.
//!
//! # Architecture
//!
//! ```text
//! optimize → validate → assess original → synthesize candidate
//!          → RewardScorer (timeout-bounded) → derive statistics
//!          → publish record atomically
//! ```
//!
//! Records are owned here in an in-memory keyed store. Writes serialize
//! through the store lock; reads run concurrently against cloned snapshots.
//! A record only becomes visible once fully built: a timed-out or cancelled
//! call publishes nothing.

pub mod scorer;

pub use scorer::{LocalRewardModel, RewardReport, RewardScorer};

use crate::config::EngineConfig;
use crate::error::{PromptforgeError, Result};
use crate::scoring::{self, synthesis, QualitySignals, SynthesizedPrompt};
use crate::types::{
    new_ab_test_id, new_optimization_id, AutomatedScores, EvaluationMetrics, EvaluationResults,
    FeedbackData, LatencyBreakdown, OptimizationProcess, OptimizationStatus, OptimizedPrompt,
    OriginalPrompt, PromptOptimization, RewardComponents, StatisticalSignificance, TaskType,
};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Keyed record store plus creation order, oldest first
#[derive(Default)]
struct RecordStore {
    by_id: HashMap<String, PromptOptimization>,
    order: Vec<String>,
}

/// Aggregate view over the processor's stored records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorStats {
    pub total_optimizations: usize,
    pub completed: usize,
    pub failed: usize,
    /// Percentage of completed records in [0, 100]
    pub success_rate: f64,
    pub average_expected_lift: f64,
    pub average_latency_ms: f64,
}

/// The optimization engine's entry point: prompt in, record out
pub struct OptimizationProcessor {
    scorer: Arc<dyn RewardScorer>,
    config: EngineConfig,
    records: Arc<RwLock<RecordStore>>,
    rng: Mutex<StdRng>,
}

impl OptimizationProcessor {
    /// Create a processor backed by the built-in local reward model
    pub fn new(config: EngineConfig) -> Self {
        let scorer = Arc::new(LocalRewardModel::new(
            config.model_version.clone(),
            config.rng_seed,
        ));
        Self::with_scorer(config, scorer)
    }

    /// Create a processor with a caller-supplied scorer
    pub fn with_scorer(config: EngineConfig, scorer: Arc<dyn RewardScorer>) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            scorer,
            config,
            records: Arc::new(RwLock::new(RecordStore::default())),
            rng: Mutex::new(rng),
        }
    }

    /// Optimize a prompt under a freshly generated record id
    pub async fn optimize(
        &self,
        prompt: &str,
        task_type: TaskType,
    ) -> Result<PromptOptimization> {
        self.optimize_with_id(&new_optimization_id(), prompt, task_type)
            .await
    }

    /// Optimize a prompt under a caller-supplied record id.
    ///
    /// Retries are idempotent under a stable id: if the id is already in the
    /// store, the stored record is returned without re-running the scorer.
    pub async fn optimize_with_id(
        &self,
        id: &str,
        prompt: &str,
        task_type: TaskType,
    ) -> Result<PromptOptimization> {
        let trimmed = prompt.trim();
        if trimmed.is_empty() {
            return Err(PromptforgeError::InvalidInput(
                "prompt is empty after trimming".to_string(),
            ));
        }
        if id.trim().is_empty() {
            return Err(PromptforgeError::InvalidInput(
                "optimization id is empty".to_string(),
            ));
        }

        if let Some(existing) = self.records.read().await.by_id.get(id) {
            debug!("optimization {} already stored, returning existing record", id);
            return Ok(existing.clone());
        }

        let started = Instant::now();
        let signals = scoring::analyze(trimmed, task_type)?;

        let synthesized = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| PromptforgeError::Other("processor RNG poisoned".to_string()))?;
            synthesis::synthesize_optimized_text(trimmed, task_type, &mut *rng)?
        };
        let candidate_signals = scoring::analyze(&synthesized.text, task_type)?;

        let scored = tokio::time::timeout(
            self.config.scorer_timeout(),
            self.scorer
                .score(trimmed, &synthesized.text, task_type, signals),
        )
        .await;

        let record = match scored {
            Err(_elapsed) => {
                warn!(
                    "scorer exceeded {}ms budget for {}, publishing nothing",
                    self.config.scorer_timeout_ms, id
                );
                return Err(PromptforgeError::Timeout(self.config.scorer_timeout_ms));
            }
            Ok(Err(scorer_err)) => {
                warn!("scorer failed for {}: {}", id, scorer_err);
                self.failed_record(id, trimmed, task_type, signals, started, scorer_err)
            }
            Ok(Ok(report)) => self.completed_record(
                id,
                trimmed,
                task_type,
                signals,
                candidate_signals,
                synthesized,
                report,
                started,
            ),
        };

        self.publish(record.clone()).await;
        info!(
            "optimization {} finished with status {}",
            record.id, record.status
        );

        Ok(record)
    }

    /// Fetch a record by id
    pub async fn get(&self, id: &str) -> Result<PromptOptimization> {
        self.records
            .read()
            .await
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| PromptforgeError::NotFound(format!("optimization: {}", id)))
    }

    /// Most recent records, newest first
    pub async fn history(&self, limit: usize) -> Vec<PromptOptimization> {
        let store = self.records.read().await;
        store
            .order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|id| store.by_id.get(id).cloned())
            .collect()
    }

    /// Number of records currently stored
    pub async fn len(&self) -> usize {
        self.records.read().await.by_id.len()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.by_id.is_empty()
    }

    /// Aggregate stats over stored records (the dashboard's live panel)
    pub async fn stats(&self) -> ProcessorStats {
        let store = self.records.read().await;
        let total = store.by_id.len();
        let completed = store
            .by_id
            .values()
            .filter(|r| r.status == OptimizationStatus::Completed)
            .count();
        let failed = store
            .by_id
            .values()
            .filter(|r| r.status == OptimizationStatus::Failed)
            .count();

        let (lift_sum, latency_sum) = store.by_id.values().fold((0.0, 0u64), |(lift, lat), r| {
            (
                lift + r.optimized_prompt.expected_performance_lift,
                lat + r.performance.total_response_time_ms,
            )
        });

        ProcessorStats {
            total_optimizations: total,
            completed,
            failed,
            success_rate: if total > 0 {
                completed as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            average_expected_lift: if total > 0 { lift_sum / total as f64 } else { 0.0 },
            average_latency_ms: if total > 0 {
                latency_sum as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    /// Insert a fully built record, evicting the oldest beyond capacity
    async fn publish(&self, record: PromptOptimization) {
        let mut store = self.records.write().await;
        let id = record.id.clone();
        if store.by_id.insert(id.clone(), record).is_none() {
            store.order.push(id);
        }

        while store.order.len() > self.config.retention_capacity {
            let oldest = store.order.remove(0);
            store.by_id.remove(&oldest);
            debug!("evicted optimization {} past retention capacity", oldest);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn completed_record(
        &self,
        id: &str,
        text: &str,
        task_type: TaskType,
        signals: QualitySignals,
        candidate_signals: QualitySignals,
        synthesized: SynthesizedPrompt,
        report: RewardReport,
        started: Instant,
    ) -> PromptOptimization {
        let quality_score = signals.combined();
        let rewards = RewardComponents {
            task_performance: report.task_performance,
            human_preference: report.human_preference,
            efficiency: report.efficiency,
        };
        let confidence = confidence_score(&rewards);
        let lift = expected_lift(quality_score, confidence);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        PromptOptimization {
            id: id.to_string(),
            original_prompt: OriginalPrompt {
                text: text.to_string(),
                task_type,
                context_length: text.chars().count(),
                quality_score,
            },
            optimized_prompt: OptimizedPrompt {
                text: synthesized.text,
                improvements_made: synthesized.improvements_made,
                confidence_score: confidence,
                expected_performance_lift: lift,
            },
            process: OptimizationProcess {
                model_version: self.scorer.model_version(),
                iterations_performed: report.iterations_performed,
                convergence_time_ms: report.convergence_time_ms,
                reward_components: rewards,
            },
            evaluation: EvaluationResults {
                ab_test_id: new_ab_test_id(),
                performance_metrics: EvaluationMetrics {
                    downstream_accuracy: (0.8 + 0.2 * rewards.task_performance).clamp(0.0, 1.0),
                    user_satisfaction: 4.0 + rewards.human_preference,
                    response_quality: (0.8 + 0.2 * rewards.efficiency).clamp(0.0, 1.0),
                },
                statistical_significance: significance(lift, confidence),
            },
            feedback: FeedbackData {
                human_ratings: Vec::new(),
                automated_scores: AutomatedScores {
                    clarity: candidate_signals.clarity,
                    completeness: candidate_signals.completeness,
                    specificity: candidate_signals.specificity,
                },
                collected_at: Utc::now(),
            },
            performance: LatencyBreakdown {
                optimization_latency_ms: elapsed_ms,
                model_inference_time_ms: report.model_inference_time_ms,
                total_response_time_ms: elapsed_ms + report.model_inference_time_ms,
            },
            status: OptimizationStatus::Completed,
            failure_reason: None,
            created_at: Utc::now(),
        }
    }

    /// Terminal failed record: candidate zeroed, diagnostic retained
    fn failed_record(
        &self,
        id: &str,
        text: &str,
        task_type: TaskType,
        signals: QualitySignals,
        started: Instant,
        scorer_err: PromptforgeError,
    ) -> PromptOptimization {
        let elapsed_ms = started.elapsed().as_millis() as u64;

        PromptOptimization {
            id: id.to_string(),
            original_prompt: OriginalPrompt {
                text: text.to_string(),
                task_type,
                context_length: text.chars().count(),
                quality_score: signals.combined(),
            },
            optimized_prompt: OptimizedPrompt {
                text: String::new(),
                improvements_made: Vec::new(),
                confidence_score: 0.0,
                expected_performance_lift: 0.0,
            },
            process: OptimizationProcess {
                model_version: self.scorer.model_version(),
                iterations_performed: 0,
                convergence_time_ms: 0,
                reward_components: RewardComponents {
                    task_performance: 0.0,
                    human_preference: 0.0,
                    efficiency: 0.0,
                },
            },
            evaluation: EvaluationResults {
                ab_test_id: new_ab_test_id(),
                performance_metrics: EvaluationMetrics {
                    downstream_accuracy: 0.0,
                    user_satisfaction: 0.0,
                    response_quality: 0.0,
                },
                statistical_significance: StatisticalSignificance {
                    p_value: 0.5,
                    effect_size: 0.0,
                    confidence_interval: (0.0, 0.0),
                },
            },
            feedback: FeedbackData {
                human_ratings: Vec::new(),
                automated_scores: AutomatedScores {
                    clarity: 0.0,
                    completeness: 0.0,
                    specificity: 0.0,
                },
                collected_at: Utc::now(),
            },
            performance: LatencyBreakdown {
                optimization_latency_ms: elapsed_ms,
                model_inference_time_ms: 0,
                total_response_time_ms: elapsed_ms,
            },
            status: OptimizationStatus::Failed,
            failure_reason: Some(scorer_err.to_string()),
            created_at: Utc::now(),
        }
    }
}

/// Confidence as a weighted combination of the reward components
fn confidence_score(rewards: &RewardComponents) -> f64 {
    (0.4 * rewards.task_performance + 0.4 * rewards.human_preference + 0.2 * rewards.efficiency)
        .clamp(0.0, 1.0)
}

/// Expected lift: quality headroom discounted by confidence
fn expected_lift(quality_score: f64, confidence: f64) -> f64 {
    ((1.0 - quality_score) * confidence).clamp(0.0, 1.0)
}

/// Significance statistics derived from lift and confidence.
///
/// `p_value` stays in (0, 1) and the interval is ordered by construction:
/// lo <= lift <= hi.
fn significance(lift: f64, confidence: f64) -> StatisticalSignificance {
    let p_value = (0.05 * (1.0 - confidence)).clamp(0.001, 0.049);
    let effect_size = (lift * 2.0).max(0.0);
    let half_width = 0.05 + lift * (1.0 - confidence);

    StatisticalSignificance {
        p_value,
        effect_size,
        confidence_interval: ((lift - half_width).max(0.0), (lift + half_width).min(1.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::scorer::MockRewardScorer;
    use super::*;

    fn test_config() -> EngineConfig {
        EngineConfig {
            rng_seed: Some(7),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_optimize_produces_completed_record() {
        let processor = OptimizationProcessor::new(test_config());

        let record = processor
            .optimize("Write code for sorting", TaskType::Coding)
            .await
            .unwrap();

        assert_eq!(record.status, OptimizationStatus::Completed);
        assert!(!record.optimized_prompt.improvements_made.is_empty());
        assert!(record
            .optimized_prompt
            .text
            .starts_with("Write code for sorting"));
        assert!(record.id.starts_with("OPT-"));

        // Bounds from the contract
        for value in [
            record.original_prompt.quality_score,
            record.optimized_prompt.confidence_score,
            record.optimized_prompt.expected_performance_lift,
            record.process.reward_components.task_performance,
            record.process.reward_components.human_preference,
            record.process.reward_components.efficiency,
        ] {
            assert!((0.0..=1.0).contains(&value), "out of bounds: {}", value);
        }

        let (lo, hi) = record.evaluation.statistical_significance.confidence_interval;
        assert!(lo <= hi);
        let p = record.evaluation.statistical_significance.p_value;
        assert!(p > 0.0 && p < 1.0);
        assert!(
            record.performance.total_response_time_ms >= record.performance.model_inference_time_ms
        );
    }

    #[tokio::test]
    async fn test_empty_prompt_creates_no_record() {
        let processor = OptimizationProcessor::new(test_config());

        let err = processor.optimize("   ", TaskType::Qa).await.unwrap_err();
        assert!(matches!(err, PromptforgeError::InvalidInput(_)));
        assert!(processor.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_not_found() {
        let processor = OptimizationProcessor::new(test_config());
        let err = processor.get("OPT-missing").await.unwrap_err();
        assert!(matches!(err, PromptforgeError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_retry_with_stable_id_is_idempotent() {
        let processor = OptimizationProcessor::new(test_config());

        let first = processor
            .optimize_with_id("OPT-client-1", "Explain caching", TaskType::Qa)
            .await
            .unwrap();
        let second = processor
            .optimize_with_id("OPT-client-1", "Explain caching", TaskType::Qa)
            .await
            .unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert_eq!(first.evaluation.ab_test_id, second.evaluation.ab_test_id);
        assert_eq!(processor.len().await, 1);
    }

    #[tokio::test]
    async fn test_scorer_failure_becomes_failed_record() {
        let mut mock = MockRewardScorer::new();
        mock.expect_model_version()
            .return_const("v-mock".to_string());
        mock.expect_score().returning(|_, _, _, _| {
            Err(PromptforgeError::ScorerFailure(
                "policy network unavailable".to_string(),
            ))
        });

        let processor = OptimizationProcessor::with_scorer(test_config(), Arc::new(mock));
        let record = processor
            .optimize_with_id("OPT-f1", "Summarize the dataset trends", TaskType::Analysis)
            .await
            .unwrap();

        assert_eq!(record.status, OptimizationStatus::Failed);
        assert!(record
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("policy network unavailable"));

        // Failed records stay retrievable: no result != poor result
        let fetched = processor.get("OPT-f1").await.unwrap();
        assert_eq!(fetched.status, OptimizationStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_scorer_times_out_and_publishes_nothing() {
        struct HangingScorer;

        #[async_trait::async_trait]
        impl RewardScorer for HangingScorer {
            fn model_version(&self) -> String {
                "v-hang".to_string()
            }

            async fn score(
                &self,
                _original: &str,
                _candidate: &str,
                _task_type: TaskType,
                _signals: QualitySignals,
            ) -> crate::error::Result<RewardReport> {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                unreachable!("scorer never returns within any test budget")
            }
        }

        let config = EngineConfig {
            scorer_timeout_ms: 50,
            rng_seed: Some(1),
            ..Default::default()
        };
        let processor = OptimizationProcessor::with_scorer(config, Arc::new(HangingScorer));

        let err = processor
            .optimize_with_id("OPT-t1", "Explain timeouts", TaskType::Qa)
            .await
            .unwrap_err();

        assert!(matches!(err, PromptforgeError::Timeout(50)));
        assert!(processor.is_empty().await);
        assert!(processor.get("OPT-t1").await.is_err());
    }

    #[tokio::test]
    async fn test_history_newest_first_and_retention() {
        let config = EngineConfig {
            retention_capacity: 3,
            rng_seed: Some(5),
            ..Default::default()
        };
        let processor = OptimizationProcessor::new(config);

        for i in 0..5 {
            processor
                .optimize_with_id(&format!("OPT-{}", i), "Explain retention", TaskType::Qa)
                .await
                .unwrap();
        }

        assert_eq!(processor.len().await, 3);
        let history = processor.history(10).await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].id, "OPT-4");
        assert_eq!(history[2].id, "OPT-2");

        // Evicted records are gone
        assert!(processor.get("OPT-0").await.is_err());
    }

    #[tokio::test]
    async fn test_stats_over_stored_records() {
        let processor = OptimizationProcessor::new(test_config());
        assert_eq!(processor.stats().await.total_optimizations, 0);
        assert_eq!(processor.stats().await.success_rate, 0.0);

        processor
            .optimize("Write code for sorting", TaskType::Coding)
            .await
            .unwrap();
        processor
            .optimize("Draft a poem about autumn", TaskType::Creative)
            .await
            .unwrap();

        let stats = processor.stats().await;
        assert_eq!(stats.total_optimizations, 2);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.success_rate, 100.0);
        assert!(stats.average_expected_lift > 0.0);
    }

    #[test]
    fn test_confidence_weights_rewards() {
        let rewards = RewardComponents {
            task_performance: 1.0,
            human_preference: 1.0,
            efficiency: 0.0,
        };
        assert!((confidence_score(&rewards) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_lift_shrinks_with_quality() {
        // A prompt that is already good has little headroom left
        let low_quality = expected_lift(0.2, 0.9);
        let high_quality = expected_lift(0.9, 0.9);
        assert!(low_quality > high_quality);
    }

    #[test]
    fn test_significance_invariants() {
        for lift in [0.0, 0.3, 0.7, 1.0] {
            for confidence in [0.0, 0.5, 1.0] {
                let stats = significance(lift, confidence);
                assert!(stats.p_value > 0.0 && stats.p_value < 1.0);
                assert!(stats.effect_size >= 0.0);
                let (lo, hi) = stats.confidence_interval;
                assert!(lo <= hi, "lo={} hi={}", lo, hi);
            }
        }
    }
}
