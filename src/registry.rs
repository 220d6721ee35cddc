//! Model health registry.
//!
//! Latest-state registry of model snapshots: `upsert` replaces the entry for
//! a model id and re-derives its operational status from the performance
//! snapshot. No history is retained here; trends belong to the performance
//! aggregator.

use crate::error::{PromptforgeError, Result};
use crate::types::{ModelPerformance, ModelSnapshot, ModelStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Derive operational status from a performance snapshot.
///
/// healthy requires both accuracy >= 0.95 and uptime >= 99; degraded requires
/// either accuracy >= 0.90 or uptime >= 95; anything less is error.
pub fn classify(performance: &ModelPerformance) -> ModelStatus {
    if performance.accuracy >= 0.95 && performance.uptime >= 99.0 {
        ModelStatus::Healthy
    } else if performance.accuracy >= 0.90 || performance.uptime >= 95.0 {
        ModelStatus::Degraded
    } else {
        ModelStatus::Error
    }
}

/// Status counts across tracked models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_models: usize,
    pub healthy: usize,
    pub degraded: usize,
    pub error: usize,
}

/// Registry of per-model operational snapshots
pub struct ModelHealthRegistry {
    models: Arc<RwLock<HashMap<String, ModelSnapshot>>>,
}

impl ModelHealthRegistry {
    pub fn new() -> Self {
        Self {
            models: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or replace the snapshot for a model id.
    ///
    /// The stored status is always re-derived from the performance snapshot,
    /// so stale caller-supplied statuses cannot leak into listings. Rejects
    /// snapshots with out-of-range performance fields.
    pub async fn upsert(&self, mut snapshot: ModelSnapshot) -> Result<()> {
        if snapshot.model_id.trim().is_empty() {
            return Err(PromptforgeError::InvalidInput(
                "model_id is empty".to_string(),
            ));
        }
        let perf = &snapshot.performance;
        if !perf.accuracy.is_finite() || !(0.0..=1.0).contains(&perf.accuracy) {
            return Err(PromptforgeError::InvalidInput(format!(
                "accuracy must be within 0-1, got {}",
                perf.accuracy
            )));
        }
        if !perf.uptime.is_finite() || !(0.0..=100.0).contains(&perf.uptime) {
            return Err(PromptforgeError::InvalidInput(format!(
                "uptime must be within 0-100, got {}",
                perf.uptime
            )));
        }
        if !perf.throughput.is_finite() || perf.throughput < 0.0 {
            return Err(PromptforgeError::InvalidInput(format!(
                "throughput must be non-negative, got {}",
                perf.throughput
            )));
        }
        if !perf.latency_p95.is_finite() || perf.latency_p95 < 0.0 {
            return Err(PromptforgeError::InvalidInput(format!(
                "latency_p95 must be non-negative, got {}",
                perf.latency_p95
            )));
        }

        snapshot.status = classify(&snapshot.performance);
        debug!(
            "model {} upserted with status {}",
            snapshot.model_id, snapshot.status
        );

        let mut models = self.models.write().await;
        models.insert(snapshot.model_id.clone(), snapshot);

        Ok(())
    }

    /// Fetch the snapshot for a model id
    pub async fn get(&self, model_id: &str) -> Result<ModelSnapshot> {
        self.models
            .read()
            .await
            .get(model_id)
            .cloned()
            .ok_or_else(|| PromptforgeError::NotFound(format!("model: {}", model_id)))
    }

    /// Snapshots matching the optional status filter, ordered by model id
    pub async fn list(&self, status: Option<ModelStatus>) -> Vec<ModelSnapshot> {
        let models = self.models.read().await;
        let mut listing: Vec<ModelSnapshot> = models
            .values()
            .filter(|m| status.map_or(true, |s| m.status == s))
            .cloned()
            .collect();
        listing.sort_by(|a, b| a.model_id.cmp(&b.model_id));
        listing
    }

    /// Remove a model from the registry
    pub async fn remove(&self, model_id: &str) -> Option<ModelSnapshot> {
        self.models.write().await.remove(model_id)
    }

    /// Status counts across tracked models
    pub async fn stats(&self) -> RegistryStats {
        let models = self.models.read().await;
        let mut stats = RegistryStats {
            total_models: models.len(),
            healthy: 0,
            degraded: 0,
            error: 0,
        };
        for model in models.values() {
            match model.status {
                ModelStatus::Healthy => stats.healthy += 1,
                ModelStatus::Degraded => stats.degraded += 1,
                ModelStatus::Error => stats.error += 1,
            }
        }
        stats
    }
}

impl Default for ModelHealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}
