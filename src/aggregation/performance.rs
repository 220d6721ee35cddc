//! Operational telemetry aggregation.
//!
//! Maintains a bounded, chronologically ordered window of performance
//! samples and produces time-windowed rollups for charting. Reads take a
//! snapshot of the retained window, so iterating a rollup's series never
//! consumes anything, and a new read always restarts from the window head.

use crate::error::{PromptforgeError, Result};
use crate::types::PerformanceSample;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Bounded chronological sample buffer
#[derive(Debug)]
struct SampleWindow {
    data: VecDeque<PerformanceSample>,
    capacity: usize,
}

impl SampleWindow {
    fn new(capacity: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert keeping timestamp order, evicting the oldest at capacity
    fn insert(&mut self, sample: PerformanceSample) {
        let pos = self
            .data
            .iter()
            .rposition(|s| s.timestamp <= sample.timestamp)
            .map(|i| i + 1)
            .unwrap_or(0);
        self.data.insert(pos, sample);

        if self.data.len() > self.capacity {
            self.data.pop_front();
        }
    }
}

/// Time window selecting samples for a rollup; open bounds select everything
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RollupRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl RollupRange {
    /// The full retained window
    pub fn all() -> Self {
        Self::default()
    }

    /// Samples from the trailing `days` days
    pub fn last_days(days: i64) -> Self {
        Self {
            since: Some(Utc::now() - Duration::days(days)),
            until: None,
        }
    }

    fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.since.map_or(true, |since| timestamp >= since)
            && self.until.map_or(true, |until| timestamp < until)
    }
}

/// Time-windowed aggregate over performance samples
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRollup {
    pub total_optimizations: u64,
    pub avg_improvement: f64,
    pub avg_success_rate: f64,
    pub avg_latency_p95: f64,
    /// Chronological snapshot of the selected samples
    pub series: Vec<PerformanceSample>,
}

impl PerformanceRollup {
    fn empty() -> Self {
        Self {
            total_optimizations: 0,
            avg_improvement: 0.0,
            avg_success_rate: 0.0,
            avg_latency_p95: 0.0,
            series: Vec::new(),
        }
    }
}

/// Aggregator over per-interval operational telemetry
pub struct PerformanceAggregator {
    window: Arc<RwLock<SampleWindow>>,
}

impl PerformanceAggregator {
    /// Default retention: one year of daily samples
    pub fn new() -> Self {
        Self::with_capacity(365)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            window: Arc::new(RwLock::new(SampleWindow::new(capacity))),
        }
    }

    /// Ingest one telemetry sample.
    ///
    /// Rejects samples that would corrupt rollups: success rate outside
    /// [0, 100], negative latency, or non-finite values.
    pub async fn ingest(&self, sample: PerformanceSample) -> Result<()> {
        if !sample.success_rate.is_finite() || !(0.0..=100.0).contains(&sample.success_rate) {
            return Err(PromptforgeError::InvalidInput(format!(
                "success_rate must be within 0-100, got {}",
                sample.success_rate
            )));
        }
        if !sample.latency_p95.is_finite() || sample.latency_p95 < 0.0 {
            return Err(PromptforgeError::InvalidInput(format!(
                "latency_p95 must be non-negative, got {}",
                sample.latency_p95
            )));
        }
        if !sample.average_improvement.is_finite() {
            return Err(PromptforgeError::InvalidInput(
                "average_improvement must be finite".to_string(),
            ));
        }

        let mut window = self.window.write().await;
        window.insert(sample);
        debug!("performance window holds {} samples", window.data.len());

        Ok(())
    }

    /// Aggregate the selected range: sum for volume, arithmetic mean for the
    /// rate and latency fields. An empty range yields all-zero aggregates.
    pub async fn rollup(&self, range: RollupRange) -> PerformanceRollup {
        let window = self.window.read().await;
        let series: Vec<PerformanceSample> = window
            .data
            .iter()
            .filter(|s| range.contains(s.timestamp))
            .cloned()
            .collect();

        if series.is_empty() {
            return PerformanceRollup::empty();
        }

        let count = series.len() as f64;
        let total_optimizations = series.iter().map(|s| s.optimizations_processed).sum();
        let improvement_sum: f64 = series.iter().map(|s| s.average_improvement).sum();
        let success_sum: f64 = series.iter().map(|s| s.success_rate).sum();
        let latency_sum: f64 = series.iter().map(|s| s.latency_p95).sum();

        PerformanceRollup {
            total_optimizations,
            avg_improvement: improvement_sum / count,
            avg_success_rate: success_sum / count,
            avg_latency_p95: latency_sum / count,
            series,
        }
    }

    /// Chronological snapshot of the samples in range
    pub async fn series(&self, range: RollupRange) -> Vec<PerformanceSample> {
        let window = self.window.read().await;
        window
            .data
            .iter()
            .filter(|s| range.contains(s.timestamp))
            .cloned()
            .collect()
    }

    /// Tabular export of the selected range, one row per sample
    pub async fn to_csv(&self, range: RollupRange) -> String {
        let mut out = String::from(
            "timestamp,optimizations_processed,average_improvement,success_rate,latency_p95\n",
        );
        for sample in self.series(range).await {
            out.push_str(&format!(
                "{},{},{:.2},{:.2},{:.2}\n",
                sample.timestamp.to_rfc3339(),
                sample.optimizations_processed,
                sample.average_improvement,
                sample.success_rate,
                sample.latency_p95
            ));
        }
        out
    }

    /// Number of retained samples
    pub async fn len(&self) -> usize {
        self.window.read().await.data.len()
    }

    /// Whether the window holds no samples
    pub async fn is_empty(&self) -> bool {
        self.window.read().await.data.is_empty()
    }
}

impl Default for PerformanceAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(days_ago: i64, processed: u64, improvement: f64) -> PerformanceSample {
        PerformanceSample {
            timestamp: Utc::now() - Duration::days(days_ago),
            optimizations_processed: processed,
            average_improvement: improvement,
            success_rate: 95.0,
            latency_p95: 400.0,
        }
    }

    #[tokio::test]
    async fn test_rollup_sums_volume_and_averages_rates() {
        let aggregator = PerformanceAggregator::new();
        aggregator.ingest(sample(2, 100, 40.0)).await.unwrap();
        aggregator.ingest(sample(1, 200, 50.0)).await.unwrap();

        let rollup = aggregator.rollup(RollupRange::all()).await;
        assert_eq!(rollup.total_optimizations, 300);
        assert!((rollup.avg_improvement - 45.0).abs() < 1e-9);
        assert!((rollup.avg_success_rate - 95.0).abs() < 1e-9);
        assert!((rollup.avg_latency_p95 - 400.0).abs() < 1e-9);
        assert_eq!(rollup.series.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_range_yields_zero_rollup() {
        let aggregator = PerformanceAggregator::new();

        let rollup = aggregator.rollup(RollupRange::all()).await;
        assert_eq!(rollup.total_optimizations, 0);
        assert_eq!(rollup.avg_improvement, 0.0);
        assert_eq!(rollup.avg_success_rate, 0.0);
        assert_eq!(rollup.avg_latency_p95, 0.0);
        assert!(rollup.series.is_empty());

        // Non-empty window, empty selection
        aggregator.ingest(sample(1, 100, 40.0)).await.unwrap();
        let rollup = aggregator.rollup(RollupRange::last_days(0)).await;
        assert_eq!(rollup.total_optimizations, 0);
    }

    #[tokio::test]
    async fn test_series_stays_chronological_for_out_of_order_ingest() {
        let aggregator = PerformanceAggregator::new();
        aggregator.ingest(sample(1, 10, 1.0)).await.unwrap();
        aggregator.ingest(sample(5, 50, 5.0)).await.unwrap();
        aggregator.ingest(sample(3, 30, 3.0)).await.unwrap();

        let series = aggregator.series(RollupRange::all()).await;
        let timestamps: Vec<_> = series.iter().map(|s| s.timestamp).collect();
        let mut sorted = timestamps.clone();
        sorted.sort();
        assert_eq!(timestamps, sorted);
        assert_eq!(series[0].optimizations_processed, 50);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let aggregator = PerformanceAggregator::with_capacity(3);
        for days_ago in (1..=5).rev() {
            aggregator.ingest(sample(days_ago, 10, 1.0)).await.unwrap();
        }

        assert_eq!(aggregator.len().await, 3);
        let series = aggregator.series(RollupRange::all()).await;
        // The two oldest samples are gone
        assert!(series[0].timestamp > Utc::now() - Duration::days(4));
    }

    #[tokio::test]
    async fn test_range_filters_by_timestamp() {
        let aggregator = PerformanceAggregator::new();
        aggregator.ingest(sample(10, 100, 40.0)).await.unwrap();
        aggregator.ingest(sample(1, 200, 50.0)).await.unwrap();

        let recent = aggregator.rollup(RollupRange::last_days(7)).await;
        assert_eq!(recent.total_optimizations, 200);
        assert_eq!(recent.series.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_samples_rejected() {
        let aggregator = PerformanceAggregator::new();

        let mut bad = sample(1, 10, 1.0);
        bad.success_rate = 140.0;
        assert!(aggregator.ingest(bad).await.is_err());

        let mut bad = sample(1, 10, 1.0);
        bad.latency_p95 = -1.0;
        assert!(aggregator.ingest(bad).await.is_err());

        let mut bad = sample(1, 10, 1.0);
        bad.average_improvement = f64::NAN;
        assert!(aggregator.ingest(bad).await.is_err());

        assert!(aggregator.is_empty().await);
    }

    #[tokio::test]
    async fn test_csv_export() {
        let aggregator = PerformanceAggregator::new();
        aggregator.ingest(sample(1, 123, 42.5)).await.unwrap();

        let csv = aggregator.to_csv(RollupRange::all()).await;
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "timestamp,optimizations_processed,average_improvement,success_rate,latency_p95"
        );
        let row = lines.next().unwrap();
        assert!(row.contains(",123,42.50,95.00,400.00"));
        assert!(lines.next().is_none());
    }

    #[tokio::test]
    async fn test_rollup_series_is_restartable_snapshot() {
        let aggregator = PerformanceAggregator::new();
        aggregator.ingest(sample(1, 10, 1.0)).await.unwrap();

        let rollup = aggregator.rollup(RollupRange::all()).await;
        // Iterating the snapshot twice sees the same data; the window is untouched
        let first: Vec<_> = rollup.series.iter().collect();
        let second: Vec<_> = rollup.series.iter().collect();
        assert_eq!(first.len(), second.len());
        assert_eq!(aggregator.len().await, 1);
    }
}
