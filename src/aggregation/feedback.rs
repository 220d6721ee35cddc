//! Human feedback aggregation.
//!
//! Sessions are keyed by `session_id`; re-ingesting an id replaces the prior
//! entry (last-write-wins), so repeat submissions never double-count.
//! Summaries are computed on demand from the live session set.

use crate::error::{PromptforgeError, Result};
use crate::types::{FeedbackSession, QualityRatings};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Rating at or above which a session counts as satisfied
const SATISFACTION_THRESHOLD: u8 = 4;

/// Filter applied to summaries and listings
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackFilter {
    All,
    /// Sessions rated 4 or 5
    HighRated,
    /// Sessions rated 1 or 2
    LowRated,
    /// Sessions for one optimization
    ForOptimization(String),
    /// Sessions within [from, until)
    Window {
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    },
}

impl FeedbackFilter {
    fn matches(&self, session: &FeedbackSession) -> bool {
        match self {
            FeedbackFilter::All => true,
            FeedbackFilter::HighRated => session.human_rating >= 4,
            FeedbackFilter::LowRated => session.human_rating <= 2,
            FeedbackFilter::ForOptimization(id) => &session.optimization_id == id,
            FeedbackFilter::Window { from, until } => {
                session.timestamp >= *from && session.timestamp < *until
            }
        }
    }
}

/// Aggregate view over a set of feedback sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackSummary {
    pub count: usize,
    pub average_rating: f64,
    pub distinct_contributors: usize,
    /// Count per rating value, all five keys always present
    pub rating_histogram: BTreeMap<u8, u64>,
    /// Fraction of sessions rated >= 4, in [0, 1]
    pub satisfaction_rate: f64,
    /// Mean per-dimension quality ratings
    pub average_quality: QualityRatings,
}

impl FeedbackSummary {
    fn empty() -> Self {
        Self {
            count: 0,
            average_rating: 0.0,
            distinct_contributors: 0,
            rating_histogram: (1..=5).map(|r| (r, 0)).collect(),
            satisfaction_rate: 0.0,
            average_quality: QualityRatings {
                clarity: 0.0,
                relevance: 0.0,
                completeness: 0.0,
            },
        }
    }
}

/// Per-rater rollup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaterSummary {
    pub user_id: String,
    pub sessions: usize,
    pub average_rating: f64,
}

/// Aggregator over discrete human feedback sessions
pub struct FeedbackAggregator {
    sessions: Arc<RwLock<HashMap<String, FeedbackSession>>>,
}

impl FeedbackAggregator {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Ingest one session, keyed by `session_id`.
    ///
    /// Re-ingesting an existing id replaces the stored session. Rejects
    /// entries that would corrupt summaries: rating outside 1–5, quality
    /// ratings outside [0, 5], or missing identifiers.
    pub async fn ingest(&self, session: FeedbackSession) -> Result<()> {
        if session.session_id.trim().is_empty() {
            return Err(PromptforgeError::InvalidInput(
                "session_id is empty".to_string(),
            ));
        }
        if session.optimization_id.trim().is_empty() {
            return Err(PromptforgeError::InvalidInput(
                "optimization_id is empty".to_string(),
            ));
        }
        if !(1..=5).contains(&session.human_rating) {
            return Err(PromptforgeError::InvalidInput(format!(
                "human_rating must be 1-5, got {}",
                session.human_rating
            )));
        }
        for (name, value) in [
            ("clarity", session.quality_ratings.clarity),
            ("relevance", session.quality_ratings.relevance),
            ("completeness", session.quality_ratings.completeness),
        ] {
            if !value.is_finite() || !(0.0..=5.0).contains(&value) {
                return Err(PromptforgeError::InvalidInput(format!(
                    "quality rating {} must be within 0-5, got {}",
                    name, value
                )));
            }
        }

        let mut sessions = self.sessions.write().await;
        let id = session.session_id.clone();
        let replaced = sessions.insert(id.clone(), session).is_some();
        debug!(
            "feedback session {} {}",
            id,
            if replaced { "updated" } else { "ingested" }
        );

        Ok(())
    }

    /// Summarize sessions matching the filter
    pub async fn summarize(&self, filter: &FeedbackFilter) -> FeedbackSummary {
        let sessions = self.sessions.read().await;
        let matching: Vec<&FeedbackSession> =
            sessions.values().filter(|s| filter.matches(s)).collect();

        if matching.is_empty() {
            return FeedbackSummary::empty();
        }

        let count = matching.len();
        let rating_sum: u64 = matching.iter().map(|s| s.human_rating as u64).sum();
        let satisfied = matching
            .iter()
            .filter(|s| s.human_rating >= SATISFACTION_THRESHOLD)
            .count();

        let mut rating_histogram: BTreeMap<u8, u64> = (1..=5).map(|r| (r, 0)).collect();
        for session in &matching {
            *rating_histogram.entry(session.human_rating).or_insert(0) += 1;
        }

        let contributors: HashSet<&str> =
            matching.iter().map(|s| s.user_id.as_str()).collect();

        let (clarity_sum, relevance_sum, completeness_sum) =
            matching.iter().fold((0.0, 0.0, 0.0), |(c, r, m), s| {
                (
                    c + s.quality_ratings.clarity,
                    r + s.quality_ratings.relevance,
                    m + s.quality_ratings.completeness,
                )
            });

        FeedbackSummary {
            count,
            average_rating: rating_sum as f64 / count as f64,
            distinct_contributors: contributors.len(),
            rating_histogram,
            satisfaction_rate: satisfied as f64 / count as f64,
            average_quality: QualityRatings {
                clarity: clarity_sum / count as f64,
                relevance: relevance_sum / count as f64,
                completeness: completeness_sum / count as f64,
            },
        }
    }

    /// Sessions matching the filter, newest first
    pub async fn sessions(&self, filter: &FeedbackFilter) -> Vec<FeedbackSession> {
        let sessions = self.sessions.read().await;
        let mut matching: Vec<FeedbackSession> = sessions
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matching
    }

    /// Per-rater summaries, most active raters first
    pub async fn contributors(&self) -> Vec<RaterSummary> {
        let sessions = self.sessions.read().await;
        let mut per_user: HashMap<&str, (usize, u64)> = HashMap::new();
        for session in sessions.values() {
            let entry = per_user.entry(session.user_id.as_str()).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += session.human_rating as u64;
        }

        let mut summaries: Vec<RaterSummary> = per_user
            .into_iter()
            .map(|(user_id, (count, sum))| RaterSummary {
                user_id: user_id.to_string(),
                sessions: count,
                average_rating: sum as f64 / count as f64,
            })
            .collect();
        summaries.sort_by(|a, b| b.sessions.cmp(&a.sessions).then(a.user_id.cmp(&b.user_id)));
        summaries
    }

    /// Number of distinct sessions stored
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store holds no sessions
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for FeedbackAggregator {
    fn default() -> Self {
        Self::new()
    }
}
