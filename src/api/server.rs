//! HTTP JSON API server.
//!
//! The surrounding application submits optimization requests, feedback
//! sessions, telemetry samples and model snapshots here, and reads back
//! records, summaries and rollups. Field names on the wire follow the
//! dashboard contract in the type definitions.

use crate::aggregation::{
    FeedbackAggregator, FeedbackFilter, FeedbackSummary, PerformanceAggregator,
    PerformanceRollup, RaterSummary, RollupRange,
};
use crate::config::EngineConfig;
use crate::error::PromptforgeError;
use crate::optimizer::{OptimizationProcessor, ProcessorStats};
use crate::registry::{ModelHealthRegistry, RegistryStats};
use crate::types::{
    FeedbackSession, ModelSnapshot, ModelStatus, PerformanceSample, PromptOptimization, TaskType,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 3000).into(),
        }
    }
}

/// Shared handle over all engine components
#[derive(Clone)]
pub struct EngineHandle {
    pub processor: Arc<OptimizationProcessor>,
    pub feedback: Arc<FeedbackAggregator>,
    pub performance: Arc<PerformanceAggregator>,
    pub models: Arc<ModelHealthRegistry>,
}

impl EngineHandle {
    /// Build all components from one engine configuration
    pub fn new(config: EngineConfig) -> Self {
        let sample_capacity = config.sample_capacity;
        Self {
            processor: Arc::new(OptimizationProcessor::new(config)),
            feedback: Arc::new(FeedbackAggregator::new()),
            performance: Arc::new(PerformanceAggregator::with_capacity(sample_capacity)),
            models: Arc::new(ModelHealthRegistry::new()),
        }
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    engine: EngineHandle,
}

type ApiResult<T> = std::result::Result<Json<T>, (StatusCode, String)>;

impl ApiServer {
    pub fn new(config: ApiServerConfig, engine: EngineHandle) -> Self {
        Self { config, engine }
    }

    /// Build router
    fn build_router(engine: EngineHandle) -> Router {
        Router::new()
            // Optimization
            .route("/optimize", post(optimize_handler))
            .route("/optimizations", get(history_handler))
            .route("/optimizations/:id", get(get_optimization_handler))
            .route("/stats", get(processor_stats_handler))
            // Feedback
            .route("/feedback", post(submit_feedback_handler))
            .route("/feedback/summary", get(feedback_summary_handler))
            .route("/feedback/contributors", get(contributors_handler))
            // Performance telemetry
            .route("/performance/samples", post(ingest_sample_handler))
            .route("/performance/rollup", get(rollup_handler))
            .route("/performance/export", get(export_csv_handler))
            // Model registry
            .route("/models", get(list_models_handler))
            .route("/models", post(upsert_model_handler))
            .route("/models/stats", get(model_stats_handler))
            // Health check
            .route("/health", get(health_handler))
            // State
            .with_state(engine)
            // Middleware
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Start serving on the configured address
    pub async fn serve(self) -> anyhow::Result<()> {
        let router = Self::build_router(self.engine);

        let listener = tokio::net::TcpListener::bind(self.config.addr).await?;
        info!("API server listening on http://{}", self.config.addr);
        axum::serve(listener, router).await?;

        Ok(())
    }
}

/// Map engine errors onto HTTP status codes
fn reject(err: PromptforgeError) -> (StatusCode, String) {
    let status = match &err {
        PromptforgeError::InvalidInput(_) | PromptforgeError::UnsupportedTaskType(_) => {
            StatusCode::BAD_REQUEST
        }
        PromptforgeError::NotFound(_) => StatusCode::NOT_FOUND,
        PromptforgeError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        PromptforgeError::ScorerFailure(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

#[derive(Debug, Deserialize)]
struct OptimizeRequest {
    prompt: String,
    task_type: String,
    /// Stable client-generated id makes retries idempotent
    #[serde(default)]
    optimization_id: Option<String>,
}

async fn optimize_handler(
    State(engine): State<EngineHandle>,
    Json(req): Json<OptimizeRequest>,
) -> ApiResult<PromptOptimization> {
    let task_type: TaskType = req.task_type.parse().map_err(reject)?;

    let record = match req.optimization_id {
        Some(id) => {
            engine
                .processor
                .optimize_with_id(&id, &req.prompt, task_type)
                .await
        }
        None => engine.processor.optimize(&req.prompt, task_type).await,
    }
    .map_err(reject)?;

    Ok(Json(record))
}

async fn get_optimization_handler(
    State(engine): State<EngineHandle>,
    Path(id): Path<String>,
) -> ApiResult<PromptOptimization> {
    engine.processor.get(&id).await.map(Json).map_err(reject)
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    limit: usize,
}

fn default_history_limit() -> usize {
    10
}

async fn history_handler(
    State(engine): State<EngineHandle>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<PromptOptimization>> {
    Json(engine.processor.history(query.limit).await)
}

async fn processor_stats_handler(State(engine): State<EngineHandle>) -> Json<ProcessorStats> {
    Json(engine.processor.stats().await)
}

async fn submit_feedback_handler(
    State(engine): State<EngineHandle>,
    Json(session): Json<FeedbackSession>,
) -> std::result::Result<StatusCode, (StatusCode, String)> {
    engine.feedback.ingest(session).await.map_err(reject)?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize)]
struct SummaryQuery {
    #[serde(default)]
    filter: Option<String>,
    #[serde(default)]
    optimization_id: Option<String>,
}

fn parse_feedback_filter(query: &SummaryQuery) -> Result<FeedbackFilter, PromptforgeError> {
    if let Some(id) = &query.optimization_id {
        return Ok(FeedbackFilter::ForOptimization(id.clone()));
    }
    match query.filter.as_deref() {
        None | Some("all") => Ok(FeedbackFilter::All),
        Some("high") => Ok(FeedbackFilter::HighRated),
        Some("low") => Ok(FeedbackFilter::LowRated),
        Some(other) => Err(PromptforgeError::InvalidInput(format!(
            "unknown feedback filter: {}",
            other
        ))),
    }
}

async fn feedback_summary_handler(
    State(engine): State<EngineHandle>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<FeedbackSummary> {
    let filter = parse_feedback_filter(&query).map_err(reject)?;
    Ok(Json(engine.feedback.summarize(&filter).await))
}

async fn contributors_handler(State(engine): State<EngineHandle>) -> Json<Vec<RaterSummary>> {
    Json(engine.feedback.contributors().await)
}

async fn ingest_sample_handler(
    State(engine): State<EngineHandle>,
    Json(sample): Json<PerformanceSample>,
) -> std::result::Result<StatusCode, (StatusCode, String)> {
    engine.performance.ingest(sample).await.map_err(reject)?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize)]
struct RollupQuery {
    /// Trailing window in days; omitted selects the full retained window
    #[serde(default)]
    days: Option<i64>,
}

impl RollupQuery {
    fn range(&self) -> RollupRange {
        match self.days {
            Some(days) => RollupRange::last_days(days),
            None => RollupRange::all(),
        }
    }
}

async fn rollup_handler(
    State(engine): State<EngineHandle>,
    Query(query): Query<RollupQuery>,
) -> Json<PerformanceRollup> {
    Json(engine.performance.rollup(query.range()).await)
}

async fn export_csv_handler(
    State(engine): State<EngineHandle>,
    Query(query): Query<RollupQuery>,
) -> String {
    engine.performance.to_csv(query.range()).await
}

async fn upsert_model_handler(
    State(engine): State<EngineHandle>,
    Json(snapshot): Json<ModelSnapshot>,
) -> std::result::Result<StatusCode, (StatusCode, String)> {
    engine.models.upsert(snapshot).await.map_err(reject)?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize)]
struct ModelsQuery {
    #[serde(default)]
    status: Option<String>,
}

async fn list_models_handler(
    State(engine): State<EngineHandle>,
    Query(query): Query<ModelsQuery>,
) -> ApiResult<Vec<ModelSnapshot>> {
    let status = match query.status.as_deref() {
        Some(s) => Some(s.parse::<ModelStatus>().map_err(reject)?),
        None => None,
    };
    Ok(Json(engine.models.list(status).await))
}

async fn model_stats_handler(State(engine): State<EngineHandle>) -> Json<RegistryStats> {
    Json(engine.models.stats().await)
}

/// Health check handler
#[derive(Debug, serde::Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    optimizations_stored: usize,
    models_tracked: usize,
}

async fn health_handler(State(engine): State<EngineHandle>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        optimizations_stored: engine.processor.len().await,
        models_tracked: engine.models.stats().await.total_models,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_engine() -> EngineHandle {
        EngineHandle::new(EngineConfig {
            rng_seed: Some(3),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = health_handler(State(test_engine())).await;
        assert_eq!(response.0.status, "ok");
        assert_eq!(response.0.optimizations_stored, 0);
    }

    #[tokio::test]
    async fn test_optimize_handler_roundtrip() {
        let engine = test_engine();
        let response = optimize_handler(
            State(engine.clone()),
            Json(OptimizeRequest {
                prompt: "Write code for sorting".to_string(),
                task_type: "coding".to_string(),
                optimization_id: None,
            }),
        )
        .await
        .unwrap();

        let record = response.0;
        assert!(engine.processor.get(&record.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_optimize_handler_rejects_unknown_task_type() {
        let err = optimize_handler(
            State(test_engine()),
            Json(OptimizeRequest {
                prompt: "Write code".to_string(),
                task_type: "summarization".to_string(),
                optimization_id: None,
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_unknown_optimization_is_404() {
        let err = get_optimization_handler(State(test_engine()), Path("OPT-x".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_feedback_filter_parsing() {
        let query = SummaryQuery {
            filter: Some("high".to_string()),
            optimization_id: None,
        };
        assert_eq!(parse_feedback_filter(&query).unwrap(), FeedbackFilter::HighRated);

        let query = SummaryQuery {
            filter: Some("weird".to_string()),
            optimization_id: None,
        };
        assert!(parse_feedback_filter(&query).is_err());

        let query = SummaryQuery {
            filter: None,
            optimization_id: Some("OPT-1".to_string()),
        };
        assert_eq!(
            parse_feedback_filter(&query).unwrap(),
            FeedbackFilter::ForOptimization("OPT-1".to_string())
        );
    }

    #[test]
    fn test_router_builds() {
        let _router = ApiServer::build_router(test_engine());
    }
}
