//! REST API server for ChainLedger
//!
//! Exposes the ledger over HTTP: submit transactions, read the chain,
//! verify integrity, and reset. All handlers go through [`LedgerService`],
//! which serialises writers.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, Request, State},
    http::{self, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::blockchain::{Block, IntegrityReport};
use crate::config::ApiConfig;
use crate::error::LedgerError;
use crate::service::LedgerService;
use crate::transaction::TransactionInput;

const MAX_PAGE_LIMIT: u64 = 100;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    pub ledger: LedgerService,
    api_stats: Arc<RwLock<ApiStats>>,
}

/// API statistics and monitoring
#[derive(Debug, Default)]
struct ApiStats {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    transactions_submitted: u64,
    transactions_rejected: u64,
    start_time: Option<Instant>,
}

impl ApiStats {
    fn new() -> Self {
        ApiStats {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    fn record_request(&mut self, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
    }
}

impl ApiState {
    pub fn new(ledger: LedgerService) -> Self {
        Self {
            ledger,
            api_stats: Arc::new(RwLock::new(ApiStats::new())),
        }
    }

    pub async fn get_stats(&self) -> ApiStatsResponse {
        let stats = self.api_stats.read().await;
        let uptime = stats.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0);

        ApiStatsResponse {
            total_requests: stats.total_requests,
            successful_requests: stats.successful_requests,
            failed_requests: stats.failed_requests,
            transactions_submitted: stats.transactions_submitted,
            transactions_rejected: stats.transactions_rejected,
            uptime_seconds: uptime,
            chain_length: self.ledger.len() as u64,
        }
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Ledger(e @ LedgerError::InvalidInput { .. }) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Ledger(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

/// Unreadable JSON bodies are reported like any other invalid input.
fn malformed_body(rejection: JsonRejection) -> LedgerError {
    LedgerError::invalid_input("body", rejection.body_text())
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ChainResponse {
    pub length: u64,
    pub blocks: Vec<Block>,
}

#[derive(Serialize)]
pub struct BlockPage {
    pub blocks: Vec<Block>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

#[derive(Serialize)]
pub struct ApiStatsResponse {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub transactions_submitted: u64,
    pub transactions_rejected: u64,
    pub uptime_seconds: u64,
    pub chain_length: u64,
}

#[derive(Serialize)]
struct SuccessResponse {
    message: String,
}

#[derive(Deserialize)]
struct ClearRequest {
    confirm: bool,
}

#[derive(Deserialize)]
struct PaginationQuery {
    #[serde(default)]
    page: u64,
    #[serde(default = "default_limit")]
    limit: u64,
}

fn default_limit() -> u64 {
    10
}

// ============================================================================
// Middleware
// ============================================================================

async fn stats_middleware(State(state): State<Arc<ApiState>>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let success = response.status().is_success();
    state.api_stats.write().await.record_request(success);

    response
}

/// Logs method, path, status and duration of every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints.
///
/// Only `allowed_origins` may call the API from a browser. Every mutating
/// endpoint takes a JSON body, so a cross-origin write always needs a
/// preflight that other origins fail.
pub fn build_api_router(state: Arc<ApiState>, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "api.cors.invalid_origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    let api_routes = Router::new()
        // Transaction endpoints
        .route("/transactions", post(submit_transaction))
        // Chain endpoints
        .route("/chain", get(get_chain))
        .route("/chain/blocks", get(get_blocks))
        .route("/chain/block/:index", get(get_block))
        .route("/chain/verify", get(verify_chain))
        .route("/chain/clear", post(clear_chain))
        // System endpoints
        .route("/health", get(health_check))
        .route("/stats", get(get_api_stats))
        // logging wraps stats so the logged duration covers both
        .layer(middleware::from_fn_with_state(state.clone(), stats_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(cors)
}

/// Serve the API on `config.host:config.port` until the process exits.
pub async fn run_api_server(
    state: Arc<ApiState>,
    config: &ApiConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_api_router(state, &config.allowed_origins);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "api.listening");

    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "chain_length": state.ledger.len(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn submit_transaction(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<TransactionInput>, JsonRejection>,
) -> Result<Json<Block>, ApiError> {
    let result = payload
        .map_err(malformed_body)
        .and_then(|Json(input)| state.ledger.submit(&input));

    {
        let mut stats = state.api_stats.write().await;
        if result.is_ok() {
            stats.transactions_submitted += 1;
        } else {
            stats.transactions_rejected += 1;
        }
    }

    Ok(Json(result?))
}

async fn get_chain(State(state): State<Arc<ApiState>>) -> Json<ChainResponse> {
    let blocks = state.ledger.get_chain();
    Json(ChainResponse {
        length: blocks.len() as u64,
        blocks,
    })
}

/// Newest-first pages of the chain.
async fn get_blocks(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<PaginationQuery>,
) -> Json<BlockPage> {
    let chain = state.ledger.get_chain();
    let total = chain.len() as u64;
    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);
    let offset = params.page.saturating_mul(limit);

    let blocks = chain
        .into_iter()
        .rev()
        .skip(offset.min(total) as usize)
        .take(limit as usize)
        .collect();

    Json(BlockPage {
        blocks,
        total,
        page: params.page,
        limit,
    })
}

async fn get_block(
    State(state): State<Arc<ApiState>>,
    Path(index): Path<u64>,
) -> Result<Json<Block>, ApiError> {
    state
        .ledger
        .get_block(index)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Block {} not found", index)))
}

async fn verify_chain(State(state): State<Arc<ApiState>>) -> Json<IntegrityReport> {
    Json(state.ledger.verify_integrity())
}

async fn clear_chain(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<ClearRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(request) = payload.map_err(malformed_body)?;
    if !request.confirm {
        return Err(LedgerError::invalid_input("confirm", "must be true to clear the ledger").into());
    }

    state.ledger.clear_chain()?;
    Ok(Json(SuccessResponse {
        message: "Ledger cleared".to_string(),
    }))
}

async fn get_api_stats(State(state): State<Arc<ApiState>>) -> Json<ApiStatsResponse> {
    Json(state.get_stats().await)
}
