//! HTTP endpoint layer.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Service description and endpoint list |
//! | `GET` | `/fibonacci/{n}` | Recursive network Fibonacci |
//! | `GET` | `/fibonacci?n=` | Same, query-parameter form |
//! | `GET` | `/bubble-sort?n=` | Bubble-sort CPU burn, timing only |

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::adapters::HttpTransport;
use crate::config::Settings;
use crate::core::{FibonacciEngine, SortBenchmark};
use crate::domain::model::{
    EndpointDescriptor, FibonacciResult, RouteStyle, ServiceInfo, SortResult,
};
use crate::domain::ports::FibonacciTransport;
use crate::utils::error::{BenchError, Result};
use crate::utils::validation::parse_integer_param;

pub const WELCOME_MESSAGE: &str = "Welcome to the performance test service";

/// Per-worker state shared by all handlers.
pub struct AppState {
    pub engine: FibonacciEngine,
    pub sort: SortBenchmark,
    pub route_style: RouteStyle,
}

impl AppState {
    pub fn new(
        transport: Arc<dyn FibonacciTransport>,
        route_style: RouteStyle,
        max_fibonacci_n: u64,
        max_sort_n: i64,
    ) -> Self {
        Self {
            engine: FibonacciEngine::new(transport, max_fibonacci_n),
            sort: SortBenchmark::new(max_sort_n),
            route_style,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let transport = HttpTransport::new(
            &settings.service_url,
            settings.route_style,
            settings.request_timeout(),
        )?;

        Ok(Self::new(
            Arc::new(transport),
            settings.route_style,
            settings.max_fibonacci_n,
            settings.max_sort_n,
        ))
    }

    pub fn service_info(&self) -> ServiceInfo {
        ServiceInfo {
            message: WELCOME_MESSAGE.to_string(),
            endpoints: vec![
                EndpointDescriptor::get(self.route_style.descriptor_path()),
                EndpointDescriptor::get("/bubble-sort?n=<number>"),
            ],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NQuery {
    pub n: Option<String>,
}

/// Unwraps the query string, turning axum's plain-text rejection (e.g. a
/// repeated `n`) into the JSON error body.
fn query_n(
    query: std::result::Result<Query<NQuery>, QueryRejection>,
) -> std::result::Result<Option<String>, BenchError> {
    match query {
        Ok(Query(query)) => Ok(query.n),
        Err(rejection) => Err(BenchError::invalid_input(
            "n",
            rejection.body_text(),
            "malformed query string",
        )),
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/fibonacci", get(fibonacci_query))
        .route("/fibonacci/{n}", get(fibonacci_path))
        .route("/bubble-sort", get(bubble_sort))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn index(State(state): State<Arc<AppState>>) -> Json<ServiceInfo> {
    Json(state.service_info())
}

pub async fn fibonacci_path(
    State(state): State<Arc<AppState>>,
    Path(n): Path<String>,
) -> std::result::Result<Json<FibonacciResult>, BenchError> {
    resolve_fibonacci(&state, Some(&n)).await
}

pub async fn fibonacci_query(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<NQuery>, QueryRejection>,
) -> std::result::Result<Json<FibonacciResult>, BenchError> {
    let n = query_n(query)?;
    resolve_fibonacci(&state, n.as_deref()).await
}

async fn resolve_fibonacci(
    state: &AppState,
    raw: Option<&str>,
) -> std::result::Result<Json<FibonacciResult>, BenchError> {
    let n = parse_integer_param("n", raw)?;
    let request = state.engine.request(n)?;

    match state.engine.compute(request).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            tracing::warn!(n = request.n, "fibonacci failed: {}", e);
            Err(e)
        }
    }
}

/// Sorts inline on the worker's only thread, so the worker is busy for
/// the whole run.
pub async fn bubble_sort(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<NQuery>, QueryRejection>,
) -> std::result::Result<Json<SortResult>, BenchError> {
    let n = query_n(query)?;
    let n = parse_integer_param("n", n.as_deref())?;
    let request = state.sort.request(n)?;
    Ok(Json(state.sort.run(request)))
}

/// Serves the router on an already bound listener until the process ends.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
