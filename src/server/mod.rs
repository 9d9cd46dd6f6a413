//! HTTP surface: a single `POST /query?q=...` endpoint


use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::rag::{QueryHandler, QueryResponse};
use crate::{QaError, Result};

/// Query-string parameters of `POST /query`
#[derive(Debug, Deserialize)]
pub struct QueryParams {
    pub q: String,
}

/// Build the router around an already constructed handler
#[inline]
pub fn router(handler: QueryHandler) -> Router {
    Router::new()
        .route("/query", post(query))
        .with_state(handler)
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until the process is stopped
#[inline]
pub async fn serve(handler: QueryHandler, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| QaError::Network(format!("Failed to bind {}: {}", addr, e)))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, router(handler))
        .await
        .map_err(|e| QaError::Network(format!("Server error: {}", e)))
}

async fn query(
    State(handler): State<QueryHandler>,
    Query(params): Query<QueryParams>,
) -> Result<Json<QueryResponse>> {
    handler.answer(&params.q).await.map(Json)
}
