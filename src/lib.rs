use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::debug;

pub type Result<T> = std::result::Result<T, QaError>;

#[derive(Error, Debug)]
pub enum QaError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),
}

impl IntoResponse for QaError {
    #[inline]
    fn into_response(self) -> Response {
        // Callers get the bare status; the cause is only visible at debug level.
        debug!("Request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

pub mod commands;
pub mod config;
pub mod database;
pub mod ollama;
pub mod providers;
pub mod rag;
pub mod server;
