//! Seams between the query handler and the services it leans on.
//!
//! The handler only ever sees these traits, so the LanceDB store and the
//! Ollama client can be swapped for in-memory fakes in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Turns text into embedding vectors, one per input, in input order
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Read-only similarity lookup over a document collection
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return the `n_results` nearest documents for every query text.
    ///
    /// The outer list of the result has exactly one entry per query text.
    async fn query(&self, query_texts: &[String], n_results: usize) -> Result<QueryResults>;
}

/// Text generation from a single prompt
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<Generation>;
}

/// A stored document returned by a similarity lookup
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMatch {
    pub text: String,
    /// Distance reported by the store; lower is closer
    pub distance: f32,
}

/// Matches for one query text, best first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedMatches {
    pub matches: Vec<DocumentMatch>,
}

impl RankedMatches {
    #[inline]
    pub fn new(matches: Vec<DocumentMatch>) -> Self {
        Self { matches }
    }

    #[inline]
    pub fn best(&self) -> Option<&DocumentMatch> {
        self.matches.first()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Result of a similarity lookup, one `RankedMatches` per query text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResults {
    pub queries: Vec<RankedMatches>,
}

impl QueryResults {
    #[inline]
    pub fn new(queries: Vec<RankedMatches>) -> Self {
        Self { queries }
    }

    /// Text of the best match for the first query, if the store found anything
    #[inline]
    pub fn top_document(&self) -> Option<&str> {
        self.queries
            .first()
            .and_then(RankedMatches::best)
            .map(|m| m.text.as_str())
    }
}

/// Output of a generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub response: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub total_duration: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u32>,
}

impl Generation {
    #[inline]
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            model: None,
            total_duration: None,
            eval_count: None,
        }
    }
}
