//! Question answering over the document collection.
//!
//! One request is one linear pass: look up the nearest document, use it as
//! context, ask the generation model, and hand back the answer together with
//! the context it was given.

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::Result;
use crate::providers::{DocumentStore, Generator, QueryResults};

/// Context used when the store has nothing to offer
pub const NO_CONTEXT_SENTINEL: &str = "No context found";

/// Documents retrieved per question
pub const N_RESULTS: usize = 1;

/// Body returned for every answered question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub debug_context: String,
}

/// Pick the context for a question: the best match of the first query verbatim,
/// or the sentinel when the store returned nothing.
#[inline]
pub fn select_context(results: &QueryResults) -> String {
    results
        .top_document()
        .map_or_else(|| NO_CONTEXT_SENTINEL.to_string(), str::to_string)
}

/// Fill the prompt template. Neither part is trimmed or escaped.
#[inline]
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Context:\n{}\n\nQuestion: {}\n\nAnswer clearly and concisely:",
        context, question
    )
}

/// Answers questions using a document store and a generation model
#[derive(Clone)]
pub struct QueryHandler {
    store: Arc<dyn DocumentStore>,
    generator: Arc<dyn Generator>,
    model: String,
}

impl QueryHandler {
    #[inline]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        generator: Arc<dyn Generator>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            generator,
            model: model.into(),
        }
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answer a question. Empty questions go through the same steps.
    ///
    /// Store and generation failures are returned as-is; only an empty lookup
    /// is turned into a normal answer via the sentinel context.
    #[inline]
    pub async fn answer(&self, question: &str) -> Result<QueryResponse> {
        let results = self
            .store
            .query(&[question.to_string()], N_RESULTS)
            .await?;

        let context = select_context(&results);
        debug!(
            "Using {} characters of context (found: {})",
            context.len(),
            results.top_document().is_some()
        );

        let prompt = build_prompt(&context, question);
        let generation = self.generator.generate(&self.model, &prompt).await?;

        Ok(QueryResponse {
            answer: generation.response,
            debug_context: context,
        })
    }
}
