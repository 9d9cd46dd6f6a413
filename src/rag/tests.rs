use super::*;
use crate::QaError;
use crate::providers::{DocumentMatch, Generation, RankedMatches};
use async_trait::async_trait;
use std::sync::Mutex;

/// Store that answers every lookup with the same canned matches
struct FakeStore {
    documents: Vec<&'static str>,
    calls: Mutex<Vec<(Vec<String>, usize)>>,
}

impl FakeStore {
    fn with_documents(documents: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            documents: documents.to_vec(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(Vec<String>, usize)> {
        self.calls.lock().expect("lock is not poisoned").clone()
    }
}

#[async_trait]
impl DocumentStore for FakeStore {
    async fn query(&self, query_texts: &[String], n_results: usize) -> Result<QueryResults> {
        self.calls
            .lock()
            .expect("lock is not poisoned")
            .push((query_texts.to_vec(), n_results));

        let matches = self
            .documents
            .iter()
            .enumerate()
            .map(|(rank, text)| DocumentMatch {
                text: (*text).to_string(),
                distance: rank as f32,
            })
            .collect();
        Ok(QueryResults::new(vec![RankedMatches::new(matches)]))
    }
}

struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    async fn query(&self, _query_texts: &[String], _n_results: usize) -> Result<QueryResults> {
        Err(QaError::Database("Failed to open table: gone".to_string()))
    }
}

/// Generator that records prompts and echoes a fixed answer
struct RecordingGenerator {
    answer: &'static str,
    prompts: Mutex<Vec<(String, String)>>,
}

impl RecordingGenerator {
    fn answering(answer: &'static str) -> Arc<Self> {
        Arc::new(Self {
            answer,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().expect("lock is not poisoned").clone()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, model: &str, prompt: &str) -> Result<Generation> {
        self.prompts
            .lock()
            .expect("lock is not poisoned")
            .push((model.to_string(), prompt.to_string()));
        Ok(Generation::new(self.answer))
    }
}

struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _model: &str, _prompt: &str) -> Result<Generation> {
        Err(QaError::Generation("model not loaded".to_string()))
    }
}

fn handler(store: Arc<dyn DocumentStore>, generator: Arc<dyn Generator>) -> QueryHandler {
    QueryHandler::new(store, generator, "tinyllama")
}

#[test]
fn prompt_template_is_exact() {
    assert_eq!(
        build_prompt("Paris is the capital of France.", "What is the capital of France?"),
        "Context:\nParis is the capital of France.\n\nQuestion: What is the capital of France?\n\nAnswer clearly and concisely:"
    );
}

#[test]
fn prompt_keeps_whitespace_untouched() {
    assert_eq!(
        build_prompt("  padded\n", ""),
        "Context:\n  padded\n\n\nQuestion: \n\nAnswer clearly and concisely:"
    );
}

#[test]
fn context_falls_back_to_sentinel() {
    assert_eq!(select_context(&QueryResults::default()), NO_CONTEXT_SENTINEL);
    assert_eq!(
        select_context(&QueryResults::new(vec![RankedMatches::default()])),
        "No context found"
    );
}

#[test]
fn context_is_top_match_only() {
    let results = QueryResults::new(vec![RankedMatches::new(vec![
        DocumentMatch {
            text: "first".to_string(),
            distance: 0.1,
        },
        DocumentMatch {
            text: "second".to_string(),
            distance: 0.2,
        },
    ])]);

    assert_eq!(select_context(&results), "first");
}

#[tokio::test]
async fn answers_with_top_document() {
    let store = FakeStore::with_documents(&["Paris is the capital of France."]);
    let generator = RecordingGenerator::answering("Paris.");
    let handler = handler(store.clone(), generator.clone());

    let response = handler
        .answer("What is the capital of France?")
        .await
        .expect("answer should succeed");

    assert_eq!(
        response,
        QueryResponse {
            answer: "Paris.".to_string(),
            debug_context: "Paris is the capital of France.".to_string(),
        }
    );
    assert_eq!(
        store.calls(),
        vec![(vec!["What is the capital of France?".to_string()], 1)]
    );
    assert_eq!(
        generator.prompts(),
        vec![(
            "tinyllama".to_string(),
            build_prompt(
                "Paris is the capital of France.",
                "What is the capital of France?"
            )
        )]
    );
}

#[tokio::test]
async fn second_ranked_document_is_never_used() {
    let store = FakeStore::with_documents(&["best", "runner-up"]);
    let generator = RecordingGenerator::answering("ok");
    let handler = handler(store, generator.clone());

    let response = handler.answer("q").await.expect("answer should succeed");

    assert_eq!(response.debug_context, "best");
    let (_, prompt) = &generator.prompts()[0];
    assert!(!prompt.contains("runner-up"));
}

#[tokio::test]
async fn empty_store_still_generates_with_sentinel() {
    let store = FakeStore::with_documents(&[]);
    let generator = RecordingGenerator::answering("I don't know.");
    let handler = handler(store, generator.clone());

    let response = handler
        .answer("anything")
        .await
        .expect("answer should succeed");

    assert_eq!(response.debug_context, NO_CONTEXT_SENTINEL);
    assert_eq!(response.answer, "I don't know.");
    assert_eq!(
        generator.prompts(),
        vec![(
            "tinyllama".to_string(),
            "Context:\nNo context found\n\nQuestion: anything\n\nAnswer clearly and concisely:"
                .to_string()
        )]
    );
}

#[tokio::test]
async fn empty_question_is_processed() {
    let store = FakeStore::with_documents(&["doc"]);
    let generator = RecordingGenerator::answering("answer");
    let handler = handler(store.clone(), generator.clone());

    let response = handler.answer("").await.expect("answer should succeed");

    assert_eq!(response.debug_context, "doc");
    assert_eq!(store.calls(), vec![(vec![String::new()], 1)]);
    assert_eq!(generator.prompts().len(), 1);
}

#[tokio::test]
async fn store_failure_skips_generation() {
    let generator = RecordingGenerator::answering("unused");
    let handler = handler(Arc::new(FailingStore), generator.clone());

    let err = handler.answer("q").await.expect_err("store is down");

    assert!(matches!(err, QaError::Database(_)));
    assert!(generator.prompts().is_empty());
}

#[tokio::test]
async fn generation_failure_propagates() {
    let store = FakeStore::with_documents(&["doc"]);
    let handler = handler(store, Arc::new(FailingGenerator));

    let err = handler.answer("q").await.expect_err("model is down");

    assert!(matches!(err, QaError::Generation(_)));
}
