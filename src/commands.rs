use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::database::VectorStore;
use crate::ollama::OllamaClient;
use crate::providers::Embedder;
use crate::rag::QueryHandler;

const STATUS_TIMEOUT_SECONDS: u64 = 5;

/// Open the document collection and wire it to Ollama.
///
/// Done once per process; every request shares the returned handler.
#[inline]
pub async fn build_handler(config: &Config) -> Result<QueryHandler> {
    let client = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    let client = Arc::new(client);

    let store = VectorStore::open(config, Arc::clone(&client) as Arc<dyn Embedder>)
        .await
        .context("Failed to open document collection")?;

    Ok(QueryHandler::new(
        Arc::new(store),
        client,
        config.ollama.generation_model.clone(),
    ))
}

/// Start the HTTP server
#[inline]
pub async fn serve(config: &Config) -> Result<()> {
    let addr = config
        .server
        .listen_addr()
        .await
        .context("Invalid server address")?;

    let handler = build_handler(config).await?;
    info!(
        "Answering with model {} from collection '{}'",
        handler.model(),
        config.store.collection
    );

    crate::server::serve(handler, addr)
        .await
        .context("HTTP server stopped")?;
    Ok(())
}

/// Answer one question from the command line and print the response as JSON
#[inline]
pub async fn ask(config: &Config, question: &str) -> Result<()> {
    let handler = build_handler(config).await?;

    let response = handler
        .answer(question)
        .await
        .context("Failed to answer question")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&response).context("Failed to serialize response")?
    );
    Ok(())
}

/// Show Ollama and document collection status
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    println!("📊 docs-qa Status");
    println!("=================");
    println!();

    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => {
            let client = client.with_timeout(Duration::from_secs(STATUS_TIMEOUT_SECONDS));
            let check = tokio::task::spawn_blocking(move || client.health_check())
                .await
                .context("Health check task failed")?;
            match check {
                Ok(()) => {
                    println!(
                        "   ✅ Ollama: Connected ({}:{})",
                        config.ollama.host, config.ollama.port
                    );
                }
                Err(e) => {
                    warn!("Ollama health check failed: {:#}", e);
                    println!("   ⚠️  Ollama: Unhealthy - {:#}", e);
                }
            }
        }
        Err(e) => {
            error!("Failed to create Ollama client: {:#}", e);
            println!("   ❌ Ollama: Failed to connect - {:#}", e);
        }
    }
    println!("   🔤 Embedding Model: {}", config.ollama.embedding_model);
    println!("   💬 Generation Model: {}", config.ollama.generation_model);
    println!();

    println!("🗄️  Document Collection:");
    println!("   📁 Path: {}", config.vector_database_path().display());
    println!("   🏷️  Collection: {}", config.store.collection);

    let client = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    match VectorStore::open_existing(config, Arc::new(client)).await {
        Ok(Some(store)) => match store.count_documents().await {
            Ok(count) => {
                println!("   ✅ LanceDB: Connected");
                println!("   🔢 Dimensions: {}", store.vector_dimension());
                println!("   📄 Documents: {}", count);
            }
            Err(e) => println!("   ❌ LanceDB: Failed to count documents - {}", e),
        },
        Ok(None) => {
            println!("   ⚪ LanceDB: Not created (created by the first `serve` or `ask`)");
        }
        Err(e) => {
            println!("   ❌ LanceDB: Failed to open - {}", e);
        }
    }

    Ok(())
}
