//! book-rag CLI - ingest a book and ask it questions.
//!
//! # Usage
//!
//! ```bash
//! # Chunk, embed and store every .mdx/.md file in a directory
//! book-rag ingest ./docs
//! book-rag ingest ./docs --max-words 400 --batch-size 20
//!
//! # Ask a question (prints the answer as JSON)
//! book-rag ask "What is a lifetime?"
//! book-rag ask "Explain this" --selected-text "Lifetimes are named regions..."
//!
//! # Run the HTTP service
//! book-rag serve
//! ```
//!
//! Credentials come from `COHERE_API_KEY`, `QDRANT_URL` and `QDRANT_API_KEY`,
//! optionally loaded from a `.env` file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use book_rag::{AskRequest, DEFAULT_COLLECTION, ProviderSettings, RagConfig, load_book_directory};
use book_rag_server::{ServerConfig, hosted_pipeline, run_server};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Retrieval-augmented question answering over a book.
#[derive(Parser)]
#[command(name = "book-rag", version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load, chunk, embed and store a directory of book chapters
    Ingest {
        /// Directory holding the .mdx and .md chapter files
        dir: PathBuf,

        /// Word budget per chunk
        #[arg(long, default_value_t = 600)]
        max_words: usize,

        /// Chunks embedded and upserted per request
        #[arg(long, default_value_t = 10)]
        batch_size: usize,

        /// Vector collection to write into
        #[arg(long, default_value = DEFAULT_COLLECTION)]
        collection: String,
    },
    /// Answer a question from the stored book content
    Ask {
        question: String,

        /// Answer from this passage instead of searching the book
        #[arg(long)]
        selected_text: Option<String>,

        /// Number of chunks to retrieve
        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: usize,

        /// Vector collection to search
        #[arg(long, default_value = DEFAULT_COLLECTION)]
        collection: String,
    },
    /// Run the HTTP question-answering service
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "info" } else { "warn" })
    });
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let settings = ProviderSettings::from_env()?;

    match cli.command {
        Command::Ingest { dir, max_words, batch_size, collection } => {
            let config = RagConfig::builder()
                .max_words(max_words)
                .batch_size(batch_size)
                .collection(collection)
                .build()?;
            let pipeline = hosted_pipeline(&settings, config)?;

            let documents = load_book_directory(&dir)
                .with_context(|| format!("failed to load book from {}", dir.display()))?;
            info!(files = documents.len(), collection = %pipeline.config().collection, "loaded book");

            let stored = pipeline.ingest(&documents).await?;
            println!("Stored {stored} chunks from {} files", documents.len());
        }
        Command::Ask { question, selected_text, top_k, collection } => {
            let config = RagConfig::builder().collection(collection).build()?;
            let pipeline = hosted_pipeline(&settings, config)?;

            let mut request = AskRequest::new(question).with_top_k(top_k);
            if let Some(text) = selected_text {
                request = request.with_selected_text(text);
            }
            let result = pipeline.ask(&request).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Serve => {
            let pipeline = hosted_pipeline(&settings, RagConfig::default())?;
            run_server(ServerConfig::from_env(), pipeline).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ingest_defaults_match_book_settings() {
        let cli = Cli::parse_from(["book-rag", "ingest", "docs"]);
        match cli.command {
            Command::Ingest { dir, max_words, batch_size, collection } => {
                assert_eq!(dir, PathBuf::from("docs"));
                assert_eq!(max_words, 600);
                assert_eq!(batch_size, 10);
                assert_eq!(collection, "book_content");
            }
            _ => panic!("expected ingest"),
        }
    }

    #[test]
    fn ask_accepts_selection_and_top_k() {
        let cli = Cli::parse_from(["book-rag", "ask", "Why?", "--selected-text", "Because.", "-k", "3"]);
        match cli.command {
            Command::Ask { question, selected_text, top_k, .. } => {
                assert_eq!(question, "Why?");
                assert_eq!(selected_text.as_deref(), Some("Because."));
                assert_eq!(top_k, 3);
            }
            _ => panic!("expected ask"),
        }
    }
}
