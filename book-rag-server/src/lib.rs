//! `book-rag-server` serves book question answering over HTTP.
//! `POST /ask` grounds answers on selected text or retrieved book chunks.

pub mod server;

pub use server::{ApiError, AppState, ServerConfig, app_router, hosted_pipeline, run_server};
