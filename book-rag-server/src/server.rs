use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use book_rag::{
    AnswerResult, AskRequest, ProviderSettings, RagConfig, RagError, RagPipeline,
    cohere::{CohereChatModel, CohereEmbeddingProvider},
    qdrant::QdrantVectorStore,
};
use serde_json::json;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
}

impl AppState {
    pub fn new(pipeline: RagPipeline) -> Self {
        Self { pipeline: Arc::new(pipeline) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// The only browser origin allowed to call the API.
    pub frontend_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

impl ServerConfig {
    /// Read `BOOK_RAG_HOST`, `BOOK_RAG_PORT` and `FRONTEND_URL`, falling back
    /// to the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("BOOK_RAG_HOST").unwrap_or(defaults.host),
            port: lookup("BOOK_RAG_PORT")
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(defaults.port),
            frontend_url: lookup("FRONTEND_URL").unwrap_or(defaults.frontend_url),
        }
    }
}

/// Wire Cohere embeddings, Cohere chat and Qdrant storage into a pipeline.
pub fn hosted_pipeline(settings: &ProviderSettings, config: RagConfig) -> book_rag::Result<RagPipeline> {
    let embedder = CohereEmbeddingProvider::new(settings.cohere_api_key.clone())?;
    let model = CohereChatModel::new(settings.cohere_api_key.clone())?;
    let store = QdrantVectorStore::new(&settings.qdrant_url, settings.qdrant_api_key.clone())?;

    RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(embedder))
        .vector_store(Arc::new(store))
        .completion_model(Arc::new(model))
        .build()
}

pub fn app_router(state: AppState, frontend_url: &str) -> anyhow::Result<Router> {
    let origin = HeaderValue::from_str(frontend_url)
        .with_context(|| format!("invalid FRONTEND_URL: {frontend_url}"))?;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([origin]))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Ok(Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/ask", post(ask))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

pub async fn run_server(config: ServerConfig, pipeline: RagPipeline) -> anyhow::Result<()> {
    let app = app_router(AppState::new(pipeline), &config.frontend_url)?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for book-rag server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("book-rag listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> impl IntoResponse {
    Json(json!({"message":"AI Native Book RAG Chatbot API","status":"running"}))
}

async fn health() -> impl IntoResponse {
    Json(json!({"status":"healthy","service":"RAG Chatbot API"}))
}

async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AnswerResult>, ApiError> {
    let span = info_span!("ask", request_id = %Uuid::new_v4());
    async move {
        let result = state.pipeline.ask(&request).await.inspect_err(|e| {
            error!(error = %e, "failed to answer question");
        })?;
        Ok(Json(result))
    }
    .instrument(span)
    .await
}

/// A pipeline failure rendered as `500 {"detail": ...}`.
#[derive(Debug)]
pub struct ApiError(RagError);

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = format!("Error processing question: {}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn config_defaults_listen_on_all_interfaces() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.port, 8000);
        assert_eq!(config.frontend_url, "http://localhost:3000");
    }

    #[test]
    fn config_reads_overrides_and_ignores_bad_port() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BOOK_RAG_HOST", "127.0.0.1"),
            ("BOOK_RAG_PORT", "not-a-port"),
            ("FRONTEND_URL", "https://book.example.org"),
        ]);
        let config = ServerConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8000);
        assert_eq!(config.frontend_url, "https://book.example.org");
    }

    #[test]
    fn api_error_is_internal_server_error() {
        let response = ApiError::from(RagError::PipelineError("boom".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
