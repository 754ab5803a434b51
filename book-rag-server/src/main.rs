use book_rag::{ProviderSettings, RagConfig};
use book_rag_server::{ServerConfig, hosted_pipeline, run_server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = ProviderSettings::from_env()?;
    let pipeline = hosted_pipeline(&settings, RagConfig::default())?;

    run_server(ServerConfig::from_env(), pipeline).await
}
