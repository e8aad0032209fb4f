//! Textgen Backend - Authenticated Text Generation Service
//! Mission: Serve bounded, accounted completions behind bearer-token auth

use anyhow::Result;
use textgen_backend::{config::Config, server};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    // Fatal if JWT_SECRET_KEY is missing
    let config = Config::from_env()?;

    info!("🚀 Starting Text Generation Service");
    server::run(config).await
}

/// Initialize tracing with env-filter support
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "textgen_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
