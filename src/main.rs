use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use tasas_bridge::config::{credentials, AppConfig};
use tasas_bridge::notifier::WebhookNotifier;
use tasas_bridge::sheets::GoogleSheetsClient;
use tasas_bridge::state::AppState;
use tasas_bridge::store::RateStore;

#[derive(Parser)]
#[command(name = "tasas-bridge", version, about = "Rate sheet and webhook bridge")]
struct Args {
    #[arg(long, help = "Port to listen on (overrides PORT)")]
    port: Option<u16>,

    #[arg(long, help = "Directory with the front-end files (overrides STATIC_DIR)")]
    static_dir: Option<PathBuf>,

    #[arg(long, help = "Load environment from this file instead of ./.env")]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load .env if present so cargo run picks up GSHEET_ID, ZAPIER_WEBHOOK_URL, etc.
    match &args.env_file {
        Some(path) => {
            dotenvy::from_path(path).with_context(|| format!("failed to load {}", path.display()))?;
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dir) = args.static_dir {
        config.server.static_dir = dir;
    }
    tracing::info!("Starting tasas-bridge in {:?} mode", config.environment);

    let key = credentials::bootstrap(&config.sheets).context("failed to load service account credentials")?;
    let sheets = GoogleSheetsClient::new(&config.sheets, key).context("failed to set up sheets client")?;
    let state = AppState::new(
        RateStore::new(Arc::new(sheets)),
        Arc::new(WebhookNotifier::new(config.webhook.url.clone())),
    );

    let app = tasas_bridge::app(state, &config);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("tasas-bridge listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
