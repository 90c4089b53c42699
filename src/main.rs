use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use mock_openai::config::{Cli, Config};
use mock_openai::registry::SUPPORTED_MODELS;
use mock_openai::server::openai_api::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "mock_openai=debug,tower_http=debug"
    } else {
        "mock_openai=info,tower_http=info"
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("mock-openai v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let config = Arc::new(Config::load(&cli.config)?);

    info!(
        char_delay_ms = config.streaming.char_delay_ms,
        announce_role = config.streaming.announce_role,
        models = ?SUPPORTED_MODELS,
        "Configuration loaded"
    );

    let state = Arc::new(AppState::new(config.clone()));
    let app = build_router(state);

    let listen_addr = config.listen_addr(&cli);
    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
