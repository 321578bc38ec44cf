use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use duet_model::ModelHost;
use duet_server::{build_router, ServerConfig, ServerState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::load()?;
    let host = Arc::new(ModelHost::new(&config.model_config, &config.infer_config));

    if config.eager_load {
        let loader = host.clone();
        match tokio::task::spawn_blocking(move || loader.initialize()).await? {
            Ok(()) => info!(device = ?host.device(), "model ready"),
            Err(e) => error!("model failed to load, generation requests will be rejected: {e}"),
        }
    }
    if config.translation.api_key.is_none() {
        warn!("DASHSCOPE_API_KEY is not set, /translate will fail");
    }

    let state = Arc::new(ServerState::from_config(&config, host)?);
    let app = build_router(state);

    let addr = SocketAddr::new(config.host, config.port);
    let listener = TcpListener::bind(addr).await?;
    info!("listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
