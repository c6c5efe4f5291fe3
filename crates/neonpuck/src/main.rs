use neonpuck::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), NeonPuckError> {
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env()?;
    init_tracing(&config.log_level);

    info!(addr = %config.bind_addr, "starting neon puck server");
    let server = NeonPuckServer::builder()
        .bind(config.bind_addr.to_string())
        .match_config(config.match_config)
        .handshake_timeout(config.handshake_timeout)
        .build()
        .await?;
    server.run_until(shutdown_signal()).await?;

    info!("server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins; otherwise the configured level.
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, shutting down"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
