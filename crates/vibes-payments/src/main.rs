use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use vibes_payments::config::PaymentsConfig;
use vibes_payments::handlers::AppStateInner;
use vibes_payments::provider::RazorpayProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vibes_payments=debug,tower_http=debug".into()),
        )
        .init();

    let config = PaymentsConfig::from_env()?;
    if let Err(e) = config.check_credentials() {
        eprintln!("FATAL: {}.", e);
        eprintln!("       Set the provider key id and secret in your .env file and restart.");
        std::process::exit(1);
    }

    let provider = RazorpayProvider::new(&config.api_url, &config.key_id, &config.key_secret);
    let state = Arc::new(AppStateInner {
        provider: Arc::new(provider),
        key_secret: config.key_secret.clone(),
    });
    let app = vibes_payments::router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Payment service listening on {}", addr);
    info!("Order provider: {}", config.api_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("No SIGTERM handler ({}), waiting for Ctrl+C only", e);
                let _ = ctrl_c.await;
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("Received Ctrl+C, shutting down...");
    }
}
