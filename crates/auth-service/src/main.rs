//! OAuth 2.0 authorization service
//!
//! Serves the `oauth-server` core over HTTP:
//! - Authorization endpoint (implicit `token` and `code` flows, PKCE)
//! - Token endpoint (authorization code exchange)
//! - Periodic cleanup of expired authorization codes

mod config;
mod oauth;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use chrono::Utc;
use clap::Parser;
use oauth_server::{CodeStorage, OAuthServer, SystemClock, SystemRandom};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "auth-service")]
#[command(about = "OAuth 2.0 authorization service")]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = 3001, env = "AUTH_PORT")]
    port: u16,

    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0", env = "AUTH_BIND")]
    bind: String,

    /// Path to config directory (also holds pending authorization codes)
    #[arg(long, default_value = "/config", env = "AUTH_CONFIG_PATH")]
    config_path: String,

    /// Seconds between sweeps of expired authorization codes
    #[arg(long, default_value_t = 60, env = "AUTH_CLEANUP_INTERVAL")]
    cleanup_interval_secs: u64,
}

/// Shared application state
pub struct AppState {
    pub server: OAuthServer,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "auth_service=info,oauth_server=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config_path)?;
    let storage = Arc::new(CodeStorage::open(&cli.config_path));
    storage
        .init()
        .context("Failed to initialize authorization code storage")?;

    let mut server = OAuthServer::new(
        storage.clone(),
        SystemRandom,
        SystemClock,
        config.registry(),
    )
    .with_config(config.tokens.clone());
    if let Some(key_pair) = config.signing_key()? {
        tracing::info!("Access tokens will be signed ({:?})", key_pair);
        server = server.with_signature_key_pair(key_pair);
    }

    let state = Arc::new(AppState { server });

    tokio::spawn(cleanup_expired_codes(
        storage,
        Duration::from_secs(cli.cleanup_interval_secs.max(1)),
    ));

    // Build router
    let app = Router::new()
        .route(
            "/authorize",
            get(oauth::authorize::get_handler).post(oauth::authorize::post_handler),
        )
        .route("/token", post(oauth::token::handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Parse bind address
    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port).parse()?;

    tracing::info!("Starting auth-service on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Auth service shut down");
    Ok(())
}

async fn cleanup_expired_codes(storage: Arc<CodeStorage>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        if let Err(e) = storage.cleanup_expired(Utc::now()) {
            tracing::error!("Failed to clean up expired codes: {}", e);
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
