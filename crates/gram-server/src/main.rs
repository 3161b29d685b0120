mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use gram_api::auth::AppStateInner;
use gram_api::relay::CdnRelay;
use gram_api::routes;

use crate::config::Config;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gram=debug,gram_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::load()?;

    if config.jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&config.jwt_secret.as_str()) {
        eprintln!("FATAL: GRAM_JWT_SECRET is unset or still a placeholder.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    if config.cdn.private_key.is_empty() {
        warn!("IMAGEKIT_PRIVATE_KEY is unset; uploads will fail until it is configured");
    }
    if !config.cdn.url_endpoint.is_empty() {
        info!(
            "CDN endpoint: {} (public key {})",
            config.cdn.url_endpoint, config.cdn.public_key
        );
    }

    // Init database and relay
    let db = gram_db::Database::open(&config.db_path)?;
    let relay = CdnRelay::new(
        config.cdn.private_key.clone(),
        config.cdn.upload_api.clone(),
        config.staging_dir.clone(),
    )
    .await?;

    let state = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        relay,
    });

    let app = routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("gram server listening on {}", addr);

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
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
