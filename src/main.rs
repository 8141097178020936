use std::sync::Arc;

use secrecy::ExposeSecret;
use store_rating::{
    config::{Config, StorageConfig},
    repository::{DocumentStore, Repository, SqliteStore},
    rest, AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "store_rating=debug,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let repo: Arc<dyn Repository> = match &config.storage {
        StorageConfig::Document { base_url } => {
            tracing::info!("using document store at {}", base_url);
            Arc::new(DocumentStore::new(base_url)?)
        }
        StorageConfig::Sqlite { database_url } => {
            tracing::info!("using sqlite database");
            Arc::new(SqliteStore::connect(database_url).await?)
        }
    };

    let app_state = AppState::new(
        repo,
        config.jwt_secret.expose_secret().as_bytes(),
        config.cookie_secure,
    );

    let rest_app = rest::router(app_state);
    let rest_addr = config.socket_addr();
    tracing::info!("REST API listening on {}", rest_addr);
    let rest_listener = tokio::net::TcpListener::bind(rest_addr).await?;

    axum::serve(rest_listener, rest_app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
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
    tracing::info!("shutting down");
}
