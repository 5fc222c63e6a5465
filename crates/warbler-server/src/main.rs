mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use warbler_db::Database;
use warbler_web::{AppState, AppStateInner};

use crate::config::{Config, DatabaseTarget, PLACEHOLDER_SECRET};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "warbler=debug,warbler_web=debug,warbler_db=info,tower_http=debug".into()
            }),
        )
        .init();

    // Config
    let config = Config::from_env()?;
    if config.secret_key == PLACEHOLDER_SECRET {
        warn!("SECRET_KEY is unset; session cookies are signed with a placeholder key");
    }

    // Init database
    let db = match &config.database {
        DatabaseTarget::File(path) => Database::open(path)?,
        DatabaseTarget::Memory => {
            warn!("Using an in-memory database; all data is lost on shutdown");
            Database::open_in_memory()?
        }
    };

    let state: AppState = Arc::new(AppStateInner {
        db,
        secret_key: config.secret_key.clone(),
    });

    let app = warbler_web::app(state, &config.static_dir);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Warbler listening on {}", addr);

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
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
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
