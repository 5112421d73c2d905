use std::net::SocketAddr;

use argus::config::init_config;
use argus::errors::{LicenseError, LicenseResult};
use argus::server::{build_router, AppState, Database, LicenseRegistry};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> LicenseResult<()> {
    let config = init_config()?;

    if config.logging.enabled {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(&config.logging.level))
            .init();
    }

    let db = Database::connect(&config.database).await?;
    db.init_schema().await?;
    info!("Database initialized ({})", db.backend_name());

    let registry = LicenseRegistry::new(db, config.database.timeout());
    let app = build_router(AppState::new(registry));

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .map_err(|e| {
            LicenseError::ServerError(format!(
                "failed to bind {}:{}: {e}",
                config.server.host, config.server.port
            ))
        })?;
    let addr: SocketAddr = listener
        .local_addr()
        .map_err(|e| LicenseError::ServerError(format!("no local address: {e}")))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| LicenseError::ServerError(format!("server failed: {e}")))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
