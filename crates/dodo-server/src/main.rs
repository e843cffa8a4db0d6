use std::error::Error;

use dodo_core::{Authenticator, Config, Database};
use dodo_server::{load_config, router, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "dodo-server failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let config = load_config(&Config::path()?, |name| std::env::var(name).ok())?;

    let db_path = config.database_path()?;
    let db = Database::open_at(&db_path)?;
    let auth = Authenticator::from_config(&config.auth)?;
    tracing::info!(database = %db_path.display(), cors_origin = %config.server.cors_origin, "dodo-server starting");

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let app = router(AppState::new(db, auth, config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("dodo-server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to register SIGTERM handler");
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    tracing::info!("dodo-server shutting down");
}
