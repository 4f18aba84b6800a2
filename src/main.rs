use std::sync::Arc;

use tracing::{error, info};

use jobqueue::{Config, JobServer, SimulatedExecutor, SqliteStorage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    let storage = SqliteStorage::new(&config.database_url).await?;
    let mut server = JobServer::new(
        Arc::new(storage),
        Arc::new(SimulatedExecutor::new()),
        config.clone(),
    );

    server.start();

    let app = server.router();
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Listening");

    let shutdown = server.shutdown_token();
    let http = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;

        if let Err(e) = result {
            error!(error = %e, "Server error");
        }
    });

    // Ctrl+C stops the workers, which in turn releases the HTTP server.
    server.wait_for_shutdown().await;
    let _ = http.await;

    info!("Server stopped");
    Ok(())
}
