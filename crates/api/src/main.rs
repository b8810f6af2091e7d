use api::{build_app, init_domain_services, init_tracing, spawn_session_cleanup};
use config::ApiConfig;
use std::time::Duration;

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be populated
    let _ = dotenvy::dotenv();

    let config = ApiConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Application cannot start without a valid configuration.");
        std::process::exit(1);
    });

    init_tracing(&config.logging);
    tracing::debug!(github = ?config.github, session = ?config.session, "Loaded configuration");

    let domain_services = init_domain_services(&config).inspect_err(|e| {
        tracing::error!(error = %e, "Failed to initialize services");
    })?;

    let _cleanup = spawn_session_cleanup(
        domain_services.session_store.clone(),
        SESSION_CLEANUP_INTERVAL,
    );

    let app = build_app(&config, domain_services)?;

    let bind_address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %bind_address, "Server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
