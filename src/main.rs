use retail_demand_forecaster::{
    api::{build_router, AppState},
    config::Config,
    ml::PredictionService,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "retail_demand_forecaster={level},tower_http={level}",
                    level = config.observability.log_level
                ))
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting demand server v{}", env!("CARGO_PKG_VERSION"));

    // Load the model, or bootstrap a placeholder so the service can answer
    // before any training has happened
    let service = Arc::new(PredictionService::load_or_bootstrap(
        &config.model.artifact_path,
    )?);
    tracing::info!(
        origin = %service.origin(),
        artifact = %service.artifact_path().display(),
        "Prediction service initialized"
    );

    // Build HTTP router
    let app = build_router(AppState::new(service));

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Predictions: POST http://{}/predict", http_addr);
    tracing::info!("   Last prediction: GET http://{}/predict", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        _ = http_handle => {
            tracing::warn!("HTTP server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Shutting down gracefully...");
    Ok(())
}
