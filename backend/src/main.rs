#![forbid(unsafe_code)]
use anyhow::{Context, Result};
use axum::Router;
use parkbook::{api, booker::ParkingApp, config::Config};
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer,
    timeout::TimeoutLayer,
};
use tracing::{debug, info, warn};
use tracing_subscriber::filter::EnvFilter;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = dotenvy::dotenv() {
        debug!("No .env loaded: {}", e);
    }
    let config = Config::from_env()?;

    info!("Starting server");

    let parking = Arc::new(ParkingApp::from_config(&config).await?);

    let middleware = tower::ServiceBuilder::new()
        .layer(CompressionLayer::new().quality(tower_http::CompressionLevel::Fastest))
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(CatchPanicLayer::new())
        .layer(CorsLayer::very_permissive());

    let mut app: Router = api::app(parking.clone());
    if let Some(dir) = &config.frontend_dir {
        info!("Serving frontend from: {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }
    let app = app.layer(middleware);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("binding port {}", config.port))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    parking.flush().await?;
    Ok(())
}
