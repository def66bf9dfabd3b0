use anyhow::Result;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use blockfit_api::config::Config;
use blockfit_api::routes::build_router;
use blockfit_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; invalid layout overrides abort startup
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting blockfit API v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Layout policy: {}px to {}px, baseline {}px, max {} table rows",
        config.policy.min_height_px,
        config.policy.max_height_px,
        config.policy.baseline_height_px,
        config.policy.max_table_rows
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let state = AppState::new(config);

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()), // editor preview calls from the browser
    );

    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
