use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod router;

use shared_config::AppConfig;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn build_app(config: Arc<AppConfig>) -> Router {
    // the frontend is served from its own origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    router::create_router(config).layer(trace).layer(cors)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env();
    if !config.is_configured() {
        warn!("Store or signing secret missing; requests touching them will fail");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting {} API on {}", config.clinic_name, addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, build_app(Arc::new(config)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
