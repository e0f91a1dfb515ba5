//! # energy_server
//!
//! REST API serving point predictions, multi-day forecasts and accuracy
//! reports from the energy_forecast ensemble.

use anyhow::Context;
use clap::Parser;
use energy_forecast::{ServiceConfig, ServiceContext};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod error;
mod routes;

#[derive(Debug, Parser)]
#[command(name = "energy_server", version, about)]
struct Args {
    /// TOML service configuration; defaults apply when omitted
    #[arg(short, long, env = "ENERGY_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to bind
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (optional - won't fail if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "energy_server=info,energy_forecast=info,tower_http=info".into()
            }),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    let context = ServiceContext::load(&config).context("invalid service configuration")?;

    let readiness = context.readiness();
    if !readiness.ready {
        for failure in &readiness.errors {
            warn!(dependency = %failure.dependency, "{}", failure.message);
        }
        warn!("serving in degraded mode; inference requests will fail");
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router(Arc::new(context))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("invalid HOST:PORT configuration")?;

    info!("energy_server v{} listening on {}", env!("CARGO_PKG_VERSION"), addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
