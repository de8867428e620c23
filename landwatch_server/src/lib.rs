// THEORY:
// `landwatch_server` is the outer surface of the change detector: configuration
// from the environment, a bounded in-memory result store, a service layer that
// drives the analysis worker pool, and (behind the `web` feature) the axum routes
// that expose it all over HTTP.

pub mod config;
pub mod service;
pub mod store;

#[cfg(feature = "web")]
mod http;

pub use config::ServerConfig;
pub use service::{ApiError, AppState, Upload};
pub use store::{AnalysisListing, AnalysisMetadata, ResultStore, StoredAnalysis};

#[cfg(feature = "web")]
pub use http::{router, start_server};

use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(not(feature = "web"))]
pub async fn start_server(
    _cfg: ServerConfig,
    _pipeline: landwatch::PipelineConfig,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    Err(anyhow::anyhow!("web feature not enabled for landwatch_server"))
}
