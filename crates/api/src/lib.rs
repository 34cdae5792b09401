//! Drowsiness Detection API Server
//!
//! Receives JPEG frames from the cabin camera, runs them through the
//! drowsiness detector, logs each score and answers with a JSON verdict.

use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
pub mod error;
pub mod pipeline;
pub mod routes;

pub use crate::config::AppConfig;
pub use error::{ApiError, ServerError};
pub use pipeline::{DetectionPipeline, PipelineError};

use crate::config::LoggingConfig;
use storage::{DebugImageStore, ScoreLog};

/// Application state shared across handlers
pub struct AppState {
    /// Detection pipeline
    pub pipeline: Arc<DetectionPipeline>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    /// Largest accepted upload body in bytes
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Create new application state
    pub fn new(pipeline: DetectionPipeline, max_upload_bytes: usize) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            max_upload_bytes,
        }
    }
}

/// Create the application router
///
/// `/detect` reads its own body so the upload limit applies only after
/// the content type has been accepted.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::status::home))
        .route("/ping", get(routes::status::ping))
        .route("/health", get(routes::status::health))
        .route("/detect", post(routes::detect::detect))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), ServerError> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| ServerError::Logging(format!("unknown log level {:?}", config.level)))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.map_err(|e| ServerError::Logging(e.to_string()))
}

/// Install the Prometheus exporter if a listen address is configured
pub fn init_metrics(listen_addr: Option<&str>) -> Result<(), ServerError> {
    let Some(addr) = listen_addr else {
        return Ok(());
    };
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| ServerError::Metrics(format!("invalid listen address {:?}: {}", addr, e)))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| ServerError::Metrics(e.to_string()))?;
    info!("Prometheus metrics on http://{}/metrics", addr);
    Ok(())
}

/// Build the pipeline described by the configuration.
///
/// Creates the log and debug image directories when they are missing.
pub fn build_pipeline(config: &AppConfig) -> Result<DetectionPipeline, ServerError> {
    let detector = dms::load_detector(&config.detector)?;

    if let Some(parent) = config.score_log.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let score_log = Arc::new(ScoreLog::new(&config.score_log.path));

    let mut pipeline = DetectionPipeline::new(Arc::from(detector), score_log);

    if config.debug_images.enabled {
        let dir = &config.debug_images.dir;
        std::fs::create_dir_all(dir)?;
        info!(
            "Debug images in {} (policy: {:?})",
            dir.display(),
            config.debug_images.policy
        );
        pipeline = pipeline.with_debug_images(Arc::new(DebugImageStore::new(
            dir,
            config.debug_images.policy,
        )));
    } else {
        warn!("Debug image capture disabled");
    }

    Ok(pipeline)
}

/// Run the server
pub async fn run_server(config: AppConfig) -> Result<(), ServerError> {
    init_metrics(config.metrics.listen_addr.as_deref())?;

    let pipeline = build_pipeline(&config)?;
    let state = Arc::new(AppState::new(pipeline, config.server.max_upload_bytes));
    let app = create_router(state);

    info!("Starting API server on {}", config.server.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
