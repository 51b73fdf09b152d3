pub mod auth;
pub mod handlers;
pub mod state;

use crate::{config::Config, error::Result, metrics, refresh};
use axum::{
    Router,
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use state::AppState;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

const VERSION_HEADER: &str = "x-reelcast-version";

async fn add_version_header(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    response.headers_mut().insert(
        VERSION_HEADER,
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    response
}

/// Build the full router for the given state.
pub fn router(state: AppState) -> Router {
    let data_routes = Router::new()
        .route("/reels", get(handlers::reels::list_reels))
        .route("/refresh-reels", post(handlers::reels::refresh_reels))
        .route("/files", get(handlers::files::list_files))
        .route("/files/{*path}", get(handlers::files::get_file))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/", get(handlers::health::health_check))
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::health::metrics))
        .merge(data_routes)
        .layer(middleware::from_fn(add_version_header))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Build a router backed by the configured upstream, without bootstrapping.
pub async fn build_router(config: Config) -> Result<Router> {
    Ok(router(AppState::new(config)?))
}

/// Start the Axum HTTP server and the periodic refresh job.
///
/// Returns once a shutdown signal was received, the server drained and the
/// refresh job stopped.
pub async fn start(config: Config) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{}", config.port);
    let refresh_on_startup = config.refresh_on_startup;
    let interval = config.refresh_interval();

    let mut state = AppState::new(config)?;
    match metrics::install_recorder() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => warn!("Prometheus recorder not installed: {}", e),
    }

    if refresh_on_startup {
        match state.coordinator().bootstrap().await {
            Ok(outcome) => info!("Reels bootstrap: {:?}", outcome),
            Err(e) => error!("Reels bootstrap failed, serving without data: {}", e),
        }
    }

    let shutdown = CancellationToken::new();
    let tracker = TaskTracker::new();
    tracker.spawn(refresh::run_periodic_refresh(
        state.coordinator().clone(),
        interval,
        shutdown.clone(),
    ));
    tracker.close();

    let app = router(state);

    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            shutdown.cancel();
            return Err(e.into());
        }
    };

    info!("🚀 Server listening on http://{}", addr);

    let server_shutdown = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_shutdown.cancel();
        })
        .await;

    // Server errors also stop the refresh job
    shutdown.cancel();
    info!("Waiting for background refresh to stop");
    tracker.wait().await;

    if let Err(e) = served {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
