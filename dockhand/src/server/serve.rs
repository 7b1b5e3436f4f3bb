//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::DockhandError;
use crate::server::handlers::{
    delete_profile_handler, deploy_handler, health_handler, image_tags_handler, job_handler,
    list_profiles_handler, load_profile_handler, recent_jobs_handler, save_profile_handler,
};
use crate::server::state::ServerState;

/// Build the application router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health
        .route("/health", get(health_handler))
        // Deployments
        .route("/api/deploy", post(deploy_handler))
        .route("/api/jobs", get(recent_jobs_handler))
        .route("/api/jobs/{id}", get(job_handler))
        .route("/api/images/tags", get(image_tags_handler))
        // Profiles
        .route("/api/profiles", get(list_profiles_handler).post(save_profile_handler))
        .route("/api/profiles/{id}", delete(delete_profile_handler))
        .route("/api/profiles/{id}/load", post(load_profile_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), DockhandError>>, DockhandError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| DockhandError::ServerError(format!("failed to bind {}: {}", addr, e)))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| DockhandError::ServerError(e.to_string()))
    });

    Ok(handle)
}
