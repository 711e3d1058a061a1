mod dto;
mod error;
mod handlers;
mod state;

pub use dto::{AskRequest, AskResponse, PageRef, SourceRef};
pub use error::ApiError;
pub use state::AppState;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{RagError, Result};

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ask", post(handlers::ask))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `state.config.server_addr` and serves until the process stops.
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr = state.config.server_addr.clone();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| RagError::Configuration(format!("cannot bind {}: {}", addr, e)))?;
    info!(addr = %addr, "listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
