use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Redirect},
    routing::get,
    Router,
};
use catapult_models::FlingRequest;
use catapult_orchestrations::{FlingError, FlingOrchestrator};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::identity::IdentityProvider;

/// Shared API state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<FlingOrchestrator>,
    pub identity: Arc<dyn IdentityProvider>,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/catapult/fling", get(fling))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the API server, stopping on Ctrl+C
pub async fn start_server(host: &str, port: u16, state: AppState) -> Result<()> {
    let app = create_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("✓ API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down...");
        })
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

// ============================================================================
// Health Check
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "catapult",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ============================================================================
// Fling
// ============================================================================

#[derive(Debug, Deserialize)]
struct FlingQuery {
    source_repo: Option<String>,
}

/// `GET /api/catapult/fling?source_repo=<owner>/<repo>`
///
/// Redirects to the new project's console overview. The request is validated
/// before identity is acquired, so a malformed request never reaches a client.
async fn fling(
    State(state): State<AppState>,
    Query(query): Query<FlingQuery>,
    headers: HeaderMap,
) -> Result<Redirect, AppError> {
    let request = FlingRequest {
        source_repo: query.source_repo,
    };
    request.validate().map_err(FlingError::from)?;

    let identity = state.identity.acquire(&headers)?;
    let result = state.orchestrator.fling(request, identity).await?;

    Ok(Redirect::to(&result.redirect_url))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub struct AppError(FlingError);

impl From<FlingError> for AppError {
    fn from(err: FlingError) -> Self {
        Self(err)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            FlingError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            e if e.is_unauthorized() => StatusCode::UNAUTHORIZED,
            e if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Fling failed upstream");
        } else {
            tracing::warn!(error = %self.0, "Fling rejected");
        }

        let body = Json(serde_json::json!({
            "error": self.0.to_string(),
            "type": self.0.error_type(),
        }));

        (status, body).into_response()
    }
}
