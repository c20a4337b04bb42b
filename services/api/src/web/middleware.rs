//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::web::state::AppState;

/// Middleware that rejects requests while nobody is signed in.
///
/// Individual actions still check their own view; this only keeps signed-out
/// clients away from set and upload routes with a uniform 401.
pub async fn require_sign_in(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let signed_in = state.app.lock().await.current_user().is_some();
    if !signed_in {
        debug!(path = %req.uri().path(), "Rejected request without a signed-in user");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}
