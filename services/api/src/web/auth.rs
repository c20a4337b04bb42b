//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for signup, signin, password recovery and logout.

use crate::error::{user_facing, HandlerError};
use crate::web::rest::StateResponse;
use crate::web::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RecoverRequest {
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct RecoverResponse {
    pub message: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create an account and sign in with it
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created; the session is on the upload view", body = StateResponse),
        (status = 401, description = "Passwords do not match"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let mut app = state.app.lock().await;
    app.sign_up(&req.email, &req.password, &req.confirm_password)
        .map_err(user_facing)?;
    Ok((StatusCode::CREATED, Json(StateResponse::from_app(&app))))
}

/// POST /auth/signin - Sign in to an existing account
#[utoipa::path(
    post,
    path = "/auth/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Signed in; the session is on the upload view", body = StateResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn signin_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SigninRequest>,
) -> Result<Json<StateResponse>, HandlerError> {
    let mut app = state.app.lock().await;
    app.sign_in(&req.email, &req.password).map_err(user_facing)?;
    Ok(Json(StateResponse::from_app(&app)))
}

/// POST /auth/recover - Request a (simulated) password reset link
#[utoipa::path(
    post,
    path = "/auth/recover",
    request_body = RecoverRequest,
    responses(
        (status = 200, description = "Reset link sent", body = RecoverResponse),
        (status = 404, description = "No account with that email")
    )
)]
pub async fn recover_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecoverRequest>,
) -> Result<Json<RecoverResponse>, HandlerError> {
    let message = state
        .app
        .lock()
        .await
        .request_password_reset(&req.email)
        .map_err(user_facing)?;
    info!("Password reset requested");
    Ok(Json(RecoverResponse { message }))
}

/// POST /auth/logout - Sign out; accounts and sets are kept
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 200, description = "Logout successful", body = StateResponse))
)]
pub async fn logout_handler(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    let mut app = state.app.lock().await;
    app.logout();
    Json(StateResponse::from_app(&app))
}
