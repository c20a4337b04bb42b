//! services/api/src/web/router.rs
//!
//! Assembles the HTTP router: public routes, signed-in routes, the study
//! socket and the Swagger UI.

use crate::config::ConfigError;
use crate::error::ApiError;
use crate::web::{
    auth::{logout_handler, recover_handler, signin_handler, signup_handler},
    middleware::require_sign_in,
    rest::{
        create_new_handler, delete_set_handler, export_set_handler, import_set_handler, list_sets_handler,
        my_sets_handler, save_set_handler, state_handler, study_set_handler, toggle_theme_handler,
        update_card_handler, upload_handler, ApiDoc,
    },
    state::AppState,
    study_handler::study_handler,
};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string()))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // Public routes (no sign-in required)
    let public_routes = Router::new()
        .route("/state", get(state_handler))
        .route("/theme/toggle", post(toggle_theme_handler))
        .route("/auth/signup", post(signup_handler))
        .route("/auth/signin", post(signin_handler))
        .route("/auth/recover", post(recover_handler))
        .route("/auth/logout", post(logout_handler));

    // Signed-in routes
    let protected_routes = Router::new()
        .route("/upload", post(upload_handler))
        .route("/cards/{index}", put(update_card_handler))
        .route("/sets", get(list_sets_handler).post(save_set_handler))
        .route("/sets/new", post(create_new_handler))
        .route("/sets/import", post(import_set_handler))
        .route("/sets/{id}", delete(delete_set_handler))
        .route("/sets/{id}/export", get(export_set_handler))
        .route("/sets/{id}/study", post(study_set_handler))
        .route("/view/my-sets", post(my_sets_handler))
        .route("/study", get(study_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_sign_in,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
