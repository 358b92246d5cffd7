//! API handlers for the Hardware Lab REST endpoints

pub mod hardware;
pub mod health;
pub mod openapi;
pub mod requests;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Get the Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    // The public feed is read by dashboards on other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Hardware types
        .route("/hardware/api", get(hardware::public_hardware))
        .route("/hardware", get(hardware::list_hardware).post(hardware::create_hardware))
        .route("/hardware/available", get(hardware::list_available))
        .route("/hardware/request", post(hardware::request_amounts))
        .route(
            "/hardware/:id",
            get(hardware::get_hardware)
                .put(hardware::update_hardware)
                .delete(hardware::delete_hardware),
        )
        .route("/hardware/:id/request", post(hardware::request_hardware))
        // Current user's requests
        .route("/me/summary", get(requests::my_summary))
        .route("/me/requests/pending", get(requests::my_pending))
        .route("/me/requests/historic", get(requests::my_historic))
        .route("/me/requests/active", get(requests::my_active))
        .route("/me/requests/:id", delete(requests::cancel_request))
        // Hardware desk
        .route("/users/:id/requests/pending", get(requests::user_pending))
        .route("/users/:id/requests/historic", get(requests::user_historic))
        .route("/users/:id/requests/active", get(requests::user_active))
        .route("/requests/active", get(requests::active_overall))
        .route("/requests/pickup", post(requests::pick_up_requests))
        .route("/requests/return", post(requests::return_requests))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
