//! Hardware request endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::request::{BatchOutcome, RequestDetails, UserSummary},
};

use super::AuthenticatedUser;

/// Requests handled together at the hardware desk
#[derive(Deserialize, ToSchema)]
pub struct RequestIdsBody {
    pub request_ids: Vec<i32>,
}

/// Pending and active request counts of the current user
#[utoipa::path(
    get,
    path = "/me/summary",
    tag = "requests",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Request counts", body = UserSummary)
    )
)]
pub async fn my_summary(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<UserSummary>> {
    let summary = state.services.requests.summary_for(claims.user_id).await?;
    Ok(Json(summary))
}

/// Requests of the current user waiting to be picked up
#[utoipa::path(
    get,
    path = "/me/requests/pending",
    tag = "requests",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending requests", body = Vec<RequestDetails>)
    )
)]
pub async fn my_pending(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<RequestDetails>>> {
    let requests = state.services.requests.pending_for(claims.user_id).await?;
    Ok(Json(requests))
}

/// Request history of the current user
#[utoipa::path(
    get,
    path = "/me/requests/historic",
    tag = "requests",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending, active and returned requests", body = Vec<RequestDetails>)
    )
)]
pub async fn my_historic(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<RequestDetails>>> {
    let requests = state.services.requests.historic_for(claims.user_id).await?;
    Ok(Json(requests))
}

/// Items the current user holds
#[utoipa::path(
    get,
    path = "/me/requests/active",
    tag = "requests",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active requests", body = Vec<RequestDetails>)
    )
)]
pub async fn my_active(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<RequestDetails>>> {
    let requests = state.services.requests.active_for(claims.user_id).await?;
    Ok(Json(requests))
}

/// Withdraw one of the current user's pending requests
#[utoipa::path(
    delete,
    path = "/me/requests/{id}",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 204, description = "Request cancelled"),
        (status = 404, description = "Request not found"),
        (status = 422, description = "Request expired or picked up")
    )
)]
pub async fn cancel_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.requests.cancel(id, claims.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Pending requests of a user
#[utoipa::path(
    get,
    path = "/users/{id}/requests/pending",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Pending requests", body = Vec<RequestDetails>),
        (status = 403, description = "Organizers only")
    )
)]
pub async fn user_pending(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<RequestDetails>>> {
    claims.require_organizer()?;
    let requests = state.services.requests.pending_for(user_id).await?;
    Ok(Json(requests))
}

/// Request history of a user
#[utoipa::path(
    get,
    path = "/users/{id}/requests/historic",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Pending, active and returned requests", body = Vec<RequestDetails>),
        (status = 403, description = "Organizers only")
    )
)]
pub async fn user_historic(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<RequestDetails>>> {
    claims.require_organizer()?;
    let requests = state.services.requests.historic_for(user_id).await?;
    Ok(Json(requests))
}

/// Items a user holds
#[utoipa::path(
    get,
    path = "/users/{id}/requests/active",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Active requests", body = Vec<RequestDetails>),
        (status = 403, description = "Organizers only")
    )
)]
pub async fn user_active(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<RequestDetails>>> {
    claims.require_organizer()?;
    let requests = state.services.requests.active_for(user_id).await?;
    Ok(Json(requests))
}

/// Every item currently out
#[utoipa::path(
    get,
    path = "/requests/active",
    tag = "requests",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active requests", body = Vec<RequestDetails>),
        (status = 403, description = "Organizers only")
    )
)]
pub async fn active_overall(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<RequestDetails>>> {
    claims.require_organizer()?;
    let requests = state.services.requests.active_overall().await?;
    Ok(Json(requests))
}

/// Hand out requested items
#[utoipa::path(
    post,
    path = "/requests/pickup",
    tag = "requests",
    security(("bearer_auth" = [])),
    request_body = RequestIdsBody,
    responses(
        (status = 200, description = "Picked up requests and failures per hardware type", body = BatchOutcome),
        (status = 403, description = "Organizers only")
    )
)]
pub async fn pick_up_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(body): Json<RequestIdsBody>,
) -> AppResult<Json<BatchOutcome>> {
    claims.require_organizer()?;
    let outcome = state
        .services
        .requests
        .pick_up_many(&body.request_ids, claims.user_id)
        .await?;
    Ok(Json(outcome))
}

/// Take items back
#[utoipa::path(
    post,
    path = "/requests/return",
    tag = "requests",
    security(("bearer_auth" = [])),
    request_body = RequestIdsBody,
    responses(
        (status = 200, description = "Returned requests and failures per hardware type", body = BatchOutcome),
        (status = 403, description = "Organizers only")
    )
)]
pub async fn return_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(body): Json<RequestIdsBody>,
) -> AppResult<Json<BatchOutcome>> {
    claims.require_organizer()?;
    let outcome = state
        .services
        .requests
        .return_many(&body.request_ids, claims.user_id)
        .await?;
    Ok(Json(outcome))
}
