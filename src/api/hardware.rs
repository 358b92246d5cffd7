//! Hardware type endpoints

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::{AppResult, LendingError},
    models::{
        hardware_type::{
            CreateHardwareType, HardwareType, HardwareTypeSummary, PublicHardwareSnapshot,
            UpdateHardwareType,
        },
        request::{HardwareRequest, RequestAmountsOutcome},
    },
};

use super::AuthenticatedUser;

/// Units wanted per hardware type
#[derive(Deserialize, ToSchema)]
pub struct RequestAmountsBody {
    /// Hardware type ID -> number of units
    pub amounts: BTreeMap<i32, u32>,
}

/// Public hardware feed for dashboards
#[utoipa::path(
    get,
    path = "/hardware/api",
    tag = "hardware",
    responses(
        (status = 200, description = "Hardware availability", body = PublicHardwareSnapshot)
    )
)]
pub async fn public_hardware(
    State(state): State<crate::AppState>,
) -> AppResult<Json<PublicHardwareSnapshot>> {
    let snapshot = state.services.inventory.public_snapshot().await?;
    Ok(Json(snapshot))
}

/// List all hardware types with their counts
#[utoipa::path(
    get,
    path = "/hardware",
    tag = "hardware",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Hardware inventory", body = Vec<HardwareTypeSummary>)
    )
)]
pub async fn list_hardware(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<HardwareTypeSummary>>> {
    let inventory = state.services.inventory.list_inventory().await?;
    Ok(Json(inventory))
}

/// List hardware types that can still be requested
#[utoipa::path(
    get,
    path = "/hardware/available",
    tag = "hardware",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Requestable hardware", body = Vec<HardwareTypeSummary>)
    )
)]
pub async fn list_available(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<HardwareTypeSummary>>> {
    let available = state.services.inventory.list_available().await?;
    Ok(Json(available))
}

/// Get a hardware type with its counts
#[utoipa::path(
    get,
    path = "/hardware/{id}",
    tag = "hardware",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Hardware type ID")),
    responses(
        (status = 200, description = "Hardware type", body = HardwareTypeSummary),
        (status = 404, description = "Hardware type not found")
    )
)]
pub async fn get_hardware(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<HardwareTypeSummary>> {
    let hardware = state.services.inventory.get(id).await?;
    Ok(Json(hardware))
}

/// Create a hardware type
#[utoipa::path(
    post,
    path = "/hardware",
    tag = "hardware",
    security(("bearer_auth" = [])),
    request_body = CreateHardwareType,
    responses(
        (status = 201, description = "Hardware type created", body = HardwareType),
        (status = 409, description = "Name already used")
    )
)]
pub async fn create_hardware(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateHardwareType>,
) -> AppResult<(StatusCode, Json<HardwareType>)> {
    claims.require_organizer()?;
    let hardware = state.services.inventory.create(&data).await?;
    Ok((StatusCode::CREATED, Json(hardware)))
}

/// Update a hardware type
#[utoipa::path(
    put,
    path = "/hardware/{id}",
    tag = "hardware",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Hardware type ID")),
    request_body = UpdateHardwareType,
    responses(
        (status = 200, description = "Hardware type updated", body = HardwareType)
    )
)]
pub async fn update_hardware(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateHardwareType>,
) -> AppResult<Json<HardwareType>> {
    claims.require_organizer()?;
    let hardware = state.services.inventory.update(id, &data).await?;
    Ok(Json(hardware))
}

/// Delete a hardware type and its requests
#[utoipa::path(
    delete,
    path = "/hardware/{id}",
    tag = "hardware",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Hardware type ID")),
    responses(
        (status = 204, description = "Hardware type deleted")
    )
)]
pub async fn delete_hardware(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_organizer()?;
    state.services.inventory.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Request one unit of a hardware type
#[utoipa::path(
    post,
    path = "/hardware/{id}/request",
    tag = "hardware",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Hardware type ID")),
    responses(
        (status = 201, description = "Request created", body = HardwareRequest),
        (status = 422, description = "No unit available or requests closed")
    )
)]
pub async fn request_hardware(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<(StatusCode, Json<HardwareRequest>)> {
    let request = state
        .services
        .inventory
        .request(id, claims.user_id)
        .await?
        .ok_or(LendingError::NoItemsAvailable)?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Request several units of several hardware types
#[utoipa::path(
    post,
    path = "/hardware/request",
    tag = "hardware",
    security(("bearer_auth" = [])),
    request_body = RequestAmountsBody,
    responses(
        (status = 200, description = "Created requests and shortfall per type", body = RequestAmountsOutcome),
        (status = 422, description = "Requests closed")
    )
)]
pub async fn request_amounts(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(body): Json<RequestAmountsBody>,
) -> AppResult<Json<RequestAmountsOutcome>> {
    let outcome = state
        .services
        .inventory
        .request_amounts(claims.user_id, &body.amounts)
        .await?;
    Ok(Json(outcome))
}
