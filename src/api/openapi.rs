//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{hardware, health, requests};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hardware Lab API",
        version = "1.0.0",
        description = "Hardware lending REST API for hackathon events",
        license(name = "GPL-2.0", url = "https://www.gnu.org/licenses/gpl-2.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Hardware
        hardware::public_hardware,
        hardware::list_hardware,
        hardware::list_available,
        hardware::get_hardware,
        hardware::create_hardware,
        hardware::update_hardware,
        hardware::delete_hardware,
        hardware::request_hardware,
        hardware::request_amounts,
        // Requests
        requests::my_summary,
        requests::my_pending,
        requests::my_historic,
        requests::my_active,
        requests::cancel_request,
        requests::user_pending,
        requests::user_historic,
        requests::user_active,
        requests::active_overall,
        requests::pick_up_requests,
        requests::return_requests,
    ),
    components(
        schemas(
            // Hardware
            crate::models::hardware_type::HardwareType,
            crate::models::hardware_type::CreateHardwareType,
            crate::models::hardware_type::UpdateHardwareType,
            crate::models::hardware_type::HardwareTypeSummary,
            crate::models::hardware_type::PublicHardware,
            crate::models::hardware_type::PublicHardwareSnapshot,
            hardware::RequestAmountsBody,
            // Requests
            crate::models::request::HardwareRequest,
            crate::models::request::RequestState,
            crate::models::request::RequestDetails,
            crate::models::request::BatchOutcome,
            crate::models::request::RequestAmountsOutcome,
            crate::models::request::UserSummary,
            requests::RequestIdsBody,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "hardware", description = "Hardware inventory and requests"),
        (name = "requests", description = "Request lifecycle and listings")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
