//! # OpenAPI Specification Assembly
//!
//! Collects every utoipa-documented handler into one OpenAPI 3.1 document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ISP System Service",
        version = "0.1.0",
        description = "Registry of domains, application groups and applications, with bearer tokens, access lists and the authenticate/authorize checks used by the gateway."
    ),
    paths(
        // Secure
        crate::routes::secure::authenticate,
        crate::routes::secure::authorize,
        // Access lists
        crate::routes::access_list::get_by_id,
        crate::routes::access_list::set_one,
        crate::routes::access_list::set_list,
        crate::routes::access_list::delete_list,
        // Domains
        crate::routes::domain::get_domains_by_system_id,
        crate::routes::domain::create_update_domain,
        crate::routes::domain::get_domain_by_id,
        crate::routes::domain::delete_domains,
        // Applications
        crate::routes::application::get_applications,
        crate::routes::application::get_applications_by_service_id,
        crate::routes::application::create_update_application,
        crate::routes::application::get_application_by_id,
        crate::routes::application::get_application_by_token,
        crate::routes::application::delete_applications,
        crate::routes::application::get_system_tree,
        crate::routes::application::next_id,
        crate::routes::application::get_all,
        crate::routes::application::create_application,
        crate::routes::application::update_application,
        // Tokens
        crate::routes::token::create_token,
        crate::routes::token::revoke_tokens,
        crate::routes::token::revoke_tokens_for_app,
        crate::routes::token::get_tokens_by_app_id,
        // Application groups
        crate::routes::app_group::create,
        crate::routes::app_group::update,
        crate::routes::app_group::delete_list,
        crate::routes::app_group::get_by_id_list,
        crate::routes::app_group::get_all,
    ),
    components(schemas(
        // Records
        isp_core::Domain,
        isp_core::AppGroup,
        isp_core::Application,
        isp_core::ApplicationType,
        isp_core::Token,
        isp_core::AccessList,
        isp_core::ApplicationWithTokens,
        isp_core::DomainNode,
        isp_core::ServiceNode,
        // Errors
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Shared DTOs
        crate::routes::IdRequest,
        crate::routes::IdListRequest,
        crate::routes::CountResponse,
        // Secure DTOs
        crate::routes::secure::AuthenticateRequest,
        crate::routes::secure::AuthenticateResponse,
        crate::routes::secure::AuthDataView,
        crate::routes::secure::AuthorizeRequest,
        crate::routes::secure::AuthorizeResponse,
        // Access-list DTOs
        crate::routes::access_list::MethodEntry,
        crate::routes::access_list::SetOneBody,
        crate::routes::access_list::SetListBody,
        crate::routes::access_list::DeleteListBody,
        // Domain DTOs
        crate::routes::domain::SystemIdRequest,
        crate::routes::domain::DomainBody,
        // Application DTOs
        crate::routes::application::ServiceIdRequest,
        crate::routes::application::TokenRequest,
        crate::routes::application::SystemTreeRequest,
        crate::routes::application::NextIdResponse,
        crate::routes::application::ApplicationBody,
        crate::routes::application::UpdateApplicationBody,
        // Token DTOs
        crate::routes::token::CreateTokenBody,
        crate::routes::token::RevokeTokensBody,
        crate::routes::token::AppIdRequest,
        crate::routes::token::RevokeResponse,
        // Application-group DTOs
        crate::routes::app_group::AppGroupBody,
    )),
    tags(
        (name = "secure", description = "Token authentication and endpoint authorization"),
        (name = "access-list", description = "Per-application endpoint permissions"),
        (name = "domain", description = "Domains of a system"),
        (name = "application", description = "Applications and the system tree"),
        (name = "token", description = "Bearer tokens"),
        (name = "application-group", description = "Application groups (services) of a domain"),
    )
)]
pub struct ApiDoc;

/// Serves the document at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
