//! # Secure Routes
//!
//! - `POST /system/secure/authenticate`: resolve a bearer token
//! - `POST /system/secure/authorize`: check one ACL row
//!
//! Rejected tokens and missing ACL rows are `200` answers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use isp_core::{AuthData, AuthDecision};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/system/secure/authenticate", post(authenticate))
        .route("/system/secure/authorize", post(authorize))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthenticateRequest {
    pub token: String,
}

/// Identity carried by an accepted token.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthDataView {
    pub system_id: i32,
    pub domain_id: i32,
    /// Application group id (legacy name).
    pub service_id: i32,
    pub application_id: i32,
    pub app_name: String,
}

impl From<AuthData> for AuthDataView {
    fn from(data: AuthData) -> Self {
        Self {
            system_id: data.system_id,
            domain_id: data.domain_id,
            service_id: data.application_group_id,
            application_id: data.app_id,
            app_name: data.app_name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateResponse {
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_data: Option<AuthDataView>,
    /// `token not found` or `token is expired`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

impl From<AuthDecision> for AuthenticateResponse {
    fn from(decision: AuthDecision) -> Self {
        let error_reason = decision.error_reason();
        match decision {
            AuthDecision::Authenticated(data) => Self {
                authenticated: true,
                auth_data: Some(data.into()),
                error_reason: None,
            },
            AuthDecision::TokenNotFound | AuthDecision::TokenExpired => Self {
                authenticated: false,
                auth_data: None,
                error_reason,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeRequest {
    pub app_id: i32,
    pub endpoint: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthorizeResponse {
    pub authorized: bool,
}

#[utoipa::path(
    post,
    path = "/system/secure/authenticate",
    request_body = AuthenticateRequest,
    responses(
        (status = 200, description = "Authentication outcome", body = AuthenticateResponse),
        (status = 400, description = "Malformed body", body = crate::error::ErrorBody),
    ),
    tag = "secure"
)]
async fn authenticate(
    State(state): State<AppState>,
    body: Result<Json<AuthenticateRequest>, JsonRejection>,
) -> Result<Json<AuthenticateResponse>, AppError> {
    let req = extract_json(body)?;
    let decision = state.services.secure.authenticate(&req.token).await?;
    Ok(Json(decision.into()))
}

#[utoipa::path(
    post,
    path = "/system/secure/authorize",
    request_body = AuthorizeRequest,
    responses(
        (status = 200, description = "Authorization outcome", body = AuthorizeResponse),
        (status = 400, description = "Malformed body", body = crate::error::ErrorBody),
    ),
    tag = "secure"
)]
async fn authorize(
    State(state): State<AppState>,
    body: Result<Json<AuthorizeRequest>, JsonRejection>,
) -> Result<Json<AuthorizeResponse>, AppError> {
    let req = extract_json(body)?;
    let authorized = state
        .services
        .secure
        .authorize(req.app_id, &req.endpoint)
        .await?;
    Ok(Json(AuthorizeResponse { authorized }))
}
