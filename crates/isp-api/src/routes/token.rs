//! # Token Routes
//!
//! - `POST /system/token/create_token`: mint a token for an application
//! - `POST /system/token/revoke_tokens`: delete listed tokens
//! - `POST /system/token/revoke_tokens_for_app`: delete every token of an application
//! - `POST /system/token/get_tokens_by_app_id`

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use isp_core::{ApplicationWithTokens, Token, NEVER_EXPIRES};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::service::RevokeOutcome;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/system/token/create_token", post(create_token))
        .route("/system/token/revoke_tokens", post(revoke_tokens))
        .route(
            "/system/token/revoke_tokens_for_app",
            post(revoke_tokens_for_app),
        )
        .route(
            "/system/token/get_tokens_by_app_id",
            post(get_tokens_by_app_id),
        )
}

fn never_expires() -> i64 {
    NEVER_EXPIRES
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenBody {
    pub app_id: i32,
    /// Lifetime in milliseconds; `-1` (the default) never expires.
    #[serde(default = "never_expires")]
    pub expire_time: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevokeTokensBody {
    pub app_id: i32,
    #[serde(default)]
    pub tokens: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppIdRequest {
    pub app_id: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RevokeResponse {
    /// The application with its remaining tokens.
    pub application: ApplicationWithTokens,
    pub deleted: u64,
}

impl From<RevokeOutcome> for RevokeResponse {
    fn from(outcome: RevokeOutcome) -> Self {
        Self {
            application: outcome.app,
            deleted: outcome.deleted,
        }
    }
}

#[utoipa::path(
    post,
    path = "/system/token/create_token",
    request_body = CreateTokenBody,
    responses(
        (status = 200, description = "The application with every token, the new one included", body = ApplicationWithTokens),
        (status = 400, description = "Expire time below -1", body = crate::error::ErrorBody),
        (status = 404, description = "Application, group or domain not found", body = crate::error::ErrorBody),
    ),
    tag = "token"
)]
async fn create_token(
    State(state): State<AppState>,
    body: Result<Json<CreateTokenBody>, JsonRejection>,
) -> Result<Json<ApplicationWithTokens>, AppError> {
    let req = extract_json(body)?;
    Ok(Json(
        state
            .services
            .tokens
            .create(req.app_id, req.expire_time)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/system/token/revoke_tokens",
    request_body = RevokeTokensBody,
    responses(
        (status = 200, description = "Remaining tokens and deleted count", body = RevokeResponse),
        (status = 404, description = "Application not found", body = crate::error::ErrorBody),
    ),
    tag = "token"
)]
async fn revoke_tokens(
    State(state): State<AppState>,
    body: Result<Json<RevokeTokensBody>, JsonRejection>,
) -> Result<Json<RevokeResponse>, AppError> {
    let req = extract_json(body)?;
    let outcome = state
        .services
        .tokens
        .revoke(req.app_id, &req.tokens)
        .await?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    post,
    path = "/system/token/revoke_tokens_for_app",
    request_body = AppIdRequest,
    responses(
        (status = 200, description = "Application without tokens and deleted count", body = RevokeResponse),
        (status = 404, description = "Application not found", body = crate::error::ErrorBody),
    ),
    tag = "token"
)]
async fn revoke_tokens_for_app(
    State(state): State<AppState>,
    body: Result<Json<AppIdRequest>, JsonRejection>,
) -> Result<Json<RevokeResponse>, AppError> {
    let req = extract_json(body)?;
    let outcome = state.services.tokens.revoke_by_app_id(req.app_id).await?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    post,
    path = "/system/token/get_tokens_by_app_id",
    request_body = AppIdRequest,
    responses(
        (status = 200, description = "Tokens of the application, newest first", body = Vec<Token>),
        (status = 404, description = "Application not found", body = crate::error::ErrorBody),
    ),
    tag = "token"
)]
async fn get_tokens_by_app_id(
    State(state): State<AppState>,
    body: Result<Json<AppIdRequest>, JsonRejection>,
) -> Result<Json<Vec<Token>>, AppError> {
    let req = extract_json(body)?;
    Ok(Json(
        state.services.tokens.get_by_app_id(req.app_id).await?,
    ))
}
