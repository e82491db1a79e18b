//! # Application Group Routes
//!
//! - `POST /system/application_group/create`
//! - `POST /system/application_group/update`
//! - `POST /system/application_group/delete_list`
//! - `POST /system/application_group/get_by_id_list`
//! - `POST /system/application_group/get_all`
//!
//! `domainId` is optional on writes and defaults to domain 1.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use isp_core::AppGroup;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CountResponse, IdListRequest};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, non_blank, Validate};
use crate::service::AppGroupWrite;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/system/application_group/create", post(create))
        .route("/system/application_group/update", post(update))
        .route("/system/application_group/delete_list", post(delete_list))
        .route(
            "/system/application_group/get_by_id_list",
            post(get_by_id_list),
        )
        .route("/system/application_group/get_all", post(get_all))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppGroupBody {
    /// Ignored by `create`; required by `update`.
    #[serde(default)]
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub domain_id: Option<i32>,
}

impl Validate for AppGroupBody {
    fn validate(&self) -> Result<(), String> {
        non_blank(&self.name, "name")
    }
}

impl From<AppGroupBody> for AppGroupWrite {
    fn from(body: AppGroupBody) -> Self {
        Self {
            id: body.id,
            name: body.name,
            description: body.description,
            domain_id: body.domain_id,
        }
    }
}

#[utoipa::path(
    post,
    path = "/system/application_group/create",
    request_body = AppGroupBody,
    responses(
        (status = 200, description = "Created group", body = AppGroup),
        (status = 404, description = "Domain not found", body = crate::error::ErrorBody),
        (status = 409, description = "Name taken in the domain", body = crate::error::ErrorBody),
    ),
    tag = "application-group"
)]
async fn create(
    State(state): State<AppState>,
    body: Result<Json<AppGroupBody>, JsonRejection>,
) -> Result<Json<AppGroup>, AppError> {
    let req = extract_validated_json(body)?;
    Ok(Json(state.services.app_groups.create(req.into()).await?))
}

#[utoipa::path(
    post,
    path = "/system/application_group/update",
    request_body = AppGroupBody,
    responses(
        (status = 200, description = "Renamed group", body = AppGroup),
        (status = 400, description = "Missing id", body = crate::error::ErrorBody),
        (status = 404, description = "Group not found", body = crate::error::ErrorBody),
        (status = 409, description = "Name taken in the domain", body = crate::error::ErrorBody),
    ),
    tag = "application-group"
)]
async fn update(
    State(state): State<AppState>,
    body: Result<Json<AppGroupBody>, JsonRejection>,
) -> Result<Json<AppGroup>, AppError> {
    let req = extract_validated_json(body)?;
    Ok(Json(state.services.app_groups.update(req.into()).await?))
}

#[utoipa::path(
    post,
    path = "/system/application_group/delete_list",
    request_body = IdListRequest,
    responses(
        (status = 200, description = "Groups deleted", body = CountResponse),
        (status = 400, description = "Empty id list", body = crate::error::ErrorBody),
    ),
    tag = "application-group"
)]
async fn delete_list(
    State(state): State<AppState>,
    body: Result<Json<IdListRequest>, JsonRejection>,
) -> Result<Json<CountResponse>, AppError> {
    let req = extract_json(body)?;
    let count = state.services.app_groups.delete_list(&req.id_list).await?;
    Ok(Json(CountResponse { count }))
}

#[utoipa::path(
    post,
    path = "/system/application_group/get_by_id_list",
    request_body = IdListRequest,
    responses(
        (status = 200, description = "Matching groups", body = Vec<AppGroup>),
    ),
    tag = "application-group"
)]
async fn get_by_id_list(
    State(state): State<AppState>,
    body: Result<Json<IdListRequest>, JsonRejection>,
) -> Result<Json<Vec<AppGroup>>, AppError> {
    let req = extract_json(body)?;
    Ok(Json(
        state.services.app_groups.get_by_id_list(&req.id_list).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/system/application_group/get_all",
    responses(
        (status = 200, description = "Every group", body = Vec<AppGroup>),
    ),
    tag = "application-group"
)]
async fn get_all(State(state): State<AppState>) -> Result<Json<Vec<AppGroup>>, AppError> {
    Ok(Json(state.services.app_groups.get_all().await?))
}
