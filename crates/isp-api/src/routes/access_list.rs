//! # Access-List Routes
//!
//! - `POST /system/access_list/get_by_id`: rows of one application
//! - `POST /system/access_list/set_one`: upsert one row
//! - `POST /system/access_list/set_list`: bulk set, optionally replacing
//! - `POST /system/access_list/delete_list`: delete rows by method

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use isp_core::AccessList;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CountResponse, IdRequest};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, non_blank, Validate};
use crate::service::{MethodValue, SetListRequest};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/system/access_list/get_by_id", post(get_by_id))
        .route("/system/access_list/set_one", post(set_one))
        .route("/system/access_list/set_list", post(set_list))
        .route("/system/access_list/delete_list", post(delete_list))
}

/// One `(method, value)` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MethodEntry {
    pub method: String,
    pub value: bool,
}

impl From<AccessList> for MethodEntry {
    fn from(row: AccessList) -> Self {
        Self {
            method: row.method,
            value: row.value,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetOneBody {
    pub app_id: i32,
    pub method: String,
    pub value: bool,
}

impl Validate for SetOneBody {
    fn validate(&self) -> Result<(), String> {
        non_blank(&self.method, "method")
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetListBody {
    pub app_id: i32,
    #[serde(default)]
    pub remove_old: bool,
    #[serde(default)]
    pub methods: Vec<MethodEntry>,
}

impl Validate for SetListBody {
    fn validate(&self) -> Result<(), String> {
        for entry in &self.methods {
            non_blank(&entry.method, "method")?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteListBody {
    pub app_id: i32,
    #[serde(default)]
    pub methods: Vec<String>,
}

#[utoipa::path(
    post,
    path = "/system/access_list/get_by_id",
    request_body = IdRequest,
    responses(
        (status = 200, description = "Rows of the application, ordered by method", body = Vec<MethodEntry>),
        (status = 404, description = "Application not found", body = crate::error::ErrorBody),
    ),
    tag = "access-list"
)]
async fn get_by_id(
    State(state): State<AppState>,
    body: Result<Json<IdRequest>, JsonRejection>,
) -> Result<Json<Vec<MethodEntry>>, AppError> {
    let req = extract_json(body)?;
    let rows = state.services.access_lists.get_by_id(req.id).await?;
    Ok(Json(rows.into_iter().map(MethodEntry::from).collect()))
}

#[utoipa::path(
    post,
    path = "/system/access_list/set_one",
    request_body = SetOneBody,
    responses(
        (status = 200, description = "Rows affected", body = CountResponse),
        (status = 404, description = "Application not found", body = crate::error::ErrorBody),
    ),
    tag = "access-list"
)]
async fn set_one(
    State(state): State<AppState>,
    body: Result<Json<SetOneBody>, JsonRejection>,
) -> Result<Json<CountResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let count = state
        .services
        .access_lists
        .set_one(AccessList {
            app_id: req.app_id,
            method: req.method,
            value: req.value,
        })
        .await?;
    Ok(Json(CountResponse { count }))
}

#[utoipa::path(
    post,
    path = "/system/access_list/set_list",
    request_body = SetListBody,
    responses(
        (status = 200, description = "Every row of the application after the write", body = Vec<MethodEntry>),
        (status = 404, description = "Application not found", body = crate::error::ErrorBody),
    ),
    tag = "access-list"
)]
async fn set_list(
    State(state): State<AppState>,
    body: Result<Json<SetListBody>, JsonRejection>,
) -> Result<Json<Vec<MethodEntry>>, AppError> {
    let req = extract_validated_json(body)?;
    let rows = state
        .services
        .access_lists
        .set_list(SetListRequest {
            app_id: req.app_id,
            remove_old: req.remove_old,
            methods: req
                .methods
                .into_iter()
                .map(|m| MethodValue {
                    method: m.method,
                    value: m.value,
                })
                .collect(),
        })
        .await?;
    Ok(Json(rows.into_iter().map(MethodEntry::from).collect()))
}

#[utoipa::path(
    post,
    path = "/system/access_list/delete_list",
    request_body = DeleteListBody,
    responses(
        (status = 200, description = "Rows deleted", body = CountResponse),
        (status = 404, description = "Application not found", body = crate::error::ErrorBody),
    ),
    tag = "access-list"
)]
async fn delete_list(
    State(state): State<AppState>,
    body: Result<Json<DeleteListBody>, JsonRejection>,
) -> Result<Json<CountResponse>, AppError> {
    let req = extract_json(body)?;
    let count = state
        .services
        .access_lists
        .delete_list(req.app_id, &req.methods)
        .await?;
    Ok(Json(CountResponse { count }))
}
