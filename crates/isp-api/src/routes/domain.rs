//! # Domain Routes
//!
//! - `POST /system/domain/get_domains_by_system_id`
//! - `POST /system/domain/create_update_domain`: `id == 0` creates
//! - `POST /system/domain/get_domain_by_id`
//! - `POST /system/domain/delete_domains`: cascades to everything below

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use isp_core::{Domain, DEFAULT_SYSTEM_ID};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CountResponse, IdListRequest, IdRequest};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, non_blank, Validate};
use crate::service::DomainWrite;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/system/domain/get_domains_by_system_id",
            post(get_domains_by_system_id),
        )
        .route("/system/domain/create_update_domain", post(create_update_domain))
        .route("/system/domain/get_domain_by_id", post(get_domain_by_id))
        .route("/system/domain/delete_domains", post(delete_domains))
}

fn default_system_id() -> i32 {
    DEFAULT_SYSTEM_ID
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemIdRequest {
    #[serde(default = "default_system_id")]
    pub system_id: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainBody {
    #[serde(default)]
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_system_id")]
    pub system_id: i32,
}

impl Validate for DomainBody {
    fn validate(&self) -> Result<(), String> {
        non_blank(&self.name, "name")
    }
}

#[utoipa::path(
    post,
    path = "/system/domain/get_domains_by_system_id",
    request_body = SystemIdRequest,
    responses(
        (status = 200, description = "Domains of the system, newest first", body = Vec<Domain>),
    ),
    tag = "domain"
)]
async fn get_domains_by_system_id(
    State(state): State<AppState>,
    body: Result<Json<SystemIdRequest>, JsonRejection>,
) -> Result<Json<Vec<Domain>>, AppError> {
    let req = extract_json(body)?;
    Ok(Json(
        state.services.domains.get_by_system_id(req.system_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/system/domain/create_update_domain",
    request_body = DomainBody,
    responses(
        (status = 200, description = "Created or renamed domain", body = Domain),
        (status = 404, description = "Domain or system not found", body = crate::error::ErrorBody),
        (status = 409, description = "Name taken in the system", body = crate::error::ErrorBody),
    ),
    tag = "domain"
)]
async fn create_update_domain(
    State(state): State<AppState>,
    body: Result<Json<DomainBody>, JsonRejection>,
) -> Result<Json<Domain>, AppError> {
    let req = extract_validated_json(body)?;
    let domain = state
        .services
        .domains
        .create_update(DomainWrite {
            id: req.id,
            name: req.name,
            description: req.description,
            system_id: req.system_id,
        })
        .await?;
    Ok(Json(domain))
}

#[utoipa::path(
    post,
    path = "/system/domain/get_domain_by_id",
    request_body = IdRequest,
    responses(
        (status = 200, description = "The domain", body = Domain),
        (status = 404, description = "Domain not found", body = crate::error::ErrorBody),
    ),
    tag = "domain"
)]
async fn get_domain_by_id(
    State(state): State<AppState>,
    body: Result<Json<IdRequest>, JsonRejection>,
) -> Result<Json<Domain>, AppError> {
    let req = extract_json(body)?;
    Ok(Json(state.services.domains.get_by_id(req.id).await?))
}

#[utoipa::path(
    post,
    path = "/system/domain/delete_domains",
    request_body = IdListRequest,
    responses(
        (status = 200, description = "Domains deleted", body = CountResponse),
        (status = 400, description = "Empty id list", body = crate::error::ErrorBody),
    ),
    tag = "domain"
)]
async fn delete_domains(
    State(state): State<AppState>,
    body: Result<Json<IdListRequest>, JsonRejection>,
) -> Result<Json<CountResponse>, AppError> {
    let req = extract_json(body)?;
    let count = state.services.domains.delete(&req.id_list).await?;
    Ok(Json(CountResponse { count }))
}
