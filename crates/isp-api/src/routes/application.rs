//! # Application Routes
//!
//! Reads return applications with their tokens attached. `serviceId` is the
//! legacy name of the application group id and is accepted wherever
//! `applicationGroupId` is.
//!
//! | Path                                           | Operation              |
//! |------------------------------------------------|------------------------|
//! | `/system/application/get_applications`         | by id list             |
//! | `/system/application/get_applications_by_service_id` | by group        |
//! | `/system/application/create_update_application`| legacy create / rename |
//! | `/system/application/get_application_by_id`    | by id                  |
//! | `/system/application/get_application_by_token` | by bearer token        |
//! | `/system/application/delete_applications`      | delete, cascading      |
//! | `/system/application/get_system_tree`          | domains → groups → apps |
//! | `/system/application/next_id`                  | `MAX(id) + 1`          |
//! | `/system/application/get_all`                  | everything             |
//! | `/system/application/create_application`       | create with explicit id |
//! | `/system/application/update_application`       | rename / move id       |

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use isp_core::{ApplicationType, ApplicationWithTokens, DomainNode, DEFAULT_SYSTEM_ID};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CountResponse, IdListRequest, IdRequest};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, non_blank, Validate};
use crate::service::{ApplicationUpdate, ApplicationWrite};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/system/application/get_applications", post(get_applications))
        .route(
            "/system/application/get_applications_by_service_id",
            post(get_applications_by_service_id),
        )
        .route(
            "/system/application/create_update_application",
            post(create_update_application),
        )
        .route(
            "/system/application/get_application_by_id",
            post(get_application_by_id),
        )
        .route(
            "/system/application/get_application_by_token",
            post(get_application_by_token),
        )
        .route(
            "/system/application/delete_applications",
            post(delete_applications),
        )
        .route("/system/application/get_system_tree", post(get_system_tree))
        .route("/system/application/next_id", post(next_id))
        .route("/system/application/get_all", post(get_all))
        .route(
            "/system/application/create_application",
            post(create_application),
        )
        .route(
            "/system/application/update_application",
            post(update_application),
        )
}

// -- Request / response types ---------------------------------------------------

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceIdRequest {
    #[serde(alias = "applicationGroupId")]
    pub service_id: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub token: String,
}

fn default_system_id() -> i32 {
    DEFAULT_SYSTEM_ID
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemTreeRequest {
    #[serde(default = "default_system_id")]
    pub system_id: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NextIdResponse {
    pub id: i32,
}

/// Create (`id == 0` on the legacy endpoint) or rename.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationBody {
    #[serde(default)]
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "serviceId")]
    pub application_group_id: i32,
    #[serde(rename = "type")]
    pub app_type: ApplicationType,
}

impl Validate for ApplicationBody {
    fn validate(&self) -> Result<(), String> {
        non_blank(&self.name, "name")
    }
}

impl From<ApplicationBody> for ApplicationWrite {
    fn from(body: ApplicationBody) -> Self {
        Self {
            id: body.id,
            name: body.name,
            description: body.description,
            application_group_id: body.application_group_id,
            app_type: body.app_type,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplicationBody {
    pub old_id: i32,
    pub new_id: i32,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Validate for UpdateApplicationBody {
    fn validate(&self) -> Result<(), String> {
        non_blank(&self.name, "name")?;
        if self.new_id <= 0 {
            return Err("newId must be positive".to_string());
        }
        Ok(())
    }
}

// -- Handlers -------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/system/application/get_applications",
    request_body = IdListRequest,
    responses(
        (status = 200, description = "Matching applications", body = Vec<ApplicationWithTokens>),
    ),
    tag = "application"
)]
async fn get_applications(
    State(state): State<AppState>,
    body: Result<Json<IdListRequest>, JsonRejection>,
) -> Result<Json<Vec<ApplicationWithTokens>>, AppError> {
    let req = extract_json(body)?;
    Ok(Json(
        state
            .services
            .applications
            .get_by_id_list(&req.id_list)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/system/application/get_applications_by_service_id",
    request_body = ServiceIdRequest,
    responses(
        (status = 200, description = "Applications of the group", body = Vec<ApplicationWithTokens>),
    ),
    tag = "application"
)]
async fn get_applications_by_service_id(
    State(state): State<AppState>,
    body: Result<Json<ServiceIdRequest>, JsonRejection>,
) -> Result<Json<Vec<ApplicationWithTokens>>, AppError> {
    let req = extract_json(body)?;
    Ok(Json(
        state
            .services
            .applications
            .get_by_service_id(req.service_id)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/system/application/create_update_application",
    request_body = ApplicationBody,
    responses(
        (status = 200, description = "Created or renamed application", body = ApplicationWithTokens),
        (status = 404, description = "Application or group not found", body = crate::error::ErrorBody),
        (status = 409, description = "Name taken in the group", body = crate::error::ErrorBody),
    ),
    tag = "application"
)]
async fn create_update_application(
    State(state): State<AppState>,
    body: Result<Json<ApplicationBody>, JsonRejection>,
) -> Result<Json<ApplicationWithTokens>, AppError> {
    let req = extract_validated_json(body)?;
    Ok(Json(
        state
            .services
            .applications
            .create_update(req.into())
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/system/application/get_application_by_id",
    request_body = IdRequest,
    responses(
        (status = 200, description = "The application", body = ApplicationWithTokens),
        (status = 404, description = "Application not found", body = crate::error::ErrorBody),
    ),
    tag = "application"
)]
async fn get_application_by_id(
    State(state): State<AppState>,
    body: Result<Json<IdRequest>, JsonRejection>,
) -> Result<Json<ApplicationWithTokens>, AppError> {
    let req = extract_json(body)?;
    Ok(Json(state.services.applications.get_by_id(req.id).await?))
}

#[utoipa::path(
    post,
    path = "/system/application/get_application_by_token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "The application owning the token", body = ApplicationWithTokens),
        (status = 404, description = "Token not found", body = crate::error::ErrorBody),
    ),
    tag = "application"
)]
async fn get_application_by_token(
    State(state): State<AppState>,
    body: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<ApplicationWithTokens>, AppError> {
    let req = extract_json(body)?;
    Ok(Json(
        state
            .services
            .applications
            .get_by_token(&req.token)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/system/application/delete_applications",
    request_body = IdListRequest,
    responses(
        (status = 200, description = "Applications deleted", body = CountResponse),
        (status = 400, description = "Empty id list", body = crate::error::ErrorBody),
    ),
    tag = "application"
)]
async fn delete_applications(
    State(state): State<AppState>,
    body: Result<Json<IdListRequest>, JsonRejection>,
) -> Result<Json<CountResponse>, AppError> {
    let req = extract_json(body)?;
    let count = state.services.applications.delete(&req.id_list).await?;
    Ok(Json(CountResponse { count }))
}

#[utoipa::path(
    post,
    path = "/system/application/get_system_tree",
    request_body = SystemTreeRequest,
    responses(
        (status = 200, description = "Domains with their groups (`services`) and applications", body = Vec<DomainNode>),
    ),
    tag = "application"
)]
async fn get_system_tree(
    State(state): State<AppState>,
    body: Result<Json<SystemTreeRequest>, JsonRejection>,
) -> Result<Json<Vec<DomainNode>>, AppError> {
    let req = extract_json(body)?;
    Ok(Json(
        state
            .services
            .applications
            .system_tree(req.system_id)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/system/application/next_id",
    responses(
        (status = 200, description = "Next free application id", body = NextIdResponse),
    ),
    tag = "application"
)]
async fn next_id(State(state): State<AppState>) -> Result<Json<NextIdResponse>, AppError> {
    let id = state.services.applications.next_id().await?;
    Ok(Json(NextIdResponse { id }))
}

#[utoipa::path(
    post,
    path = "/system/application/get_all",
    responses(
        (status = 200, description = "Every application", body = Vec<ApplicationWithTokens>),
    ),
    tag = "application"
)]
async fn get_all(
    State(state): State<AppState>,
) -> Result<Json<Vec<ApplicationWithTokens>>, AppError> {
    Ok(Json(state.services.applications.get_all().await?))
}

#[utoipa::path(
    post,
    path = "/system/application/create_application",
    request_body = ApplicationBody,
    responses(
        (status = 200, description = "Created application, no tokens yet", body = ApplicationWithTokens),
        (status = 404, description = "Group not found", body = crate::error::ErrorBody),
        (status = 409, description = "Id or name taken", body = crate::error::ErrorBody),
    ),
    tag = "application"
)]
async fn create_application(
    State(state): State<AppState>,
    body: Result<Json<ApplicationBody>, JsonRejection>,
) -> Result<Json<ApplicationWithTokens>, AppError> {
    let req = extract_validated_json(body)?;
    Ok(Json(state.services.applications.create(req.into()).await?))
}

#[utoipa::path(
    post,
    path = "/system/application/update_application",
    request_body = UpdateApplicationBody,
    responses(
        (status = 200, description = "Updated application", body = ApplicationWithTokens),
        (status = 404, description = "Application not found", body = crate::error::ErrorBody),
        (status = 409, description = "Id or name taken", body = crate::error::ErrorBody),
    ),
    tag = "application"
)]
async fn update_application(
    State(state): State<AppState>,
    body: Result<Json<UpdateApplicationBody>, JsonRejection>,
) -> Result<Json<ApplicationWithTokens>, AppError> {
    let req = extract_validated_json(body)?;
    let app = state
        .services
        .applications
        .update(ApplicationUpdate {
            old_id: req.old_id,
            new_id: req.new_id,
            name: req.name,
            description: req.description,
        })
        .await?;
    Ok(Json(app))
}
