//! # Route Modules
//!
//! Each module defines an Axum Router for one surface under `/system`.
//! Every endpoint is `POST` with one JSON body in and one JSON body out.
//! Handlers hold no business logic; they decode, call a service, encode.

pub mod access_list;
pub mod app_group;
pub mod application;
pub mod domain;
pub mod secure;
pub mod token;

use axum::Router;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::AppState;

/// Every `/system` router merged.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(secure::router())
        .merge(access_list::router())
        .merge(domain::router())
        .merge(application::router())
        .merge(token::router())
        .merge(app_group::router())
}

// -- Shared request / response shapes ------------------------------------------

/// Single identifier.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdRequest {
    pub id: i32,
}

/// Identifier list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdListRequest {
    #[serde(default)]
    pub id_list: Vec<i32>,
}

/// Rows affected by a write.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub count: u64,
}
