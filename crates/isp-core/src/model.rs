//! # Identity, Token and Access-List Records
//!
//! The persisted relations of the service. A single implicit System (id
//! [`DEFAULT_SYSTEM_ID`]) owns Domains; Domains own AppGroups; AppGroups own
//! Applications; Applications own Tokens and AccessList rows. Deleting a
//! parent cascades to its children in storage.
//!
//! ## Uniqueness
//!
//! | Record      | Unique by                             |
//! |-------------|---------------------------------------|
//! | Domain      | `(name, system_id)`                   |
//! | AppGroup    | `(name, domain_id)`                   |
//! | Application | `id`, `(name, application_group_id)`  |
//! | Token       | `token`                               |
//! | AccessList  | `(app_id, method)`                    |

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SystemError;

/// The only system in current deployments.
pub const DEFAULT_SYSTEM_ID: i32 = 1;

/// Domain assumed for AppGroup writes that do not name one.
pub const DEFAULT_DOMAIN_ID: i32 = 1;

/// `expire_time` sentinel for tokens that never expire.
pub const NEVER_EXPIRES: i64 = -1;

/// Grouping of application groups under a system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    /// Storage-assigned identifier.
    pub id: i32,
    /// Name, unique within the system.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Owning system.
    pub system_id: i32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Grouping of applications under a domain ("service" in legacy naming).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AppGroup {
    /// Storage-assigned identifier.
    pub id: i32,
    /// Name, unique within the domain.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Owning domain.
    pub domain_id: i32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Kind of client an application represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationType {
    /// Backend service or administrative client.
    System,
    /// Mobile client.
    Mobile,
}

impl ApplicationType {
    /// Return the string stored in the `type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "SYSTEM",
            Self::Mobile => "MOBILE",
        }
    }
}

impl fmt::Display for ApplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationType {
    type Err = SystemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SYSTEM" => Ok(Self::System),
            "MOBILE" => Ok(Self::Mobile),
            other => Err(SystemError::InvalidArgument(format!(
                "unknown application type {other:?}"
            ))),
        }
    }
}

/// The authenticated principal: owns tokens and access-list rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Application {
    /// Caller-supplied identifier (see `NextId`).
    pub id: i32,
    /// Name, unique within the application group.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Owning application group.
    #[serde(alias = "serviceId")]
    pub application_group_id: i32,
    /// Client kind.
    #[serde(rename = "type")]
    pub app_type: ApplicationType,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for an application; the identifier is chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    /// Identifier to insert under.
    pub id: i32,
    /// Application name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Owning application group.
    pub application_group_id: i32,
    /// Client kind.
    pub app_type: ApplicationType,
}

/// Opaque bearer token bound to one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// The bearer string itself; globally unique.
    pub token: String,
    /// Owning application.
    pub app_id: i32,
    /// Lifetime in milliseconds from `created_at`; [`NEVER_EXPIRES`] for none.
    pub expire_time: i64,
    /// Issue time.
    pub created_at: DateTime<Utc>,
}

impl Token {
    /// Whether the token has outlived its lifetime at `now`.
    ///
    /// A token expires strictly after `created_at + expire_time`; the boundary
    /// instant is still valid.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        lifetime_elapsed(self.created_at, self.expire_time, now)
    }
}

/// Shared lifetime arithmetic for tokens and the authentication projection.
pub(crate) fn lifetime_elapsed(
    created_at: DateTime<Utc>,
    expire_time_ms: i64,
    now: DateTime<Utc>,
) -> bool {
    if expire_time_ms == NEVER_EXPIRES {
        return false;
    }
    created_at
        .timestamp_millis()
        .saturating_add(expire_time_ms)
        < now.timestamp_millis()
}

/// Per-application permit or deny for one exact endpoint string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AccessList {
    /// Owning application.
    pub app_id: i32,
    /// Endpoint path, compared by exact equality.
    pub method: String,
    /// Whether the call is permitted.
    pub value: bool,
}
