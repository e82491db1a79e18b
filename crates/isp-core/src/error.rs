//! # Error Taxonomy
//!
//! Every layer of the service reports failures through [`SystemError`].
//! Persistence adapters translate driver errors into these kinds (unique
//! violations become `*DuplicateName` / `ApplicationDuplicateId`, foreign-key
//! violations become the parent's `*NotFound`, empty results become the
//! entity's `*NotFound`). Anything that does not fit a kind is carried
//! verbatim in [`SystemError::Internal`].

use thiserror::Error;

/// Failure kinds shared by repositories, services and the HTTP layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SystemError {
    /// The referenced system does not exist.
    #[error("system not found")]
    SystemNotFound,

    /// No domain matches the request.
    #[error("domain not found")]
    DomainNotFound,

    /// A domain with the same name already exists in the system.
    #[error("domain with the same name already exists")]
    DomainDuplicateName,

    /// No application group matches the request.
    #[error("application group not found")]
    AppGroupNotFound,

    /// An application group with the same name already exists in the domain.
    #[error("application group with the same name already exists")]
    AppGroupDuplicateName,

    /// No application matches the request.
    #[error("application not found")]
    ApplicationNotFound,

    /// An application with the same name already exists in the group.
    #[error("application with the same name already exists")]
    ApplicationDuplicateName,

    /// An application with the same identifier already exists.
    #[error("application with the same id already exists")]
    ApplicationDuplicateId,

    /// The token string is unknown.
    #[error("token not found")]
    TokenNotFound,

    /// The token exists but its lifetime has elapsed.
    #[error("token is expired")]
    TokenExpired,

    /// The generated token collided with a stored one; regenerate and retry.
    #[error("token already exists")]
    TokenDuplicate,

    /// No access-list row matches `(app_id, method)`.
    #[error("access list not found")]
    AccessListNotFound,

    /// The request is malformed (empty identifier list, bad value).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Any other failure, typically from the storage driver.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SystemError {
    /// Machine-readable reason code carried in error response bodies.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::SystemNotFound => "SYSTEM_NOT_FOUND",
            Self::DomainNotFound => "DOMAIN_NOT_FOUND",
            Self::DomainDuplicateName => "DOMAIN_DUPLICATE_NAME",
            Self::AppGroupNotFound => "APP_GROUP_NOT_FOUND",
            Self::AppGroupDuplicateName => "APP_GROUP_DUPLICATE_NAME",
            Self::ApplicationNotFound => "APPLICATION_NOT_FOUND",
            Self::ApplicationDuplicateName => "APPLICATION_DUPLICATE_NAME",
            Self::ApplicationDuplicateId => "APPLICATION_DUPLICATE_ID",
            Self::TokenNotFound => "TOKEN_NOT_FOUND",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenDuplicate => "TOKEN_DUPLICATE",
            Self::AccessListNotFound => "ACCESS_LIST_NOT_FOUND",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether this is one of the `*NotFound` kinds.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SystemNotFound
                | Self::DomainNotFound
                | Self::AppGroupNotFound
                | Self::ApplicationNotFound
                | Self::TokenNotFound
                | Self::AccessListNotFound
        )
    }

    /// Whether this is a uniqueness violation (name, id or token string).
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            Self::DomainDuplicateName
                | Self::AppGroupDuplicateName
                | Self::ApplicationDuplicateName
                | Self::ApplicationDuplicateId
                | Self::TokenDuplicate
        )
    }
}
