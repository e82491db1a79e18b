//! # Authentication Projection
//!
//! [`AuthData`] is the flattened identity a token resolves to: one row of the
//! Token ⋈ Application ⋈ AppGroup ⋈ Domain join. [`AuthDecision::evaluate`]
//! turns the outcome of that lookup into the answer given to peer services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SystemError;
use crate::model::lifetime_elapsed;

/// Identity context carried by a token, fetched in a single round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    /// Application the token is bound to.
    pub app_id: i32,
    /// Name of that application.
    pub app_name: String,
    /// Application group of the application.
    pub application_group_id: i32,
    /// Domain of the application group.
    pub domain_id: i32,
    /// System of the domain.
    pub system_id: i32,
    /// Token lifetime in milliseconds, `-1` for never.
    pub expire_time: i64,
    /// Token issue time.
    pub created_at: DateTime<Utc>,
}

impl AuthData {
    /// Whether the underlying token has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        lifetime_elapsed(self.created_at, self.expire_time, now)
    }
}

/// Outcome of authenticating a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// The token is known and live.
    Authenticated(AuthData),
    /// The token string is unknown.
    TokenNotFound,
    /// The token is known but expired.
    TokenExpired,
}

impl AuthDecision {
    /// Classify a token lookup.
    ///
    /// `TokenNotFound` from storage is a negative answer, not a failure; any
    /// other error is passed through to the caller.
    pub fn evaluate(
        lookup: Result<AuthData, SystemError>,
        now: DateTime<Utc>,
    ) -> Result<Self, SystemError> {
        match lookup {
            Ok(data) if data.is_expired_at(now) => Ok(Self::TokenExpired),
            Ok(data) => Ok(Self::Authenticated(data)),
            Err(SystemError::TokenNotFound) => Ok(Self::TokenNotFound),
            Err(err) => Err(err),
        }
    }

    /// Error reason reported for a rejected token.
    pub fn error_reason(&self) -> Option<String> {
        match self {
            Self::Authenticated(_) => None,
            Self::TokenNotFound => Some(SystemError::TokenNotFound.to_string()),
            Self::TokenExpired => Some(SystemError::TokenExpired.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn data(expire_time: i64, created_at: DateTime<Utc>) -> AuthData {
        AuthData {
            app_id: 7,
            app_name: "a".to_string(),
            application_group_id: 5,
            domain_id: 3,
            system_id: 1,
            expire_time,
            created_at,
        }
    }

    #[test]
    fn live_token_is_authenticated() {
        let now = Utc::now();
        let decision = AuthDecision::evaluate(Ok(data(-1, now)), now).unwrap();
        assert_eq!(decision, AuthDecision::Authenticated(data(-1, now)));
        assert_eq!(decision.error_reason(), None);
    }

    #[test]
    fn elapsed_token_is_expired() {
        let now = Utc::now();
        let created = now - Duration::milliseconds(1);
        let decision = AuthDecision::evaluate(Ok(data(0, created)), now).unwrap();
        assert_eq!(decision, AuthDecision::TokenExpired);
        assert_eq!(decision.error_reason().as_deref(), Some("token is expired"));
    }

    #[test]
    fn missing_token_is_a_negative_answer() {
        let decision =
            AuthDecision::evaluate(Err(SystemError::TokenNotFound), Utc::now()).unwrap();
        assert_eq!(decision, AuthDecision::TokenNotFound);
        assert_eq!(decision.error_reason().as_deref(), Some("token not found"));
    }

    #[test]
    fn storage_failure_is_propagated() {
        let err = AuthDecision::evaluate(
            Err(SystemError::Internal("pool timed out".into())),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, SystemError::Internal("pool timed out".into()));
    }
}
