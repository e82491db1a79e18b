//! Authenticate / Authorize, the path peer services call on every request.
//!
//! Unknown and expired tokens, and missing ACL rows, are answers rather than
//! errors. Only storage failures propagate.

use std::sync::Arc;

use chrono::Utc;
use isp_core::{AuthDecision, SystemError};

use crate::repository::{AccessListRepository, RepoResult, TokenRepository};

#[derive(Clone)]
pub struct SecureService {
    tokens: Arc<dyn TokenRepository>,
    access_lists: Arc<dyn AccessListRepository>,
}

impl SecureService {
    pub fn new(
        tokens: Arc<dyn TokenRepository>,
        access_lists: Arc<dyn AccessListRepository>,
    ) -> Self {
        Self {
            tokens,
            access_lists,
        }
    }

    pub async fn authenticate(&self, token: &str) -> RepoResult<AuthDecision> {
        let lookup = self.tokens.select_auth_data_by_token(token).await;
        let decision = AuthDecision::evaluate(lookup, Utc::now())?;
        if let Some(reason) = decision.error_reason() {
            tracing::debug!(reason = %reason, "token rejected");
        }
        Ok(decision)
    }

    /// Exact-match ACL lookup; an absent row denies.
    pub async fn authorize(&self, app_id: i32, endpoint: &str) -> RepoResult<bool> {
        match self
            .access_lists
            .get_by_app_id_and_method(app_id, endpoint)
            .await
        {
            Ok(row) => Ok(row.value),
            Err(SystemError::AccessListNotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }
}
