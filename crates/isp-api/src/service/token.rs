//! Token service: mint, revoke and list the bearer tokens of an application.

use std::sync::Arc;

use chrono::Utc;
use isp_core::{ApplicationWithTokens, SystemError, Token, TokenSource, NEVER_EXPIRES};

use super::application::ApplicationService;
use crate::repository::{
    AppGroupRepository, ApplicationRepository, DomainRepository, RepoResult, Repositories,
    TokenCreateWork, TokenRepository, TokenRevokeWork, TransactionManager,
};

/// Attempts at generate + insert before a `TokenDuplicate` is returned.
const GENERATE_ATTEMPTS: usize = 3;

/// Result of a revocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokeOutcome {
    /// The application with its remaining tokens.
    pub app: ApplicationWithTokens,
    pub deleted: u64,
}

#[derive(Clone)]
pub struct TokenService {
    applications: Arc<dyn ApplicationRepository>,
    groups: Arc<dyn AppGroupRepository>,
    domains: Arc<dyn DomainRepository>,
    tokens: Arc<dyn TokenRepository>,
    tx: Arc<dyn TransactionManager>,
    source: Arc<dyn TokenSource>,
    enrich: ApplicationService,
}

impl TokenService {
    pub fn new(repos: &Repositories, source: Arc<dyn TokenSource>) -> Self {
        Self {
            applications: repos.applications.clone(),
            groups: repos.app_groups.clone(),
            domains: repos.domains.clone(),
            tokens: repos.tokens.clone(),
            tx: repos.tx.clone(),
            source,
            enrich: ApplicationService::new(repos),
        }
    }

    /// Issue a fresh token for `app_id` living `expire_time_ms` milliseconds
    /// (`-1` never expires). Returns the application with all its tokens.
    pub async fn create(&self, app_id: i32, expire_time_ms: i64) -> RepoResult<ApplicationWithTokens> {
        if expire_time_ms < NEVER_EXPIRES {
            return Err(SystemError::InvalidArgument(format!(
                "expire time must be -1 or non-negative, got {expire_time_ms}"
            )));
        }
        let app = self.applications.get_by_id(app_id).await?;
        let group = self.groups.get_by_id(app.application_group_id).await?;
        self.domains.get_by_id(group.domain_id).await?;

        let mut attempt = 1;
        loop {
            let token = Token {
                token: self.source.generate(),
                app_id,
                expire_time: expire_time_ms,
                created_at: Utc::now(),
            };
            let work = TokenCreateWork::new(move |tx| Box::pin(async move { tx.save(&token).await }));
            match self.tx.token_create_tx(work).await {
                Ok(()) => break,
                Err(SystemError::TokenDuplicate) if attempt < GENERATE_ATTEMPTS => {
                    tracing::warn!(app_id, attempt, "generated token collided, regenerating");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
        tracing::info!(app_id, expire_time_ms, "token issued");
        self.enrich.get_by_id(app_id).await
    }

    /// Delete the listed tokens of `app_id`. Unknown tokens, and tokens of
    /// other applications, count for nothing.
    pub async fn revoke(&self, app_id: i32, tokens: &[String]) -> RepoResult<RevokeOutcome> {
        self.applications.get_by_id(app_id).await?;
        let deleted = if tokens.is_empty() {
            0
        } else {
            let owned = tokens.to_vec();
            let work = TokenRevokeWork::new(move |tx| {
                Box::pin(async move { tx.delete_by_app_id_and_tokens(app_id, &owned).await })
            });
            self.tx.token_revoke_tx(work).await?
        };
        tracing::info!(app_id, requested = tokens.len(), deleted, "tokens revoked");
        Ok(RevokeOutcome {
            app: self.enrich.get_by_id(app_id).await?,
            deleted,
        })
    }

    pub async fn revoke_by_app_id(&self, app_id: i32) -> RepoResult<RevokeOutcome> {
        self.applications.get_by_id(app_id).await?;
        let tokens: Vec<String> = self
            .tokens
            .get_by_app_id(app_id)
            .await?
            .into_iter()
            .map(|t| t.token)
            .collect();
        self.revoke(app_id, &tokens).await
    }

    pub async fn get_by_app_id(&self, app_id: i32) -> RepoResult<Vec<Token>> {
        self.applications.get_by_id(app_id).await?;
        self.tokens.get_by_app_id(app_id).await
    }
}
