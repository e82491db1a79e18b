//! # Repository Ports
//!
//! Storage-agnostic interfaces over the five relations. The Postgres adapter
//! lives in [`crate::db`], the in-memory adapter in [`crate::memory`]; both
//! translate their native failures into [`SystemError`] so services never see
//! driver types.
//!
//! Every method is a single statement against the shared handle. Multi-step
//! writes go through [`tx::TransactionManager`] instead.

pub mod tx;

use std::sync::Arc;

use async_trait::async_trait;
use isp_core::{AccessList, AppGroup, Application, AuthData, Domain, NewApplication, SystemError, Token};

pub use tx::{
    AccessListSetListTx, AccessListSetListWork, AccessListSetOneTx, AccessListSetOneWork,
    ApplicationDeleteTx, ApplicationDeleteWork, BaselineOutcome, BaselineTx, BaselineWork,
    TokenCreateTx, TokenCreateWork, TokenRevokeTx, TokenRevokeWork, TransactionManager, TxFuture,
    TxWork,
};

/// Result alias for repository calls.
pub type RepoResult<T> = Result<T, SystemError>;

#[async_trait]
pub trait DomainRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> RepoResult<Domain>;
    async fn get_by_id_list(&self, ids: &[i32]) -> RepoResult<Vec<Domain>>;
    async fn get_by_system_id(&self, system_id: i32) -> RepoResult<Vec<Domain>>;
    async fn get_by_name_and_system_id(&self, name: &str, system_id: i32) -> RepoResult<Domain>;
    async fn create(&self, name: &str, description: &str, system_id: i32) -> RepoResult<Domain>;
    async fn update(&self, id: i32, name: &str, description: &str) -> RepoResult<Domain>;
    async fn delete_by_id_list(&self, ids: &[i32]) -> RepoResult<u64>;
}

#[async_trait]
pub trait AppGroupRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> RepoResult<AppGroup>;
    async fn get_by_id_list(&self, ids: &[i32]) -> RepoResult<Vec<AppGroup>>;
    async fn get_by_domain_ids(&self, domain_ids: &[i32]) -> RepoResult<Vec<AppGroup>>;
    async fn get_all(&self) -> RepoResult<Vec<AppGroup>>;
    async fn get_by_name_and_domain_id(&self, name: &str, domain_id: i32) -> RepoResult<AppGroup>;
    async fn create(&self, name: &str, description: &str, domain_id: i32) -> RepoResult<AppGroup>;
    async fn update(&self, id: i32, name: &str, description: &str) -> RepoResult<AppGroup>;
    async fn delete_by_id_list(&self, ids: &[i32]) -> RepoResult<u64>;
}

#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> RepoResult<Application>;
    async fn get_by_id_list(&self, ids: &[i32]) -> RepoResult<Vec<Application>>;
    async fn get_by_app_group_ids(&self, group_ids: &[i32]) -> RepoResult<Vec<Application>>;
    async fn get_by_name_and_app_group_id(
        &self,
        name: &str,
        group_id: i32,
    ) -> RepoResult<Application>;
    async fn get_all(&self) -> RepoResult<Vec<Application>>;
    /// `COALESCE(MAX(id) + 1, 1)`; not a reservation.
    async fn next_id(&self) -> RepoResult<i32>;
    async fn create(&self, app: NewApplication) -> RepoResult<Application>;
    async fn update(&self, id: i32, name: &str, description: &str) -> RepoResult<Application>;
    /// Rewrite id and content in one statement; children follow by cascade.
    async fn update_with_new_id(
        &self,
        old_id: i32,
        new_id: i32,
        name: &str,
        description: &str,
    ) -> RepoResult<Application>;
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn get_by_token(&self, token: &str) -> RepoResult<Token>;
    async fn get_by_app_id(&self, app_id: i32) -> RepoResult<Vec<Token>>;
    async fn get_by_app_ids(&self, app_ids: &[i32]) -> RepoResult<Vec<Token>>;
    /// Token ⋈ Application ⋈ AppGroup ⋈ Domain in one round trip.
    async fn select_auth_data_by_token(&self, token: &str) -> RepoResult<AuthData>;
}

#[async_trait]
pub trait AccessListRepository: Send + Sync {
    async fn get_by_app_id(&self, app_id: i32) -> RepoResult<Vec<AccessList>>;
    async fn get_by_app_id_and_method(&self, app_id: i32, method: &str) -> RepoResult<AccessList>;
    async fn delete_by_app_id_and_methods(&self, app_id: i32, methods: &[String])
        -> RepoResult<u64>;
}

/// The full set of storage handles a service graph is built from.
#[derive(Clone)]
pub struct Repositories {
    pub domains: Arc<dyn DomainRepository>,
    pub app_groups: Arc<dyn AppGroupRepository>,
    pub applications: Arc<dyn ApplicationRepository>,
    pub tokens: Arc<dyn TokenRepository>,
    pub access_lists: Arc<dyn AccessListRepository>,
    pub tx: Arc<dyn TransactionManager>,
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}
