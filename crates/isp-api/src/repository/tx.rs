//! # Transaction Manager
//!
//! Multi-step writes run as a closure under one transaction. Each use case
//! gets its own narrowed capability trait, bound to the transactional
//! connection, exposing only the statements that use case issues:
//!
//! | Use case               | Capability              |
//! |------------------------|-------------------------|
//! | access list set one    | [`AccessListSetOneTx`]  |
//! | access list set list   | [`AccessListSetListTx`] |
//! | application delete     | [`ApplicationDeleteTx`] |
//! | token create           | [`TokenCreateTx`]       |
//! | token revoke           | [`TokenRevokeTx`]       |
//! | baseline provisioning  | [`BaselineTx`]          |
//!
//! The manager begins the transaction, hands the capability to the closure,
//! commits when the closure returns `Ok` and rolls back on `Err`. A dropped
//! future rolls back as well.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use isp_core::{AccessList, AppGroup, Application, Domain, NewApplication, SystemError, Token};

use super::RepoResult;

/// Boxed future returned by a transactional closure.
pub type TxFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T, SystemError>> + Send + 'c>>;

/// A closure to run against capability `C`, producing `T`.
///
/// ```ignore
/// let work = TokenCreateWork::new(move |tx| Box::pin(async move { tx.save(&token).await }));
/// manager.token_create_tx(work).await?;
/// ```
pub struct TxWork<C: ?Sized + 'static, T>(
    Box<dyn for<'c> FnOnce(&'c mut C) -> TxFuture<'c, T> + Send>,
);

impl<C: ?Sized + 'static, T> TxWork<C, T> {
    /// Wrap a closure. Captures must be owned.
    pub fn new<F>(f: F) -> Self
    where
        F: for<'c> FnOnce(&'c mut C) -> TxFuture<'c, T> + Send + 'static,
    {
        Self(Box::new(f))
    }

    /// Run the closure against a capability.
    pub fn run<'c>(self, conn: &'c mut C) -> TxFuture<'c, T> {
        (self.0)(conn)
    }
}

impl<C: ?Sized + 'static, T> std::fmt::Debug for TxWork<C, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TxWork")
    }
}

// ── Capabilities ────────────────────────────────────────────────────────────

#[async_trait]
pub trait AccessListSetOneTx: Send {
    /// `INSERT .. ON CONFLICT (app_id, method) DO UPDATE SET value = EXCLUDED.value`.
    async fn upsert(&mut self, row: &AccessList) -> RepoResult<u64>;
}

#[async_trait]
pub trait AccessListSetListTx: Send {
    async fn delete_by_app_id(&mut self, app_id: i32) -> RepoResult<u64>;
    async fn delete_by_app_id_and_methods(
        &mut self,
        app_id: i32,
        methods: &[String],
    ) -> RepoResult<u64>;
    async fn insert_all(&mut self, rows: &[AccessList]) -> RepoResult<u64>;
    async fn get_by_app_id(&mut self, app_id: i32) -> RepoResult<Vec<AccessList>>;
}

#[async_trait]
pub trait ApplicationDeleteTx: Send {
    async fn delete_by_id_list(&mut self, ids: &[i32]) -> RepoResult<u64>;
}

#[async_trait]
pub trait TokenCreateTx: Send {
    /// Insert; a colliding token string yields [`SystemError::TokenDuplicate`].
    async fn save(&mut self, token: &Token) -> RepoResult<()>;
}

#[async_trait]
pub trait TokenRevokeTx: Send {
    async fn delete_by_app_id_and_tokens(&mut self, app_id: i32, tokens: &[String])
        -> RepoResult<u64>;
}

#[async_trait]
pub trait BaselineTx: Send {
    /// `pg_try_advisory_xact_lock(key)`; released at commit or rollback.
    async fn try_lock(&mut self, key: i64) -> RepoResult<bool>;
    async fn get_token(&mut self, token: &str) -> RepoResult<Token>;
    async fn create_domain(
        &mut self,
        name: &str,
        description: &str,
        system_id: i32,
    ) -> RepoResult<Domain>;
    async fn create_app_group(
        &mut self,
        name: &str,
        description: &str,
        domain_id: i32,
    ) -> RepoResult<AppGroup>;
    async fn create_application(&mut self, app: NewApplication) -> RepoResult<Application>;
    async fn save_token(&mut self, token: &Token) -> RepoResult<()>;
    async fn upsert_access_list(&mut self, row: &AccessList) -> RepoResult<u64>;
}

/// Terminal state of one baseline run. All of them are successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineOutcome {
    /// No bootstrap token is configured.
    Disabled,
    /// Another instance holds the advisory lock.
    SkippedLockBusy,
    /// The bootstrap token already exists.
    SkippedTokenPresent,
    /// The root tenant, admin application, token and ACL row were created.
    Provisioned,
}

pub type AccessListSetOneWork = TxWork<dyn AccessListSetOneTx, u64>;
pub type AccessListSetListWork = TxWork<dyn AccessListSetListTx, Vec<AccessList>>;
pub type ApplicationDeleteWork = TxWork<dyn ApplicationDeleteTx, u64>;
pub type TokenCreateWork = TxWork<dyn TokenCreateTx, ()>;
pub type TokenRevokeWork = TxWork<dyn TokenRevokeTx, u64>;
pub type BaselineWork = TxWork<dyn BaselineTx, BaselineOutcome>;

/// Runs use-case closures under a single transaction each.
#[async_trait]
pub trait TransactionManager: Send + Sync {
    async fn access_list_set_one_tx(&self, work: AccessListSetOneWork) -> RepoResult<u64>;
    async fn access_list_set_list_tx(
        &self,
        work: AccessListSetListWork,
    ) -> RepoResult<Vec<AccessList>>;
    async fn application_delete_tx(&self, work: ApplicationDeleteWork) -> RepoResult<u64>;
    async fn token_create_tx(&self, work: TokenCreateWork) -> RepoResult<()>;
    async fn token_revoke_tx(&self, work: TokenRevokeWork) -> RepoResult<u64>;
    async fn baseline_tx(&self, work: BaselineWork) -> RepoResult<BaselineOutcome>;
}
