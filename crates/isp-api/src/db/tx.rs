//! Postgres transaction manager.

use async_trait::async_trait;
use isp_core::{AccessList, AppGroup, Application, Domain, NewApplication, Token};
use sqlx::postgres::PgPool;
use sqlx::{Postgres, Transaction};

use super::error::db_error;
use super::{access_lists, app_groups, applications, domains, tokens};
use crate::repository::{
    AccessListSetListTx, AccessListSetListWork, AccessListSetOneTx, AccessListSetOneWork,
    ApplicationDeleteTx, ApplicationDeleteWork, BaselineOutcome, BaselineTx, BaselineWork,
    RepoResult, TokenCreateTx, TokenCreateWork, TokenRevokeTx, TokenRevokeWork,
    TransactionManager, TxFuture,
};

/// Begins one Postgres transaction per use case.
#[derive(Debug, Clone)]
pub struct PgTransactionManager {
    pool: PgPool,
}

impl PgTransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn in_transaction<T, F>(&self, use_case: &'static str, body: F) -> RepoResult<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut PgTx) -> TxFuture<'c, T> + Send,
    {
        let tx = self.pool.begin().await.map_err(db_error)?;
        let mut conn = PgTx { tx };
        match body(&mut conn).await {
            Ok(value) => {
                conn.tx.commit().await.map_err(db_error)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = conn.tx.rollback().await {
                    tracing::warn!(use_case, error = %rollback, "rollback failed");
                }
                tracing::debug!(use_case, error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }
}

#[async_trait]
impl TransactionManager for PgTransactionManager {
    async fn access_list_set_one_tx(&self, work: AccessListSetOneWork) -> RepoResult<u64> {
        self.in_transaction("access_list_set_one", |conn| work.run(conn))
            .await
    }

    async fn access_list_set_list_tx(
        &self,
        work: AccessListSetListWork,
    ) -> RepoResult<Vec<AccessList>> {
        self.in_transaction("access_list_set_list", |conn| work.run(conn))
            .await
    }

    async fn application_delete_tx(&self, work: ApplicationDeleteWork) -> RepoResult<u64> {
        self.in_transaction("application_delete", |conn| work.run(conn))
            .await
    }

    async fn token_create_tx(&self, work: TokenCreateWork) -> RepoResult<()> {
        self.in_transaction("token_create", |conn| work.run(conn)).await
    }

    async fn token_revoke_tx(&self, work: TokenRevokeWork) -> RepoResult<u64> {
        self.in_transaction("token_revoke", |conn| work.run(conn)).await
    }

    async fn baseline_tx(&self, work: BaselineWork) -> RepoResult<BaselineOutcome> {
        self.in_transaction("baseline", |conn| work.run(conn)).await
    }
}

/// An open transaction; implements every narrowed capability.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AccessListSetOneTx for PgTx {
    async fn upsert(&mut self, row: &AccessList) -> RepoResult<u64> {
        access_lists::upsert(&mut self.tx, row).await
    }
}

#[async_trait]
impl AccessListSetListTx for PgTx {
    async fn delete_by_app_id(&mut self, app_id: i32) -> RepoResult<u64> {
        access_lists::delete_by_app_id(&mut self.tx, app_id).await
    }

    async fn delete_by_app_id_and_methods(
        &mut self,
        app_id: i32,
        methods: &[String],
    ) -> RepoResult<u64> {
        access_lists::delete_by_app_id_and_methods(&mut self.tx, app_id, methods).await
    }

    async fn insert_all(&mut self, rows: &[AccessList]) -> RepoResult<u64> {
        access_lists::insert_all(&mut self.tx, rows).await
    }

    async fn get_by_app_id(&mut self, app_id: i32) -> RepoResult<Vec<AccessList>> {
        access_lists::get_by_app_id(&mut self.tx, app_id).await
    }
}

#[async_trait]
impl ApplicationDeleteTx for PgTx {
    async fn delete_by_id_list(&mut self, ids: &[i32]) -> RepoResult<u64> {
        applications::delete_by_id_list(&mut self.tx, ids).await
    }
}

#[async_trait]
impl TokenCreateTx for PgTx {
    async fn save(&mut self, token: &Token) -> RepoResult<()> {
        tokens::save(&mut self.tx, token).await
    }
}

#[async_trait]
impl TokenRevokeTx for PgTx {
    async fn delete_by_app_id_and_tokens(
        &mut self,
        app_id: i32,
        tokens: &[String],
    ) -> RepoResult<u64> {
        tokens::delete_by_app_id_and_tokens(&mut self.tx, app_id, tokens).await
    }
}

#[async_trait]
impl BaselineTx for PgTx {
    async fn try_lock(&mut self, key: i64) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT pg_try_advisory_xact_lock($1)")
            .bind(key)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_error)
    }

    async fn get_token(&mut self, token: &str) -> RepoResult<Token> {
        tokens::get_by_token(&mut self.tx, token).await
    }

    async fn create_domain(
        &mut self,
        name: &str,
        description: &str,
        system_id: i32,
    ) -> RepoResult<Domain> {
        domains::create(&mut self.tx, name, description, system_id).await
    }

    async fn create_app_group(
        &mut self,
        name: &str,
        description: &str,
        domain_id: i32,
    ) -> RepoResult<AppGroup> {
        app_groups::create(&mut self.tx, name, description, domain_id).await
    }

    async fn create_application(&mut self, app: NewApplication) -> RepoResult<Application> {
        applications::create(&mut self.tx, &app).await
    }

    async fn save_token(&mut self, token: &Token) -> RepoResult<()> {
        tokens::save(&mut self.tx, token).await
    }

    async fn upsert_access_list(&mut self, row: &AccessList) -> RepoResult<u64> {
        access_lists::upsert(&mut self.tx, row).await
    }
}
