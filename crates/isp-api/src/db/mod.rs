//! # Database Persistence Layer
//!
//! Postgres persistence via SQLx.
//!
//! ## Architecture
//!
//! The database layer is **optional**. When the configuration carries a
//! `database` section, every relation lives in Postgres and
//! [`PgStore`] / [`tx::PgTransactionManager`] back the repository ports.
//! When absent, the service runs on the in-memory backend
//! ([`crate::memory`]), which is what the test suites use.
//!
//! ## Layout
//!
//! One module per table, each a set of free functions over
//! `&mut PgConnection`. Rows are read into private `#[derive(FromRow)]`
//! structs and converted into `isp-core` records. Driver errors are
//! translated in [`error::db_error`].

pub mod access_lists;
pub mod app_groups;
pub mod applications;
pub mod domains;
pub mod error;
pub mod tokens;
pub mod tx;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use isp_core::{AccessList, AppGroup, Application, AuthData, Domain, NewApplication, Token};
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Postgres;

use self::error::db_error;
use crate::config::DatabaseConfig;
use crate::repository::{
    AccessListRepository, AppGroupRepository, ApplicationRepository, DomainRepository, RepoResult,
    Repositories, TokenRepository,
};

/// Connect to Postgres, create the configured schema, and run migrations.
pub async fn init_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.username)
        .password(&config.password)
        .database(&config.database);
    if let Some(schema) = &config.schema {
        options = options.options([("search_path", schema.as_str())]);
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await?;

    tracing::info!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        "Connected to PostgreSQL"
    );

    if let Some(schema) = &config.schema {
        // Identifier validated by DatabaseConfig::validate.
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS \"{schema}\""))
            .execute(&pool)
            .await?;
    }

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// Repository ports backed by a Postgres pool.
pub fn repositories(pool: PgPool) -> Repositories {
    let store = Arc::new(PgStore::new(pool.clone()));
    Repositories {
        domains: store.clone(),
        app_groups: store.clone(),
        applications: store.clone(),
        tokens: store.clone(),
        access_lists: store,
        tx: Arc::new(tx::PgTransactionManager::new(pool)),
    }
}

/// Pool-backed implementation of the single-statement repository ports.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> RepoResult<PoolConnection<Postgres>> {
        self.pool.acquire().await.map_err(db_error)
    }
}

#[async_trait]
impl DomainRepository for PgStore {
    async fn get_by_id(&self, id: i32) -> RepoResult<Domain> {
        domains::get_by_id(&mut *self.conn().await?, id).await
    }

    async fn get_by_id_list(&self, ids: &[i32]) -> RepoResult<Vec<Domain>> {
        domains::get_by_id_list(&mut *self.conn().await?, ids).await
    }

    async fn get_by_system_id(&self, system_id: i32) -> RepoResult<Vec<Domain>> {
        domains::get_by_system_id(&mut *self.conn().await?, system_id).await
    }

    async fn get_by_name_and_system_id(&self, name: &str, system_id: i32) -> RepoResult<Domain> {
        domains::get_by_name_and_system_id(&mut *self.conn().await?, name, system_id).await
    }

    async fn create(&self, name: &str, description: &str, system_id: i32) -> RepoResult<Domain> {
        domains::create(&mut *self.conn().await?, name, description, system_id).await
    }

    async fn update(&self, id: i32, name: &str, description: &str) -> RepoResult<Domain> {
        domains::update(&mut *self.conn().await?, id, name, description).await
    }

    async fn delete_by_id_list(&self, ids: &[i32]) -> RepoResult<u64> {
        domains::delete_by_id_list(&mut *self.conn().await?, ids).await
    }
}

#[async_trait]
impl AppGroupRepository for PgStore {
    async fn get_by_id(&self, id: i32) -> RepoResult<AppGroup> {
        app_groups::get_by_id(&mut *self.conn().await?, id).await
    }

    async fn get_by_id_list(&self, ids: &[i32]) -> RepoResult<Vec<AppGroup>> {
        app_groups::get_by_id_list(&mut *self.conn().await?, ids).await
    }

    async fn get_by_domain_ids(&self, domain_ids: &[i32]) -> RepoResult<Vec<AppGroup>> {
        app_groups::get_by_domain_ids(&mut *self.conn().await?, domain_ids).await
    }

    async fn get_all(&self) -> RepoResult<Vec<AppGroup>> {
        app_groups::get_all(&mut *self.conn().await?).await
    }

    async fn get_by_name_and_domain_id(&self, name: &str, domain_id: i32) -> RepoResult<AppGroup> {
        app_groups::get_by_name_and_domain_id(&mut *self.conn().await?, name, domain_id).await
    }

    async fn create(&self, name: &str, description: &str, domain_id: i32) -> RepoResult<AppGroup> {
        app_groups::create(&mut *self.conn().await?, name, description, domain_id).await
    }

    async fn update(&self, id: i32, name: &str, description: &str) -> RepoResult<AppGroup> {
        app_groups::update(&mut *self.conn().await?, id, name, description).await
    }

    async fn delete_by_id_list(&self, ids: &[i32]) -> RepoResult<u64> {
        app_groups::delete_by_id_list(&mut *self.conn().await?, ids).await
    }
}

#[async_trait]
impl ApplicationRepository for PgStore {
    async fn get_by_id(&self, id: i32) -> RepoResult<Application> {
        applications::get_by_id(&mut *self.conn().await?, id).await
    }

    async fn get_by_id_list(&self, ids: &[i32]) -> RepoResult<Vec<Application>> {
        applications::get_by_id_list(&mut *self.conn().await?, ids).await
    }

    async fn get_by_app_group_ids(&self, group_ids: &[i32]) -> RepoResult<Vec<Application>> {
        applications::get_by_app_group_ids(&mut *self.conn().await?, group_ids).await
    }

    async fn get_by_name_and_app_group_id(
        &self,
        name: &str,
        group_id: i32,
    ) -> RepoResult<Application> {
        applications::get_by_name_and_app_group_id(&mut *self.conn().await?, name, group_id).await
    }

    async fn get_all(&self) -> RepoResult<Vec<Application>> {
        applications::get_all(&mut *self.conn().await?).await
    }

    async fn next_id(&self) -> RepoResult<i32> {
        applications::next_id(&mut *self.conn().await?).await
    }

    async fn create(&self, app: NewApplication) -> RepoResult<Application> {
        applications::create(&mut *self.conn().await?, &app).await
    }

    async fn update(&self, id: i32, name: &str, description: &str) -> RepoResult<Application> {
        applications::update(&mut *self.conn().await?, id, name, description).await
    }

    async fn update_with_new_id(
        &self,
        old_id: i32,
        new_id: i32,
        name: &str,
        description: &str,
    ) -> RepoResult<Application> {
        applications::update_with_new_id(&mut *self.conn().await?, old_id, new_id, name, description)
            .await
    }
}

#[async_trait]
impl TokenRepository for PgStore {
    async fn get_by_token(&self, token: &str) -> RepoResult<Token> {
        tokens::get_by_token(&mut *self.conn().await?, token).await
    }

    async fn get_by_app_id(&self, app_id: i32) -> RepoResult<Vec<Token>> {
        tokens::get_by_app_id(&mut *self.conn().await?, app_id).await
    }

    async fn get_by_app_ids(&self, app_ids: &[i32]) -> RepoResult<Vec<Token>> {
        tokens::get_by_app_ids(&mut *self.conn().await?, app_ids).await
    }

    async fn select_auth_data_by_token(&self, token: &str) -> RepoResult<AuthData> {
        tokens::select_auth_data_by_token(&mut *self.conn().await?, token).await
    }
}

#[async_trait]
impl AccessListRepository for PgStore {
    async fn get_by_app_id(&self, app_id: i32) -> RepoResult<Vec<AccessList>> {
        access_lists::get_by_app_id(&mut *self.conn().await?, app_id).await
    }

    async fn get_by_app_id_and_method(&self, app_id: i32, method: &str) -> RepoResult<AccessList> {
        access_lists::get_by_app_id_and_method(&mut *self.conn().await?, app_id, method).await
    }

    async fn delete_by_app_id_and_methods(
        &self,
        app_id: i32,
        methods: &[String],
    ) -> RepoResult<u64> {
        access_lists::delete_by_app_id_and_methods(&mut *self.conn().await?, app_id, methods).await
    }
}
