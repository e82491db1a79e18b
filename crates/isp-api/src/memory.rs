//! # In-Memory Backend
//!
//! Implements every repository port and the transaction manager over
//! process-local tables. Selected when no `database` section is configured,
//! and used by the test suites.
//!
//! The tables enforce the same rules as the Postgres schema: `(name, parent)`
//! uniqueness, parent existence on insert, cascading deletes, and cascading
//! application-id rewrites into tokens and access-list rows.
//!
//! ## Concurrency
//!
//! Reads take a shared lock on the tables. Writes and transactions are
//! serialized by an async gate. A transaction works on a private copy of the
//! tables that replaces the shared copy on commit; dropping the copy is the
//! rollback.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use isp_core::{
    AccessList, AppGroup, Application, AuthData, Domain, NewApplication, SystemError, Token,
    DEFAULT_SYSTEM_ID,
};
use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::repository::{
    AccessListRepository, AccessListSetListTx, AccessListSetListWork, AccessListSetOneTx,
    AccessListSetOneWork, AppGroupRepository, ApplicationDeleteTx, ApplicationDeleteWork,
    ApplicationRepository, BaselineOutcome, BaselineTx, BaselineWork, DomainRepository,
    RepoResult, Repositories, TokenCreateTx, TokenCreateWork, TokenRepository, TokenRevokeTx,
    TokenRevokeWork, TransactionManager, TxFuture,
};

/// Flat copy of every table, used to seed and inspect a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub domains: Vec<Domain>,
    pub app_groups: Vec<AppGroup>,
    pub applications: Vec<Application>,
    pub tokens: Vec<Token>,
    pub access_lists: Vec<AccessList>,
}

/// Shared in-memory storage handle. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    gate: Arc<Mutex<()>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("MemoryStore")
            .field("domains", &tables.domains.len())
            .field("app_groups", &tables.app_groups.len())
            .field("applications", &tables.applications.len())
            .field("tokens", &tables.tokens.len())
            .field("access_lists", &tables.access_lists.len())
            .finish()
    }
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with explicit rows, ids included.
    ///
    /// Rows are taken as given; identity counters resume after the highest
    /// seeded id.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut tables = Tables::default();
        for d in snapshot.domains {
            tables.next_domain_id = tables.next_domain_id.max(d.id + 1);
            tables.domains.insert(d.id, d);
        }
        for g in snapshot.app_groups {
            tables.next_app_group_id = tables.next_app_group_id.max(g.id + 1);
            tables.app_groups.insert(g.id, g);
        }
        for a in snapshot.applications {
            tables.applications.insert(a.id, a);
        }
        for t in snapshot.tokens {
            tables.tokens.insert(t.token.clone(), t);
        }
        for acl in snapshot.access_lists {
            tables.access_lists.insert((acl.app_id, acl.method), acl.value);
        }
        Self {
            tables: Arc::new(RwLock::new(tables)),
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Copy out every table.
    pub fn snapshot(&self) -> Snapshot {
        let tables = self.tables.read();
        Snapshot {
            domains: tables.domains.values().cloned().collect(),
            app_groups: tables.app_groups.values().cloned().collect(),
            applications: tables.applications.values().cloned().collect(),
            tokens: tables.tokens.values().cloned().collect(),
            access_lists: tables
                .access_lists
                .iter()
                .map(|((app_id, method), value)| AccessList {
                    app_id: *app_id,
                    method: method.clone(),
                    value: *value,
                })
                .collect(),
        }
    }

    /// Repository ports backed by this store.
    pub fn repositories(&self) -> Repositories {
        let store = Arc::new(self.clone());
        Repositories {
            domains: store.clone(),
            app_groups: store.clone(),
            applications: store.clone(),
            tokens: store.clone(),
            access_lists: store.clone(),
            tx: store,
        }
    }

    async fn in_transaction<T, F>(&self, use_case: &'static str, body: F) -> RepoResult<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut MemoryTx) -> TxFuture<'c, T> + Send,
    {
        let _gate = self.gate.lock().await;
        let working = self.tables.read().clone();
        let mut tx = MemoryTx { tables: working };
        match body(&mut tx).await {
            Ok(value) => {
                *self.tables.write() = tx.tables;
                Ok(value)
            }
            Err(err) => {
                tracing::debug!(use_case, error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }
}

// ── Tables ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Tables {
    domains: BTreeMap<i32, Domain>,
    app_groups: BTreeMap<i32, AppGroup>,
    applications: BTreeMap<i32, Application>,
    tokens: BTreeMap<String, Token>,
    access_lists: BTreeMap<(i32, String), bool>,
    next_domain_id: i32,
    next_app_group_id: i32,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            domains: BTreeMap::new(),
            app_groups: BTreeMap::new(),
            applications: BTreeMap::new(),
            tokens: BTreeMap::new(),
            access_lists: BTreeMap::new(),
            next_domain_id: 1,
            next_app_group_id: 1,
        }
    }
}

/// `ORDER BY created_at DESC, id DESC`.
fn newest_first<T>(mut rows: Vec<T>, key: impl Fn(&T) -> (DateTime<Utc>, i32)) -> Vec<T> {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    rows
}

impl Tables {
    // -- Domain ---------------------------------------------------------------

    fn domain(&self, id: i32) -> RepoResult<Domain> {
        self.domains
            .get(&id)
            .cloned()
            .ok_or(SystemError::DomainNotFound)
    }

    fn domains_where(&self, pred: impl Fn(&Domain) -> bool) -> Vec<Domain> {
        let rows = self.domains.values().filter(|d| pred(d)).cloned().collect();
        newest_first(rows, |d: &Domain| (d.created_at, d.id))
    }

    fn create_domain(&mut self, name: &str, description: &str, system_id: i32) -> RepoResult<Domain> {
        if self
            .domains
            .values()
            .any(|d| d.name == name && d.system_id == system_id)
        {
            return Err(SystemError::DomainDuplicateName);
        }
        if system_id != DEFAULT_SYSTEM_ID {
            return Err(SystemError::SystemNotFound);
        }
        let now = Utc::now();
        let domain = Domain {
            id: self.next_domain_id,
            name: name.to_string(),
            description: description.to_string(),
            system_id,
            created_at: now,
            updated_at: now,
        };
        self.next_domain_id += 1;
        self.domains.insert(domain.id, domain.clone());
        Ok(domain)
    }

    fn update_domain(&mut self, id: i32, name: &str, description: &str) -> RepoResult<Domain> {
        let system_id = self.domain(id)?.system_id;
        if self
            .domains
            .values()
            .any(|d| d.id != id && d.name == name && d.system_id == system_id)
        {
            return Err(SystemError::DomainDuplicateName);
        }
        let domain = self
            .domains
            .get_mut(&id)
            .ok_or(SystemError::DomainNotFound)?;
        domain.name = name.to_string();
        domain.description = description.to_string();
        domain.updated_at = Utc::now();
        Ok(domain.clone())
    }

    fn delete_domains(&mut self, ids: &[i32]) -> u64 {
        let deleted = ids
            .iter()
            .filter(|id| self.domains.remove(*id).is_some())
            .count();
        self.sweep_orphans();
        deleted as u64
    }

    // -- AppGroup -------------------------------------------------------------

    fn app_group(&self, id: i32) -> RepoResult<AppGroup> {
        self.app_groups
            .get(&id)
            .cloned()
            .ok_or(SystemError::AppGroupNotFound)
    }

    fn app_groups_where(&self, pred: impl Fn(&AppGroup) -> bool) -> Vec<AppGroup> {
        let rows = self.app_groups.values().filter(|g| pred(g)).cloned().collect();
        newest_first(rows, |g: &AppGroup| (g.created_at, g.id))
    }

    fn create_app_group(
        &mut self,
        name: &str,
        description: &str,
        domain_id: i32,
    ) -> RepoResult<AppGroup> {
        if self
            .app_groups
            .values()
            .any(|g| g.name == name && g.domain_id == domain_id)
        {
            return Err(SystemError::AppGroupDuplicateName);
        }
        if !self.domains.contains_key(&domain_id) {
            return Err(SystemError::DomainNotFound);
        }
        let now = Utc::now();
        let group = AppGroup {
            id: self.next_app_group_id,
            name: name.to_string(),
            description: description.to_string(),
            domain_id,
            created_at: now,
            updated_at: now,
        };
        self.next_app_group_id += 1;
        self.app_groups.insert(group.id, group.clone());
        Ok(group)
    }

    fn update_app_group(&mut self, id: i32, name: &str, description: &str) -> RepoResult<AppGroup> {
        let domain_id = self.app_group(id)?.domain_id;
        if self
            .app_groups
            .values()
            .any(|g| g.id != id && g.name == name && g.domain_id == domain_id)
        {
            return Err(SystemError::AppGroupDuplicateName);
        }
        let group = self
            .app_groups
            .get_mut(&id)
            .ok_or(SystemError::AppGroupNotFound)?;
        group.name = name.to_string();
        group.description = description.to_string();
        group.updated_at = Utc::now();
        Ok(group.clone())
    }

    fn delete_app_groups(&mut self, ids: &[i32]) -> u64 {
        let deleted = ids
            .iter()
            .filter(|id| self.app_groups.remove(*id).is_some())
            .count();
        self.sweep_orphans();
        deleted as u64
    }

    // -- Application ----------------------------------------------------------

    fn application(&self, id: i32) -> RepoResult<Application> {
        self.applications
            .get(&id)
            .cloned()
            .ok_or(SystemError::ApplicationNotFound)
    }

    fn applications_where(&self, pred: impl Fn(&Application) -> bool) -> Vec<Application> {
        let rows = self
            .applications
            .values()
            .filter(|a| pred(a))
            .cloned()
            .collect();
        newest_first(rows, |a: &Application| (a.created_at, a.id))
    }

    fn next_application_id(&self) -> i32 {
        self.applications
            .keys()
            .next_back()
            .map_or(1, |max| max + 1)
    }

    fn create_application(&mut self, app: NewApplication) -> RepoResult<Application> {
        if self.applications.contains_key(&app.id) {
            return Err(SystemError::ApplicationDuplicateId);
        }
        if self
            .applications
            .values()
            .any(|a| a.name == app.name && a.application_group_id == app.application_group_id)
        {
            return Err(SystemError::ApplicationDuplicateName);
        }
        if !self.app_groups.contains_key(&app.application_group_id) {
            return Err(SystemError::AppGroupNotFound);
        }
        let now = Utc::now();
        let created = Application {
            id: app.id,
            name: app.name,
            description: app.description,
            application_group_id: app.application_group_id,
            app_type: app.app_type,
            created_at: now,
            updated_at: now,
        };
        self.applications.insert(created.id, created.clone());
        Ok(created)
    }

    fn update_application(
        &mut self,
        old_id: i32,
        new_id: i32,
        name: &str,
        description: &str,
    ) -> RepoResult<Application> {
        let current = self.application(old_id)?;
        if new_id != old_id && self.applications.contains_key(&new_id) {
            return Err(SystemError::ApplicationDuplicateId);
        }
        if self.applications.values().any(|a| {
            a.id != old_id && a.name == name && a.application_group_id == current.application_group_id
        }) {
            return Err(SystemError::ApplicationDuplicateName);
        }

        self.applications.remove(&old_id);
        let updated = Application {
            id: new_id,
            name: name.to_string(),
            description: description.to_string(),
            updated_at: Utc::now(),
            ..current
        };
        self.applications.insert(new_id, updated.clone());

        if new_id != old_id {
            for token in self.tokens.values_mut().filter(|t| t.app_id == old_id) {
                token.app_id = new_id;
            }
            let moved: Vec<(i32, String)> = self
                .access_lists
                .keys()
                .filter(|(app_id, _)| *app_id == old_id)
                .cloned()
                .collect();
            for key in moved {
                if let Some(value) = self.access_lists.remove(&key) {
                    self.access_lists.insert((new_id, key.1), value);
                }
            }
        }
        Ok(updated)
    }

    fn delete_applications(&mut self, ids: &[i32]) -> u64 {
        let deleted = ids
            .iter()
            .filter(|id| self.applications.remove(*id).is_some())
            .count();
        self.sweep_orphans();
        deleted as u64
    }

    // -- Token ----------------------------------------------------------------

    fn token(&self, token: &str) -> RepoResult<Token> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(SystemError::TokenNotFound)
    }

    fn tokens_where(&self, pred: impl Fn(&Token) -> bool) -> Vec<Token> {
        let mut rows: Vec<Token> = self.tokens.values().filter(|t| pred(t)).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }

    fn save_token(&mut self, token: &Token) -> RepoResult<()> {
        if self.tokens.contains_key(&token.token) {
            return Err(SystemError::TokenDuplicate);
        }
        if !self.applications.contains_key(&token.app_id) {
            return Err(SystemError::ApplicationNotFound);
        }
        self.tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    fn delete_tokens(&mut self, app_id: i32, tokens: &[String]) -> u64 {
        let mut deleted = 0;
        for value in tokens {
            if self.tokens.get(value).is_some_and(|t| t.app_id == app_id) {
                self.tokens.remove(value);
                deleted += 1;
            }
        }
        deleted
    }

    fn auth_data(&self, token: &str) -> RepoResult<AuthData> {
        let token = self.token(token)?;
        let joined = self.applications.get(&token.app_id).and_then(|app| {
            let group = self.app_groups.get(&app.application_group_id)?;
            let domain = self.domains.get(&group.domain_id)?;
            Some(AuthData {
                app_id: app.id,
                app_name: app.name.clone(),
                application_group_id: group.id,
                domain_id: domain.id,
                system_id: domain.system_id,
                expire_time: token.expire_time,
                created_at: token.created_at,
            })
        });
        joined.ok_or(SystemError::TokenNotFound)
    }

    // -- AccessList -----------------------------------------------------------

    fn access_lists_for(&self, app_id: i32) -> Vec<AccessList> {
        self.access_lists
            .iter()
            .filter(|((id, _), _)| *id == app_id)
            .map(|((id, method), value)| AccessList {
                app_id: *id,
                method: method.clone(),
                value: *value,
            })
            .collect()
    }

    fn access_list(&self, app_id: i32, method: &str) -> RepoResult<AccessList> {
        self.access_lists
            .get(&(app_id, method.to_string()))
            .map(|value| AccessList {
                app_id,
                method: method.to_string(),
                value: *value,
            })
            .ok_or(SystemError::AccessListNotFound)
    }

    fn upsert_access_list(&mut self, row: &AccessList) -> RepoResult<u64> {
        if !self.applications.contains_key(&row.app_id) {
            return Err(SystemError::ApplicationNotFound);
        }
        self.access_lists
            .insert((row.app_id, row.method.clone()), row.value);
        Ok(1)
    }

    fn insert_access_lists(&mut self, rows: &[AccessList]) -> RepoResult<u64> {
        for row in rows {
            if !self.applications.contains_key(&row.app_id) {
                return Err(SystemError::ApplicationNotFound);
            }
            let key = (row.app_id, row.method.clone());
            if self.access_lists.contains_key(&key) {
                return Err(SystemError::InvalidArgument(
                    "method listed more than once for the application".into(),
                ));
            }
            self.access_lists.insert(key, row.value);
        }
        Ok(rows.len() as u64)
    }

    fn delete_access_lists(&mut self, app_id: i32, methods: Option<&[String]>) -> u64 {
        let before = self.access_lists.len();
        self.access_lists.retain(|(id, method), _| {
            *id != app_id || methods.is_some_and(|m| !m.contains(method))
        });
        (before - self.access_lists.len()) as u64
    }

    /// `ON DELETE CASCADE` for every foreign key.
    fn sweep_orphans(&mut self) {
        let domains = &self.domains;
        self.app_groups
            .retain(|_, g| domains.contains_key(&g.domain_id));
        let groups = &self.app_groups;
        self.applications
            .retain(|_, a| groups.contains_key(&a.application_group_id));
        let apps = &self.applications;
        self.tokens.retain(|_, t| apps.contains_key(&t.app_id));
        self.access_lists
            .retain(|(app_id, _), _| apps.contains_key(app_id));
    }
}

// ── Repository ports ────────────────────────────────────────────────────────

#[async_trait]
impl DomainRepository for MemoryStore {
    async fn get_by_id(&self, id: i32) -> RepoResult<Domain> {
        self.tables.read().domain(id)
    }

    async fn get_by_id_list(&self, ids: &[i32]) -> RepoResult<Vec<Domain>> {
        Ok(self.tables.read().domains_where(|d| ids.contains(&d.id)))
    }

    async fn get_by_system_id(&self, system_id: i32) -> RepoResult<Vec<Domain>> {
        Ok(self.tables.read().domains_where(|d| d.system_id == system_id))
    }

    async fn get_by_name_and_system_id(&self, name: &str, system_id: i32) -> RepoResult<Domain> {
        self.tables
            .read()
            .domains
            .values()
            .find(|d| d.name == name && d.system_id == system_id)
            .cloned()
            .ok_or(SystemError::DomainNotFound)
    }

    async fn create(&self, name: &str, description: &str, system_id: i32) -> RepoResult<Domain> {
        let _gate = self.gate.lock().await;
        self.tables.write().create_domain(name, description, system_id)
    }

    async fn update(&self, id: i32, name: &str, description: &str) -> RepoResult<Domain> {
        let _gate = self.gate.lock().await;
        self.tables.write().update_domain(id, name, description)
    }

    async fn delete_by_id_list(&self, ids: &[i32]) -> RepoResult<u64> {
        let _gate = self.gate.lock().await;
        Ok(self.tables.write().delete_domains(ids))
    }
}

#[async_trait]
impl AppGroupRepository for MemoryStore {
    async fn get_by_id(&self, id: i32) -> RepoResult<AppGroup> {
        self.tables.read().app_group(id)
    }

    async fn get_by_id_list(&self, ids: &[i32]) -> RepoResult<Vec<AppGroup>> {
        Ok(self.tables.read().app_groups_where(|g| ids.contains(&g.id)))
    }

    async fn get_by_domain_ids(&self, domain_ids: &[i32]) -> RepoResult<Vec<AppGroup>> {
        Ok(self
            .tables
            .read()
            .app_groups_where(|g| domain_ids.contains(&g.domain_id)))
    }

    async fn get_all(&self) -> RepoResult<Vec<AppGroup>> {
        Ok(self.tables.read().app_groups_where(|_| true))
    }

    async fn get_by_name_and_domain_id(&self, name: &str, domain_id: i32) -> RepoResult<AppGroup> {
        self.tables
            .read()
            .app_groups
            .values()
            .find(|g| g.name == name && g.domain_id == domain_id)
            .cloned()
            .ok_or(SystemError::AppGroupNotFound)
    }

    async fn create(&self, name: &str, description: &str, domain_id: i32) -> RepoResult<AppGroup> {
        let _gate = self.gate.lock().await;
        self.tables
            .write()
            .create_app_group(name, description, domain_id)
    }

    async fn update(&self, id: i32, name: &str, description: &str) -> RepoResult<AppGroup> {
        let _gate = self.gate.lock().await;
        self.tables.write().update_app_group(id, name, description)
    }

    async fn delete_by_id_list(&self, ids: &[i32]) -> RepoResult<u64> {
        let _gate = self.gate.lock().await;
        Ok(self.tables.write().delete_app_groups(ids))
    }
}

#[async_trait]
impl ApplicationRepository for MemoryStore {
    async fn get_by_id(&self, id: i32) -> RepoResult<Application> {
        self.tables.read().application(id)
    }

    async fn get_by_id_list(&self, ids: &[i32]) -> RepoResult<Vec<Application>> {
        Ok(self.tables.read().applications_where(|a| ids.contains(&a.id)))
    }

    async fn get_by_app_group_ids(&self, group_ids: &[i32]) -> RepoResult<Vec<Application>> {
        Ok(self
            .tables
            .read()
            .applications_where(|a| group_ids.contains(&a.application_group_id)))
    }

    async fn get_by_name_and_app_group_id(
        &self,
        name: &str,
        group_id: i32,
    ) -> RepoResult<Application> {
        self.tables
            .read()
            .applications
            .values()
            .find(|a| a.name == name && a.application_group_id == group_id)
            .cloned()
            .ok_or(SystemError::ApplicationNotFound)
    }

    async fn get_all(&self) -> RepoResult<Vec<Application>> {
        Ok(self.tables.read().applications_where(|_| true))
    }

    async fn next_id(&self) -> RepoResult<i32> {
        Ok(self.tables.read().next_application_id())
    }

    async fn create(&self, app: NewApplication) -> RepoResult<Application> {
        let _gate = self.gate.lock().await;
        self.tables.write().create_application(app)
    }

    async fn update(&self, id: i32, name: &str, description: &str) -> RepoResult<Application> {
        let _gate = self.gate.lock().await;
        self.tables
            .write()
            .update_application(id, id, name, description)
    }

    async fn update_with_new_id(
        &self,
        old_id: i32,
        new_id: i32,
        name: &str,
        description: &str,
    ) -> RepoResult<Application> {
        let _gate = self.gate.lock().await;
        self.tables
            .write()
            .update_application(old_id, new_id, name, description)
    }
}

#[async_trait]
impl TokenRepository for MemoryStore {
    async fn get_by_token(&self, token: &str) -> RepoResult<Token> {
        self.tables.read().token(token)
    }

    async fn get_by_app_id(&self, app_id: i32) -> RepoResult<Vec<Token>> {
        Ok(self.tables.read().tokens_where(|t| t.app_id == app_id))
    }

    async fn get_by_app_ids(&self, app_ids: &[i32]) -> RepoResult<Vec<Token>> {
        Ok(self
            .tables
            .read()
            .tokens_where(|t| app_ids.contains(&t.app_id)))
    }

    async fn select_auth_data_by_token(&self, token: &str) -> RepoResult<AuthData> {
        self.tables.read().auth_data(token)
    }
}

#[async_trait]
impl AccessListRepository for MemoryStore {
    async fn get_by_app_id(&self, app_id: i32) -> RepoResult<Vec<AccessList>> {
        Ok(self.tables.read().access_lists_for(app_id))
    }

    async fn get_by_app_id_and_method(&self, app_id: i32, method: &str) -> RepoResult<AccessList> {
        self.tables.read().access_list(app_id, method)
    }

    async fn delete_by_app_id_and_methods(
        &self,
        app_id: i32,
        methods: &[String],
    ) -> RepoResult<u64> {
        let _gate = self.gate.lock().await;
        Ok(self
            .tables
            .write()
            .delete_access_lists(app_id, Some(methods)))
    }
}

// ── Transactions ────────────────────────────────────────────────────────────

#[async_trait]
impl TransactionManager for MemoryStore {
    async fn access_list_set_one_tx(&self, work: AccessListSetOneWork) -> RepoResult<u64> {
        self.in_transaction("access_list_set_one", |tx| work.run(tx))
            .await
    }

    async fn access_list_set_list_tx(
        &self,
        work: AccessListSetListWork,
    ) -> RepoResult<Vec<AccessList>> {
        self.in_transaction("access_list_set_list", |tx| work.run(tx))
            .await
    }

    async fn application_delete_tx(&self, work: ApplicationDeleteWork) -> RepoResult<u64> {
        self.in_transaction("application_delete", |tx| work.run(tx))
            .await
    }

    async fn token_create_tx(&self, work: TokenCreateWork) -> RepoResult<()> {
        self.in_transaction("token_create", |tx| work.run(tx)).await
    }

    async fn token_revoke_tx(&self, work: TokenRevokeWork) -> RepoResult<u64> {
        self.in_transaction("token_revoke", |tx| work.run(tx)).await
    }

    async fn baseline_tx(&self, work: BaselineWork) -> RepoResult<BaselineOutcome> {
        self.in_transaction("baseline", |tx| work.run(tx)).await
    }
}

/// Working copy of the tables for one transaction.
pub struct MemoryTx {
    tables: Tables,
}

#[async_trait]
impl AccessListSetOneTx for MemoryTx {
    async fn upsert(&mut self, row: &AccessList) -> RepoResult<u64> {
        self.tables.upsert_access_list(row)
    }
}

#[async_trait]
impl AccessListSetListTx for MemoryTx {
    async fn delete_by_app_id(&mut self, app_id: i32) -> RepoResult<u64> {
        Ok(self.tables.delete_access_lists(app_id, None))
    }

    async fn delete_by_app_id_and_methods(
        &mut self,
        app_id: i32,
        methods: &[String],
    ) -> RepoResult<u64> {
        Ok(self.tables.delete_access_lists(app_id, Some(methods)))
    }

    async fn insert_all(&mut self, rows: &[AccessList]) -> RepoResult<u64> {
        self.tables.insert_access_lists(rows)
    }

    async fn get_by_app_id(&mut self, app_id: i32) -> RepoResult<Vec<AccessList>> {
        Ok(self.tables.access_lists_for(app_id))
    }
}

#[async_trait]
impl ApplicationDeleteTx for MemoryTx {
    async fn delete_by_id_list(&mut self, ids: &[i32]) -> RepoResult<u64> {
        Ok(self.tables.delete_applications(ids))
    }
}

#[async_trait]
impl TokenCreateTx for MemoryTx {
    async fn save(&mut self, token: &Token) -> RepoResult<()> {
        self.tables.save_token(token)
    }
}

#[async_trait]
impl TokenRevokeTx for MemoryTx {
    async fn delete_by_app_id_and_tokens(
        &mut self,
        app_id: i32,
        tokens: &[String],
    ) -> RepoResult<u64> {
        Ok(self.tables.delete_tokens(app_id, tokens))
    }
}

#[async_trait]
impl BaselineTx for MemoryTx {
    async fn try_lock(&mut self, _key: i64) -> RepoResult<bool> {
        // The store gate already serializes transactions in this process.
        Ok(true)
    }

    async fn get_token(&mut self, token: &str) -> RepoResult<Token> {
        self.tables.token(token)
    }

    async fn create_domain(
        &mut self,
        name: &str,
        description: &str,
        system_id: i32,
    ) -> RepoResult<Domain> {
        self.tables.create_domain(name, description, system_id)
    }

    async fn create_app_group(
        &mut self,
        name: &str,
        description: &str,
        domain_id: i32,
    ) -> RepoResult<AppGroup> {
        self.tables.create_app_group(name, description, domain_id)
    }

    async fn create_application(&mut self, app: NewApplication) -> RepoResult<Application> {
        self.tables.create_application(app)
    }

    async fn save_token(&mut self, token: &Token) -> RepoResult<()> {
        self.tables.save_token(token)
    }

    async fn upsert_access_list(&mut self, row: &AccessList) -> RepoResult<u64> {
        self.tables.upsert_access_list(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::TxWork;
    use isp_core::ApplicationType;

    fn new_app(id: i32, name: &str, group: i32) -> NewApplication {
        NewApplication {
            id,
            name: name.to_string(),
            description: String::new(),
            application_group_id: group,
            app_type: ApplicationType::System,
        }
    }

    fn token(value: &str, app_id: i32) -> Token {
        Token {
            token: value.to_string(),
            app_id,
            expire_time: -1,
            created_at: Utc::now(),
        }
    }

    async fn seeded() -> (MemoryStore, Domain, AppGroup) {
        let store = MemoryStore::new();
        let domain = DomainRepository::create(&store, "d", "", 1).await.unwrap();
        let group = AppGroupRepository::create(&store, "g", "", domain.id)
            .await
            .unwrap();
        (store, domain, group)
    }

    #[tokio::test]
    async fn domain_name_is_unique_per_system() {
        let (store, _, _) = seeded().await;
        let err = DomainRepository::create(&store, "d", "", 1).await.unwrap_err();
        assert_eq!(err, SystemError::DomainDuplicateName);
    }

    #[tokio::test]
    async fn domain_requires_existing_system() {
        let store = MemoryStore::new();
        let err = DomainRepository::create(&store, "d", "", 9).await.unwrap_err();
        assert_eq!(err, SystemError::SystemNotFound);
    }

    #[tokio::test]
    async fn app_group_requires_existing_domain() {
        let store = MemoryStore::new();
        let err = AppGroupRepository::create(&store, "g", "", 42)
            .await
            .unwrap_err();
        assert_eq!(err, SystemError::DomainNotFound);
    }

    #[tokio::test]
    async fn application_create_checks_id_name_and_group() {
        let (store, _, group) = seeded().await;
        ApplicationRepository::create(&store, new_app(1, "a", group.id))
            .await
            .unwrap();
        assert_eq!(
            ApplicationRepository::create(&store, new_app(1, "b", group.id))
                .await
                .unwrap_err(),
            SystemError::ApplicationDuplicateId
        );
        assert_eq!(
            ApplicationRepository::create(&store, new_app(2, "a", group.id))
                .await
                .unwrap_err(),
            SystemError::ApplicationDuplicateName
        );
        assert_eq!(
            ApplicationRepository::create(&store, new_app(3, "c", 999))
                .await
                .unwrap_err(),
            SystemError::AppGroupNotFound
        );
    }

    #[tokio::test]
    async fn next_id_is_max_plus_one() {
        let (store, _, group) = seeded().await;
        assert_eq!(store.next_id().await.unwrap(), 1);
        ApplicationRepository::create(&store, new_app(41, "a", group.id))
            .await
            .unwrap();
        assert_eq!(store.next_id().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn id_rewrite_cascades_to_tokens_and_access_lists() {
        let (store, _, group) = seeded().await;
        ApplicationRepository::create(&store, new_app(7, "a", group.id))
            .await
            .unwrap();
        store.tables.write().save_token(&token("t", 7)).unwrap();
        store
            .tables
            .write()
            .upsert_access_list(&AccessList {
                app_id: 7,
                method: "m".into(),
                value: true,
            })
            .unwrap();

        let updated = store.update_with_new_id(7, 70, "a2", "x").await.unwrap();
        assert_eq!(updated.id, 70);
        assert_eq!(store.get_by_token("t").await.unwrap().app_id, 70);
        assert!(store.get_by_app_id_and_method(70, "m").await.unwrap().value);
        assert_eq!(
            store.get_by_app_id_and_method(7, "m").await.unwrap_err(),
            SystemError::AccessListNotFound
        );
    }

    #[tokio::test]
    async fn deleting_a_domain_cascades_to_every_child() {
        let (store, domain, group) = seeded().await;
        ApplicationRepository::create(&store, new_app(7, "a", group.id))
            .await
            .unwrap();
        store.tables.write().save_token(&token("t", 7)).unwrap();

        let deleted = DomainRepository::delete_by_id_list(&store, &[domain.id])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        let snapshot = store.snapshot();
        assert!(snapshot.app_groups.is_empty());
        assert!(snapshot.applications.is_empty());
        assert!(snapshot.tokens.is_empty());

        let again = DomainRepository::delete_by_id_list(&store, &[domain.id])
            .await
            .unwrap();
        assert_eq!(again, 0);
    }

    #[tokio::test]
    async fn failed_transaction_leaves_tables_untouched() {
        let (store, _, group) = seeded().await;
        ApplicationRepository::create(&store, new_app(7, "a", group.id))
            .await
            .unwrap();

        let work = TokenCreateWork::new(|tx| {
            Box::pin(async move {
                tx.save(&token("first", 7)).await?;
                tx.save(&token("first", 7)).await
            })
        });
        let err = store.token_create_tx(work).await.unwrap_err();
        assert_eq!(err, SystemError::TokenDuplicate);
        assert!(store.snapshot().tokens.is_empty());
    }

    #[tokio::test]
    async fn committed_transaction_is_visible() {
        let (store, _, group) = seeded().await;
        ApplicationRepository::create(&store, new_app(7, "a", group.id))
            .await
            .unwrap();

        let work: TokenCreateWork =
            TxWork::<dyn TokenCreateTx, ()>::new(|tx| Box::pin(async move { tx.save(&token("ok", 7)).await }));
        store.token_create_tx(work).await.unwrap();
        assert_eq!(store.get_by_token("ok").await.unwrap().app_id, 7);
    }

    #[tokio::test]
    async fn auth_data_joins_four_tables() {
        let (store, domain, group) = seeded().await;
        ApplicationRepository::create(&store, new_app(7, "a", group.id))
            .await
            .unwrap();
        store.tables.write().save_token(&token("t", 7)).unwrap();

        let auth = store.select_auth_data_by_token("t").await.unwrap();
        assert_eq!(auth.app_id, 7);
        assert_eq!(auth.app_name, "a");
        assert_eq!(auth.application_group_id, group.id);
        assert_eq!(auth.domain_id, domain.id);
        assert_eq!(auth.system_id, 1);
        assert_eq!(
            store.select_auth_data_by_token("nope").await.unwrap_err(),
            SystemError::TokenNotFound
        );
    }

    #[test]
    fn snapshot_seeding_keeps_ids_and_advances_counters() {
        let now = Utc::now();
        let store = MemoryStore::from_snapshot(Snapshot {
            domains: vec![Domain {
                id: 3,
                name: "d".into(),
                description: String::new(),
                system_id: 1,
                created_at: now,
                updated_at: now,
            }],
            ..Snapshot::default()
        });
        let tables = store.tables.read();
        assert!(tables.domains.contains_key(&3));
        assert_eq!(tables.next_domain_id, 4);
    }
}
