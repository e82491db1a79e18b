//! Baseline provisioning.
//!
//! Runs once at startup, before the listener opens. Under a transactional
//! advisory lock it creates the root tenant, the `admin` application, the
//! configured bootstrap token and the login ACL row, unless the token is
//! already present. Every terminal state is a success and only
//! [`BaselineOutcome::Provisioned`] writes anything.
//!
//! ```text
//! Idle ──▶ LockAttempt ──┬──▶ SkippedLockBusy
//!                        ├──▶ SkippedTokenPresent
//!                        └──▶ Provisioned
//! ```

use std::sync::Arc;

use chrono::Utc;
use isp_core::{
    advisory_lock_key, AccessList, ApplicationType, NewApplication, Token, BASELINE_LOCK_NAME,
    DEFAULT_SYSTEM_ID, NEVER_EXPIRES,
};

pub use crate::repository::BaselineOutcome;
use crate::repository::{BaselineWork, RepoResult, TransactionManager};

pub const ROOT_DOMAIN_NAME: &str = "root";
pub const ROOT_APP_GROUP_NAME: &str = "rootService";
pub const ADMIN_APP_ID: i32 = 1;
pub const ADMIN_APP_NAME: &str = "admin";
pub const ADMIN_LOGIN_METHOD: &str = "admin/auth/login";

#[derive(Clone)]
pub struct BaselineService {
    tx: Arc<dyn TransactionManager>,
}

impl BaselineService {
    pub fn new(tx: Arc<dyn TransactionManager>) -> Self {
        Self { tx }
    }

    pub async fn run(&self, initial_token: &str) -> RepoResult<BaselineOutcome> {
        if initial_token.is_empty() {
            tracing::info!("baseline disabled: no initial admin UI token configured");
            return Ok(BaselineOutcome::Disabled);
        }

        let token = initial_token.to_string();
        let key = advisory_lock_key(BASELINE_LOCK_NAME);
        let work = BaselineWork::new(move |tx| {
            Box::pin(async move {
                if !tx.try_lock(key).await? {
                    return Ok(BaselineOutcome::SkippedLockBusy);
                }
                match tx.get_token(&token).await {
                    Ok(_) => return Ok(BaselineOutcome::SkippedTokenPresent),
                    Err(err) if err.is_not_found() => {}
                    Err(err) => return Err(err),
                }

                let domain = tx
                    .create_domain(ROOT_DOMAIN_NAME, "", DEFAULT_SYSTEM_ID)
                    .await?;
                let group = tx
                    .create_app_group(ROOT_APP_GROUP_NAME, "", domain.id)
                    .await?;
                let app = tx
                    .create_application(NewApplication {
                        id: ADMIN_APP_ID,
                        name: ADMIN_APP_NAME.to_string(),
                        description: String::new(),
                        application_group_id: group.id,
                        app_type: ApplicationType::System,
                    })
                    .await?;
                tx.save_token(&Token {
                    token,
                    app_id: app.id,
                    expire_time: NEVER_EXPIRES,
                    created_at: Utc::now(),
                })
                .await?;
                tx.upsert_access_list(&AccessList {
                    app_id: app.id,
                    method: ADMIN_LOGIN_METHOD.to_string(),
                    value: true,
                })
                .await?;
                Ok(BaselineOutcome::Provisioned)
            })
        });

        let outcome = self.tx.baseline_tx(work).await?;
        match outcome {
            BaselineOutcome::Provisioned => {
                tracing::info!(app_id = ADMIN_APP_ID, "baseline provisioned")
            }
            BaselineOutcome::SkippedLockBusy => {
                tracing::info!("baseline skipped: another instance holds the lock")
            }
            BaselineOutcome::SkippedTokenPresent => {
                tracing::info!("baseline skipped: bootstrap token already present")
            }
            BaselineOutcome::Disabled => {}
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn empty_token_disables() {
        let store = MemoryStore::new();
        let svc = BaselineService::new(store.repositories().tx);
        assert_eq!(svc.run("").await.unwrap(), BaselineOutcome::Disabled);
        assert_eq!(store.snapshot(), Default::default());
    }

    #[tokio::test]
    async fn provisions_once() {
        let store = MemoryStore::new();
        let svc = BaselineService::new(store.repositories().tx);
        assert_eq!(svc.run("T").await.unwrap(), BaselineOutcome::Provisioned);
        let first = store.snapshot();

        for _ in 0..3 {
            assert_eq!(
                svc.run("T").await.unwrap(),
                BaselineOutcome::SkippedTokenPresent
            );
        }
        assert_eq!(store.snapshot(), first);

        assert_eq!(first.domains.len(), 1);
        assert_eq!(first.domains[0].name, "root");
        assert_eq!(first.app_groups.len(), 1);
        assert_eq!(first.app_groups[0].name, "rootService");
        assert_eq!(first.applications.len(), 1);
        assert_eq!(first.applications[0].id, 1);
        assert_eq!(first.applications[0].name, "admin");
        assert_eq!(first.applications[0].app_type, ApplicationType::System);
        assert_eq!(first.tokens.len(), 1);
        assert_eq!(first.tokens[0].token, "T");
        assert_eq!(first.tokens[0].expire_time, -1);
        assert_eq!(
            first.access_lists,
            vec![AccessList {
                app_id: 1,
                method: "admin/auth/login".into(),
                value: true,
            }]
        );
    }

    /// Transaction whose advisory lock is always held elsewhere. Records
    /// every statement issued against it.
    struct BusyLockTx {
        calls: Arc<parking_lot::Mutex<Vec<&'static str>>>,
    }

    impl BusyLockTx {
        fn record(&self, call: &'static str) {
            self.calls.lock().push(call);
        }
    }

    #[async_trait::async_trait]
    impl crate::repository::BaselineTx for BusyLockTx {
        async fn try_lock(&mut self, _key: i64) -> RepoResult<bool> {
            self.record("try_lock");
            Ok(false)
        }

        async fn get_token(&mut self, _token: &str) -> RepoResult<Token> {
            self.record("get_token");
            Err(isp_core::SystemError::TokenNotFound)
        }

        async fn create_domain(
            &mut self,
            _name: &str,
            _description: &str,
            _system_id: i32,
        ) -> RepoResult<isp_core::Domain> {
            self.record("create_domain");
            Err(isp_core::SystemError::Internal("unexpected".into()))
        }

        async fn create_app_group(
            &mut self,
            _name: &str,
            _description: &str,
            _domain_id: i32,
        ) -> RepoResult<isp_core::AppGroup> {
            self.record("create_app_group");
            Err(isp_core::SystemError::Internal("unexpected".into()))
        }

        async fn create_application(
            &mut self,
            _app: NewApplication,
        ) -> RepoResult<isp_core::Application> {
            self.record("create_application");
            Err(isp_core::SystemError::Internal("unexpected".into()))
        }

        async fn save_token(&mut self, _token: &Token) -> RepoResult<()> {
            self.record("save_token");
            Err(isp_core::SystemError::Internal("unexpected".into()))
        }

        async fn upsert_access_list(&mut self, _row: &AccessList) -> RepoResult<u64> {
            self.record("upsert_access_list");
            Err(isp_core::SystemError::Internal("unexpected".into()))
        }
    }

    #[derive(Default)]
    struct BusyLockManager {
        calls: Arc<parking_lot::Mutex<Vec<&'static str>>>,
    }

    #[async_trait::async_trait]
    impl TransactionManager for BusyLockManager {
        async fn access_list_set_one_tx(
            &self,
            _work: crate::repository::AccessListSetOneWork,
        ) -> RepoResult<u64> {
            unimplemented!()
        }

        async fn access_list_set_list_tx(
            &self,
            _work: crate::repository::AccessListSetListWork,
        ) -> RepoResult<Vec<AccessList>> {
            unimplemented!()
        }

        async fn application_delete_tx(
            &self,
            _work: crate::repository::ApplicationDeleteWork,
        ) -> RepoResult<u64> {
            unimplemented!()
        }

        async fn token_create_tx(&self, _work: crate::repository::TokenCreateWork) -> RepoResult<()> {
            unimplemented!()
        }

        async fn token_revoke_tx(&self, _work: crate::repository::TokenRevokeWork) -> RepoResult<u64> {
            unimplemented!()
        }

        async fn baseline_tx(&self, work: BaselineWork) -> RepoResult<BaselineOutcome> {
            let mut tx = BusyLockTx {
                calls: self.calls.clone(),
            };
            work.run(&mut tx).await
        }
    }

    #[tokio::test]
    async fn busy_lock_skips_without_writing() {
        let manager = Arc::new(BusyLockManager::default());
        let calls = manager.calls.clone();
        let svc = BaselineService::new(manager);

        assert_eq!(svc.run("T").await.unwrap(), BaselineOutcome::SkippedLockBusy);
        assert_eq!(*calls.lock(), vec!["try_lock"]);
    }

    #[tokio::test]
    async fn failure_midway_leaves_nothing_behind() {
        let store = MemoryStore::new();
        let repos = store.repositories();
        // Occupy the name the root domain needs so its insert fails.
        repos.domains.create("root", "", 1).await.unwrap();
        let before = store.snapshot();

        let svc = BaselineService::new(repos.tx);
        assert!(svc.run("T").await.is_err());
        assert_eq!(store.snapshot(), before);
    }
}
