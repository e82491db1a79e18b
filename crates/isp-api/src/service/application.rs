//! Application service.
//!
//! Reads return applications enriched with their tokens (one token query per
//! call). Identifiers are caller-supplied; the legacy combined endpoint
//! allocates one with `next_id` and retries when a concurrent writer takes it
//! first.

use std::sync::Arc;

use isp_core::{
    attach_tokens, build_system_tree, Application, ApplicationType, ApplicationWithTokens,
    DomainNode, NewApplication, SystemError,
};

use super::validation::{ensure_name_free, require_ids};
use crate::repository::{
    AppGroupRepository, ApplicationDeleteWork, ApplicationRepository, DomainRepository,
    RepoResult, Repositories, TokenRepository, TransactionManager,
};

/// Attempts at `next_id` + insert before a `DuplicateId` is returned.
const ALLOCATE_ATTEMPTS: usize = 3;

/// Legacy create-or-rename request; `id == 0` creates with an allocated id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationWrite {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub application_group_id: i32,
    pub app_type: ApplicationType,
}

/// Rename and identifier rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationUpdate {
    pub old_id: i32,
    pub new_id: i32,
    pub name: String,
    pub description: String,
}

#[derive(Clone)]
pub struct ApplicationService {
    applications: Arc<dyn ApplicationRepository>,
    groups: Arc<dyn AppGroupRepository>,
    domains: Arc<dyn DomainRepository>,
    tokens: Arc<dyn TokenRepository>,
    tx: Arc<dyn TransactionManager>,
}

impl ApplicationService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            applications: repos.applications.clone(),
            groups: repos.app_groups.clone(),
            domains: repos.domains.clone(),
            tokens: repos.tokens.clone(),
            tx: repos.tx.clone(),
        }
    }

    pub async fn get_by_id(&self, id: i32) -> RepoResult<ApplicationWithTokens> {
        let app = self.applications.get_by_id(id).await?;
        self.enrich_one(app).await
    }

    pub async fn get_by_id_list(&self, ids: &[i32]) -> RepoResult<Vec<ApplicationWithTokens>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let apps = self.applications.get_by_id_list(ids).await?;
        self.enrich_with_tokens(apps).await
    }

    /// Applications of one application group ("service").
    pub async fn get_by_service_id(&self, group_id: i32) -> RepoResult<Vec<ApplicationWithTokens>> {
        let apps = self.applications.get_by_app_group_ids(&[group_id]).await?;
        self.enrich_with_tokens(apps).await
    }

    /// The application a token is bound to.
    pub async fn get_by_token(&self, token: &str) -> RepoResult<ApplicationWithTokens> {
        let token = self.tokens.get_by_token(token).await?;
        self.get_by_id(token.app_id).await
    }

    pub async fn get_all(&self) -> RepoResult<Vec<ApplicationWithTokens>> {
        let apps = self.applications.get_all().await?;
        self.enrich_with_tokens(apps).await
    }

    pub async fn next_id(&self) -> RepoResult<i32> {
        self.applications.next_id().await
    }

    /// Insert with an explicit id (see [`Self::next_id`]).
    pub async fn create(&self, req: ApplicationWrite) -> RepoResult<ApplicationWithTokens> {
        if req.id <= 0 {
            return Err(SystemError::InvalidArgument(
                "application id must be positive".into(),
            ));
        }
        let app = self
            .applications
            .create(NewApplication {
                id: req.id,
                name: req.name,
                description: req.description,
                application_group_id: req.application_group_id,
                app_type: req.app_type,
            })
            .await?;
        tracing::info!(
            app_id = app.id,
            app_group_id = app.application_group_id,
            name = %app.name,
            "application created"
        );
        Ok(ApplicationWithTokens {
            app,
            tokens: Vec::new(),
        })
    }

    /// Rename, optionally moving the application to a new id. Tokens and ACL
    /// rows follow by cascade.
    pub async fn update(&self, req: ApplicationUpdate) -> RepoResult<ApplicationWithTokens> {
        let app = self
            .applications
            .update_with_new_id(req.old_id, req.new_id, &req.name, &req.description)
            .await?;
        tracing::info!(old_id = req.old_id, new_id = app.id, name = %app.name, "application updated");
        self.enrich_one(app).await
    }

    pub async fn create_update(&self, req: ApplicationWrite) -> RepoResult<ApplicationWithTokens> {
        let existing = self
            .applications
            .get_by_name_and_app_group_id(&req.name, req.application_group_id)
            .await;
        ensure_name_free(existing, req.id, |a| a.id, SystemError::ApplicationDuplicateName)?;

        if req.id != 0 {
            self.applications.get_by_id(req.id).await?;
            let app = self
                .applications
                .update(req.id, &req.name, &req.description)
                .await?;
            tracing::info!(app_id = app.id, name = %app.name, "application updated");
            return self.enrich_one(app).await;
        }

        self.groups.get_by_id(req.application_group_id).await?;
        let mut attempt = 1;
        loop {
            let id = self.applications.next_id().await?;
            match self.create(ApplicationWrite { id, ..req.clone() }).await {
                Err(SystemError::ApplicationDuplicateId) if attempt < ALLOCATE_ATTEMPTS => {
                    tracing::warn!(id, attempt, "application id taken concurrently, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Delete applications under one transaction; tokens and ACL rows go by
    /// cascade.
    pub async fn delete(&self, ids: &[i32]) -> RepoResult<u64> {
        require_ids(ids, "application")?;
        let owned = ids.to_vec();
        let work = ApplicationDeleteWork::new(move |tx| {
            Box::pin(async move { tx.delete_by_id_list(&owned).await })
        });
        let deleted = self.tx.application_delete_tx(work).await?;
        tracing::info!(requested = ids.len(), deleted, "applications deleted");
        Ok(deleted)
    }

    /// Domains → groups (`services`) → applications, without tokens.
    pub async fn system_tree(&self, system_id: i32) -> RepoResult<Vec<DomainNode>> {
        let domains = self.domains.get_by_system_id(system_id).await?;
        let domain_ids: Vec<i32> = domains.iter().map(|d| d.id).collect();
        let groups = if domain_ids.is_empty() {
            Vec::new()
        } else {
            self.groups.get_by_domain_ids(&domain_ids).await?
        };
        let group_ids: Vec<i32> = groups.iter().map(|g| g.id).collect();
        let apps = if group_ids.is_empty() {
            Vec::new()
        } else {
            self.applications.get_by_app_group_ids(&group_ids).await?
        };
        Ok(build_system_tree(domains, groups, apps))
    }

    /// Attach every token to its application with a single token query.
    pub async fn enrich_with_tokens(
        &self,
        apps: Vec<Application>,
    ) -> RepoResult<Vec<ApplicationWithTokens>> {
        if apps.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = apps.iter().map(|a| a.id).collect();
        let tokens = self.tokens.get_by_app_ids(&ids).await?;
        Ok(attach_tokens(apps, tokens))
    }

    async fn enrich_one(&self, app: Application) -> RepoResult<ApplicationWithTokens> {
        let tokens = self.tokens.get_by_app_id(app.id).await?;
        Ok(ApplicationWithTokens { app, tokens })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::Utc;
    use isp_core::{AccessList, Token};

    struct Fixture {
        svc: ApplicationService,
        store: MemoryStore,
        group_id: i32,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let repos = store.repositories();
        let domain = repos.domains.create("d", "", 1).await.unwrap();
        let group = repos.app_groups.create("g", "", domain.id).await.unwrap();
        Fixture {
            svc: ApplicationService::new(&repos),
            store,
            group_id: group.id,
        }
    }

    fn write(id: i32, name: &str, group: i32) -> ApplicationWrite {
        ApplicationWrite {
            id,
            name: name.to_string(),
            description: String::new(),
            application_group_id: group,
            app_type: ApplicationType::Mobile,
        }
    }

    #[tokio::test]
    async fn create_returns_empty_token_list() {
        let f = fixture().await;
        let app = f.svc.create(write(7, "a", f.group_id)).await.unwrap();
        assert_eq!(app.app.id, 7);
        assert!(app.tokens.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_non_positive_id() {
        let f = fixture().await;
        assert!(matches!(
            f.svc.create(write(0, "a", f.group_id)).await,
            Err(SystemError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn create_update_allocates_next_id() {
        let f = fixture().await;
        f.svc.create(write(10, "a", f.group_id)).await.unwrap();
        let app = f.svc.create_update(write(0, "b", f.group_id)).await.unwrap();
        assert_eq!(app.app.id, 11);
        assert_eq!(f.svc.next_id().await.unwrap(), 12);
    }

    #[tokio::test]
    async fn create_update_twice_is_duplicate_name() {
        let f = fixture().await;
        f.svc.create_update(write(0, "a", f.group_id)).await.unwrap();
        assert_eq!(
            f.svc
                .create_update(write(0, "a", f.group_id))
                .await
                .unwrap_err(),
            SystemError::ApplicationDuplicateName
        );
    }

    #[tokio::test]
    async fn create_update_in_missing_group_is_not_found() {
        let f = fixture().await;
        assert_eq!(
            f.svc.create_update(write(0, "a", 404)).await.unwrap_err(),
            SystemError::AppGroupNotFound
        );
    }

    #[tokio::test]
    async fn create_update_with_id_renames_in_place() {
        let f = fixture().await;
        f.svc.create(write(3, "a", f.group_id)).await.unwrap();
        let renamed = f.svc.create_update(write(3, "b", f.group_id)).await.unwrap();
        assert_eq!(renamed.app.id, 3);
        assert_eq!(renamed.app.name, "b");
        assert_eq!(renamed.app.app_type, ApplicationType::Mobile);
    }

    #[tokio::test]
    async fn update_moves_children_to_new_id() {
        let f = fixture().await;
        f.svc.create(write(3, "a", f.group_id)).await.unwrap();
        let repos = f.store.repositories();
        repos
            .tx
            .token_create_tx(crate::repository::TokenCreateWork::new(|tx| {
                Box::pin(async move {
                    tx.save(&Token {
                        token: "t".into(),
                        app_id: 3,
                        expire_time: -1,
                        created_at: Utc::now(),
                    })
                    .await
                })
            }))
            .await
            .unwrap();
        repos
            .tx
            .access_list_set_one_tx(crate::repository::AccessListSetOneWork::new(|tx| {
                Box::pin(async move {
                    tx.upsert(&AccessList {
                        app_id: 3,
                        method: "m".into(),
                        value: true,
                    })
                    .await
                })
            }))
            .await
            .unwrap();

        let moved = f
            .svc
            .update(ApplicationUpdate {
                old_id: 3,
                new_id: 30,
                name: "a".into(),
                description: "moved".into(),
            })
            .await
            .unwrap();
        assert_eq!(moved.app.id, 30);
        assert_eq!(moved.tokens.len(), 1);
        assert_eq!(moved.tokens[0].app_id, 30);
        assert!(repos.access_lists.get_by_app_id_and_method(30, "m").await.unwrap().value);
        assert_eq!(
            f.svc.get_by_id(3).await.unwrap_err(),
            SystemError::ApplicationNotFound
        );
    }

    #[tokio::test]
    async fn delete_cascades_and_is_idempotent() {
        let f = fixture().await;
        f.svc.create(write(3, "a", f.group_id)).await.unwrap();
        assert_eq!(f.svc.delete(&[3]).await.unwrap(), 1);
        assert_eq!(f.svc.delete(&[3]).await.unwrap(), 0);
        assert!(matches!(
            f.svc.delete(&[]).await,
            Err(SystemError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn enrich_with_tokens_handles_empty_and_order() {
        let f = fixture().await;
        assert!(f.svc.enrich_with_tokens(Vec::new()).await.unwrap().is_empty());
        let a = f.svc.create(write(1, "a", f.group_id)).await.unwrap().app;
        let b = f.svc.create(write(2, "b", f.group_id)).await.unwrap().app;
        let out = f.svc.enrich_with_tokens(vec![b, a]).await.unwrap();
        assert_eq!(out.iter().map(|x| x.app.id).collect::<Vec<_>>(), vec![2, 1]);
        assert!(out.iter().all(|x| x.tokens.is_empty()));
    }

    #[tokio::test]
    async fn system_tree_nests_levels() {
        let f = fixture().await;
        f.svc.create(write(1, "a", f.group_id)).await.unwrap();
        let tree = f.svc.system_tree(1).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].services.len(), 1);
        assert_eq!(tree[0].services[0].apps[0].id, 1);
        assert!(f.svc.system_tree(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn every_listed_application_has_its_group() {
        let f = fixture().await;
        for id in 1..=5 {
            f.svc
                .create(write(id, &format!("a{id}"), f.group_id))
                .await
                .unwrap();
        }
        let repos = f.store.repositories();
        for app in f.svc.get_all().await.unwrap() {
            let group = repos
                .app_groups
                .get_by_id(app.app.application_group_id)
                .await
                .unwrap();
            assert_eq!(group.id, app.app.application_group_id);
        }
    }
}
