//! Application group service.
//!
//! Writes carry an optional parent domain; when unset, the group belongs to
//! [`DEFAULT_DOMAIN_ID`] (single-domain deployments).

use std::sync::Arc;

use isp_core::{AppGroup, SystemError, DEFAULT_DOMAIN_ID};

use super::validation::{ensure_name_free, require_ids};
use crate::repository::{AppGroupRepository, DomainRepository, RepoResult};

/// Create-or-rename request; `id == 0` creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppGroupWrite {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub domain_id: Option<i32>,
}

impl AppGroupWrite {
    fn domain_id(&self) -> i32 {
        self.domain_id.unwrap_or(DEFAULT_DOMAIN_ID)
    }
}

#[derive(Clone)]
pub struct AppGroupService {
    groups: Arc<dyn AppGroupRepository>,
    domains: Arc<dyn DomainRepository>,
}

impl AppGroupService {
    pub fn new(groups: Arc<dyn AppGroupRepository>, domains: Arc<dyn DomainRepository>) -> Self {
        Self { groups, domains }
    }

    pub async fn get_by_id(&self, id: i32) -> RepoResult<AppGroup> {
        self.groups.get_by_id(id).await
    }

    pub async fn get_by_id_list(&self, ids: &[i32]) -> RepoResult<Vec<AppGroup>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.groups.get_by_id_list(ids).await
    }

    pub async fn get_by_domain_id(&self, domain_id: i32) -> RepoResult<Vec<AppGroup>> {
        self.groups.get_by_domain_ids(&[domain_id]).await
    }

    pub async fn get_all(&self) -> RepoResult<Vec<AppGroup>> {
        self.groups.get_all().await
    }

    /// Insert a new group; `req.id` is ignored.
    pub async fn create(&self, req: AppGroupWrite) -> RepoResult<AppGroup> {
        let domain_id = req.domain_id();
        let existing = self
            .groups
            .get_by_name_and_domain_id(&req.name, domain_id)
            .await;
        ensure_name_free(existing, 0, |g| g.id, SystemError::AppGroupDuplicateName)?;
        self.domains.get_by_id(domain_id).await?;

        let group = self
            .groups
            .create(&req.name, &req.description, domain_id)
            .await?;
        tracing::info!(
            app_group_id = group.id,
            domain_id,
            name = %group.name,
            "application group created"
        );
        Ok(group)
    }

    /// Rename group `req.id`.
    pub async fn update(&self, req: AppGroupWrite) -> RepoResult<AppGroup> {
        if req.id == 0 {
            return Err(SystemError::InvalidArgument(
                "application group id is required".into(),
            ));
        }
        let current = self.groups.get_by_id(req.id).await?;
        let domain_id = req.domain_id.unwrap_or(current.domain_id);
        let existing = self
            .groups
            .get_by_name_and_domain_id(&req.name, domain_id)
            .await;
        ensure_name_free(existing, req.id, |g| g.id, SystemError::AppGroupDuplicateName)?;

        let group = self
            .groups
            .update(req.id, &req.name, &req.description)
            .await?;
        tracing::info!(app_group_id = group.id, name = %group.name, "application group updated");
        Ok(group)
    }

    pub async fn create_update(&self, req: AppGroupWrite) -> RepoResult<AppGroup> {
        if req.id == 0 {
            self.create(req).await
        } else {
            self.update(req).await
        }
    }

    pub async fn delete_list(&self, ids: &[i32]) -> RepoResult<u64> {
        require_ids(ids, "application group")?;
        let deleted = self.groups.delete_by_id_list(ids).await?;
        tracing::info!(requested = ids.len(), deleted, "application groups deleted");
        Ok(deleted)
    }
}
