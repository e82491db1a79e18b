//! Domain service.

use std::sync::Arc;

use isp_core::{Domain, SystemError};

use super::validation::{ensure_name_free, require_ids};
use crate::repository::{DomainRepository, RepoResult};

/// Create-or-rename request; `id == 0` creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainWrite {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub system_id: i32,
}

#[derive(Clone)]
pub struct DomainService {
    domains: Arc<dyn DomainRepository>,
}

impl DomainService {
    pub fn new(domains: Arc<dyn DomainRepository>) -> Self {
        Self { domains }
    }

    pub async fn get_by_id(&self, id: i32) -> RepoResult<Domain> {
        self.domains.get_by_id(id).await
    }

    pub async fn get_by_id_list(&self, ids: &[i32]) -> RepoResult<Vec<Domain>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.domains.get_by_id_list(ids).await
    }

    pub async fn get_by_system_id(&self, system_id: i32) -> RepoResult<Vec<Domain>> {
        self.domains.get_by_system_id(system_id).await
    }

    pub async fn create_update(&self, req: DomainWrite) -> RepoResult<Domain> {
        let existing = self
            .domains
            .get_by_name_and_system_id(&req.name, req.system_id)
            .await;
        ensure_name_free(existing, req.id, |d| d.id, SystemError::DomainDuplicateName)?;

        if req.id == 0 {
            let domain = self
                .domains
                .create(&req.name, &req.description, req.system_id)
                .await?;
            tracing::info!(domain_id = domain.id, name = %domain.name, "domain created");
            return Ok(domain);
        }

        self.domains.get_by_id(req.id).await?;
        let domain = self
            .domains
            .update(req.id, &req.name, &req.description)
            .await?;
        tracing::info!(domain_id = domain.id, name = %domain.name, "domain updated");
        Ok(domain)
    }

    /// Delete domains; groups, applications, tokens and ACL rows go by cascade.
    pub async fn delete(&self, ids: &[i32]) -> RepoResult<u64> {
        require_ids(ids, "domain")?;
        let deleted = self.domains.delete_by_id_list(ids).await?;
        tracing::info!(requested = ids.len(), deleted, "domains deleted");
        Ok(deleted)
    }
}
