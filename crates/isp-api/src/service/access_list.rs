//! Access-list service. Every operation checks the application first.

use std::sync::Arc;

use isp_core::AccessList;

use crate::repository::{
    AccessListRepository, AccessListSetListWork, AccessListSetOneWork, ApplicationRepository,
    RepoResult, Repositories, TransactionManager,
};

/// One `(method, value)` pair of a bulk set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodValue {
    pub method: String,
    pub value: bool,
}

/// Bulk set request. With `remove_old` the listed rows replace every row of
/// the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetListRequest {
    pub app_id: i32,
    pub remove_old: bool,
    pub methods: Vec<MethodValue>,
}

#[derive(Clone)]
pub struct AccessListService {
    applications: Arc<dyn ApplicationRepository>,
    access_lists: Arc<dyn AccessListRepository>,
    tx: Arc<dyn TransactionManager>,
}

impl AccessListService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            applications: repos.applications.clone(),
            access_lists: repos.access_lists.clone(),
            tx: repos.tx.clone(),
        }
    }

    pub async fn get_by_id(&self, app_id: i32) -> RepoResult<Vec<AccessList>> {
        self.applications.get_by_id(app_id).await?;
        self.access_lists.get_by_app_id(app_id).await
    }

    /// Upsert one row; returns rows affected.
    pub async fn set_one(&self, row: AccessList) -> RepoResult<u64> {
        self.applications.get_by_id(row.app_id).await?;
        let (app_id, method, value) = (row.app_id, row.method.clone(), row.value);
        let work =
            AccessListSetOneWork::new(move |tx| Box::pin(async move { tx.upsert(&row).await }));
        let affected = self.tx.access_list_set_one_tx(work).await?;
        tracing::info!(app_id, method = %method, value, "access list row set");
        Ok(affected)
    }

    /// Apply a bulk set and return every row the application holds afterwards.
    pub async fn set_list(&self, req: SetListRequest) -> RepoResult<Vec<AccessList>> {
        self.applications.get_by_id(req.app_id).await?;
        let SetListRequest {
            app_id,
            remove_old,
            methods,
        } = req;
        let requested = methods.len();
        let work = AccessListSetListWork::new(move |tx| {
            Box::pin(async move {
                if remove_old {
                    tx.delete_by_app_id(app_id).await?;
                }
                let names: Vec<String> = methods.iter().map(|m| m.method.clone()).collect();
                tx.delete_by_app_id_and_methods(app_id, &names).await?;
                let rows: Vec<AccessList> = methods
                    .into_iter()
                    .map(|m| AccessList {
                        app_id,
                        method: m.method,
                        value: m.value,
                    })
                    .collect();
                tx.insert_all(&rows).await?;
                tx.get_by_app_id(app_id).await
            })
        });
        let rows = self.tx.access_list_set_list_tx(work).await?;
        tracing::info!(app_id, remove_old, requested, total = rows.len(), "access list replaced");
        Ok(rows)
    }

    pub async fn delete_list(&self, app_id: i32, methods: &[String]) -> RepoResult<u64> {
        self.applications.get_by_id(app_id).await?;
        if methods.is_empty() {
            return Ok(0);
        }
        let deleted = self
            .access_lists
            .delete_by_app_id_and_methods(app_id, methods)
            .await?;
        tracing::info!(app_id, requested = methods.len(), deleted, "access list rows deleted");
        Ok(deleted)
    }
}
