//! # Services
//!
//! Business rules over the repository ports. Each service is concrete and
//! cheap to clone; [`Services`] wires the whole graph from one
//! [`Repositories`] set.

pub mod access_list;
pub mod app_group;
pub mod application;
pub mod baseline;
pub mod domain;
pub mod secure;
pub mod token;
mod validation;

use std::sync::Arc;

use isp_core::TokenSource;

use crate::repository::Repositories;

pub use access_list::{AccessListService, MethodValue, SetListRequest};
pub use app_group::{AppGroupService, AppGroupWrite};
pub use application::{ApplicationService, ApplicationUpdate, ApplicationWrite};
pub use baseline::{BaselineOutcome, BaselineService};
pub use domain::{DomainService, DomainWrite};
pub use secure::SecureService;
pub use token::{RevokeOutcome, TokenService};

/// Every service, built over one storage backend.
#[derive(Clone)]
pub struct Services {
    pub domains: DomainService,
    pub app_groups: AppGroupService,
    pub applications: ApplicationService,
    pub tokens: TokenService,
    pub access_lists: AccessListService,
    pub secure: SecureService,
    pub baseline: BaselineService,
}

impl Services {
    pub fn new(repos: Repositories, token_source: Arc<dyn TokenSource>) -> Self {
        Self {
            domains: DomainService::new(repos.domains.clone()),
            app_groups: AppGroupService::new(repos.app_groups.clone(), repos.domains.clone()),
            applications: ApplicationService::new(&repos),
            tokens: TokenService::new(&repos, token_source),
            access_lists: AccessListService::new(&repos),
            secure: SecureService::new(repos.tokens.clone(), repos.access_lists.clone()),
            baseline: BaselineService::new(repos.tx.clone()),
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
