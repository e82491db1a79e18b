//! # Read Projections
//!
//! Shapes assembled from several relations for the read side of the API:
//!
//! - [`ApplicationWithTokens`]: an application plus every token it owns.
//! - [`DomainNode`] / [`ServiceNode`]: the three-level system tree. Application
//!   groups are exposed as `services` for compatibility with older clients,
//!   and tokens are left out of this view.
//!
//! Both are stitched in memory from flat lists fetched with one query per
//! level. Input order is preserved at every level, so an ordering applied by
//! storage (`created_at DESC`) carries through unchanged.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{AppGroup, Application, Domain, Token};

/// An application together with the tokens it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ApplicationWithTokens {
    /// The application record.
    #[serde(flatten)]
    pub app: Application,
    /// Tokens bound to the application; empty, never absent.
    pub tokens: Vec<Token>,
}

/// Attach tokens to their applications.
///
/// Returns one entry per input application in input order. Tokens whose
/// `app_id` matches no input application are ignored.
pub fn attach_tokens(apps: Vec<Application>, tokens: Vec<Token>) -> Vec<ApplicationWithTokens> {
    let mut by_app: HashMap<i32, Vec<Token>> = HashMap::new();
    for token in tokens {
        by_app.entry(token.app_id).or_default().push(token);
    }
    apps.into_iter()
        .map(|app| {
            let tokens = by_app.get(&app.id).cloned().unwrap_or_default();
            ApplicationWithTokens { app, tokens }
        })
        .collect()
}

/// A domain with its application groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DomainNode {
    /// The domain record.
    #[serde(flatten)]
    pub domain: Domain,
    /// Application groups of the domain.
    pub services: Vec<ServiceNode>,
}

/// An application group with its applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ServiceNode {
    /// The application group record.
    #[serde(flatten)]
    pub group: AppGroup,
    /// Applications of the group, without tokens.
    pub apps: Vec<Application>,
}

/// Stitch domains, groups and applications into the system tree.
///
/// Groups and applications whose parent is not in the input are dropped.
pub fn build_system_tree(
    domains: Vec<Domain>,
    groups: Vec<AppGroup>,
    apps: Vec<Application>,
) -> Vec<DomainNode> {
    let mut apps_by_group: HashMap<i32, Vec<Application>> = HashMap::new();
    for app in apps {
        apps_by_group
            .entry(app.application_group_id)
            .or_default()
            .push(app);
    }

    let mut groups_by_domain: HashMap<i32, Vec<ServiceNode>> = HashMap::new();
    for group in groups {
        let apps = apps_by_group.remove(&group.id).unwrap_or_default();
        groups_by_domain
            .entry(group.domain_id)
            .or_default()
            .push(ServiceNode { group, apps });
    }

    domains
        .into_iter()
        .map(|domain| {
            let services = groups_by_domain.remove(&domain.id).unwrap_or_default();
            DomainNode { domain, services }
        })
        .collect()
}
