#![deny(missing_docs)]

//! # isp-core: Domain Model for the ISP System Service
//!
//! The system service is the registry and access-control backend for the
//! applications of a platform. This crate holds the parts of it that do not
//! touch a database or a socket:
//!
//! - the four-level identity hierarchy
//!   (System → [`Domain`] → [`AppGroup`] → [`Application`]),
//! - opaque bearer [`Token`]s and their lifetime arithmetic,
//! - per-application [`AccessList`] rows,
//! - the [`SystemError`] taxonomy every layer reports through,
//! - the read projections ([`ApplicationWithTokens`], the system tree),
//! - the random [`TokenSource`] and the baseline advisory-lock key.
//!
//! ## Crate Policy
//!
//! - No I/O. Persistence and transport live in `isp-api`.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - Public records derive `Debug`, `Clone`, `Serialize`, `Deserialize`; with
//!   the `openapi` feature they also derive `utoipa::ToSchema`.

pub mod auth;
pub mod error;
pub mod lock;
pub mod model;
pub mod projection;
pub mod token;

pub use auth::{AuthData, AuthDecision};
pub use error::SystemError;
pub use lock::{advisory_lock_key, fnv1a_32, BASELINE_LOCK_NAME, LOCK_NAMESPACE};
pub use model::{
    AccessList, AppGroup, Application, ApplicationType, Domain, NewApplication, Token,
    DEFAULT_DOMAIN_ID, DEFAULT_SYSTEM_ID, NEVER_EXPIRES,
};
pub use projection::{
    attach_tokens, build_system_tree, ApplicationWithTokens, DomainNode, ServiceNode,
};
pub use token::{RandomTokenSource, TokenSource, TOKEN_BYTES};
