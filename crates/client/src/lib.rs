//! REST client and session persistence for the group-buying marketplace.
//!
//! [`api::ApiClient`] implements the collaborator traits of
//! `groupbuy_core::sources` against the HTTP API; [`store::FileSessionStore`]
//! keeps the session between runs.

pub mod api;
pub mod auth;
pub mod config;
pub mod store;

pub use api::{ApiClient, ApiError};
pub use config::{ClientConfig, ConfigError};
pub use store::{FileSessionStore, SessionStoreError};
