//! Marketplace dashboard: role-gated pools, requests and analytics views
//! over the REST API.

pub mod error;
pub mod state;
pub mod views;

pub use error::DashboardError;
pub use views::Dashboard;

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "groupbuy_dashboard=info,groupbuy_client=info";
