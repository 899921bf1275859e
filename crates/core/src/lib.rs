//! Domain logic for the group-buying marketplace client.
//!
//! Pool lifecycle classification, request aggregation, sales analytics and
//! session role gating. Network access happens only through the traits in
//! [`sources`].

pub mod analytics;
pub mod error;
pub mod models;
pub mod pool_board;
pub mod pool_status;
pub mod requests;
pub mod roles;
pub mod session;
pub mod sources;
pub mod types;
pub mod validation;

#[cfg(test)]
mod test_support;
