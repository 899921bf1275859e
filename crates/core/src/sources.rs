//! Collaborator contracts consumed by the aggregation logic.
//!
//! The core never talks to the network itself. Views receive these traits
//! and the HTTP client crate implements them; tests implement them with
//! in-memory fakes.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::{Pool, Product, ProductRef};
use crate::types::DbId;

/// Loads a single product by id.
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn product(&self, id: DbId) -> Result<Product, CoreError>;
}

/// Loads a single pool by id.
#[async_trait]
pub trait PoolSource: Send + Sync {
    async fn pool(&self, id: DbId) -> Result<Pool, CoreError>;
}

/// Fetches the signed-in user's role from the backend.
///
/// `Ok(None)` means the user exists but has no role assigned yet.
#[async_trait]
pub trait RoleSource: Send + Sync {
    async fn user_role(&self) -> Result<Option<String>, CoreError>;
}

/// Look up a product, substituting the sentinel when it cannot be loaded.
///
/// Never fails: a missing id or any lookup error yields
/// [`ProductRef::Unresolved`].
pub async fn resolve_product<S: ProductSource + ?Sized>(
    product_id: Option<DbId>,
    products: &S,
) -> ProductRef {
    let Some(id) = product_id else {
        return ProductRef::unresolved(None);
    };
    match products.product(id).await {
        Ok(product) => ProductRef::Resolved(product),
        Err(e) => {
            tracing::warn!(product_id = id, error = %e, "Product lookup failed, using placeholder");
            ProductRef::unresolved(Some(id))
        }
    }
}
