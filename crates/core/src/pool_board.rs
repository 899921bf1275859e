//! Pool listing: pairs each pool with its product and display state.

use futures::future::join_all;
use serde::Serialize;

use crate::models::{Pool, Priced, ProductRef};
use crate::pool_status::{can_join, classify, PoolClassification};
use crate::session::Capabilities;
use crate::sources::{resolve_product, ProductSource};
use crate::types::Timestamp;

/// Everything a pool card shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolCard {
    pub pool: Pool,
    pub product: ProductRef,
    pub classification: PoolClassification,
    pub can_join: bool,
    pub deadline_text: String,
    pub unit_price: f64,
    /// Minimum quantity to show; never below 1.
    pub min_quantity: i32,
}

impl PoolCard {
    pub fn new(
        pool: Pool,
        product: ProductRef,
        capabilities: &Capabilities,
        now: Timestamp,
    ) -> Self {
        let classification = classify(&pool, now);
        Self {
            can_join: can_join(&classification, capabilities),
            deadline_text: classification.deadline_text(),
            unit_price: product.unit_price(),
            min_quantity: pool.min_quantity.max(1),
            pool,
            product,
            classification,
        }
    }

    /// Unit price as shown on the card, e.g. `$12.50`.
    pub fn price_text(&self) -> String {
        format!("${:.2}", self.unit_price)
    }
}

/// Build one card per pool, in input order.
///
/// Product lookups run concurrently; a failed lookup yields the sentinel
/// product and never drops the pool.
pub async fn load_pool_cards<S: ProductSource + ?Sized>(
    pools: Vec<Pool>,
    products: &S,
    capabilities: &Capabilities,
    now: Timestamp,
) -> Vec<PoolCard> {
    join_all(pools.into_iter().map(|pool| async move {
        let product = resolve_product(Some(pool.product_id), products).await;
        PoolCard::new(pool, product, capabilities, now)
    }))
    .await
}
