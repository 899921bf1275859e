//! In-memory collaborators shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};

use crate::error::CoreError;
use crate::models::{Pool, PoolStatus, Product};
use crate::sources::{PoolSource, ProductSource};
use crate::types::{DbId, Timestamp};

pub fn now() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap()
}

pub fn today() -> NaiveDate {
    now().date_naive()
}

pub fn product(id: DbId, name: &str, unit_price: f64) -> Product {
    Product {
        id,
        name: name.to_string(),
        description: None,
        unit_price,
        image_url: None,
        email: Some("sales@acme.test".to_string()),
    }
}

pub fn pool(id: DbId, product_id: DbId, status: PoolStatus, end_at: NaiveDate) -> Pool {
    Pool {
        id,
        product_id,
        start_at: Some(today()),
        end_at,
        min_quantity: 10,
        status,
        total_quantity_sold: None,
        total_participants: None,
    }
}

#[derive(Default)]
pub struct FakeProducts {
    products: HashMap<DbId, Product>,
    pub calls: AtomicUsize,
}

impl FakeProducts {
    pub fn with(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: products.into_iter().map(|p| (p.id, p)).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductSource for FakeProducts {
    async fn product(&self, id: DbId) -> Result<Product, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.products
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "Product",
                id,
            })
    }
}

#[derive(Default)]
pub struct FakePools {
    pools: HashMap<DbId, Pool>,
    pub calls: AtomicUsize,
}

impl FakePools {
    pub fn with(pools: impl IntoIterator<Item = Pool>) -> Self {
        Self {
            pools: pools.into_iter().map(|p| (p.id, p)).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PoolSource for FakePools {
    async fn pool(&self, id: DbId) -> Result<Pool, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pools
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound { entity: "Pool", id })
    }
}
