//! Backend-owned records as the client reads them.
//!
//! Products, pools and requests are created and owned by the backend. The
//! client only deserializes and joins them for display; nothing here is
//! ever written back.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{flexible_date, flexible_timestamp, DbId, Timestamp};

// ---------------------------------------------------------------------------
// Pool status
// ---------------------------------------------------------------------------

/// Pool accepts new requests until its deadline.
pub const STATUS_OPEN: &str = "open";

/// Pool reached its minimum quantity.
pub const STATUS_SUCCESS: &str = "success";

/// Pool closed without reaching its minimum quantity.
pub const STATUS_FAILED: &str = "failed";

/// All pool status values the backend is known to emit.
pub const VALID_POOL_STATUSES: &[&str] = &[STATUS_OPEN, STATUS_SUCCESS, STATUS_FAILED];

/// Backend-authoritative pool status.
///
/// Unknown strings are preserved so they can be shown as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PoolStatus {
    Open,
    Success,
    Failed,
    Other(String),
}

impl PoolStatus {
    pub fn from_str_value(s: &str) -> Self {
        match s {
            STATUS_OPEN => Self::Open,
            STATUS_SUCCESS => Self::Success,
            STATUS_FAILED => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => STATUS_OPEN,
            Self::Success => STATUS_SUCCESS,
            Self::Failed => STATUS_FAILED,
            Self::Other(raw) => raw,
        }
    }

    /// Placeholder used when the backend omits the status entirely.
    pub fn unknown() -> Self {
        Self::Other("unknown".to_string())
    }
}

impl Serialize for PoolStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PoolStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_str_value(&raw))
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A product offered by a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: DbId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub unit_price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Email of the owning company account.
    #[serde(default)]
    pub email: Option<String>,
}

/// A group-buying pool for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub id: DbId,
    pub product_id: DbId,
    #[serde(default, with = "flexible_date::option")]
    pub start_at: Option<NaiveDate>,
    #[serde(with = "flexible_date")]
    pub end_at: NaiveDate,
    pub min_quantity: i32,
    #[serde(default = "PoolStatus::unknown")]
    pub status: PoolStatus,
    #[serde(default)]
    pub total_quantity_sold: Option<i64>,
    #[serde(default)]
    pub total_participants: Option<i64>,
}

/// Partial pool embedded in a request listing.
///
/// The requests-by-email endpoint joins a subset of pool columns; status is
/// usually absent, in which case the full pool has to be looked up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    #[serde(default)]
    pub product_id: Option<DbId>,
    #[serde(default, with = "flexible_date::option")]
    pub start_at: Option<NaiveDate>,
    #[serde(default, with = "flexible_date::option")]
    pub end_at: Option<NaiveDate>,
    #[serde(default)]
    pub min_quantity: Option<i32>,
    #[serde(default)]
    pub status: Option<PoolStatus>,
}

impl PoolSnapshot {
    /// Promote the snapshot to a full pool when it carries enough fields.
    ///
    /// A missing status becomes [`PoolStatus::unknown`] so the result can
    /// never be mistaken for an open pool.
    pub fn to_pool(&self, pool_id: DbId) -> Option<Pool> {
        Some(Pool {
            id: pool_id,
            product_id: self.product_id?,
            start_at: self.start_at,
            end_at: self.end_at?,
            min_quantity: self.min_quantity.unwrap_or_default(),
            status: self.status.clone().unwrap_or_else(PoolStatus::unknown),
            total_quantity_sold: None,
            total_participants: None,
        })
    }
}

/// One participant's commitment against a pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolRequest {
    pub id: DbId,
    pub pool_id: DbId,
    pub email: String,
    pub quantity: i32,
    #[serde(with = "flexible_timestamp")]
    pub created_at: Timestamp,
    #[serde(default)]
    pub pool: Option<PoolSnapshot>,
}

// ---------------------------------------------------------------------------
// Product references
// ---------------------------------------------------------------------------

/// Name shown when a product lookup fails.
pub const SENTINEL_PRODUCT_NAME: &str = "Product not found";

/// Description shown when a product lookup fails.
pub const SENTINEL_PRODUCT_DESCRIPTION: &str = "Product information unavailable";

/// Description shown for a resolved product without one.
pub const DEFAULT_PRODUCT_DESCRIPTION: &str = "No description available";

/// Anything that can be displayed as a priced product.
pub trait Priced {
    fn unit_price(&self) -> f64;
    fn display_name(&self) -> &str;
    fn display_description(&self) -> &str;
}

impl Priced for Product {
    fn unit_price(&self) -> f64 {
        self.unit_price
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn display_description(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_PRODUCT_DESCRIPTION)
    }
}

/// Placeholder for a product that could not be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnresolvedProduct {
    pub product_id: Option<DbId>,
}

impl Priced for UnresolvedProduct {
    fn unit_price(&self) -> f64 {
        0.0
    }

    fn display_name(&self) -> &str {
        SENTINEL_PRODUCT_NAME
    }

    fn display_description(&self) -> &str {
        SENTINEL_PRODUCT_DESCRIPTION
    }
}

/// A product that was either loaded or replaced by the sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductRef {
    Resolved(Product),
    Unresolved(UnresolvedProduct),
}

impl ProductRef {
    pub fn unresolved(product_id: Option<DbId>) -> Self {
        Self::Unresolved(UnresolvedProduct { product_id })
    }

    pub fn id(&self) -> Option<DbId> {
        match self {
            Self::Resolved(p) => Some(p.id),
            Self::Unresolved(u) => u.product_id,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn image_url(&self) -> Option<&str> {
        match self {
            Self::Resolved(p) => p.image_url.as_deref(),
            Self::Unresolved(_) => None,
        }
    }

    fn as_priced(&self) -> &dyn Priced {
        match self {
            Self::Resolved(p) => p,
            Self::Unresolved(u) => u,
        }
    }
}

impl Priced for ProductRef {
    fn unit_price(&self) -> f64 {
        self.as_priced().unit_price()
    }

    fn display_name(&self) -> &str {
        self.as_priced().display_name()
    }

    fn display_description(&self) -> &str {
        self.as_priced().display_description()
    }
}

/// Flat view of a [`ProductRef`] for serialized snapshots.
#[derive(Serialize)]
struct ProductRefView<'a> {
    id: Option<DbId>,
    name: &'a str,
    description: &'a str,
    unit_price: f64,
    image_url: Option<&'a str>,
    resolved: bool,
}

impl Serialize for ProductRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ProductRefView {
            id: self.id(),
            name: self.display_name(),
            description: self.display_description(),
            unit_price: self.unit_price(),
            image_url: self.image_url(),
            resolved: self.is_resolved(),
        }
        .serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
