//! Input validation for pool creation, joining, and product creation.
//!
//! Inputs mirror the raw form fields (everything optional) so that missing
//! values produce the same messages the forms show. Validation happens
//! before anything is submitted; a rejected input is never partially sent.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::error::CoreError;
use crate::models::{Pool, PoolStatus};
use crate::pool_status::{classify, PoolPhase};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Smallest minimum quantity a pool may be created with.
pub const MIN_POOL_QUANTITY: i32 = 2;

/// Smallest quantity a participant may request.
pub const MIN_REQUEST_QUANTITY: i32 = 1;

pub const MSG_DEADLINE_IN_PAST: &str = "Deadline cannot be in the past";
pub const MSG_POOL_CLOSED: &str = "This pool is no longer accepting requests";
pub const MSG_POOL_EXPIRED: &str = "This pool has passed its deadline";

// ---------------------------------------------------------------------------
// Pool creation
// ---------------------------------------------------------------------------

/// Raw "create pool" form values.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreatePoolInput {
    #[validate(required(message = "Please select a product"))]
    pub product_id: Option<DbId>,
    #[validate(
        required(message = "Minimum quantity must be at least 2"),
        range(min = 2, message = "Minimum quantity must be at least 2")
    )]
    pub min_quantity: Option<i32>,
    #[validate(required(message = "Please select a deadline"))]
    pub deadline: Option<NaiveDate>,
}

/// Validated payload for `POST /pools`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPool {
    pub product_id: DbId,
    pub start_at: NaiveDate,
    pub end_at: NaiveDate,
    pub min_quantity: i32,
}

/// Validate a pool creation form. The pool starts `today`.
pub fn validate_create_pool(
    input: &CreatePoolInput,
    today: NaiveDate,
) -> Result<NewPool, CoreError> {
    input
        .validate()
        .map_err(|e| first_error(&e, &["product_id", "min_quantity", "deadline"]))?;

    let (Some(product_id), Some(min_quantity), Some(end_at)) =
        (input.product_id, input.min_quantity, input.deadline)
    else {
        return Err(CoreError::Validation("Incomplete pool form".into()));
    };

    if end_at < today {
        return Err(CoreError::Validation(MSG_DEADLINE_IN_PAST.into()));
    }

    Ok(NewPool {
        product_id,
        start_at: today,
        end_at,
        min_quantity,
    })
}

// ---------------------------------------------------------------------------
// Joining a pool
// ---------------------------------------------------------------------------

/// Raw "join pool" form values.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct JoinPoolInput {
    #[validate(
        required(message = "Please enter your email"),
        email(message = "Please enter a valid email")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "Please enter a valid quantity"),
        range(min = 1, message = "Please enter a valid quantity")
    )]
    pub quantity: Option<i32>,
}

/// Validated payload for `POST /pools/{id}/requests`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPoolRequest {
    pub email: String,
    pub quantity: i32,
}

/// Validate a join form against the pool being joined.
///
/// The pool must be open and within its deadline; the backend rejects
/// joins on closed pools anyway, this only avoids the round trip.
pub fn validate_join_request(
    pool: &Pool,
    input: &JoinPoolInput,
    now: Timestamp,
) -> Result<NewPoolRequest, CoreError> {
    let normalized = JoinPoolInput {
        email: input
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string),
        quantity: input.quantity,
    };
    normalized
        .validate()
        .map_err(|e| first_error(&e, &["email", "quantity"]))?;

    if pool.status != PoolStatus::Open {
        return Err(CoreError::Validation(MSG_POOL_CLOSED.into()));
    }
    if classify(pool, now).phase == PoolPhase::Expired {
        return Err(CoreError::Validation(MSG_POOL_EXPIRED.into()));
    }

    let (Some(email), Some(quantity)) = (normalized.email, normalized.quantity) else {
        return Err(CoreError::Validation("Incomplete join form".into()));
    };

    Ok(NewPoolRequest { email, quantity })
}

// ---------------------------------------------------------------------------
// Product creation
// ---------------------------------------------------------------------------

/// Raw "add product" form values.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewProductInput {
    #[validate(
        required(message = "Please enter a product name"),
        length(min = 1, message = "Please enter a product name")
    )]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(
        required(message = "Please enter a valid price"),
        range(min = 0.0, message = "Please enter a valid price")
    )]
    pub unit_price: Option<f64>,
    #[validate(url(message = "Image URL is not valid"))]
    pub image_url: Option<String>,
}

/// Validated payload for `POST /products`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub unit_price: f64,
    pub image_url: Option<String>,
}

pub fn validate_new_product(input: &NewProductInput) -> Result<NewProduct, CoreError> {
    let normalized = NewProductInput {
        name: input.name.as_deref().map(|n| n.trim().to_string()),
        description: input
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        unit_price: input.unit_price.filter(|p| p.is_finite()),
        image_url: input.image_url.clone(),
    };
    normalized
        .validate()
        .map_err(|e| first_error(&e, &["name", "unit_price", "image_url"]))?;

    let (Some(name), Some(unit_price)) = (normalized.name, normalized.unit_price) else {
        return Err(CoreError::Validation("Incomplete product form".into()));
    };

    Ok(NewProduct {
        name,
        description: normalized.description,
        unit_price,
        image_url: normalized.image_url,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pick the first failing field in form order and surface its message.
fn first_error(errors: &ValidationErrors, field_order: &[&str]) -> CoreError {
    let fields = errors.field_errors();
    for field in field_order {
        let message = fields
            .get(*field)
            .and_then(|errs| errs.iter().find_map(|e| e.message.as_ref()));
        if let Some(message) = message {
            return CoreError::Validation(message.to_string());
        }
    }
    CoreError::Validation(errors.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
