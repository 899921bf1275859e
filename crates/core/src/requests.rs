//! Request aggregation: joins each request with its pool and product and
//! derives the status shown to the participant.

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::analytics::SAVINGS_RATE;
use crate::models::{Pool, PoolRequest, PoolStatus, Priced, ProductRef};
use crate::pool_status::{classify, PoolClassification, PoolPhase};
use crate::sources::{resolve_product, PoolSource, ProductSource};
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

pub const MSG_EXPIRED: &str = "Pool expired before completion";
pub const MSG_COMPLETED: &str = "Pool completed successfully";
pub const MSG_CLOSED: &str = "Pool closed without reaching the minimum";
pub const MSG_UNAVAILABLE: &str = "Pool status unavailable";

pub const LABEL_UNAVAILABLE: &str = "Unavailable";

/// Participant-facing explanation of a pool phase.
pub fn status_message(phase: &PoolPhase) -> String {
    match phase {
        PoolPhase::Active { days_remaining } => {
            format!("Waiting for pool to complete ({days_remaining} days left)")
        }
        PoolPhase::Expired => MSG_EXPIRED.to_string(),
        PoolPhase::Completed => MSG_COMPLETED.to_string(),
        PoolPhase::Closed => MSG_CLOSED.to_string(),
        PoolPhase::Unknown { .. } => MSG_UNAVAILABLE.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

/// A request joined with its pool and product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRequest {
    pub request: PoolRequest,
    /// Resolved pool; `None` when neither a lookup nor the embedded snapshot
    /// produced one.
    pub pool: Option<Pool>,
    pub product: ProductRef,
    pub classification: PoolClassification,
    pub message: String,
}

impl EnrichedRequest {
    /// Quantity times the product's unit price.
    pub fn total_price(&self) -> f64 {
        f64::from(self.request.quantity) * self.product.unit_price()
    }
}

/// Enrich every request concurrently.
///
/// The output has one entry per input, in input order. Lookup failures are
/// absorbed per request and never abort the batch.
pub async fn enrich<P, S>(
    requests: Vec<PoolRequest>,
    pools: &P,
    products: &S,
    now: Timestamp,
) -> Vec<EnrichedRequest>
where
    P: PoolSource + ?Sized,
    S: ProductSource + ?Sized,
{
    join_all(
        requests
            .into_iter()
            .map(|request| enrich_one(request, pools, products, now)),
    )
    .await
}

async fn enrich_one<P, S>(
    request: PoolRequest,
    pools: &P,
    products: &S,
    now: Timestamp,
) -> EnrichedRequest
where
    P: PoolSource + ?Sized,
    S: ProductSource + ?Sized,
{
    let pool = resolve_pool(&request, pools).await;

    let product_id = pool
        .as_ref()
        .map(|p| p.product_id)
        .or_else(|| request.pool.as_ref().and_then(|s| s.product_id));
    let product = resolve_product(product_id, products).await;

    let classification = match &pool {
        Some(pool) if pool.status != PoolStatus::unknown() => classify(pool, now),
        _ => unavailable(),
    };
    let message = status_message(&classification.phase);

    EnrichedRequest {
        request,
        pool,
        product,
        classification,
        message,
    }
}

/// No status could be determined for the request's pool.
fn unavailable() -> PoolClassification {
    let status = PoolStatus::unknown();
    PoolClassification {
        label: LABEL_UNAVAILABLE.to_string(),
        ..PoolClassification::unknown(status.as_str())
    }
}

/// Prefer an embedded snapshot that carries a status; otherwise look the
/// pool up and fall back to whatever the snapshot has.
async fn resolve_pool<P: PoolSource + ?Sized>(request: &PoolRequest, pools: &P) -> Option<Pool> {
    let snapshot = request.pool.as_ref();

    if let Some(pool) = snapshot
        .filter(|s| s.status.is_some())
        .and_then(|s| s.to_pool(request.pool_id))
    {
        return Some(pool);
    }

    match pools.pool(request.pool_id).await {
        Ok(pool) => Some(pool),
        Err(e) => {
            tracing::warn!(
                request_id = request.id,
                pool_id = request.pool_id,
                error = %e,
                "Pool lookup failed, falling back to embedded snapshot"
            );
            snapshot.and_then(|s| s.to_pool(request.pool_id))
        }
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Header counters of the "my requests" page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestStats {
    pub total_requests: usize,
    pub total_quantity: i64,
    pub waiting: usize,
    pub completed: usize,
    pub closed: usize,
    pub expired: usize,
    pub unavailable: usize,
    /// Estimated savings on completed pools.
    pub estimated_savings: f64,
}

impl RequestStats {
    pub fn from_requests(requests: &[EnrichedRequest]) -> Self {
        let mut stats = Self {
            total_requests: requests.len(),
            ..Self::default()
        };
        for req in requests {
            stats.total_quantity += i64::from(req.request.quantity);
            match req.classification.phase {
                PoolPhase::Active { .. } => stats.waiting += 1,
                PoolPhase::Expired => stats.expired += 1,
                PoolPhase::Completed => {
                    stats.completed += 1;
                    stats.estimated_savings += req.total_price() * SAVINGS_RATE;
                }
                PoolPhase::Closed => stats.closed += 1,
                PoolPhase::Unknown { .. } => stats.unavailable += 1,
            }
        }
        stats
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Tabs of the "my requests" page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestFilter {
    #[default]
    All,
    Waiting,
    Completed,
    Closed,
    Expired,
}

impl RequestFilter {
    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Self::All),
            "waiting" => Some(Self::Waiting),
            "completed" => Some(Self::Completed),
            "closed" => Some(Self::Closed),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    pub fn matches(self, phase: &PoolPhase) -> bool {
        match self {
            Self::All => true,
            Self::Waiting => matches!(phase, PoolPhase::Active { .. }),
            Self::Completed => *phase == PoolPhase::Completed,
            Self::Closed => *phase == PoolPhase::Closed,
            Self::Expired => *phase == PoolPhase::Expired,
        }
    }
}

/// Requests whose phase matches `filter`, order preserved.
pub fn filter_by_phase(requests: &[EnrichedRequest], filter: RequestFilter) -> Vec<&EnrichedRequest> {
    requests
        .iter()
        .filter(|r| filter.matches(&r.classification.phase))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PoolSnapshot, PoolStatus, SENTINEL_PRODUCT_NAME};
    use crate::test_support::{now, pool, product, today, FakePools, FakeProducts};
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn request(id: i64, pool_id: i64, quantity: i32) -> PoolRequest {
        PoolRequest {
            id,
            pool_id,
            email: "ana@example.com".into(),
            quantity,
            created_at: now() - Duration::days(1),
            pool: None,
        }
    }

    // -- status_message --

    #[test]
    fn active_message_includes_days_left() {
        assert_eq!(
            status_message(&PoolPhase::Active { days_remaining: 3 }),
            "Waiting for pool to complete (3 days left)"
        );
    }

    #[test]
    fn unknown_phase_message() {
        let phase = PoolPhase::Unknown {
            status: "paused".into(),
        };
        assert_eq!(status_message(&phase), MSG_UNAVAILABLE);
    }

    // -- enrich --

    #[tokio::test]
    async fn enrich_joins_pool_and_product() {
        let pools = FakePools::with([pool(1, 10, PoolStatus::Open, today() + Duration::days(2))]);
        let products = FakeProducts::with([product(10, "Olive oil", 8.0)]);

        let out = enrich(vec![request(100, 1, 3)], &pools, &products, now()).await;

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].product.display_name(), "Olive oil");
        assert_eq!(out[0].message, "Waiting for pool to complete (2 days left)");
        assert_eq!(out[0].total_price(), 24.0);
    }

    #[tokio::test]
    async fn every_request_survives_failed_product_lookups() {
        let pools = FakePools::with([
            pool(1, 10, PoolStatus::Open, today()),
            pool(2, 11, PoolStatus::Success, today()),
            pool(3, 12, PoolStatus::Failed, today()),
        ]);
        let products = FakeProducts::default();
        let requests = vec![request(100, 1, 1), request(101, 2, 2), request(102, 3, 3)];

        let out = enrich(requests, &pools, &products, now()).await;

        assert_eq!(out.len(), 3);
        assert!(out
            .iter()
            .all(|r| r.product.display_name() == SENTINEL_PRODUCT_NAME));
        assert!(out.iter().all(|r| r.product.unit_price() == 0.0));
        assert_eq!(products.calls(), 3);
    }

    #[tokio::test]
    async fn output_keeps_input_order() {
        let pools = FakePools::with([
            pool(1, 10, PoolStatus::Open, today()),
            pool(2, 10, PoolStatus::Success, today()),
        ]);
        let products = FakeProducts::with([product(10, "Rice", 2.0)]);
        let requests = vec![request(7, 2, 1), request(3, 1, 1), request(5, 2, 1)];

        let out = enrich(requests, &pools, &products, now()).await;

        let ids: Vec<_> = out.iter().map(|r| r.request.id).collect();
        assert_eq!(ids, vec![7, 3, 5]);
        assert_eq!(out[0].message, MSG_COMPLETED);
    }

    #[tokio::test]
    async fn snapshot_with_status_skips_pool_lookup() {
        let pools = FakePools::default();
        let products = FakeProducts::with([product(10, "Rice", 2.0)]);
        let mut req = request(1, 9, 2);
        req.pool = Some(PoolSnapshot {
            product_id: Some(10),
            end_at: Some(today() - Duration::days(2)),
            min_quantity: Some(5),
            status: Some(PoolStatus::Failed),
            ..Default::default()
        });

        let out = enrich(vec![req], &pools, &products, now()).await;

        assert_eq!(pools.calls(), 0);
        assert_eq!(out[0].message, MSG_CLOSED);
    }

    #[tokio::test]
    async fn snapshot_without_status_looks_up_pool() {
        let pools = FakePools::with([pool(9, 10, PoolStatus::Open, today() - Duration::days(1))]);
        let products = FakeProducts::with([product(10, "Rice", 2.0)]);
        let mut req = request(1, 9, 2);
        req.pool = Some(PoolSnapshot {
            product_id: Some(10),
            end_at: Some(today() - Duration::days(1)),
            ..Default::default()
        });

        let out = enrich(vec![req], &pools, &products, now()).await;

        assert_eq!(pools.calls(), 1);
        assert_eq!(out[0].classification.phase, PoolPhase::Expired);
        assert_eq!(out[0].message, MSG_EXPIRED);
    }

    #[tokio::test]
    async fn failed_pool_lookup_falls_back_to_snapshot() {
        let pools = FakePools::default();
        let products = FakeProducts::with([product(10, "Rice", 2.0)]);
        let mut req = request(1, 9, 2);
        req.pool = Some(PoolSnapshot {
            product_id: Some(10),
            end_at: Some(today() + Duration::days(4)),
            ..Default::default()
        });

        let out = enrich(vec![req], &pools, &products, now()).await;

        assert!(out[0].pool.is_some());
        assert!(out[0].product.is_resolved());
        assert_matches!(out[0].classification.phase, PoolPhase::Unknown { .. });
        assert_eq!(out[0].classification.label, LABEL_UNAVAILABLE);
        assert_eq!(out[0].message, MSG_UNAVAILABLE);
    }

    #[tokio::test]
    async fn missing_pool_and_snapshot_still_yields_entry() {
        let pools = FakePools::default();
        let products = FakeProducts::default();

        let out = enrich(vec![request(1, 404, 1)], &pools, &products, now()).await;

        assert_eq!(out.len(), 1);
        assert!(out[0].pool.is_none());
        assert!(!out[0].product.is_resolved());
        assert!(!out[0].classification.joinable);
        assert_eq!(out[0].classification.label, LABEL_UNAVAILABLE);
        // No product id to look up.
        assert_eq!(products.calls(), 0);
    }

    // -- RequestStats --

    #[tokio::test]
    async fn stats_count_phases_and_savings() {
        let pools = FakePools::with([
            pool(1, 10, PoolStatus::Open, today() + Duration::days(1)),
            pool(2, 10, PoolStatus::Success, today()),
            pool(3, 10, PoolStatus::Failed, today()),
            pool(4, 10, PoolStatus::Open, today() - Duration::days(1)),
        ]);
        let products = FakeProducts::with([product(10, "Rice", 10.0)]);
        let requests = vec![
            request(1, 1, 1),
            request(2, 2, 4),
            request(3, 3, 2),
            request(4, 4, 3),
        ];

        let out = enrich(requests, &pools, &products, now()).await;
        let stats = RequestStats::from_requests(&out);

        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.total_quantity, 10);
        assert_eq!(stats.waiting, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.closed, 1);
        assert_eq!(stats.expired, 1);
        assert!((stats.estimated_savings - 6.0).abs() < 1e-9);
    }

    #[test]
    fn stats_of_nothing_are_zero() {
        assert_eq!(RequestStats::from_requests(&[]), RequestStats::default());
    }

    // -- filter_by_phase --

    #[tokio::test]
    async fn filter_selects_matching_phase() {
        let pools = FakePools::with([
            pool(1, 10, PoolStatus::Open, today() + Duration::days(1)),
            pool(2, 10, PoolStatus::Success, today()),
        ]);
        let products = FakeProducts::with([product(10, "Rice", 1.0)]);
        let out = enrich(
            vec![request(1, 1, 1), request(2, 2, 1), request(3, 1, 1)],
            &pools,
            &products,
            now(),
        )
        .await;

        let waiting = filter_by_phase(&out, RequestFilter::Waiting);
        assert_eq!(waiting.iter().map(|r| r.request.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(filter_by_phase(&out, RequestFilter::All).len(), 3);
        assert!(filter_by_phase(&out, RequestFilter::Expired).is_empty());
    }

    #[test]
    fn filter_parses_tab_names() {
        assert_eq!(RequestFilter::from_str_value("completed"), Some(RequestFilter::Completed));
        assert_eq!(RequestFilter::from_str_value("pending"), None);
    }
}
