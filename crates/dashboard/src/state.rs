//! Last loaded view snapshots.
//!
//! Each refresh builds a complete snapshot and swaps it in; a failed
//! refresh leaves the previous snapshot untouched.

use serde::Serialize;

use groupbuy_core::types::Timestamp;

use crate::views::{AnalyticsView, PoolsView, RequestsView};

/// A view together with the time it was loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot<T> {
    pub refreshed_at: Timestamp,
    #[serde(flatten)]
    pub view: T,
}

#[derive(Debug, Default)]
pub struct ViewState {
    pools: Option<Snapshot<PoolsView>>,
    requests: Option<Snapshot<RequestsView>>,
    analytics: Option<Snapshot<AnalyticsView>>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pools(&self) -> Option<&Snapshot<PoolsView>> {
        self.pools.as_ref()
    }

    pub fn requests(&self) -> Option<&Snapshot<RequestsView>> {
        self.requests.as_ref()
    }

    pub fn analytics(&self) -> Option<&Snapshot<AnalyticsView>> {
        self.analytics.as_ref()
    }

    pub fn replace_pools(&mut self, view: PoolsView, now: Timestamp) -> &Snapshot<PoolsView> {
        self.pools.insert(Snapshot {
            refreshed_at: now,
            view,
        })
    }

    pub fn replace_requests(
        &mut self,
        view: RequestsView,
        now: Timestamp,
    ) -> &Snapshot<RequestsView> {
        self.requests.insert(Snapshot {
            refreshed_at: now,
            view,
        })
    }

    pub fn replace_analytics(
        &mut self,
        view: AnalyticsView,
        now: Timestamp,
    ) -> &Snapshot<AnalyticsView> {
        self.analytics.insert(Snapshot {
            refreshed_at: now,
            view,
        })
    }

    /// Drop every snapshot, e.g. after logout.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
