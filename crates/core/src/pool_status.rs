//! Pool lifecycle classification.
//!
//! Derives a presentation phase from the backend status and the deadline.
//! The derived phase is display-only: an `open` pool past its deadline is
//! shown as expired, but its stored status stays `open` until the backend's
//! scheduled check closes it.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::models::{Pool, PoolStatus};
use crate::session::Capabilities;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Milliseconds per day, the unit of `days_remaining`.
pub const MS_PER_DAY: i64 = 86_400_000;

pub const LABEL_ACTIVE: &str = "Active";
pub const LABEL_EXPIRED: &str = "Expired";
pub const LABEL_COMPLETED: &str = "Completed";
pub const LABEL_CLOSED: &str = "Closed";

/// Deadline text for pools that are no longer open.
pub const DEADLINE_ENDED: &str = "Ended";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Presentation phase of a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum PoolPhase {
    /// Open and the deadline has not passed.
    Active { days_remaining: i64 },
    /// Still `open` in the backend, but past its deadline.
    Expired,
    /// Reached its minimum quantity.
    Completed,
    /// Failed to reach its minimum quantity.
    Closed,
    /// Status value this client does not recognise.
    Unknown { status: String },
}

/// Result of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolClassification {
    pub phase: PoolPhase,
    pub label: String,
    /// Whether the pool accepts new requests, before role checks.
    pub joinable: bool,
    /// Days left for active pools; `None` otherwise.
    pub urgency: Option<i64>,
}

impl PoolClassification {
    /// Classification for a pool whose status cannot be determined.
    pub fn unknown(status: &str) -> Self {
        closed(
            PoolPhase::Unknown {
                status: status.to_string(),
            },
            status,
        )
    }

    /// Deadline line shown on pool cards.
    pub fn deadline_text(&self) -> String {
        match &self.phase {
            PoolPhase::Active { days_remaining } => format!("{days_remaining} days left"),
            PoolPhase::Expired => LABEL_EXPIRED.to_string(),
            _ => DEADLINE_ENDED.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// The instant a pool's deadline date begins (00:00 UTC).
pub fn deadline_instant(end_at: NaiveDate) -> Timestamp {
    end_at.and_time(NaiveTime::MIN).and_utc()
}

/// Whole days until the deadline, rounded up.
///
/// A deadline of today yields 0 for the whole day; yesterday yields -1.
pub fn days_remaining(end_at: NaiveDate, now: Timestamp) -> i64 {
    let diff_ms = (deadline_instant(end_at) - now).num_milliseconds();
    ceil_div(diff_ms, MS_PER_DAY)
}

fn ceil_div(n: i64, d: i64) -> i64 {
    let q = n.div_euclid(d);
    if n.rem_euclid(d) == 0 {
        q
    } else {
        q + 1
    }
}

/// Classify a pool at `now`.
pub fn classify(pool: &Pool, now: Timestamp) -> PoolClassification {
    classify_status(&pool.status, pool.end_at, now)
}

/// Classify a raw status/deadline pair. Never fails: unknown statuses map
/// to [`PoolPhase::Unknown`] labelled with the raw value.
pub fn classify_status(
    status: &PoolStatus,
    end_at: NaiveDate,
    now: Timestamp,
) -> PoolClassification {
    match status {
        PoolStatus::Open => {
            let days = days_remaining(end_at, now);
            if days >= 0 {
                PoolClassification {
                    phase: PoolPhase::Active {
                        days_remaining: days,
                    },
                    label: LABEL_ACTIVE.to_string(),
                    joinable: true,
                    urgency: Some(days),
                }
            } else {
                closed(PoolPhase::Expired, LABEL_EXPIRED)
            }
        }
        PoolStatus::Success => closed(PoolPhase::Completed, LABEL_COMPLETED),
        PoolStatus::Failed => closed(PoolPhase::Closed, LABEL_CLOSED),
        PoolStatus::Other(raw) => PoolClassification::unknown(raw),
    }
}

fn closed(phase: PoolPhase, label: &str) -> PoolClassification {
    PoolClassification {
        phase,
        label: label.to_string(),
        joinable: false,
        urgency: None,
    }
}

/// Whether the current user may join a pool in this state.
pub fn can_join(classification: &PoolClassification, capabilities: &Capabilities) -> bool {
    classification.joinable && capabilities.can_join_pool
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
