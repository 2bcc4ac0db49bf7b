//! Status classification
//!
//! Turns the age of an aircraft's latest check into a compliance status
//! and urgency tone.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

use crate::models::{Status, Tone};

/// Default window before the deadline in which an aircraft is due soon
pub const DEFAULT_DUE_SOON_MINUTES: i64 = 10;

/// Count of check timestamps found in the future and clamped to zero age
static CLOCK_SKEW_CLAMPS: AtomicU64 = AtomicU64::new(0);

/// Number of times a future-dated check was clamped to zero age
pub fn clock_skew_clamps() -> u64 {
    CLOCK_SKEW_CLAMPS.load(Ordering::Relaxed)
}

/// Classifier output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub status: Status,
    pub tone: Tone,
    pub minutes_remaining: Option<i64>,
}

/// Minutes elapsed since `checked_at`, rounded to the nearest minute and clamped at zero
pub fn minutes_since(checked_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let minutes = (now - checked_at).num_seconds().saturating_add(30).div_euclid(60);
    if minutes < 0 {
        CLOCK_SKEW_CLAMPS.fetch_add(1, Ordering::Relaxed);
        warn!(
            checked_at = %checked_at,
            now = %now,
            "Check timestamp is in the future, treating age as zero"
        );
        return 0;
    }
    minutes
}

/// Classify a check age against the required interval
pub fn classify(
    minutes_since_last_check: Option<i64>,
    required_interval_minutes: i64,
    due_soon_threshold_minutes: i64,
) -> Classification {
    let Some(age) = minutes_since_last_check else {
        return Classification {
            status: Status::NoData,
            tone: Tone::Muted,
            minutes_remaining: None,
        };
    };

    let remaining = required_interval_minutes - age.max(0);
    let status = if remaining <= 0 {
        Status::Overdue
    } else if remaining <= due_soon_threshold_minutes {
        Status::DueSoon
    } else {
        Status::Ok
    };

    Classification {
        status,
        tone: status.tone(),
        minutes_remaining: Some(remaining),
    }
}
