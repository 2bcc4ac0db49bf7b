//! Urgency ranking for display
//!
//! Most urgent tone first, then least time remaining. Summaries with no
//! remaining time (never checked) sort after every real minute count.
//! The sort is stable, so equal keys keep their input order.

use std::cmp::Ordering;

use crate::models::AircraftSummary;

/// Remaining-time sort key where absence means effectively infinite
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum RemainingKey {
    Minutes(i64),
    Unbounded,
}

impl From<Option<i64>> for RemainingKey {
    fn from(value: Option<i64>) -> Self {
        value.map_or(RemainingKey::Unbounded, RemainingKey::Minutes)
    }
}

/// Urgency order between two summaries
pub fn urgency_cmp(a: &AircraftSummary, b: &AircraftSummary) -> Ordering {
    a.tone.cmp(&b.tone).then_with(|| {
        RemainingKey::from(a.minutes_remaining).cmp(&RemainingKey::from(b.minutes_remaining))
    })
}

/// Order summaries by urgency
pub fn rank(mut summaries: Vec<AircraftSummary>) -> Vec<AircraftSummary> {
    summaries.sort_by(urgency_cmp);
    summaries
}
