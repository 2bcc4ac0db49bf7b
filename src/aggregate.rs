//! Aircraft aggregation
//!
//! Joins the active tail list with the check log to produce one summary per
//! active aircraft. Tails that only appear in the check log (deactivated
//! aircraft) are not tracked.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::cadence::CadenceRule;
use crate::models::{AircraftSummary, CheckRecord};
use crate::status::{classify, minutes_since};

/// Inputs shared by every summary in one aggregation pass
#[derive(Debug, Clone, Copy)]
pub struct AggregationParams {
    pub rule: CadenceRule,
    pub due_soon_minutes: i64,
}

impl Default for AggregationParams {
    fn default() -> Self {
        Self {
            rule: CadenceRule::default(),
            due_soon_minutes: crate::status::DEFAULT_DUE_SOON_MINUTES,
        }
    }
}

struct TailLog<'a> {
    latest: &'a CheckRecord,
    count: usize,
}

/// Build one summary per active tail; output order is not meaningful
pub fn aggregate(
    active_tails: &[String],
    check_records: &[CheckRecord],
    ambient_temperature_f: Option<i32>,
    now: DateTime<Utc>,
    params: &AggregationParams,
) -> Vec<AircraftSummary> {
    if active_tails.is_empty() {
        return Vec::new();
    }

    let mut by_tail: HashMap<&str, TailLog<'_>> = HashMap::new();
    for record in check_records {
        by_tail
            .entry(record.tail.as_str())
            .and_modify(|log| {
                log.count += 1;
                if record.recency_cmp(log.latest).is_gt() {
                    log.latest = record;
                }
            })
            .or_insert(TailLog {
                latest: record,
                count: 1,
            });
    }

    let interval = params.rule.required_interval_minutes(ambient_temperature_f);

    debug!(
        tails = active_tails.len(),
        records = check_records.len(),
        interval_minutes = interval,
        "Aggregating aircraft summaries"
    );

    active_tails
        .iter()
        .map(|tail| {
            let log = by_tail.get(tail.as_str());
            let age = log.map(|l| minutes_since(l.latest.checked_at, now));
            let classification = classify(age, interval, params.due_soon_minutes);

            AircraftSummary {
                tail: tail.clone(),
                latest_check: log.map(|l| l.latest.clone()),
                minutes_since_last_check: age,
                minutes_remaining: classification.minutes_remaining,
                status: classification.status,
                tone: classification.tone,
                history_count: log.map(|l| l.count).unwrap_or(0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use chrono::Duration;
    use uuid::Uuid;

    fn tails(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    fn defaults() -> AggregationParams {
        AggregationParams::default()
    }

    fn check(tail: &str, minutes_ago: i64, now: DateTime<Utc>) -> CheckRecord {
        CheckRecord::new(tail, 72, "A. Larson", now - Duration::minutes(minutes_ago))
    }

    #[test]
    fn test_empty_roster_yields_nothing() {
        let now = Utc::now();
        let records = vec![check("N1", 5, now)];
        assert!(aggregate(&[], &records, Some(20), now, &defaults()).is_empty());
    }

    #[test]
    fn test_tails_without_records_get_no_data() {
        let now = Utc::now();
        let out = aggregate(&tails(&["N1", "N2"]), &[], Some(20), now, &defaults());

        assert_eq!(out.len(), 2);
        for summary in &out {
            assert_eq!(summary.status, Status::NoData);
            assert_eq!(summary.history_count, 0);
            assert!(summary.latest_check.is_none());
            assert!(summary.minutes_remaining.is_none());
        }
    }

    #[test]
    fn test_inactive_tails_are_excluded() {
        let now = Utc::now();
        let records = vec![check("N1", 5, now), check("N9", 5, now)];
        let out = aggregate(&tails(&["N1"]), &records, Some(20), now, &defaults());

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tail, "N1");
    }

    #[test]
    fn test_latest_is_max_timestamp_regardless_of_order() {
        let now = Utc::now();
        // Oldest first, so a first-seen reduction would pick the wrong one
        let records = vec![check("N1", 90, now), check("N1", 12, now), check("N1", 45, now)];
        let out = aggregate(&tails(&["N1"]), &records, Some(20), now, &defaults());

        assert_eq!(out[0].minutes_since_last_check, Some(12));
        assert_eq!(out[0].minutes_remaining, Some(48));
        assert_eq!(out[0].history_count, 3);
        assert_eq!(out[0].status, Status::Ok);
    }

    #[test]
    fn test_timestamp_ties_resolve_consistently() {
        let now = Utc::now();
        let at = now - Duration::minutes(10);
        let mut a = CheckRecord::new("N1", 70, "T. Begum", at);
        let mut b = CheckRecord::new("N1", 74, "T. Begum", at);
        a.id = Uuid::from_u128(7);
        b.id = Uuid::from_u128(3);

        let params = AggregationParams::default();
        let forward = aggregate(&tails(&["N1"]), &[a.clone(), b.clone()], None, now, &params);
        let reverse = aggregate(&tails(&["N1"]), &[b, a], None, now, &params);

        assert_eq!(forward[0].latest_check.as_ref().unwrap().temperature_f, 70);
        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_cold_weather_cadence_applies() {
        let now = Utc::now();
        let records = vec![check("N1", 35, now)];
        let out = aggregate(&tails(&["N1"]), &records, Some(6), now, &defaults());

        assert_eq!(out[0].minutes_remaining, Some(-5));
        assert_eq!(out[0].status, Status::Overdue);
    }

    #[test]
    fn test_partial_minutes_round_into_due_soon() {
        let now = Utc::now();
        let records = vec![CheckRecord::new(
            "N1",
            72,
            "A. Larson",
            now - Duration::seconds(49 * 60 + 40),
        )];
        let out = aggregate(&tails(&["N1"]), &records, Some(15), now, &defaults());

        assert_eq!(out[0].minutes_since_last_check, Some(50));
        assert_eq!(out[0].minutes_remaining, Some(10));
        assert_eq!(out[0].status, Status::DueSoon);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let now = Utc::now();
        let records = vec![check("N1", 35, now), check("N2", 52, now), check("N2", 110, now)];
        let roster = tails(&["N1", "N2", "N3"]);
        let params = AggregationParams::default();

        let first = aggregate(&roster, &records, Some(15), now, &params);
        let second = aggregate(&roster, &records, Some(15), now, &params);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );

        assert_eq!(first, second);
    }
}
