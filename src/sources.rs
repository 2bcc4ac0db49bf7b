//! Aircraft registry and check log
//!
//! The monitor reads the station fleet and cabin temperature checks through
//! these traits. `InMemoryStore` backs both for the service binary and tests;
//! persistence beyond the process is out of scope.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::{normalize_tail, Aircraft, CheckRecord, NewCheck, TonightEntry};

/// Station fleet registry
#[async_trait]
pub trait AircraftRegistry: Send + Sync {
    /// Active tails for a station, ordered by tail
    async fn list_active_tails(&self, station: &str) -> AppResult<Vec<String>>;

    /// Tails on a station's worklist for one operations date, ordered by tail
    async fn list_tonight_tails(
        &self,
        station: &str,
        ops_date: NaiveDate,
    ) -> AppResult<Vec<String>>;

    /// Register a tail as active at a station if it is not already
    async fn ensure_active(&self, tail: &str, station: &str) -> AppResult<()>;

    async fn add_tonight(&self, entry: TonightEntry) -> AppResult<()>;

    /// Remove a tail from a worklist; false if it was not on it
    async fn remove_tonight(
        &self,
        station: &str,
        ops_date: NaiveDate,
        tail: &str,
    ) -> AppResult<bool>;
}

/// Cabin temperature check log
#[async_trait]
pub trait CheckLog: Send + Sync {
    /// Most recent checks across `tails`, newest first, at most `limit`
    async fn list_recent_checks(
        &self,
        tails: &[String],
        limit: usize,
    ) -> AppResult<Vec<CheckRecord>>;

    /// Exact number of checks ever recorded for a tail
    async fn count_checks(&self, tail: &str) -> AppResult<usize>;

    async fn insert_check(&self, check: NewCheck) -> AppResult<CheckRecord>;
}

/// Which roster of tails the dashboard tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterSource {
    /// Every active aircraft at the station
    ActiveFleet,
    /// Only tails on tonight's worklist
    Tonight,
    /// Tonight's worklist, or the active fleet when the worklist is empty
    TonightOrFleet,
}

impl fmt::Display for RosterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RosterSource::ActiveFleet => "active_fleet",
            RosterSource::Tonight => "tonight",
            RosterSource::TonightOrFleet => "tonight_or_fleet",
        };
        f.write_str(name)
    }
}

impl FromStr for RosterSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active_fleet" | "fleet" => Ok(RosterSource::ActiveFleet),
            "tonight" => Ok(RosterSource::Tonight),
            "tonight_or_fleet" => Ok(RosterSource::TonightOrFleet),
            other => Err(format!("unknown roster source: {}", other)),
        }
    }
}

/// Load the roster, reporting which concrete source supplied it
pub async fn load_roster(
    registry: &dyn AircraftRegistry,
    source: RosterSource,
    station: &str,
    ops_date: NaiveDate,
) -> AppResult<(Vec<String>, RosterSource)> {
    match source {
        RosterSource::ActiveFleet => Ok((
            registry.list_active_tails(station).await?,
            RosterSource::ActiveFleet,
        )),
        RosterSource::Tonight => Ok((
            registry.list_tonight_tails(station, ops_date).await?,
            RosterSource::Tonight,
        )),
        RosterSource::TonightOrFleet => {
            let tonight = registry.list_tonight_tails(station, ops_date).await?;
            if !tonight.is_empty() {
                return Ok((tonight, RosterSource::Tonight));
            }
            info!(
                station = %station,
                ops_date = %ops_date,
                "Tonight's worklist empty, using active fleet"
            );
            Ok((
                registry.list_active_tails(station).await?,
                RosterSource::ActiveFleet,
            ))
        }
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    aircraft: BTreeMap<String, Aircraft>,
    checks: Vec<CheckRecord>,
    tonight: Vec<TonightEntry>,
}

/// Process-local registry and check log
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_aircraft(&self, aircraft: Aircraft) {
        let mut inner = self.inner.write().await;
        inner.aircraft.insert(aircraft.tail.clone(), aircraft);
    }

    #[cfg(test)]
    pub async fn set_active(&self, tail: &str, active: bool) -> bool {
        let mut inner = self.inner.write().await;
        match inner.aircraft.get_mut(&normalize_tail(tail)) {
            Some(aircraft) => {
                aircraft.active = active;
                true
            }
            None => false,
        }
    }

    /// Insert an already-built record, keeping its id and timestamp
    pub async fn push_check(&self, record: CheckRecord) {
        self.inner.write().await.checks.push(record);
    }
}

#[async_trait]
impl AircraftRegistry for InMemoryStore {
    async fn list_active_tails(&self, station: &str) -> AppResult<Vec<String>> {
        let inner = self.inner.read().await;
        Ok(inner
            .aircraft
            .values()
            .filter(|a| a.active && a.station.eq_ignore_ascii_case(station))
            .map(|a| a.tail.clone())
            .collect())
    }

    async fn list_tonight_tails(
        &self,
        station: &str,
        ops_date: NaiveDate,
    ) -> AppResult<Vec<String>> {
        let inner = self.inner.read().await;
        let mut tails: Vec<String> = inner
            .tonight
            .iter()
            .filter(|e| e.ops_date == ops_date && e.station.eq_ignore_ascii_case(station))
            .map(|e| e.tail.clone())
            .collect();
        tails.sort();
        tails.dedup();
        Ok(tails)
    }

    async fn ensure_active(&self, tail: &str, station: &str) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let aircraft = Aircraft::new(tail, station);
        inner
            .aircraft
            .entry(aircraft.tail.clone())
            .and_modify(|a| a.active = true)
            .or_insert(aircraft);
        Ok(())
    }

    async fn add_tonight(&self, entry: TonightEntry) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if inner.tonight.contains(&entry) {
            return Err(AppError::BadRequest(format!(
                "{} is already on the {} worklist for {}",
                entry.tail, entry.station, entry.ops_date
            )));
        }
        debug!(tail = %entry.tail, station = %entry.station, "Added tail to tonight's worklist");
        inner.tonight.push(entry);
        Ok(())
    }

    async fn remove_tonight(
        &self,
        station: &str,
        ops_date: NaiveDate,
        tail: &str,
    ) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.tonight.len();
        inner.tonight.retain(|e| {
            !(e.ops_date == ops_date && e.tail == tail && e.station.eq_ignore_ascii_case(station))
        });
        Ok(inner.tonight.len() != before)
    }
}

#[async_trait]
impl CheckLog for InMemoryStore {
    async fn list_recent_checks(
        &self,
        tails: &[String],
        limit: usize,
    ) -> AppResult<Vec<CheckRecord>> {
        let wanted: HashSet<&str> = tails.iter().map(String::as_str).collect();
        let inner = self.inner.read().await;
        let mut checks: Vec<CheckRecord> = inner
            .checks
            .iter()
            .filter(|c| wanted.contains(c.tail.as_str()))
            .cloned()
            .collect();
        checks.sort_by(|a, b| b.recency_cmp(a));
        checks.truncate(limit);
        Ok(checks)
    }

    async fn count_checks(&self, tail: &str) -> AppResult<usize> {
        let inner = self.inner.read().await;
        Ok(inner.checks.iter().filter(|c| c.tail == tail).count())
    }

    async fn insert_check(&self, check: NewCheck) -> AppResult<CheckRecord> {
        let record = CheckRecord::from(check);
        self.inner.write().await.checks.push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tokio_test::block_on;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 14).unwrap()
    }

    fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        block_on(async {
            for tail in ["N456PD", "N123PD", "N789PD"] {
                store.upsert_aircraft(Aircraft::new(tail, "OMA")).await;
            }
            store.upsert_aircraft(Aircraft::new("N555DN", "DEN")).await;
        });
        store
    }

    #[test]
    fn test_active_tails_are_sorted_and_station_scoped() {
        let store = seeded();
        block_on(store.set_active("n789pd", false));

        let tails = block_on(store.list_active_tails("OMA")).unwrap();
        assert_eq!(tails, vec!["N123PD", "N456PD"]);
    }

    #[test]
    fn test_ensure_active_reactivates() {
        let store = seeded();
        block_on(store.set_active("N789PD", false));
        block_on(store.ensure_active(" n789pd ", "OMA")).unwrap();
        block_on(store.ensure_active("N1", "OMA")).unwrap();

        let tails = block_on(store.list_active_tails("OMA")).unwrap();
        assert_eq!(tails, vec!["N1", "N123PD", "N456PD", "N789PD"]);
    }

    #[test]
    fn test_recent_checks_newest_first_and_limited() {
        let store = seeded();
        let now = Utc::now();
        block_on(async {
            for minutes in [50, 10, 30, 70] {
                let checked_at = now - Duration::minutes(minutes);
                store
                    .push_check(CheckRecord::new("N123PD", 72, "A. Zimmer", checked_at))
                    .await;
            }
            store
                .push_check(CheckRecord::new("N999", 72, "A. Zimmer", now))
                .await;
        });

        let checks =
            block_on(store.list_recent_checks(&["N123PD".to_string()], 3)).unwrap();
        let ages: Vec<i64> = checks.iter().map(|c| (now - c.checked_at).num_minutes()).collect();
        assert_eq!(ages, vec![10, 30, 50]);
        assert_eq!(block_on(store.count_checks("N123PD")).unwrap(), 4);
    }

    #[test]
    fn test_tonight_worklist_add_and_remove() {
        let store = seeded();
        let entry = TonightEntry {
            station: "OMA".into(),
            ops_date: date(),
            tail: "N789PD".into(),
        };
        block_on(store.add_tonight(entry.clone())).unwrap();
        assert!(block_on(store.add_tonight(entry)).is_err());

        assert_eq!(block_on(store.list_tonight_tails("OMA", date())).unwrap(), vec!["N789PD"]);
        assert!(block_on(store.remove_tonight("OMA", date(), "N789PD")).unwrap());
        assert!(!block_on(store.remove_tonight("OMA", date(), "N789PD")).unwrap());
    }

    #[test]
    fn test_roster_fallback_reports_source_used() {
        let store = seeded();

        let (tails, used) =
            block_on(load_roster(&store, RosterSource::TonightOrFleet, "OMA", date())).unwrap();
        assert_eq!(used, RosterSource::ActiveFleet);
        assert_eq!(tails.len(), 3);

        block_on(store.add_tonight(TonightEntry {
            station: "OMA".into(),
            ops_date: date(),
            tail: "N456PD".into(),
        }))
        .unwrap();

        let (tails, used) =
            block_on(load_roster(&store, RosterSource::TonightOrFleet, "OMA", date())).unwrap();
        assert_eq!(used, RosterSource::Tonight);
        assert_eq!(tails, vec!["N456PD"]);
    }

    #[test]
    fn test_tonight_source_does_not_fall_back() {
        let store = seeded();
        let (tails, used) =
            block_on(load_roster(&store, RosterSource::Tonight, "OMA", date())).unwrap();
        assert!(tails.is_empty());
        assert_eq!(used, RosterSource::Tonight);
    }

    #[test]
    fn test_roster_source_parsing() {
        assert_eq!("tonight".parse::<RosterSource>(), Ok(RosterSource::Tonight));
        assert_eq!(" Active_Fleet ".parse::<RosterSource>(), Ok(RosterSource::ActiveFleet));
        assert!("sometimes".parse::<RosterSource>().is_err());
        assert_eq!(RosterSource::TonightOrFleet.to_string(), "tonight_or_fleet");
    }
}
