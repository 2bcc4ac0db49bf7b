//! Application state management
//!
//! Central state container for one station: the current weather state and
//! the cached roster and check log. Both are replaced whole by their refresh
//! cycles and read together as one snapshot for aggregation.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::models::CheckRecord;
use crate::sources::RosterSource;
use crate::weather::WeatherState;

/// Last successfully loaded roster and check records
#[derive(Debug, Clone)]
pub struct CheckCache {
    pub roster: Vec<String>,
    pub roster_source: RosterSource,
    pub records: Vec<CheckRecord>,
    pub fetched_at: DateTime<Utc>,
}

/// Consistent copy of everything an aggregation pass needs
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub station: String,
    pub ambient_temperature_f: Option<i32>,
    pub checks: Option<CheckCache>,
    pub last_error: Option<String>,
}

/// Central application state
#[derive(Debug)]
pub struct AppState {
    station: String,
    /// Bumped on station change so late check-log loads can be discarded
    epoch: u64,
    weather: WeatherState,
    checks: Option<CheckCache>,
    last_error: Option<String>,
    start_time: DateTime<Utc>,
    total_refreshes: u64,
    failed_refreshes: u64,
}

impl AppState {
    /// Create new application state
    pub fn new(station: &str) -> Self {
        info!(station = %station, "Initializing application state");
        Self {
            station: station.to_string(),
            epoch: 0,
            weather: WeatherState::new(station),
            checks: None,
            last_error: None,
            start_time: Utc::now(),
            total_refreshes: 0,
            failed_refreshes: 0,
        }
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn weather(&self) -> &WeatherState {
        &self.weather
    }

    pub fn weather_mut(&mut self) -> &mut WeatherState {
        &mut self.weather
    }

    #[cfg(test)]
    pub fn checks(&self) -> Option<&CheckCache> {
        self.checks.as_ref()
    }

    #[cfg(test)]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Replace the check cache; ignored if the station changed meanwhile
    pub fn commit_checks(&mut self, epoch: u64, cache: CheckCache) -> bool {
        if epoch != self.epoch {
            debug!(station = %self.station, "Discarding check log load for previous station");
            return false;
        }
        self.total_refreshes += 1;
        debug!(
            station = %self.station,
            tails = cache.roster.len(),
            records = cache.records.len(),
            total = self.total_refreshes,
            "Check cache replaced"
        );
        self.checks = Some(cache);
        self.last_error = None;
        true
    }

    /// Note a failed load; the previous cache stays in place
    pub fn record_check_failure(&mut self, epoch: u64, message: String) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.failed_refreshes += 1;
        warn!(
            station = %self.station,
            failures = self.failed_refreshes,
            kept_cache = self.checks.is_some(),
            "Check log load failed"
        );
        self.last_error = Some(message);
        true
    }

    /// Tear down everything tied to the current station
    pub fn switch_station(&mut self, station: &str) {
        info!(from = %self.station, to = %station, "Switching station");
        self.station = station.to_string();
        self.epoch += 1;
        self.weather.switch_station(station);
        self.checks = None;
        self.last_error = None;
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            station: self.station.clone(),
            ambient_temperature_f: self.weather.ambient_temperature_f(),
            checks: self.checks.clone(),
            last_error: self.last_error.clone(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.start_time)
            .num_seconds()
            .try_into()
            .unwrap_or(0)
    }

    pub fn checks_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.checks.as_ref().map(|c| c.fetched_at)
    }

    pub fn total_refreshes(&self) -> u64 {
        self.total_refreshes
    }

    pub fn failed_refreshes(&self) -> u64 {
        self.failed_refreshes
    }
}
