//! Ambient weather state machine
//!
//! Tracks which outside-temperature reading is current for the station and
//! whether it is live, stale, manually entered or unavailable.
//!
//! ```text
//! Idle ──begin──▶ Loading ──ok──▶ Live ──begin──▶ Loading
//!                    │                               │
//!                    └──fail──▶ Error        fail ───┴──▶ Stale (reading kept)
//!
//! any ──set_manual──▶ Manual ──resume_live──▶ Idle
//! ```
//!
//! Refreshes are suppressed while in `Manual`. Every refresh hands out a
//! ticket bound to the current station epoch; completions carrying a ticket
//! from before a station switch are discarded.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::{AmbientReading, ReadingOrigin};

/// Phase of the weather state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherPhase {
    Idle,
    Loading,
    Live,
    /// Last refresh failed; the previous live reading is still used
    Stale,
    /// No usable reading; cadence falls back to the unknown default
    Error,
    Manual,
}

/// A successful outside temperature observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbientObservation {
    pub temperature_f: i32,
    pub observed_at: DateTime<Utc>,
}

/// Permission to run one fetch for one station
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTicket {
    pub station: String,
    epoch: u64,
    seq: u64,
}

/// Serializable snapshot of the weather state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeatherView {
    pub station: String,
    pub phase: WeatherPhase,
    pub origin: ReadingOrigin,
    pub temperature_f: Option<i32>,
    pub observed_at: Option<DateTime<Utc>>,
    pub stale: bool,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct WeatherState {
    station: String,
    epoch: u64,
    /// Sequence number of the most recent refresh handed out
    refresh_seq: u64,
    phase: WeatherPhase,
    /// Phase the in-flight refresh started from
    before_loading: WeatherPhase,
    reading: Option<AmbientReading>,
    last_error: Option<String>,
    last_attempt_at: Option<DateTime<Utc>>,
}

impl WeatherState {
    pub fn new(station: &str) -> Self {
        Self {
            station: station.to_string(),
            epoch: 0,
            refresh_seq: 0,
            phase: WeatherPhase::Idle,
            before_loading: WeatherPhase::Idle,
            reading: None,
            last_error: None,
            last_attempt_at: None,
        }
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn phase(&self) -> WeatherPhase {
        self.phase
    }

    pub fn reading(&self) -> Option<&AmbientReading> {
        self.reading.as_ref()
    }

    /// Temperature that should drive the cadence, if any reading is usable
    pub fn ambient_temperature_f(&self) -> Option<i32> {
        self.reading().map(|r| r.temperature_f)
    }

    /// Start a refresh; `None` while manual or while another refresh is in flight
    pub fn begin_refresh(&mut self, now: DateTime<Utc>) -> Option<RefreshTicket> {
        match self.phase {
            WeatherPhase::Manual => {
                debug!(station = %self.station, "Weather refresh suppressed by manual override");
                None
            }
            WeatherPhase::Loading => {
                debug!(station = %self.station, "Weather refresh already in flight");
                None
            }
            previous => {
                self.before_loading = previous;
                self.phase = WeatherPhase::Loading;
                self.last_attempt_at = Some(now);
                self.refresh_seq += 1;
                Some(RefreshTicket {
                    station: self.station.clone(),
                    epoch: self.epoch,
                    seq: self.refresh_seq,
                })
            }
        }
    }

    /// Whether a ticket is the latest refresh for the current station
    pub fn accepts(&self, ticket: &RefreshTicket) -> bool {
        ticket.epoch == self.epoch
            && ticket.seq == self.refresh_seq
            && self.phase == WeatherPhase::Loading
    }

    /// Commit a successful fetch; returns false if the ticket was discarded
    pub fn complete_success(
        &mut self,
        ticket: &RefreshTicket,
        observation: AmbientObservation,
    ) -> bool {
        if !self.accepts(ticket) {
            debug!(station = %ticket.station, "Discarding weather result for superseded refresh");
            return false;
        }

        info!(
            station = %self.station,
            temperature_f = observation.temperature_f,
            "Live ambient temperature updated"
        );

        self.phase = WeatherPhase::Live;
        self.last_error = None;
        self.reading = Some(AmbientReading {
            temperature_f: observation.temperature_f,
            observed_at: observation.observed_at,
            origin: ReadingOrigin::Live,
        });
        true
    }

    /// Commit a failed fetch; returns false if the ticket was discarded
    pub fn complete_failure(&mut self, ticket: &RefreshTicket, cause: &str) -> bool {
        if !self.accepts(ticket) {
            debug!(station = %ticket.station, "Discarding weather failure for superseded refresh");
            return false;
        }

        let had_live = matches!(self.before_loading, WeatherPhase::Live | WeatherPhase::Stale)
            && self.reading.is_some();

        if had_live {
            warn!(
                station = %self.station,
                error = %cause,
                "Weather refresh failed, keeping last reading"
            );
            self.phase = WeatherPhase::Stale;
        } else {
            warn!(station = %self.station, error = %cause, "Weather unavailable");
            self.phase = WeatherPhase::Error;
            self.reading = None;
        }
        self.last_error = Some(cause.to_string());
        true
    }

    /// Override the ambient temperature by hand; suppresses refreshes
    pub fn set_manual(&mut self, temperature_f: i32, now: DateTime<Utc>) {
        info!(station = %self.station, temperature_f, "Manual ambient temperature set");
        self.phase = WeatherPhase::Manual;
        self.last_error = None;
        self.reading = Some(AmbientReading {
            temperature_f,
            observed_at: now,
            origin: ReadingOrigin::Manual,
        });
    }

    /// Leave manual mode; the next refresh establishes a live reading
    pub fn resume_live(&mut self) -> bool {
        if self.phase != WeatherPhase::Manual {
            return false;
        }
        info!(station = %self.station, "Resuming live weather");
        self.phase = WeatherPhase::Idle;
        self.reading = None;
        true
    }

    /// Tear down all state for a new station and invalidate in-flight refreshes
    pub fn switch_station(&mut self, station: &str) {
        info!(from = %self.station, to = %station, "Weather state reset for station change");
        let epoch = self.epoch + 1;
        *self = Self::new(station);
        self.epoch = epoch;
    }

    pub fn view(&self) -> WeatherView {
        WeatherView {
            station: self.station.clone(),
            phase: self.phase,
            origin: self
                .reading
                .as_ref()
                .map_or(ReadingOrigin::Unavailable, |r| r.origin),
            temperature_f: self.ambient_temperature_f(),
            observed_at: self.reading.as_ref().map(|r| r.observed_at),
            stale: self.phase == WeatherPhase::Stale,
            last_error: self.last_error.clone(),
            last_attempt_at: self.last_attempt_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::CadenceRule;

    fn observation(temperature_f: i32) -> AmbientObservation {
        AmbientObservation {
            temperature_f,
            observed_at: Utc::now(),
        }
    }

    fn live(temperature_f: i32) -> WeatherState {
        let mut state = WeatherState::new("OMA");
        let ticket = state.begin_refresh(Utc::now()).unwrap();
        assert!(state.complete_success(&ticket, observation(temperature_f)));
        state
    }

    #[test]
    fn test_initial_state() {
        let state = WeatherState::new("OMA");
        assert_eq!(state.phase(), WeatherPhase::Idle);
        assert_eq!(state.ambient_temperature_f(), None);
        assert_eq!(state.view().origin, ReadingOrigin::Unavailable);
    }

    #[test]
    fn test_successful_fetch_goes_live() {
        let state = live(15);
        assert_eq!(state.phase(), WeatherPhase::Live);
        assert_eq!(state.ambient_temperature_f(), Some(15));
        assert_eq!(state.reading().unwrap().origin, ReadingOrigin::Live);
    }

    #[test]
    fn test_failure_without_prior_reading_is_error() {
        let mut state = WeatherState::new("OMA");
        let ticket = state.begin_refresh(Utc::now()).unwrap();
        assert_eq!(state.phase(), WeatherPhase::Loading);

        state.complete_failure(&ticket, "HTTP 503");

        assert_eq!(state.phase(), WeatherPhase::Error);
        assert_eq!(state.ambient_temperature_f(), None);
        assert_eq!(state.view().last_error.as_deref(), Some("HTTP 503"));
    }

    #[test]
    fn test_failure_after_live_is_stale_and_keeps_reading() {
        let mut state = live(8);
        let ticket = state.begin_refresh(Utc::now()).unwrap();
        state.complete_failure(&ticket, "timeout");

        assert_eq!(state.phase(), WeatherPhase::Stale);
        assert!(state.view().stale);
        assert_eq!(state.ambient_temperature_f(), Some(8));
        let rule = CadenceRule::default();
        assert_eq!(rule.required_interval_minutes(state.ambient_temperature_f()), 30);
    }

    #[test]
    fn test_repeated_failure_stays_stale() {
        let mut state = live(8);
        for _ in 0..3 {
            let ticket = state.begin_refresh(Utc::now()).unwrap();
            state.complete_failure(&ticket, "timeout");
        }
        assert_eq!(state.phase(), WeatherPhase::Stale);
        assert_eq!(state.ambient_temperature_f(), Some(8));
    }

    #[test]
    fn test_stale_recovers_to_live() {
        let mut state = live(8);
        let ticket = state.begin_refresh(Utc::now()).unwrap();
        state.complete_failure(&ticket, "timeout");
        let ticket = state.begin_refresh(Utc::now()).unwrap();
        state.complete_success(&ticket, observation(12));

        assert_eq!(state.phase(), WeatherPhase::Live);
        assert_eq!(state.view().last_error, None);
    }

    #[test]
    fn test_manual_suppresses_refresh() {
        let mut state = live(20);
        state.set_manual(4, Utc::now());

        assert_eq!(state.phase(), WeatherPhase::Manual);
        assert_eq!(state.ambient_temperature_f(), Some(4));
        assert!(state.begin_refresh(Utc::now()).is_none());
    }

    #[test]
    fn test_manual_wins_over_in_flight_fetch() {
        let mut state = WeatherState::new("OMA");
        let ticket = state.begin_refresh(Utc::now()).unwrap();
        state.set_manual(3, Utc::now());

        assert!(!state.complete_success(&ticket, observation(30)));
        assert_eq!(state.phase(), WeatherPhase::Manual);
        assert_eq!(state.ambient_temperature_f(), Some(3));
    }

    #[test]
    fn test_resume_live_reenables_refresh() {
        let mut state = WeatherState::new("OMA");
        assert!(!state.resume_live());

        state.set_manual(3, Utc::now());
        assert!(state.resume_live());
        assert_eq!(state.phase(), WeatherPhase::Idle);

        let ticket = state.begin_refresh(Utc::now()).unwrap();
        state.complete_success(&ticket, observation(25));
        assert_eq!(state.reading().unwrap().origin, ReadingOrigin::Live);
    }

    #[test]
    fn test_single_refresh_in_flight() {
        let mut state = WeatherState::new("OMA");
        assert!(state.begin_refresh(Utc::now()).is_some());
        assert!(state.begin_refresh(Utc::now()).is_none());
    }

    #[test]
    fn test_only_latest_refresh_commits() {
        let mut state = WeatherState::new("OMA");
        let first = state.begin_refresh(Utc::now()).unwrap();
        state.set_manual(3, Utc::now());
        state.resume_live();
        let second = state.begin_refresh(Utc::now()).unwrap();

        assert!(!state.complete_success(&first, observation(40)));
        assert_eq!(state.phase(), WeatherPhase::Loading);

        assert!(state.complete_success(&second, observation(18)));
        assert_eq!(state.ambient_temperature_f(), Some(18));
    }

    #[test]
    fn test_station_switch_discards_in_flight_result() {
        let mut state = live(5);
        let ticket = state.begin_refresh(Utc::now()).unwrap();
        state.switch_station("DEN");

        assert!(!state.complete_success(&ticket, observation(50)));
        assert_eq!(state.station(), "DEN");
        assert_eq!(state.phase(), WeatherPhase::Idle);
        assert_eq!(state.ambient_temperature_f(), None);

        let fresh = state.begin_refresh(Utc::now()).unwrap();
        assert_eq!(fresh.station, "DEN");
        assert!(state.complete_success(&fresh, observation(41)));
    }
}
