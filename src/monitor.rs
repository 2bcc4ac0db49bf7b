//! Station monitor
//!
//! Owns the refresh cycles for one station and builds the dashboard read
//! model from a consistent snapshot of the weather state and check cache.
//! Weather failures are absorbed into the weather state; data source
//! failures propagate to the caller and leave the previous cache in place.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::aggregate::{aggregate, AggregationParams};
use crate::clients::WeatherSource;
use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::models::{
    AircraftSummary, CheckInput, CheckRecord, DashboardView, HeaderStatus, HealthCheck, NextDue,
    Status, TailHistory, TonightEntry,
};
use crate::ranking::rank;
use crate::sources::{load_roster, AircraftRegistry, CheckLog};
use crate::state::{AppState, CheckCache};
use crate::status::clock_skew_clamps;
use crate::validation::{
    validate_ambient_temperature, validate_check_input, validate_history_limit,
    validate_station, validate_tail,
};
use crate::weather::WeatherView;

/// Checks listed in the dashboard's recent activity strip
const RECENT_CHECKS_SHOWN: usize = 4;

/// Operations date for a timestamp
pub fn ops_date(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

pub struct StationMonitor {
    settings: Settings,
    registry: Arc<dyn AircraftRegistry>,
    check_log: Arc<dyn CheckLog>,
    weather_source: Arc<dyn WeatherSource>,
    state: Arc<RwLock<AppState>>,
}

impl StationMonitor {
    pub fn new(
        settings: Settings,
        registry: Arc<dyn AircraftRegistry>,
        check_log: Arc<dyn CheckLog>,
        weather_source: Arc<dyn WeatherSource>,
    ) -> Self {
        let state = Arc::new(RwLock::new(AppState::new(&settings.station)));
        Self {
            settings,
            registry,
            check_log,
            weather_source,
            state,
        }
    }

    fn aggregation_params(&self) -> AggregationParams {
        AggregationParams {
            rule: self.settings.cadence.rule(),
            due_soon_minutes: self.settings.cadence.due_soon_minutes,
        }
    }

    pub async fn station(&self) -> String {
        self.state.read().await.station().to_string()
    }

    /// Reload the roster and its recent checks into the cache
    pub async fn refresh_checks(&self) -> AppResult<usize> {
        let (station, epoch) = {
            let state = self.state.read().await;
            (state.station().to_string(), state.epoch())
        };

        match self.load_checks(&station).await {
            Ok(cache) => {
                let records = cache.records.len();
                let committed = self.state.write().await.commit_checks(epoch, cache);
                if committed {
                    debug!(station = %station, records, "Check log refreshed");
                }
                Ok(records)
            }
            Err(e) => {
                error!(station = %station, error = %e, "Check log refresh failed");
                self.state
                    .write()
                    .await
                    .record_check_failure(epoch, e.to_string());
                Err(e)
            }
        }
    }

    async fn load_checks(&self, station: &str) -> AppResult<CheckCache> {
        let now = Utc::now();
        let (roster, roster_source) = load_roster(
            self.registry.as_ref(),
            self.settings.roster_source,
            station,
            ops_date(now),
        )
        .await?;

        let records = if roster.is_empty() {
            Vec::new()
        } else {
            self.check_log
                .list_recent_checks(&roster, self.settings.refresh.check_fetch_limit)
                .await?
        };

        Ok(CheckCache {
            roster,
            roster_source,
            records,
            fetched_at: now,
        })
    }

    /// Run one weather fetch unless suppressed; never fails
    pub async fn refresh_weather(&self) -> WeatherView {
        let ticket = {
            let mut state = self.state.write().await;
            match state.weather_mut().begin_refresh(Utc::now()) {
                Some(ticket) => ticket,
                None => {
                    debug!(phase = ?state.weather().phase(), "Weather refresh skipped");
                    return state.weather().view();
                }
            }
        };

        let result = self
            .weather_source
            .fetch_ambient_temperature(&ticket.station)
            .await;

        let mut state = self.state.write().await;
        let weather = state.weather_mut();
        match result {
            Ok(observation) => {
                weather.complete_success(&ticket, observation);
            }
            Err(e) => {
                weather.complete_failure(&ticket, &e.to_string());
            }
        }
        debug!(
            station = %weather.station(),
            phase = ?weather.phase(),
            "Weather refresh finished"
        );
        weather.view()
    }

    /// Run both refresh cycles concurrently
    pub async fn refresh_all(&self) -> AppResult<()> {
        let (_, checks) = futures::join!(self.refresh_weather(), self.refresh_checks());
        checks.map(|_| ())
    }

    pub async fn weather(&self) -> WeatherView {
        self.state.read().await.weather().view()
    }

    pub async fn set_manual_temperature(&self, temperature_f: i32) -> AppResult<WeatherView> {
        validate_ambient_temperature(temperature_f)?;
        let mut state = self.state.write().await;
        state.weather_mut().set_manual(temperature_f, Utc::now());
        Ok(state.weather().view())
    }

    /// Leave manual mode and fetch a live reading straight away
    pub async fn resume_live_weather(&self) -> WeatherView {
        let resumed = self.state.write().await.weather_mut().resume_live();
        if !resumed {
            debug!("Resume requested while not in manual mode");
        }
        self.refresh_weather().await
    }

    /// Build the dashboard from the current snapshot
    pub async fn get_dashboard(&self, now: DateTime<Utc>) -> DashboardView {
        let (snapshot, weather) = {
            let state = self.state.read().await;
            (state.snapshot(), state.weather().view())
        };
        let params = self.aggregation_params();
        let interval_minutes = params
            .rule
            .required_interval_minutes(snapshot.ambient_temperature_f);

        let (summaries, recent_checks) = match &snapshot.checks {
            Some(cache) => {
                let summaries = aggregate(
                    &cache.roster,
                    &cache.records,
                    snapshot.ambient_temperature_f,
                    now,
                    &params,
                );
                (rank(summaries), recent_checks(&cache.records))
            }
            None => (Vec::new(), Vec::new()),
        };

        let overdue_count = count_status(&summaries, Status::Overdue);
        let due_soon_count = count_status(&summaries, Status::DueSoon);
        let header =
            HeaderStatus::from_counts(snapshot.checks.is_some(), overdue_count, due_soon_count);

        let next_due = summaries.iter().find_map(|s| {
            s.minutes_remaining.map(|minutes| NextDue {
                tail: s.tail.clone(),
                minutes: minutes.max(0),
            })
        });

        if let Some(top) = summaries.first() {
            debug!(
                station = %snapshot.station,
                tail = %top.tail,
                status = %top.status,
                overdue = overdue_count,
                due_soon = due_soon_count,
                "Dashboard built"
            );
        }

        DashboardView {
            station: snapshot.station,
            generated_at: now,
            header,
            header_tone: header.tone(),
            interval_minutes,
            ambient_temperature_f: snapshot.ambient_temperature_f,
            summaries,
            overdue_count,
            due_soon_count,
            next_due,
            recent_checks,
            weather,
            roster_source: snapshot.checks.as_ref().map(|c| c.roster_source),
            checks_fetched_at: snapshot.checks.as_ref().map(|c| c.fetched_at),
            last_error: snapshot.last_error,
        }
    }

    /// Validate and store a cabin temperature check
    pub async fn record_check(&self, input: &CheckInput) -> AppResult<CheckRecord> {
        let (station, ambient) = {
            let state = self.state.read().await;
            (
                state.station().to_string(),
                state.weather().ambient_temperature_f(),
            )
        };

        let check = validate_check_input(input, &self.settings.validation, ambient, Utc::now())?;
        self.registry.ensure_active(&check.tail, &station).await?;
        let record = self.check_log.insert_check(check).await?;

        info!(
            station = %station,
            tail = %record.tail,
            temperature_f = record.temperature_f,
            "Cabin temperature check recorded"
        );

        if let Err(e) = self.refresh_checks().await {
            warn!(tail = %record.tail, error = %e, "Check stored but cache refresh failed");
        }
        Ok(record)
    }

    /// Newest-first checks for one tail with its lifetime count
    pub async fn tail_history(&self, tail: &str, limit: Option<usize>) -> AppResult<TailHistory> {
        let tail = validate_tail(tail)?;
        let limit = validate_history_limit(limit)?;

        let checks = self
            .check_log
            .list_recent_checks(std::slice::from_ref(&tail), limit)
            .await?;
        let total = self.check_log.count_checks(&tail).await?;

        Ok(TailHistory {
            tail,
            total,
            checks,
        })
    }

    pub async fn tonight(&self, date: Option<NaiveDate>) -> AppResult<Vec<String>> {
        let station = self.station().await;
        let date = date.unwrap_or_else(|| ops_date(Utc::now()));
        self.registry.list_tonight_tails(&station, date).await
    }

    pub async fn add_tonight(
        &self,
        tail: &str,
        date: Option<NaiveDate>,
    ) -> AppResult<TonightEntry> {
        let entry = TonightEntry {
            station: self.station().await,
            ops_date: date.unwrap_or_else(|| ops_date(Utc::now())),
            tail: validate_tail(tail)?,
        };
        self.registry.add_tonight(entry.clone()).await?;
        info!(station = %entry.station, tail = %entry.tail, "Tail added to tonight's worklist");
        self.refresh_after_roster_change().await;
        Ok(entry)
    }

    pub async fn remove_tonight(&self, tail: &str, date: Option<NaiveDate>) -> AppResult<()> {
        let station = self.station().await;
        let tail = validate_tail(tail)?;
        let date = date.unwrap_or_else(|| ops_date(Utc::now()));

        if !self.registry.remove_tonight(&station, date, &tail).await? {
            return Err(AppError::NotFound(format!(
                "{} is not on the {} worklist for {}",
                tail, station, date
            )));
        }
        info!(station = %station, tail = %tail, "Tail removed from tonight's worklist");
        self.refresh_after_roster_change().await;
        Ok(())
    }

    async fn refresh_after_roster_change(&self) {
        if let Err(e) = self.refresh_checks().await {
            warn!(error = %e, "Cache refresh after worklist change failed");
        }
    }

    /// Point the monitor at another station; in-flight results for the old one are dropped
    pub async fn switch_station(&self, station: &str) -> AppResult<String> {
        let station = validate_station(station)?;
        {
            let mut state = self.state.write().await;
            if state.station() == station {
                return Ok(station);
            }
            state.switch_station(&station);
        }
        if let Err(e) = self.refresh_all().await {
            warn!(station = %station, error = %e, "Initial load for new station failed");
        }
        Ok(station)
    }

    pub async fn health(&self) -> HealthCheck {
        let state = self.state.read().await;
        HealthCheck {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            station: state.station().to_string(),
            timestamp: Utc::now(),
            uptime_seconds: state.uptime_seconds(),
            checks_fetched_at: state.checks_fetched_at(),
            check_refreshes: state.total_refreshes(),
            failed_check_refreshes: state.failed_refreshes(),
            clock_skew_clamps: clock_skew_clamps(),
        }
    }
}

fn count_status(summaries: &[AircraftSummary], status: Status) -> usize {
    summaries.iter().filter(|s| s.status == status).count()
}

fn recent_checks(records: &[CheckRecord]) -> Vec<CheckRecord> {
    let mut newest: Vec<&CheckRecord> = records.iter().collect();
    newest.sort_by(|a, b| b.recency_cmp(a));
    newest
        .into_iter()
        .take(RECENT_CHECKS_SHOWN)
        .cloned()
        .collect()
}
