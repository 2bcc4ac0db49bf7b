//! Data models for aircraft, cabin temperature checks and the dashboard
//!
//! Defines the core data structures used throughout the application.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::sources::RosterSource;
use crate::weather::WeatherView;

/// Normalize a tail identifier (registration number): trimmed, upper-case
pub fn normalize_tail(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// An aircraft known to the station registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aircraft {
    pub tail: String,
    pub station: String,
    pub active: bool,
}

impl Aircraft {
    pub fn new(tail: &str, station: &str) -> Self {
        Self {
            tail: normalize_tail(tail),
            station: station.trim().to_uppercase(),
            active: true,
        }
    }
}

/// An immutable cabin temperature check
///
/// Tied to an aircraft only by tail value; records outlive deactivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub id: Uuid,
    pub tail: String,
    /// Cabin temperature (Fahrenheit)
    pub temperature_f: i32,
    /// Identity of whoever took the reading
    pub checked_by: String,
    pub checked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Outside temperature in force when the check was recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outside_temperature_f_at_check: Option<i32>,
}

impl CheckRecord {
    pub fn new(
        tail: &str,
        temperature_f: i32,
        checked_by: &str,
        checked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tail: normalize_tail(tail),
            temperature_f,
            checked_by: checked_by.to_string(),
            checked_at,
            notes: None,
            outside_temperature_f_at_check: None,
        }
    }

    /// Recency order: later `checked_at` wins, ties fall back to record id
    pub fn recency_cmp(&self, other: &Self) -> Ordering {
        self.checked_at
            .cmp(&other.checked_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Input DTO for recording a cabin temperature check
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckInput {
    #[validate(length(min = 1, message = "Tail must not be empty"))]
    pub tail: String,

    /// Cabin temperature (Fahrenheit); bounds are configured, see `validation`
    pub temperature_f: i32,

    #[validate(length(min = 1, message = "Checked-by identity must not be empty"))]
    pub checked_by: String,

    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

/// A check ready for insertion, after validation and normalization
#[derive(Debug, Clone, PartialEq)]
pub struct NewCheck {
    pub tail: String,
    pub temperature_f: i32,
    pub checked_by: String,
    pub checked_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub outside_temperature_f_at_check: Option<i32>,
}

impl From<NewCheck> for CheckRecord {
    fn from(input: NewCheck) -> Self {
        CheckRecord {
            id: Uuid::new_v4(),
            tail: input.tail,
            temperature_f: input.temperature_f,
            checked_by: input.checked_by,
            checked_at: input.checked_at,
            notes: input.notes,
            outside_temperature_f_at_check: input.outside_temperature_f_at_check,
        }
    }
}

/// Where the current ambient reading came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingOrigin {
    Live,
    Manual,
    Unavailable,
}

/// The outside temperature driving the check cadence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbientReading {
    pub temperature_f: i32,
    pub observed_at: DateTime<Utc>,
    pub origin: ReadingOrigin,
}

/// Compliance status of one aircraft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    DueSoon,
    Overdue,
    NoData,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::DueSoon => "DUE SOON",
            Status::Overdue => "OVERDUE",
            Status::NoData => "NO DATA",
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            Status::Overdue => Tone::Danger,
            Status::DueSoon => Tone::Warn,
            Status::Ok => Tone::Good,
            Status::NoData => Tone::Muted,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Urgency tone shown alongside a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Danger,
    Warn,
    Good,
    Muted,
}

impl Tone {
    /// Ranking priority, most urgent first
    pub fn priority(&self) -> u8 {
        match self {
            Tone::Danger => 0,
            Tone::Warn => 1,
            Tone::Good => 2,
            Tone::Muted => 3,
        }
    }
}

impl PartialOrd for Tone {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tone {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority().cmp(&other.priority())
    }
}

/// Per-aircraft projection of the check log; recomputed every pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AircraftSummary {
    pub tail: String,
    pub latest_check: Option<CheckRecord>,
    pub minutes_since_last_check: Option<i64>,
    pub minutes_remaining: Option<i64>,
    pub status: Status,
    pub tone: Tone,
    /// Records for this tail within the fetched window, not a lifetime count
    pub history_count: usize,
}

/// Fleet-level header shown above the aircraft list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeaderStatus {
    Loading,
    Attention,
    DueSoon,
    Ok,
}

impl HeaderStatus {
    pub fn from_counts(loaded: bool, overdue: usize, due_soon: usize) -> Self {
        if !loaded {
            HeaderStatus::Loading
        } else if overdue > 0 {
            HeaderStatus::Attention
        } else if due_soon > 0 {
            HeaderStatus::DueSoon
        } else {
            HeaderStatus::Ok
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            HeaderStatus::Loading | HeaderStatus::DueSoon => Tone::Warn,
            HeaderStatus::Attention => Tone::Danger,
            HeaderStatus::Ok => Tone::Good,
        }
    }
}

/// The most urgent aircraft and how long until its next check is due
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextDue {
    pub tail: String,
    /// Floored at zero for display
    pub minutes: i64,
}

/// The single read model consumed by the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub station: String,
    pub generated_at: DateTime<Utc>,
    pub header: HeaderStatus,
    pub header_tone: Tone,
    pub interval_minutes: i64,
    pub ambient_temperature_f: Option<i32>,
    pub summaries: Vec<AircraftSummary>,
    pub overdue_count: usize,
    pub due_soon_count: usize,
    pub next_due: Option<NextDue>,
    pub recent_checks: Vec<CheckRecord>,
    pub weather: WeatherView,
    pub roster_source: Option<RosterSource>,
    /// When the check log was last loaded successfully
    pub checks_fetched_at: Option<DateTime<Utc>>,
    /// Last data source failure, cleared by the next successful load
    pub last_error: Option<String>,
}

/// Newest-first check history for one tail
#[derive(Debug, Clone, Serialize)]
pub struct TailHistory {
    pub tail: String,
    pub total: usize,
    pub checks: Vec<CheckRecord>,
}

/// A tail on a station's worklist for one operations date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TonightEntry {
    pub station: String,
    pub ops_date: NaiveDate,
    pub tail: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub version: String,
    pub station: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub checks_fetched_at: Option<DateTime<Utc>>,
    pub check_refreshes: u64,
    pub failed_check_refreshes: u64,
    /// Future-dated checks treated as zero minutes old
    pub clock_skew_clamps: u64,
}
