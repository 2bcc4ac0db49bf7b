//! Configuration management module
//!
//! Loads and validates environment-based configuration for the station
//! monitor: server binding, cadence rule parameters, refresh timers,
//! the weather source and input validation bounds.

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::cadence::CadenceRule;
use crate::sources::RosterSource;

/// Configuration errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid value for environment variable {0}")]
    ParseError(String),
}

/// Server configuration settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Check cadence and status thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct CadenceSettings {
    /// Ambient temperatures strictly below this switch to the cold interval
    pub cold_threshold_f: i32,
    pub cold_interval_minutes: i64,
    pub normal_interval_minutes: i64,
    /// Interval used while no ambient reading is usable
    pub unknown_interval_minutes: i64,
    /// Remaining minutes at or below which an aircraft is due soon
    pub due_soon_minutes: i64,
}

impl CadenceSettings {
    pub fn rule(&self) -> CadenceRule {
        CadenceRule {
            cold_threshold_f: self.cold_threshold_f,
            cold_interval_minutes: self.cold_interval_minutes,
            normal_interval_minutes: self.normal_interval_minutes,
            unknown_interval_minutes: self.unknown_interval_minutes,
        }
    }
}

/// Refresh timer settings
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshSettings {
    pub weather_secs: u64,
    pub checks_secs: u64,
    /// Upper bound on check records pulled per check-log refresh
    pub check_fetch_limit: usize,
}

/// Weather source settings
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Cabin temperature input bounds (Fahrenheit, inclusive)
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationSettings {
    pub cabin_temp_min_f: i32,
    pub cabin_temp_max_f: i32,
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub station: String,
    pub cadence: CadenceSettings,
    pub refresh: RefreshSettings,
    pub weather: WeatherSettings,
    pub validation: ValidationSettings,
    pub roster_source: RosterSource,
    pub demo_seed: bool,
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse = |key: &str| lookup(key).map(|raw| raw.trim().to_string());

        Ok(Self {
            server: ServerSettings {
                host: parse("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_or(&parse, "SERVER_PORT", defaults.server.port)?,
            },
            station: parse("STATION")
                .map(|s| s.to_uppercase())
                .unwrap_or(defaults.station),
            cadence: CadenceSettings {
                cold_threshold_f: parse_or(
                    &parse,
                    "CADENCE_COLD_THRESHOLD_F",
                    defaults.cadence.cold_threshold_f,
                )?,
                cold_interval_minutes: parse_or(
                    &parse,
                    "CADENCE_COLD_INTERVAL_MIN",
                    defaults.cadence.cold_interval_minutes,
                )?,
                normal_interval_minutes: parse_or(
                    &parse,
                    "CADENCE_NORMAL_INTERVAL_MIN",
                    defaults.cadence.normal_interval_minutes,
                )?,
                unknown_interval_minutes: parse_or(
                    &parse,
                    "CADENCE_UNKNOWN_INTERVAL_MIN",
                    defaults.cadence.unknown_interval_minutes,
                )?,
                due_soon_minutes: parse_or(
                    &parse,
                    "DUE_SOON_MINUTES",
                    defaults.cadence.due_soon_minutes,
                )?,
            },
            refresh: RefreshSettings {
                weather_secs: parse_or(
                    &parse,
                    "WEATHER_REFRESH_SECS",
                    defaults.refresh.weather_secs,
                )?,
                checks_secs: parse_or(
                    &parse,
                    "CHECKS_REFRESH_SECS",
                    defaults.refresh.checks_secs,
                )?,
                check_fetch_limit: parse_or(
                    &parse,
                    "CHECK_FETCH_LIMIT",
                    defaults.refresh.check_fetch_limit,
                )?,
            },
            weather: WeatherSettings {
                base_url: parse("WEATHER_BASE_URL").unwrap_or(defaults.weather.base_url),
                timeout_secs: parse_or(
                    &parse,
                    "WEATHER_TIMEOUT_SECS",
                    defaults.weather.timeout_secs,
                )?,
            },
            validation: ValidationSettings {
                cabin_temp_min_f: parse_or(
                    &parse,
                    "CABIN_TEMP_MIN_F",
                    defaults.validation.cabin_temp_min_f,
                )?,
                cabin_temp_max_f: parse_or(
                    &parse,
                    "CABIN_TEMP_MAX_F",
                    defaults.validation.cabin_temp_max_f,
                )?,
            },
            roster_source: parse_or(&parse, "ROSTER_SOURCE", defaults.roster_source)?,
            demo_seed: parse_or(&parse, "DEMO_SEED", defaults.demo_seed)?,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".into(),
                port: 8080,
            },
            station: "OMA".into(),
            cadence: CadenceSettings {
                cold_threshold_f: 10,
                cold_interval_minutes: 30,
                normal_interval_minutes: 60,
                unknown_interval_minutes: 60,
                due_soon_minutes: 10,
            },
            refresh: RefreshSettings {
                weather_secs: 300,
                checks_secs: 30,
                check_fetch_limit: 500,
            },
            weather: WeatherSettings {
                base_url: "https://api.open-meteo.com".into(),
                timeout_secs: 10,
            },
            validation: ValidationSettings {
                cabin_temp_min_f: 1,
                cabin_temp_max_f: 149,
            },
            roster_source: RosterSource::ActiveFleet,
            demo_seed: false,
        }
    }
}

fn parse_or<T, P>(parse: &P, key: &str, default: T) -> Result<T, SettingsError>
where
    T: FromStr,
    P: Fn(&str) -> Option<String>,
{
    match parse(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| SettingsError::ParseError(key.to_string())),
        None => Ok(default),
    }
}
