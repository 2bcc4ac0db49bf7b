//! External weather source
//!
//! Fetches the current outside temperature for a station from Open-Meteo
//! (no API key). One attempt per call, bounded by the client timeout; any
//! non-success response or missing temperature is a `WeatherFetch` error.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::weather::AmbientObservation;

/// Anything that can report the current outside temperature for a station
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch_ambient_temperature(&self, station: &str) -> AppResult<AmbientObservation>;
}

/// Known station coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationSite {
    pub code: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

/// Eppley Airfield, Omaha
pub const OMA: StationSite = StationSite {
    code: "OMA",
    latitude: 41.3032,
    longitude: -95.8941,
};

const STATIONS: &[StationSite] = &[OMA];

/// Coordinates for a station code; unknown codes fall back to OMA
pub fn station_site(code: &str) -> StationSite {
    STATIONS
        .iter()
        .copied()
        .find(|s| s.code.eq_ignore_ascii_case(code.trim()))
        .unwrap_or(OMA)
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<CurrentConditions>,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temperature_2m: Option<f64>,
    time: Option<String>,
}

/// Open-Meteo forecast API client
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("rampwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("Weather client setup failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn fetch_ambient_temperature(&self, station: &str) -> AppResult<AmbientObservation> {
        let site = station_site(station);
        let url = format!("{}/v1/forecast", self.base_url);

        debug!(station = site.code, url = %url, "Fetching outside temperature");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("latitude", site.latitude.to_string()),
                ("longitude", site.longitude.to_string()),
                ("current", "temperature_2m".to_string()),
                ("temperature_unit", "fahrenheit".to_string()),
                ("timezone", "UTC".to_string()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::WeatherFetch(format!(
                "Weather fetch failed: HTTP {}",
                resp.status().as_u16()
            )));
        }

        let body: ForecastResponse = resp.json().await?;
        let current = body.current.ok_or_else(missing_temperature)?;
        let temperature = current
            .temperature_2m
            .filter(|t| t.is_finite())
            .ok_or_else(missing_temperature)?;

        let observed_at = current
            .time
            .as_deref()
            .and_then(parse_observation_time)
            .unwrap_or_else(Utc::now);

        Ok(AmbientObservation {
            temperature_f: temperature.round() as i32,
            observed_at,
        })
    }
}

fn missing_temperature() -> AppError {
    AppError::WeatherFetch("Weather fetch failed: missing temperature".into())
}

/// Open-Meteo reports `current.time` as ISO 8601 without seconds or offset
fn parse_observation_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
                .ok()
                .map(|t| t.and_utc())
        })
}
