//! Input validation module
//!
//! Rejects bad operator input before it can reach the check log or the
//! weather state: out-of-range temperatures, empty identities, empty tails.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use validator::Validate;

use crate::config::ValidationSettings;
use crate::error::{AppError, AppResult};
use crate::models::{normalize_tail, CheckInput, NewCheck};

/// Fixed bounds that do not come from configuration
pub struct InputConstraints;

impl InputConstraints {
    /// Plausible manual outside temperature range (Fahrenheit)
    pub const AMBIENT_MIN_F: i32 = -80;
    pub const AMBIENT_MAX_F: i32 = 140;

    /// Longest tail identifier accepted
    pub const TAIL_MAX_LEN: usize = 10;

    /// Station codes are IATA or ICAO style
    pub const STATION_LEN: std::ops::RangeInclusive<usize> = 3..=4;

    /// History page size bounds
    pub const HISTORY_DEFAULT: usize = 100;
    pub const HISTORY_MAX: usize = 500;
}

/// Validate a check submission and turn it into an insertable record
pub fn validate_check_input(
    input: &CheckInput,
    bounds: &ValidationSettings,
    outside_temperature_f: Option<i32>,
    now: DateTime<Utc>,
) -> AppResult<NewCheck> {
    if let Err(validation_errors) = input.validate() {
        let error_messages: Vec<String> = validation_errors
            .field_errors()
            .iter()
            .map(|(field, errors)| {
                let msgs: Vec<&str> = errors
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|c| c.as_ref()))
                    .collect();
                format!("{}: {}", field, msgs.join(", "))
            })
            .collect();

        warn!(errors = ?error_messages, "Check input validation failed");
        return Err(AppError::Validation(error_messages.join("; ")));
    }

    let tail = validate_tail(&input.tail)?;
    validate_cabin_temperature(input.temperature_f, bounds)?;

    let checked_by = input.checked_by.trim();
    if checked_by.is_empty() {
        return Err(AppError::Validation(
            "Checked-by identity must not be empty".to_string(),
        ));
    }

    let notes = input
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    debug!(tail = %tail, "Check input validation passed");

    Ok(NewCheck {
        tail,
        temperature_f: input.temperature_f,
        checked_by: checked_by.to_string(),
        checked_at: now,
        notes,
        outside_temperature_f_at_check: outside_temperature_f,
    })
}

/// Normalize and validate a tail identifier
pub fn validate_tail(raw: &str) -> AppResult<String> {
    let tail = normalize_tail(raw);
    if tail.is_empty() {
        return Err(AppError::Validation("Tail must not be empty".to_string()));
    }
    if tail.len() > InputConstraints::TAIL_MAX_LEN {
        return Err(AppError::Validation(format!(
            "Tail {} longer than {} characters",
            tail,
            InputConstraints::TAIL_MAX_LEN
        )));
    }
    if !tail.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(AppError::Validation(format!(
            "Tail {} contains invalid characters",
            tail
        )));
    }
    Ok(tail)
}

/// Normalize and validate a station code
pub fn validate_station(raw: &str) -> AppResult<String> {
    let station = raw.trim().to_uppercase();
    if !InputConstraints::STATION_LEN.contains(&station.len())
        || !station.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(AppError::Validation(format!(
            "Station code {:?} must be 3 or 4 letters or digits",
            station
        )));
    }
    Ok(station)
}

/// Validate a cabin temperature against the configured inclusive range
pub fn validate_cabin_temperature(value: i32, bounds: &ValidationSettings) -> AppResult<()> {
    if value < bounds.cabin_temp_min_f || value > bounds.cabin_temp_max_f {
        return Err(AppError::Validation(format!(
            "Cabin temperature {}°F out of valid range [{}, {}]",
            value, bounds.cabin_temp_min_f, bounds.cabin_temp_max_f
        )));
    }
    Ok(())
}

/// Validate a manually entered outside temperature
pub fn validate_ambient_temperature(value: i32) -> AppResult<()> {
    if !(InputConstraints::AMBIENT_MIN_F..=InputConstraints::AMBIENT_MAX_F).contains(&value) {
        return Err(AppError::Validation(format!(
            "Outside temperature {}°F out of valid range [{}, {}]",
            value,
            InputConstraints::AMBIENT_MIN_F,
            InputConstraints::AMBIENT_MAX_F
        )));
    }
    Ok(())
}

/// Validate a history page size
pub fn validate_history_limit(limit: Option<usize>) -> AppResult<usize> {
    let limit = limit.unwrap_or(InputConstraints::HISTORY_DEFAULT);
    if limit == 0 || limit > InputConstraints::HISTORY_MAX {
        return Err(AppError::Validation(format!(
            "Limit must be between 1 and {}",
            InputConstraints::HISTORY_MAX
        )));
    }
    Ok(limit)
}
