//! Check cadence rule
//!
//! Maps the ambient (outside) temperature to the required interval between
//! cabin temperature checks. Cold weather tightens the cadence.

use serde::{Deserialize, Serialize};

/// Weather-dependent check interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadenceRule {
    /// Ambient temperatures strictly below this use the cold interval (°F)
    pub cold_threshold_f: i32,
    pub cold_interval_minutes: i64,
    pub normal_interval_minutes: i64,
    /// Interval while the ambient temperature is unknown
    pub unknown_interval_minutes: i64,
}

impl CadenceRule {
    pub const DEFAULT_COLD_THRESHOLD_F: i32 = 10;
    pub const DEFAULT_COLD_INTERVAL_MINUTES: i64 = 30;
    pub const DEFAULT_NORMAL_INTERVAL_MINUTES: i64 = 60;
    pub const DEFAULT_UNKNOWN_INTERVAL_MINUTES: i64 = 60;

    /// Required minutes between checks for the given ambient temperature
    pub fn required_interval_minutes(&self, ambient_temperature_f: Option<i32>) -> i64 {
        match ambient_temperature_f {
            None => self.unknown_interval_minutes,
            Some(t) if t < self.cold_threshold_f => self.cold_interval_minutes,
            Some(_) => self.normal_interval_minutes,
        }
    }
}

impl Default for CadenceRule {
    fn default() -> Self {
        Self {
            cold_threshold_f: Self::DEFAULT_COLD_THRESHOLD_F,
            cold_interval_minutes: Self::DEFAULT_COLD_INTERVAL_MINUTES,
            normal_interval_minutes: Self::DEFAULT_NORMAL_INTERVAL_MINUTES,
            unknown_interval_minutes: Self::DEFAULT_UNKNOWN_INTERVAL_MINUTES,
        }
    }
}
