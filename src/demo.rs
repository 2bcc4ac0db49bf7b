//! Demo fleet seeding
//!
//! Fills the in-memory store with a small station fleet and a plausible
//! check history so the dashboard has something to show without a real
//! registry behind it.
//!
//! Each tail gets `CHECKS_PER_TAIL` checks roughly an hour apart. The
//! latest check ages are staggered so a fresh demo shows a mix of OK,
//! due soon and overdue aircraft once the cadence tightens.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::{info, warn};

use crate::models::{Aircraft, CheckRecord};
use crate::sources::InMemoryStore;

pub const DEMO_TAILS: [&str; 6] = ["N123PD", "N456PD", "N789PD", "N321PD", "N654PD", "N987PD"];

const CHECKS_PER_TAIL: usize = 5;

/// Minutes since the latest check, per demo tail
const LATEST_CHECK_AGES: [i64; 6] = [18, 42, 61, 9, 28, 35];

const CHECKERS: [&str; 4] = ["S. Santos", "A. Zimmer", "T. Begum", "R. Okafor"];

/// Demo data generator
pub struct DemoSeeder {
    station: String,
    /// Mean cabin temperature (Fahrenheit)
    base_temperature: f64,
    /// Spread of cabin temperatures around the mean
    temperature_sd: f64,
    /// Nominal spacing between checks
    spacing_minutes: i64,
}

impl DemoSeeder {
    pub fn new(station: &str) -> Self {
        Self {
            station: station.to_string(),
            base_temperature: 72.0,
            temperature_sd: 1.5,
            spacing_minutes: 60,
        }
    }

    /// Build the demo check history relative to `now`
    pub fn generate(&self, now: DateTime<Utc>) -> Vec<CheckRecord> {
        let mut rng = rand::thread_rng();
        let temperatures = match Normal::new(self.base_temperature, self.temperature_sd) {
            Ok(dist) => dist,
            Err(e) => {
                warn!(error = %e, "Invalid demo temperature distribution");
                return Vec::new();
            }
        };

        let mut records = Vec::with_capacity(DEMO_TAILS.len() * CHECKS_PER_TAIL);
        for (tail, latest_age) in DEMO_TAILS.iter().zip(LATEST_CHECK_AGES) {
            let mut age = latest_age;
            for _ in 0..CHECKS_PER_TAIL {
                let temperature = temperatures.sample(&mut rng).round().clamp(60.0, 85.0) as i32;
                let checker = CHECKERS[rng.gen_range(0..CHECKERS.len())];
                records.push(CheckRecord::new(
                    tail,
                    temperature,
                    checker,
                    now - Duration::minutes(age),
                ));
                age += self.spacing_minutes + rng.gen_range(-5..=5);
            }
        }
        records
    }

    /// Register the demo fleet at the station and load its history
    pub async fn seed(&self, store: &InMemoryStore, now: DateTime<Utc>) -> usize {
        for tail in DEMO_TAILS {
            store.upsert_aircraft(Aircraft::new(tail, &self.station)).await;
        }

        let records = self.generate(now);
        let count = records.len();
        for record in records {
            store.push_check(record).await;
        }

        info!(
            station = %self.station,
            tails = DEMO_TAILS.len(),
            checks = count,
            "Seeded demo fleet"
        );
        count
    }
}
