//! Periodic refresh loops
//!
//! Weather and check log refresh on independent timers. A slow or failing
//! cycle never delays the other one.

use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::monitor::StationMonitor;

/// Refresh the ambient reading every `every`
pub async fn run_weather_refresh(monitor: Arc<StationMonitor>, every: Duration) {
    info!(interval_secs = every.as_secs(), "Starting weather refresh loop");

    let mut tick_interval = interval(every);
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tick_interval.tick().await;
        let view = monitor.refresh_weather().await;
        debug!(
            station = %view.station,
            phase = ?view.phase,
            temperature_f = ?view.temperature_f,
            "Weather refresh tick"
        );
    }
}

/// Reload the check log every `every`
pub async fn run_check_refresh(monitor: Arc<StationMonitor>, every: Duration) {
    info!(interval_secs = every.as_secs(), "Starting check log refresh loop");

    let mut tick_interval = interval(every);
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut tick_count: u64 = 0;

    loop {
        tick_interval.tick().await;
        tick_count += 1;

        match monitor.refresh_checks().await {
            Ok(records) => {
                if tick_count % 20 == 0 {
                    info!(tick_count, records, "Check log refresh running");
                }
            }
            Err(e) => error!(tick_count, error = %e, "Scheduled check log refresh failed"),
        }
    }
}
