//! Ramp Watch
//!
//! Cabin temperature check cadence monitor for a station fleet. Tracks
//! when each active aircraft was last checked, how often it must be
//! checked given the outside temperature, and which aircraft need
//! attention first.

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod aggregate;
mod cadence;
mod clients;
mod config;
mod demo;
mod error;
mod handlers;
mod models;
mod monitor;
mod ranking;
mod sources;
mod state;
mod status;
mod tasks;
mod validation;
mod weather;

use crate::clients::OpenMeteoClient;
use crate::config::Settings;
use crate::demo::DemoSeeder;
use crate::monitor::StationMonitor;
use crate::sources::InMemoryStore;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenv::dotenv().ok();

    // Logging
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rampwatch=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();

    // Load configuration
    let settings = Settings::from_env().context("Failed to load configuration")?;
    let bind_address = format!("{}:{}", settings.server.host, settings.server.port);

    info!(
        station = %settings.station,
        roster_source = %settings.roster_source,
        "Starting Ramp Watch"
    );
    info!("Binding server to {}", bind_address);

    // Registry and check log
    let store = Arc::new(InMemoryStore::new());
    if settings.demo_seed {
        DemoSeeder::new(&settings.station)
            .seed(&store, chrono::Utc::now())
            .await;
    }

    let weather_client =
        OpenMeteoClient::new(&settings.weather.base_url, settings.weather.timeout_secs)
            .context("Failed to build weather client")?;

    let weather_every = Duration::from_secs(settings.refresh.weather_secs);
    let checks_every = Duration::from_secs(settings.refresh.checks_secs);

    let monitor = Arc::new(StationMonitor::new(
        settings,
        store.clone(),
        store,
        Arc::new(weather_client),
    ));

    if let Err(e) = monitor.refresh_all().await {
        warn!(error = %e, "Initial load failed, serving until the next refresh");
    }

    // ---------------------------------------------------------------------
    // Refresh loops
    // IMPORTANT: use actix_rt::spawn (NOT tokio::spawn)
    // ---------------------------------------------------------------------
    actix_rt::spawn(tasks::run_weather_refresh(monitor.clone(), weather_every));
    actix_rt::spawn(tasks::run_check_refresh(monitor.clone(), checks_every));

    // ---------------------------------------------------------------------
    // HTTP server
    // ---------------------------------------------------------------------
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(monitor.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
