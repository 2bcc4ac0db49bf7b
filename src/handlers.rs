//! HTTP request handlers
//!
//! REST surface over the station monitor. Handlers only parse input and
//! shape responses; all behavior lives in `StationMonitor`.

use actix_web::{web, HttpRequest, HttpResponse, Result};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::CheckInput;
use crate::monitor::StationMonitor;

type Monitor = web::Data<Arc<StationMonitor>>;

/// Configure all application routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Health check
            .route("/health", web::get().to(health_check))
            // Dashboard
            .route("/dashboard", web::get().to(get_dashboard))
            .route("/refresh", web::post().to(refresh_now))
            // Checks
            .route("/checks", web::post().to(record_check))
            .route("/aircraft/{tail}/history", web::get().to(get_tail_history))
            // Weather
            .route("/weather", web::get().to(get_weather))
            .route("/weather/refresh", web::post().to(refresh_weather))
            .route("/weather/manual", web::post().to(set_manual_weather))
            .route("/weather/resume", web::post().to(resume_live_weather))
            // Tonight's worklist
            .route("/tonight", web::get().to(get_tonight))
            .route("/tonight", web::post().to(add_tonight))
            .route("/tonight/{tail}", web::delete().to(remove_tonight))
            // Station
            .route("/station", web::put().to(switch_station)),
    );
}

/// Health check endpoint
///
/// GET /api/health
pub async fn health_check(monitor: Monitor) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(monitor.health().await))
}

/// GET /api/dashboard
pub async fn get_dashboard(monitor: Monitor) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(monitor.get_dashboard(Utc::now()).await))
}

/// Run both refresh cycles now
///
/// POST /api/refresh
///
/// A check log failure is returned as an error; the dashboard keeps
/// showing the previous data either way.
pub async fn refresh_now(monitor: Monitor, req: HttpRequest) -> Result<HttpResponse, AppError> {
    let correlation_id = extract_correlation_id(&req);
    info!(correlation_id = %correlation_id, "Manual refresh requested");

    monitor.refresh_all().await?;
    Ok(HttpResponse::Ok().json(monitor.get_dashboard(Utc::now()).await))
}

/// Record a cabin temperature check
///
/// POST /api/checks
pub async fn record_check(
    monitor: Monitor,
    body: web::Json<CheckInput>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let correlation_id = extract_correlation_id(&req);

    info!(
        correlation_id = %correlation_id,
        tail = %body.tail,
        "Received cabin temperature check"
    );

    let record = monitor.record_check(&body).await?;

    info!(
        correlation_id = %correlation_id,
        check_id = %record.id,
        "Cabin temperature check stored"
    );

    Ok(HttpResponse::Created().json(record))
}

/// Query parameters for tail history
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// GET /api/aircraft/{tail}/history?limit=100
pub async fn get_tail_history(
    monitor: Monitor,
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let history = monitor.tail_history(&path.into_inner(), query.limit).await?;
    Ok(HttpResponse::Ok().json(history))
}

/// GET /api/weather
pub async fn get_weather(monitor: Monitor) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(monitor.weather().await))
}

/// POST /api/weather/refresh
///
/// Always succeeds; a failed fetch shows up in the returned weather phase.
pub async fn refresh_weather(monitor: Monitor) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(monitor.refresh_weather().await))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ManualTemperatureRequest {
    #[serde(alias = "temperatureF")]
    pub temperature_f: i32,
}

/// Override the outside temperature
///
/// POST /api/weather/manual
pub async fn set_manual_weather(
    monitor: Monitor,
    body: web::Json<ManualTemperatureRequest>,
) -> Result<HttpResponse, AppError> {
    let view = monitor.set_manual_temperature(body.temperature_f).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// POST /api/weather/resume
pub async fn resume_live_weather(monitor: Monitor) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(monitor.resume_live_weather().await))
}

/// Optional operations date override for worklist routes
#[derive(Debug, Deserialize)]
pub struct OpsDateQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Serialize)]
struct TonightResponse {
    station: String,
    tails: Vec<String>,
}

/// GET /api/tonight?date=2026-01-14
pub async fn get_tonight(
    monitor: Monitor,
    query: web::Query<OpsDateQuery>,
) -> Result<HttpResponse, AppError> {
    let tails = monitor.tonight(query.date).await?;
    Ok(HttpResponse::Ok().json(TonightResponse {
        station: monitor.station().await,
        tails,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TonightRequest {
    pub tail: String,
    pub date: Option<NaiveDate>,
}

/// POST /api/tonight
pub async fn add_tonight(
    monitor: Monitor,
    body: web::Json<TonightRequest>,
) -> Result<HttpResponse, AppError> {
    let entry = monitor.add_tonight(&body.tail, body.date).await?;
    Ok(HttpResponse::Created().json(entry))
}

/// DELETE /api/tonight/{tail}
pub async fn remove_tonight(
    monitor: Monitor,
    path: web::Path<String>,
    query: web::Query<OpsDateQuery>,
) -> Result<HttpResponse, AppError> {
    monitor.remove_tonight(&path.into_inner(), query.date).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StationRequest {
    pub station: String,
}

/// Switch the monitored station
///
/// PUT /api/station
pub async fn switch_station(
    monitor: Monitor,
    body: web::Json<StationRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let correlation_id = extract_correlation_id(&req);
    let previous = monitor.station().await;

    let station = monitor.switch_station(&body.station).await.map_err(|e| {
        warn!(correlation_id = %correlation_id, error = %e, "Station switch rejected");
        e
    })?;

    info!(
        correlation_id = %correlation_id,
        from = %previous,
        to = %station,
        "Station switched"
    );

    Ok(HttpResponse::Ok().json(monitor.get_dashboard(Utc::now()).await))
}

/// Extract or generate correlation ID from request headers
fn extract_correlation_id(req: &HttpRequest) -> String {
    req.headers()
        .get("X-Correlation-ID")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CheckRecord;
    use crate::monitor::tests::fixture;
    use actix_web::{test, App};
    use chrono::Duration;
    use serde_json::Value;
    use std::sync::atomic::Ordering;

    macro_rules! app_for {
        ($monitor:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($monitor))
                    .configure(configure_routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_health_check() {
        let fx = fixture(&["N1"]).await;
        let app = app_for!(Arc::new(fx.monitor));

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_dashboard_after_refresh() {
        let fx = fixture(&["N1", "N2"]).await;
        let checked_at = Utc::now() - Duration::minutes(45);
        fx.store
            .store
            .push_check(CheckRecord::new("N1", 72, "S. Santos", checked_at))
            .await;
        fx.weather.push_ok(6);
        let app = app_for!(Arc::new(fx.monitor));

        let req = test::TestRequest::post().uri("/api/refresh").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["header"], "ATTENTION");
        assert_eq!(body["overdue_count"], 1);
        assert_eq!(body["interval_minutes"], 30);
        assert_eq!(body["summaries"][0]["tail"], "N1");
        assert_eq!(body["summaries"][0]["status"], "OVERDUE");
        assert_eq!(body["summaries"][1]["status"], "NO_DATA");
        assert_eq!(body["weather"]["phase"], "live");
    }

    #[actix_web::test]
    async fn test_refresh_reports_data_source_failure() {
        let fx = fixture(&["N1"]).await;
        fx.store.failing.store(true, Ordering::SeqCst);
        let app = app_for!(Arc::new(fx.monitor));

        let req = test::TestRequest::post().uri("/api/refresh").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 502);

        let req = test::TestRequest::get().uri("/api/dashboard").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["last_error"].as_str().unwrap().contains("Aircraft load failed"));
    }

    #[actix_web::test]
    async fn test_record_valid_check() {
        let fx = fixture(&["N1"]).await;
        let app = app_for!(Arc::new(fx.monitor));

        let check = CheckInput {
            tail: "n1".into(),
            temperature_f: 71,
            checked_by: "ramp@example.com".into(),
            notes: None,
        };

        let req = test::TestRequest::post()
            .uri("/api/checks")
            .set_json(&check)
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);

        let req = test::TestRequest::get()
            .uri("/api/aircraft/N1/history")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["checks"][0]["temperature_f"], 71);
    }

    #[actix_web::test]
    async fn test_record_invalid_check() {
        let fx = fixture(&["N1"]).await;
        let app = app_for!(Arc::new(fx.monitor));

        let check = CheckInput {
            tail: "N1".into(),
            temperature_f: 150, // Invalid
            checked_by: "ramp@example.com".into(),
            notes: None,
        };

        let req = test::TestRequest::post()
            .uri("/api/checks")
            .set_json(&check)
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_manual_weather_and_resume() {
        let fx = fixture(&["N1"]).await;
        fx.weather.push_ok(33);
        let app = app_for!(Arc::new(fx.monitor));

        let req = test::TestRequest::post()
            .uri("/api/weather/manual")
            .set_json(serde_json::json!({ "temperatureF": -4 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["phase"], "manual");
        assert_eq!(body["temperature_f"], -4);

        let req = test::TestRequest::post().uri("/api/weather/resume").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["phase"], "live");
        assert_eq!(body["origin"], "live");
        assert_eq!(body["temperature_f"], 33);
    }

    #[actix_web::test]
    async fn test_tonight_worklist_routes() {
        let fx = fixture(&["N1", "N2"]).await;
        let app = app_for!(Arc::new(fx.monitor));

        let req = test::TestRequest::post()
            .uri("/api/tonight")
            .set_json(serde_json::json!({ "tail": "n2", "date": "2026-01-14" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);

        let req = test::TestRequest::get()
            .uri("/api/tonight?date=2026-01-14")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["tails"], serde_json::json!(["N2"]));

        let req = test::TestRequest::delete()
            .uri("/api/tonight/N2?date=2026-01-14")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 204);

        let req = test::TestRequest::delete()
            .uri("/api/tonight/N2?date=2026-01-14")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
    }

    #[actix_web::test]
    async fn test_switch_station() {
        let fx = fixture(&["N1"]).await;
        let app = app_for!(Arc::new(fx.monitor));

        let req = test::TestRequest::put()
            .uri("/api/station")
            .set_json(serde_json::json!({ "station": "den" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["station"], "DEN");
        assert_eq!(body["summaries"], serde_json::json!([]));

        let req = test::TestRequest::put()
            .uri("/api/station")
            .set_json(serde_json::json!({ "station": "x" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }
}
