use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde::Deserialize;

use crate::api::{error_response, forbidden};
use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::services::report_service;

/// Default report window when the client omits the range: last 30 days
const DEFAULT_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    /// Unix timestamp, milliseconds (inclusive)
    pub from: Option<i64>,
    /// Unix timestamp, milliseconds (exclusive)
    pub to: Option<i64>,
}

fn resolve_range(query: &RangeQuery) -> Result<(i64, i64), HttpResponse> {
    let to = query.to.unwrap_or_else(|| Utc::now().timestamp_millis());
    let from = query
        .from
        .unwrap_or_else(|| to - DEFAULT_WINDOW_DAYS * 24 * 60 * 60 * 1000);

    if from >= to {
        return Err(HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "from must be before to"
        })));
    }

    Ok((from, to))
}

/// GET /api/v1/reports/appointments-per-day?from=..&to=..
#[get("/appointments-per-day")]
pub async fn appointments_per_day(
    user: web::ReqData<Claims>,
    query: web::Query<RangeQuery>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    if !user.has_role("admin") {
        return forbidden("Admin role required");
    }
    let (from, to) = match resolve_range(&query) {
        Ok(range) => range,
        Err(response) => return response,
    };

    log::info!("📊 GET /reports/appointments-per-day [{}, {})", from, to);

    match report_service::appointments_per_day(&db, from, to).await {
        Ok(rows) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "from": from,
            "to": to,
            "rows": rows
        })),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/reports/revenue?from=..&to=..
#[get("/revenue")]
pub async fn revenue(
    user: web::ReqData<Claims>,
    query: web::Query<RangeQuery>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    if !user.has_role("admin") {
        return forbidden("Admin role required");
    }
    let (from, to) = match resolve_range(&query) {
        Ok(range) => range,
        Err(response) => return response,
    };

    log::info!("📊 GET /reports/revenue [{}, {})", from, to);

    match report_service::revenue_per_facility(&db, from, to).await {
        Ok(rows) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "from": from,
            "to": to,
            "rows": rows
        })),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/reports/staff-utilization?from=..&to=..
#[get("/staff-utilization")]
pub async fn staff_utilization(
    user: web::ReqData<Claims>,
    query: web::Query<RangeQuery>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    if !user.has_role("admin") {
        return forbidden("Admin role required");
    }
    let (from, to) = match resolve_range(&query) {
        Ok(range) => range,
        Err(response) => return response,
    };

    match report_service::staff_utilization(&db, from, to).await {
        Ok(rows) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "from": from,
            "to": to,
            "rows": rows
        })),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/reports/stock-valuation - current snapshot, no range
#[get("/stock-valuation")]
pub async fn stock_valuation(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> impl Responder {
    if !user.has_role("admin") {
        return forbidden("Admin role required");
    }

    match report_service::stock_valuation(&db).await {
        Ok(rows) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "rows": rows
        })),
        Err(e) => error_response(e),
    }
}
