use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static REQUEST_COUNT: AtomicU64 = AtomicU64::new(0);
static ERROR_COUNT: AtomicU64 = AtomicU64::new(0);
static BOOKING_COUNT: AtomicU64 = AtomicU64::new(0);
static NOTIFICATION_COUNT: AtomicU64 = AtomicU64::new(0);

pub fn increment_request_count() {
    REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_error_count() {
    ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_booking_count() {
    BOOKING_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_notification_count() {
    NOTIFICATION_COUNT.fetch_add(1, Ordering::Relaxed);
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricsResponse {
    pub http_requests_total: u64,
    pub http_errors_total: u64,
    pub appointments_booked_total: u64,
    pub notifications_published_total: u64,
}

fn render_metrics(requests: u64, errors: u64, bookings: u64, notifications: u64) -> String {
    format!(
        "# HELP http_requests_total Total number of HTTP requests\n\
         # TYPE http_requests_total counter\n\
         http_requests_total {}\n\
         \n\
         # HELP http_errors_total Total number of HTTP errors\n\
         # TYPE http_errors_total counter\n\
         http_errors_total {}\n\
         \n\
         # HELP appointments_booked_total Appointments booked since startup\n\
         # TYPE appointments_booked_total counter\n\
         appointments_booked_total {}\n\
         \n\
         # HELP notifications_published_total Notifications published since startup\n\
         # TYPE notifications_published_total counter\n\
         notifications_published_total {}\n",
        requests, errors, bookings, notifications
    )
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "System metrics", body = MetricsResponse)
    )
)]
pub async fn get_metrics() -> HttpResponse {
    let metrics = render_metrics(
        REQUEST_COUNT.load(Ordering::Relaxed),
        ERROR_COUNT.load(Ordering::Relaxed),
        BOOKING_COUNT.load(Ordering::Relaxed),
        NOTIFICATION_COUNT.load(Ordering::Relaxed),
    );

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposition_carries_domain_counters() {
        let body = render_metrics(10, 2, 7, 42);

        assert!(body.contains("# TYPE appointments_booked_total counter"));
        assert!(body.contains("appointments_booked_total 7"));
        assert!(body.contains("# TYPE notifications_published_total counter"));
        assert!(body.contains("notifications_published_total 42"));
        assert!(body.contains("http_requests_total 10"));
        assert!(body.contains("http_errors_total 2"));
    }
}
