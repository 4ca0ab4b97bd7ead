pub mod appointments;
pub mod auth;
pub mod billing;
pub mod facilities;
pub mod health;
pub mod metrics;
pub mod notifications;
pub mod patients;
pub mod pharmacy;
pub mod reports;
pub mod swagger;
pub mod users;

use crate::utils::error::AppError;
use actix_web::HttpResponse;

/// Maps a service error onto the HTTP status + JSON envelope every
/// endpoint responds with
pub fn error_response(error: AppError) -> HttpResponse {
    let body = serde_json::json!({
        "success": false,
        "error": error.to_string(),
    });

    match error {
        AppError::InvalidRequest(_) => HttpResponse::BadRequest().json(body),
        AppError::NotFound(_) => HttpResponse::NotFound().json(body),
        AppError::Conflict(_) => HttpResponse::Conflict().json(body),
        AppError::Forbidden(_) => HttpResponse::Forbidden().json(body),
        AppError::VendorError(_) => HttpResponse::BadGateway().json(body),
        AppError::DatabaseError(_) => HttpResponse::InternalServerError().json(body),
    }
}

pub fn forbidden(message: &str) -> HttpResponse {
    HttpResponse::Forbidden().json(serde_json::json!({
        "success": false,
        "error": message,
    }))
}
