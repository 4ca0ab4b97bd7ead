use actix_web::{web, HttpResponse};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;

use crate::database::MongoDB;
use crate::services::facility_service;

#[derive(Debug, Deserialize)]
pub struct StaffQuery {
    pub role: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/facilities",
    tag = "Facilities",
    responses(
        (status = 200, description = "Active facilities")
    )
)]
pub async fn list_facilities(db: web::Data<MongoDB>) -> HttpResponse {
    log::info!("🏥 GET /facilities");

    match facility_service::list_facilities(&db).await {
        Ok(facilities) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "facilities": facilities
        })),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({
            "success": false,
            "error": e
        })),
    }
}

pub async fn get_facility(db: web::Data<MongoDB>, path: web::Path<String>) -> HttpResponse {
    let facility_id = path.into_inner();

    let object_id = match ObjectId::parse_str(&facility_id) {
        Ok(id) => id,
        Err(_) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": "Invalid facility ID"
            }))
        }
    };

    match facility_service::get_facility(&db, &object_id).await {
        Ok(facility) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "facility": facility
        })),
        Err(e) if e == "Facility not found" => HttpResponse::NotFound().json(serde_json::json!({
            "success": false,
            "error": e
        })),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({
            "success": false,
            "error": e
        })),
    }
}

/// Bookable staff of a facility, optionally filtered by role
/// (?role=doctor or ?role=nurse)
pub async fn list_staff(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    query: web::Query<StaffQuery>,
) -> HttpResponse {
    let facility_id = path.into_inner();
    log::info!("🩺 GET /facilities/{}/staff", facility_id);

    match facility_service::list_staff(&db, &facility_id, query.role.as_deref()).await {
        Ok(staff) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "staff": staff,
            "total": staff.len()
        })),
        Err(e) => HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": e
        })),
    }
}
