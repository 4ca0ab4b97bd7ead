use actix_web::{get, post, put, web, HttpResponse, Responder};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;

use crate::api::{error_response, forbidden};
use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::{
    CreateMedicationRequest, MedicationListQuery, MedicationResponse, StockAdjustRequest,
    UpdateMedicationRequest,
};
use crate::services::pharmacy_service;

// Inventory writes are for pharmacists and admins; any staff member may
// read the shelf.
fn can_write(user: &Claims) -> bool {
    user.has_role("pharmacist") || user.has_role("admin")
}

/// POST /api/v1/pharmacy/medications
#[post("/medications")]
pub async fn create_medication(
    user: web::ReqData<Claims>,
    request: web::Json<CreateMedicationRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    if !can_write(&user) {
        return forbidden("Pharmacist role required");
    }

    log::info!("💊 POST /pharmacy/medications - sku: {} ({})", request.sku, request.name);

    match pharmacy_service::create_medication(&db, &request).await {
        Ok(medication) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "medication": MedicationResponse::from(medication)
        })),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/pharmacy/medications?facility_id=..&search=..
#[get("/medications")]
pub async fn list_medications(
    user: web::ReqData<Claims>,
    query: web::Query<MedicationListQuery>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    if !user.is_staff() {
        return forbidden("Staff role required");
    }

    match pharmacy_service::list_medications(&db, &query.facility_id, query.search.as_deref()).await
    {
        Ok(medications) => {
            let medications: Vec<MedicationResponse> =
                medications.into_iter().map(MedicationResponse::from).collect();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "medications": medications,
                "total": medications.len()
            }))
        }
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/pharmacy/medications/low-stock?facility_id=..
#[get("/medications/low-stock")]
pub async fn low_stock(
    user: web::ReqData<Claims>,
    query: web::Query<LowStockQuery>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    if !user.is_staff() {
        return forbidden("Staff role required");
    }

    match pharmacy_service::low_stock_report(&db, &query.facility_id).await {
        Ok(medications) => {
            let medications: Vec<MedicationResponse> =
                medications.into_iter().map(MedicationResponse::from).collect();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "medications": medications,
                "total": medications.len()
            }))
        }
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/pharmacy/medications/{id} - MUST STAY LAST among GETs
#[get("/medications/{id}")]
pub async fn get_medication(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    if !user.is_staff() {
        return forbidden("Staff role required");
    }

    let object_id = match parse_id(&path.into_inner()) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match pharmacy_service::get_medication(&db, &object_id).await {
        Ok(medication) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "medication": MedicationResponse::from(medication)
        })),
        Err(e) => error_response(e),
    }
}

/// PUT /api/v1/pharmacy/medications/{id}
#[put("/medications/{id}")]
pub async fn update_medication(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<UpdateMedicationRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    if !can_write(&user) {
        return forbidden("Pharmacist role required");
    }

    let object_id = match parse_id(&path.into_inner()) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match pharmacy_service::update_medication(&db, &object_id, &request).await {
        Ok(medication) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "medication": MedicationResponse::from(medication)
        })),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/pharmacy/medications/{id}/restock
#[post("/medications/{id}/restock")]
pub async fn restock(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<StockAdjustRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    if !can_write(&user) {
        return forbidden("Pharmacist role required");
    }

    let object_id = match parse_id(&path.into_inner()) {
        Ok(id) => id,
        Err(response) => return response,
    };

    log::info!("📦 POST /pharmacy/medications/{}/restock +{}", object_id.to_hex(), request.quantity);

    match pharmacy_service::restock(&db, &object_id, &request).await {
        Ok(medication) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "medication": MedicationResponse::from(medication)
        })),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/pharmacy/medications/{id}/dispense
#[post("/medications/{id}/dispense")]
pub async fn dispense(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<StockAdjustRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    if !can_write(&user) {
        return forbidden("Pharmacist role required");
    }

    let object_id = match parse_id(&path.into_inner()) {
        Ok(id) => id,
        Err(response) => return response,
    };

    log::info!("💊 POST /pharmacy/medications/{}/dispense -{}", object_id.to_hex(), request.quantity);

    match pharmacy_service::dispense(&db, &object_id, &request).await {
        Ok(medication) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "medication": MedicationResponse::from(medication)
        })),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct LowStockQuery {
    pub facility_id: String,
}

fn parse_id(raw: &str) -> Result<ObjectId, HttpResponse> {
    ObjectId::parse_str(raw).map_err(|_| {
        HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "Invalid medication ID"
        }))
    })
}
