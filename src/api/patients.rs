use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use mongodb::bson::oid::ObjectId;

use crate::api::{error_response, forbidden};
use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::{
    CreateAllergyRequest, CreateConditionRequest, CreateTestResultRequest, CreateVitalRequest,
    UpdateAllergyRequest, UpdateConditionRequest, UpdateTestResultRequest, UpdateVitalRequest,
};
use crate::services::record_service;

// Patients see their own chart; staff see every chart. Vitals and test
// results are written by staff only, allergies/conditions also by the
// patient themself.
fn can_read(user: &Claims, patient_id: &str) -> bool {
    user.sub == patient_id || user.is_staff()
}

fn can_write_self_reported(user: &Claims, patient_id: &str) -> bool {
    user.sub == patient_id || user.is_staff()
}

// ==================== ALLERGIES ====================

#[post("/{patient_id}/allergies")]
pub async fn create_allergy(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<CreateAllergyRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let patient_id = path.into_inner();
    if !can_write_self_reported(&user, &patient_id) {
        return forbidden("Not your chart");
    }

    match record_service::create_allergy(&db, &patient_id, &user.sub, &request).await {
        Ok(allergy) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "id": allergy.id.map(|id| id.to_hex()).unwrap_or_default()
        })),
        Err(e) => error_response(e),
    }
}

#[get("/{patient_id}/allergies")]
pub async fn list_allergies(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let patient_id = path.into_inner();
    if !can_read(&user, &patient_id) {
        return forbidden("Not your chart");
    }

    match record_service::list_allergies(&db, &patient_id).await {
        Ok(allergies) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "allergies": allergies,
            "total": allergies.len()
        })),
        Err(e) => error_response(e),
    }
}

#[put("/{patient_id}/allergies/{id}")]
pub async fn update_allergy(
    user: web::ReqData<Claims>,
    path: web::Path<(String, String)>,
    request: web::Json<UpdateAllergyRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let (patient_id, id) = path.into_inner();
    if !can_write_self_reported(&user, &patient_id) {
        return forbidden("Not your chart");
    }
    let object_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match record_service::update_allergy(&db, &patient_id, &object_id, &request).await {
        Ok(allergy) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "allergy": allergy
        })),
        Err(e) => error_response(e),
    }
}

#[delete("/{patient_id}/allergies/{id}")]
pub async fn delete_allergy(
    user: web::ReqData<Claims>,
    path: web::Path<(String, String)>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let (patient_id, id) = path.into_inner();
    if !can_write_self_reported(&user, &patient_id) {
        return forbidden("Not your chart");
    }
    let object_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match record_service::delete_allergy(&db, &patient_id, &object_id).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => error_response(e),
    }
}

// ==================== CONDITIONS ====================

#[post("/{patient_id}/conditions")]
pub async fn create_condition(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<CreateConditionRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let patient_id = path.into_inner();
    if !can_write_self_reported(&user, &patient_id) {
        return forbidden("Not your chart");
    }

    match record_service::create_condition(&db, &patient_id, &user.sub, &request).await {
        Ok(condition) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "id": condition.id.map(|id| id.to_hex()).unwrap_or_default()
        })),
        Err(e) => error_response(e),
    }
}

#[get("/{patient_id}/conditions")]
pub async fn list_conditions(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let patient_id = path.into_inner();
    if !can_read(&user, &patient_id) {
        return forbidden("Not your chart");
    }

    match record_service::list_conditions(&db, &patient_id).await {
        Ok(conditions) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "conditions": conditions,
            "total": conditions.len()
        })),
        Err(e) => error_response(e),
    }
}

#[put("/{patient_id}/conditions/{id}")]
pub async fn update_condition(
    user: web::ReqData<Claims>,
    path: web::Path<(String, String)>,
    request: web::Json<UpdateConditionRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let (patient_id, id) = path.into_inner();
    if !can_write_self_reported(&user, &patient_id) {
        return forbidden("Not your chart");
    }
    let object_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match record_service::update_condition(&db, &patient_id, &object_id, &request).await {
        Ok(condition) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "condition": condition
        })),
        Err(e) => error_response(e),
    }
}

#[delete("/{patient_id}/conditions/{id}")]
pub async fn delete_condition(
    user: web::ReqData<Claims>,
    path: web::Path<(String, String)>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let (patient_id, id) = path.into_inner();
    if !can_write_self_reported(&user, &patient_id) {
        return forbidden("Not your chart");
    }
    let object_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match record_service::delete_condition(&db, &patient_id, &object_id).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => error_response(e),
    }
}

// ==================== VITALS ====================

#[post("/{patient_id}/vitals")]
pub async fn create_vital(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<CreateVitalRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let patient_id = path.into_inner();
    if !user.is_staff() {
        return forbidden("Staff role required");
    }

    log::info!("💓 POST /patients/{}/vitals by {}", patient_id, user.sub);

    match record_service::create_vital(&db, &patient_id, &user.sub, &request).await {
        Ok(vital) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "id": vital.id.map(|id| id.to_hex()).unwrap_or_default()
        })),
        Err(e) => error_response(e),
    }
}

#[get("/{patient_id}/vitals")]
pub async fn list_vitals(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let patient_id = path.into_inner();
    if !can_read(&user, &patient_id) {
        return forbidden("Not your chart");
    }

    match record_service::list_vitals(&db, &patient_id).await {
        Ok(vitals) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "vitals": vitals,
            "total": vitals.len()
        })),
        Err(e) => error_response(e),
    }
}

#[put("/{patient_id}/vitals/{id}")]
pub async fn update_vital(
    user: web::ReqData<Claims>,
    path: web::Path<(String, String)>,
    request: web::Json<UpdateVitalRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let (patient_id, id) = path.into_inner();
    if !user.is_staff() {
        return forbidden("Staff role required");
    }
    let object_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match record_service::update_vital(&db, &patient_id, &object_id, &request).await {
        Ok(vital) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "vital": vital
        })),
        Err(e) => error_response(e),
    }
}

#[delete("/{patient_id}/vitals/{id}")]
pub async fn delete_vital(
    user: web::ReqData<Claims>,
    path: web::Path<(String, String)>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let (patient_id, id) = path.into_inner();
    if !user.is_staff() {
        return forbidden("Staff role required");
    }
    let object_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match record_service::delete_vital(&db, &patient_id, &object_id).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => error_response(e),
    }
}

// ==================== TEST RESULTS ====================

#[post("/{patient_id}/test-results")]
pub async fn create_test_result(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<CreateTestResultRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let patient_id = path.into_inner();
    if !user.is_staff() {
        return forbidden("Staff role required");
    }

    match record_service::create_test_result(&db, &patient_id, &user.sub, &request).await {
        Ok(test_result) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "id": test_result.id.map(|id| id.to_hex()).unwrap_or_default()
        })),
        Err(e) => error_response(e),
    }
}

#[get("/{patient_id}/test-results")]
pub async fn list_test_results(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let patient_id = path.into_inner();
    if !can_read(&user, &patient_id) {
        return forbidden("Not your chart");
    }

    match record_service::list_test_results(&db, &patient_id).await {
        Ok(results) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "test_results": results,
            "total": results.len()
        })),
        Err(e) => error_response(e),
    }
}

#[put("/{patient_id}/test-results/{id}")]
pub async fn update_test_result(
    user: web::ReqData<Claims>,
    path: web::Path<(String, String)>,
    request: web::Json<UpdateTestResultRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let (patient_id, id) = path.into_inner();
    if !user.is_staff() {
        return forbidden("Staff role required");
    }
    let object_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match record_service::update_test_result(&db, &patient_id, &object_id, &request).await {
        Ok(test_result) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "test_result": test_result
        })),
        Err(e) => error_response(e),
    }
}

#[delete("/{patient_id}/test-results/{id}")]
pub async fn delete_test_result(
    user: web::ReqData<Claims>,
    path: web::Path<(String, String)>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let (patient_id, id) = path.into_inner();
    if !user.is_staff() {
        return forbidden("Staff role required");
    }
    let object_id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match record_service::delete_test_result(&db, &patient_id, &object_id).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => error_response(e),
    }
}

fn parse_id(raw: &str) -> Result<ObjectId, HttpResponse> {
    ObjectId::parse_str(raw).map_err(|_| {
        HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "Invalid record ID"
        }))
    })
}
