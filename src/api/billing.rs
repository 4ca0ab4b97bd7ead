use actix_web::{delete, get, post, web, HttpResponse, Responder};
use mongodb::bson::oid::ObjectId;

use crate::api::{error_response, forbidden};
use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::{BillResponse, CreateBillRequest, PayBillRequest, PaymentResponse};
use crate::services::billing_service;

/// POST /api/v1/billing/bills - issue a bill (staff/admin)
#[post("/bills")]
pub async fn create_bill(
    user: web::ReqData<Claims>,
    request: web::Json<CreateBillRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    if !user.is_staff() {
        return forbidden("Staff role required");
    }

    log::info!(
        "💵 POST /billing/bills - patient: {}, items: {}",
        request.patient_id,
        request.line_items.len()
    );

    match billing_service::create_bill(&db, &user.sub, &request).await {
        Ok(bill) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "bill": BillResponse::from(bill)
        })),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/billing/bills?patient_id=..
#[get("/bills")]
pub async fn list_bills(
    user: web::ReqData<Claims>,
    query: web::Query<PatientQuery>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    // Patients see their own bills; staff may query any patient
    let patient_id = match resolve_patient(&user, query.patient_id.as_deref()) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match billing_service::list_bills(&db, &patient_id).await {
        Ok(bills) => {
            let bills: Vec<BillResponse> = bills.into_iter().map(BillResponse::from).collect();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "bills": bills,
                "total": bills.len()
            }))
        }
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/billing/bills/{id}
#[get("/bills/{id}")]
pub async fn get_bill(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let object_id = match parse_id(&path.into_inner()) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match billing_service::get_bill(&db, &object_id).await {
        Ok(bill) => {
            if user.sub != bill.patient_id && !user.is_staff() {
                return forbidden("Not your bill");
            }
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "bill": BillResponse::from(bill)
            }))
        }
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/billing/bills/{id}/pay - patient pays their own bill
#[post("/bills/{id}/pay")]
pub async fn pay_bill(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<PayBillRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let object_id = match parse_id(&path.into_inner()) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let bill = match billing_service::get_bill(&db, &object_id).await {
        Ok(bill) => bill,
        Err(e) => return error_response(e),
    };

    // Cash payments are entered at the front desk by staff
    if request.provider == "cash" && !user.is_staff() {
        return forbidden("Cash payments are recorded by staff");
    }
    if user.sub != bill.patient_id && !user.is_staff() {
        return forbidden("Not your bill");
    }

    log::info!(
        "💳 POST /billing/bills/{}/pay - provider: {}",
        object_id.to_hex(),
        request.provider
    );

    match billing_service::pay_bill(&db, &object_id, &request).await {
        Ok(payment) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "payment": PaymentResponse::from(payment)
        })),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/v1/billing/bills/{id} - void a pending bill (staff/admin)
#[delete("/bills/{id}")]
pub async fn cancel_bill(
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

    log::info!("🗑️ DELETE /billing/bills/{} by {}", object_id.to_hex(), user.sub);

    match billing_service::cancel_bill(&db, &object_id).await {
        Ok(bill) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "bill": BillResponse::from(bill)
        })),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/billing/payments?patient_id=..
#[get("/payments")]
pub async fn list_payments(
    user: web::ReqData<Claims>,
    query: web::Query<PatientQuery>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let patient_id = match resolve_patient(&user, query.patient_id.as_deref()) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match billing_service::list_payments(&db, &patient_id).await {
        Ok(payments) => {
            let payments: Vec<PaymentResponse> =
                payments.into_iter().map(PaymentResponse::from).collect();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "payments": payments,
                "total": payments.len()
            }))
        }
        Err(e) => error_response(e),
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct PatientQuery {
    pub patient_id: Option<String>,
}

fn resolve_patient(user: &Claims, requested: Option<&str>) -> Result<String, HttpResponse> {
    match requested {
        Some(id) if id != user.sub => {
            if user.is_staff() {
                Ok(id.to_string())
            } else {
                Err(forbidden("Not your billing history"))
            }
        }
        _ => Ok(user.sub.clone()),
    }
}

fn parse_id(raw: &str) -> Result<ObjectId, HttpResponse> {
    ObjectId::parse_str(raw).map_err(|_| {
        HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "Invalid bill ID"
        }))
    })
}
