use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use mongodb::bson::{doc, oid::ObjectId};

use crate::api::{error_response, forbidden};
use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::{
    AppointmentListQuery, AppointmentResponse, AvailabilityQuery, BookAppointmentRequest,
    CreateLeaveRequest, LeaveListQuery, LeaveResponse, RescheduleAppointmentRequest,
    UpdateStatusRequest,
};
use crate::services::appointment_service;

/// POST /api/v1/appointments - book a slot for the logged-in patient
#[post("")]
pub async fn book_appointment(
    user: web::ReqData<Claims>,
    request: web::Json<BookAppointmentRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    log::info!(
        "📅 POST /appointments - patient: {}, staff: {}, start: {}",
        user.sub,
        request.staff_id,
        request.start
    );

    match appointment_service::book_appointment(&db, &user.sub, &request).await {
        Ok(appointment) => {
            log::info!(
                "✅ Appointment booked: {}",
                appointment.id.map(|id| id.to_hex()).unwrap_or_default()
            );
            HttpResponse::Created().json(serde_json::json!({
                "success": true,
                "appointment": AppointmentResponse::from(appointment)
            }))
        }
        Err(e) => {
            log::warn!("❌ Booking failed for {}: {}", user.sub, e);
            error_response(e)
        }
    }
}

/// GET /api/v1/appointments/availability?staff_id=..&date=YYYY-MM-DD
#[get("/availability")]
pub async fn get_availability(
    query: web::Query<AvailabilityQuery>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    log::info!("🗓️ GET /appointments/availability - staff: {}, date: {}", query.staff_id, query.date);

    match appointment_service::availability(&db, &query.staff_id, &query.date).await {
        Ok(slots) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "staff_id": query.staff_id,
            "date": query.date,
            "slots": slots
        })),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/appointments/leaves - file a leave window
#[post("/leaves")]
pub async fn create_leave(
    user: web::ReqData<Claims>,
    request: web::Json<CreateLeaveRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    // Staff file their own leave; admins may file for anyone
    let staff_id = match &request.staff_id {
        Some(id) if id != &user.sub => {
            if !user.has_role("admin") {
                return forbidden("Only admins can file leave for someone else");
            }
            id.clone()
        }
        _ => {
            if !user.is_staff() {
                return forbidden("Staff role required");
            }
            user.sub.clone()
        }
    };

    log::info!("🏖️ POST /appointments/leaves - staff: {}", staff_id);

    match appointment_service::create_leave(&db, &staff_id, request.from, request.to, request.reason.clone())
        .await
    {
        Ok(leave) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "leave": LeaveResponse::from(leave)
        })),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/appointments/leaves?staff_id=..
#[get("/leaves")]
pub async fn list_leaves(
    user: web::ReqData<Claims>,
    query: web::Query<LeaveListQuery>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    if !user.is_staff() {
        return forbidden("Staff role required");
    }

    match appointment_service::list_leaves(&db, query.staff_id.as_deref()).await {
        Ok(leaves) => {
            let leaves: Vec<LeaveResponse> = leaves.into_iter().map(LeaveResponse::from).collect();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "leaves": leaves,
                "total": leaves.len()
            }))
        }
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/appointments - own appointments (patients their bookings,
/// staff their schedule, admins may filter freely)
#[get("")]
pub async fn list_appointments(
    user: web::ReqData<Claims>,
    query: web::Query<AppointmentListQuery>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let mut filter = doc! {};

    if user.has_role("admin") {
        if let Some(patient_id) = &query.patient_id {
            filter.insert("patient_id", patient_id);
        }
        if let Some(staff_id) = &query.staff_id {
            filter.insert("staff_id", staff_id);
        }
    } else if user.is_staff() {
        filter.insert("staff_id", &user.sub);
    } else {
        filter.insert("patient_id", &user.sub);
    }

    if let Some(status) = &query.status {
        filter.insert("status", status);
    }

    match appointment_service::list_appointments(&db, filter).await {
        Ok(appointments) => {
            let appointments: Vec<AppointmentResponse> =
                appointments.into_iter().map(AppointmentResponse::from).collect();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "appointments": appointments,
                "total": appointments.len()
            }))
        }
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/appointments/{id} - MUST STAY LAST among GETs (catch-all)
#[get("/{id}")]
pub async fn get_appointment(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let object_id = match parse_id(&path.into_inner()) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match appointment_service::get_appointment(&db, &object_id).await {
        Ok(appointment) => {
            if !can_view(&user, &appointment.patient_id, &appointment.staff_id) {
                return forbidden("Not your appointment");
            }
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "appointment": AppointmentResponse::from(appointment)
            }))
        }
        Err(e) => error_response(e),
    }
}

/// PUT /api/v1/appointments/{id}/reschedule
#[put("/{id}/reschedule")]
pub async fn reschedule_appointment(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<RescheduleAppointmentRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let object_id = match parse_id(&path.into_inner()) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let current = match appointment_service::get_appointment(&db, &object_id).await {
        Ok(appointment) => appointment,
        Err(e) => return error_response(e),
    };

    if !can_view(&user, &current.patient_id, &current.staff_id) {
        return forbidden("Not your appointment");
    }

    log::info!("🔁 PUT /appointments/{}/reschedule to {}", object_id.to_hex(), request.start);

    match appointment_service::reschedule_appointment(
        &db,
        &object_id,
        request.start,
        request.duration_minutes,
    )
    .await
    {
        Ok(appointment) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "appointment": AppointmentResponse::from(appointment)
        })),
        Err(e) => error_response(e),
    }
}

/// PUT /api/v1/appointments/{id}/status - staff-side lifecycle updates
#[put("/{id}/status")]
pub async fn update_status(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<UpdateStatusRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let object_id = match parse_id(&path.into_inner()) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let current = match appointment_service::get_appointment(&db, &object_id).await {
        Ok(appointment) => appointment,
        Err(e) => return error_response(e),
    };

    if !user.has_role("admin") && user.sub != current.staff_id {
        return forbidden("Only the assigned staff member can update the status");
    }

    match appointment_service::update_status(&db, &object_id, request.status, request.notes.clone())
        .await
    {
        Ok(appointment) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "appointment": AppointmentResponse::from(appointment)
        })),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/v1/appointments/{id} - cancel, freeing the slot
#[delete("/{id}")]
pub async fn cancel_appointment(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let object_id = match parse_id(&path.into_inner()) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let current = match appointment_service::get_appointment(&db, &object_id).await {
        Ok(appointment) => appointment,
        Err(e) => return error_response(e),
    };

    if !can_view(&user, &current.patient_id, &current.staff_id) {
        return forbidden("Not your appointment");
    }

    log::info!("🗑️ DELETE /appointments/{} by {}", object_id.to_hex(), user.sub);

    match appointment_service::cancel_appointment(&db, &object_id).await {
        Ok(appointment) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "appointment": AppointmentResponse::from(appointment)
        })),
        Err(e) => error_response(e),
    }
}

fn can_view(user: &Claims, patient_id: &str, staff_id: &str) -> bool {
    user.has_role("admin") || user.sub == patient_id || user.sub == staff_id
}

fn parse_id(raw: &str) -> Result<ObjectId, HttpResponse> {
    ObjectId::parse_str(raw).map_err(|_| {
        HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "Invalid appointment ID"
        }))
    })
}
