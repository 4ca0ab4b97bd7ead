use std::time::Duration;

use actix_web::{get, put, web, HttpResponse, Responder};
use mongodb::bson::oid::ObjectId;
use tokio::sync::broadcast::error::RecvError;

use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::{DeviceTokenRequest, NotificationListQuery};
use crate::services::notification_service;

/// Keep-alive interval for idle SSE streams. Comments keep proxies from
/// dropping the connection.
const KEEP_ALIVE_SECS: u64 = 25;

/// GET /api/v1/notifications/stream - live notification feed (SSE)
///
/// EventSource cannot set headers, so clients authenticate with
/// `?token=<jwt>` (accepted by the auth middleware).
#[get("/stream")]
pub async fn stream(user: web::ReqData<Claims>) -> impl Responder {
    let user_id = user.sub.clone();
    log::info!("📡 SSE stream opened for user {}", user_id);

    let rx = notification_service::subscribe();

    let events = futures::stream::unfold((rx, user_id), |(mut rx, user_id)| async move {
        loop {
            match tokio::time::timeout(Duration::from_secs(KEEP_ALIVE_SECS), rx.recv()).await {
                Ok(Ok(event)) => {
                    // Broker fan-out is global; deliver only own events
                    if event.user_id != user_id {
                        continue;
                    }
                    let frame = format!("data: {}\n\n", event.payload);
                    return Some((
                        Ok::<web::Bytes, actix_web::Error>(web::Bytes::from(frame)),
                        (rx, user_id),
                    ));
                }
                // Slow consumer skipped some events; the backlog is still
                // in the database, so just keep streaming
                Ok(Err(RecvError::Lagged(skipped))) => {
                    log::warn!("⚠️ SSE subscriber {} lagged, skipped {}", user_id, skipped);
                    continue;
                }
                Ok(Err(RecvError::Closed)) => return None,
                Err(_) => {
                    return Some((
                        Ok(web::Bytes::from_static(b": keep-alive\n\n")),
                        (rx, user_id),
                    ))
                }
            }
        }
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(events)
}

/// GET /api/v1/notifications?unread=true
#[get("")]
pub async fn list_notifications(
    user: web::ReqData<Claims>,
    query: web::Query<NotificationListQuery>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let unread_only = query.unread.unwrap_or(false);

    match notification_service::list_notifications(&db, &user.sub, unread_only).await {
        Ok(notifications) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "notifications": notifications,
            "total": notifications.len()
        })),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({
            "success": false,
            "error": e
        })),
    }
}

/// PUT /api/v1/notifications/read-all
#[put("/read-all")]
pub async fn mark_all_read(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> impl Responder {
    match notification_service::mark_all_read(&db, &user.sub).await {
        Ok(count) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "marked": count
        })),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({
            "success": false,
            "error": e
        })),
    }
}

/// PUT /api/v1/notifications/device-token - register an FCM token
#[put("/device-token")]
pub async fn set_device_token(
    user: web::ReqData<Claims>,
    request: web::Json<DeviceTokenRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    log::info!("📲 PUT /notifications/device-token for {}", user.sub);

    match notification_service::set_device_token(&db, &user.sub, &request.device_token).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Device token registered"
        })),
        Err(e) if e == "User not found" => HttpResponse::NotFound().json(serde_json::json!({
            "success": false,
            "error": e
        })),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({
            "success": false,
            "error": e
        })),
    }
}

/// PUT /api/v1/notifications/{id}/read
#[put("/{id}/read")]
pub async fn mark_read(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let object_id = match ObjectId::parse_str(path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": "Invalid notification ID"
            }))
        }
    };

    match notification_service::mark_read(&db, &user.sub, &object_id).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) if e == "Notification not found" => {
            HttpResponse::NotFound().json(serde_json::json!({
                "success": false,
                "error": e
            }))
        }
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({
            "success": false,
            "error": e
        })),
    }
}
