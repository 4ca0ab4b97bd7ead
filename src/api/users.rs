use actix_web::{get, put, web, HttpResponse, Responder};
use serde::Deserialize;

use crate::api::{error_response, forbidden};
use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::UpdateUserRequest;
use crate::services::user_service;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
}

/// GET /api/v1/users - list accounts (admin)
#[get("")]
pub async fn list_users(
    user: web::ReqData<Claims>,
    query: web::Query<UserListQuery>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    if !user.has_role("admin") {
        return forbidden("Admin role required");
    }

    match user_service::list_users(&db, query.role.as_deref()).await {
        Ok(users) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "users": users,
            "total": users.len()
        })),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/users/{user_id}
#[get("/{user_id}")]
pub async fn get_user(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    let user_id = path.into_inner();

    // Admins see anyone, everyone else only themself
    if !user.has_role("admin") && user.sub != user_id {
        return forbidden("Admin role required");
    }

    match user_service::get_user(&db, &user_id).await {
        Ok(profile) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": profile
        })),
        Err(e) => error_response(e),
    }
}

/// PUT /api/v1/users/{user_id} - profile/role update (admin)
#[put("/{user_id}")]
pub async fn update_user(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<UpdateUserRequest>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    if !user.has_role("admin") {
        return forbidden("Admin role required");
    }

    let user_id = path.into_inner();
    log::info!("✏️ PUT /users/{} by admin {}", user_id, user.sub);

    match user_service::update_user(&db, &user_id, &request).await {
        Ok(profile) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": profile
        })),
        Err(e) => error_response(e),
    }
}

/// PUT /api/v1/users/{user_id}/deactivate (admin)
#[put("/{user_id}/deactivate")]
pub async fn deactivate_user(
    user: web::ReqData<Claims>,
    path: web::Path<String>,
    db: web::Data<MongoDB>,
) -> impl Responder {
    if !user.has_role("admin") {
        return forbidden("Admin role required");
    }

    let user_id = path.into_inner();
    log::info!("🚫 PUT /users/{}/deactivate by admin {}", user_id, user.sub);

    match user_service::deactivate_user(&db, &user_id).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "User deactivated"
        })),
        Err(e) => error_response(e),
    }
}
