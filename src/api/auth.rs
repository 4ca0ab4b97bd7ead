use crate::services::auth_service;
use crate::services::auth_service::{AuthResponse, LoginRequest, RegisterRequest};
use crate::{database::MongoDB, models::UserInfo};
use actix_web::{web, HttpRequest, HttpResponse};

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    db: web::Data<MongoDB>,
    request: web::Json<auth_service::LoginRequest>,
) -> HttpResponse {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match auth_service::login(&db, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", request.email);
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            HttpResponse::Unauthorized().json(serde_json::json!({
                "success": false,
                "error": e
            }))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = AuthResponse),
        (status = 400, description = "Invalid request or user already exists")
    )
)]
pub async fn register(
    db: web::Data<MongoDB>,
    request: web::Json<auth_service::RegisterRequest>,
) -> HttpResponse {
    log::info!("📝 POST /auth/register - email: {}", request.email);

    match auth_service::register(&db, &request).await {
        Ok(response) => {
            log::info!("✅ Registration successful: {}", request.email);
            HttpResponse::Created().json(response)
        }
        Err(e) => {
            log::warn!("❌ Registration failed: {} - {}", request.email, e);
            HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": e
            }))
        }
    }
}

pub async fn refresh_token(
    db: web::Data<MongoDB>,
    request: web::Json<auth_service::RefreshTokenRequest>,
) -> HttpResponse {
    log::info!("🔄 POST /auth/refresh");

    match auth_service::refresh_token(&db, &request).await {
        Ok(response) => {
            log::info!("✅ Token refreshed");
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::warn!("❌ Token refresh failed: {}", e);
            HttpResponse::Unauthorized().json(serde_json::json!({
                "success": false,
                "error": e
            }))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/verify",
    tag = "Auth",
    responses(
        (status = 200, description = "Token is valid"),
        (status = 401, description = "Invalid or expired token")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn verify_token(req: HttpRequest) -> HttpResponse {
    log::info!("✓ GET /auth/verify");

    match extract_bearer(&req) {
        Some(token) => match auth_service::verify_token(token) {
            Ok(claims) => {
                log::info!("✅ Token valid for user: {}", claims.sub);
                HttpResponse::Ok().json(serde_json::json!({
                    "success": true,
                    "valid": true,
                    "user_id": claims.sub,
                    "email": claims.email,
                    "roles": claims.roles,
                    "exp": claims.exp
                }))
            }
            Err(e) => {
                log::warn!("❌ Invalid token: {}", e);
                HttpResponse::Unauthorized().json(serde_json::json!({
                    "success": false,
                    "valid": false,
                    "error": e
                }))
            }
        },
        None => HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "No valid Authorization header"
        })),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "User information retrieved", body = UserInfo),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(db: web::Data<MongoDB>, req: HttpRequest) -> HttpResponse {
    log::info!("👤 GET /auth/me");

    match extract_bearer(&req) {
        Some(token) => match auth_service::verify_token(token) {
            Ok(claims) => match auth_service::get_current_user(&db, &claims.sub).await {
                Ok(user) => {
                    log::info!("✅ User info retrieved: {}", claims.sub);
                    HttpResponse::Ok().json(serde_json::json!({
                        "success": true,
                        "user": user
                    }))
                }
                Err(e) => {
                    log::error!("❌ Failed to get user: {}", e);
                    HttpResponse::InternalServerError().json(serde_json::json!({
                        "success": false,
                        "error": e
                    }))
                }
            },
            Err(e) => {
                log::warn!("❌ Invalid token: {}", e);
                HttpResponse::Unauthorized().json(serde_json::json!({
                    "success": false,
                    "error": e
                }))
            }
        },
        None => HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": "No valid Authorization header"
        })),
    }
}

/// Deletes the account and all associated data
pub async fn delete_account(db: web::Data<MongoDB>, req: HttpRequest) -> HttpResponse {
    log::info!("🗑️ DELETE /auth/delete-account");

    match extract_bearer(&req) {
        Some(token) => match auth_service::verify_token(token) {
            Ok(claims) => {
                let user_id = &claims.sub;
                log::info!("🗑️ Deleting account for user: {}", user_id);

                match auth_service::delete_user_account(&db, user_id).await {
                    Ok(_) => {
                        log::info!("✅ Account deleted successfully: {}", user_id);
                        HttpResponse::Ok().json(serde_json::json!({
                            "success": true,
                            "message": "Account deleted successfully"
                        }))
                    }
                    Err(e) => {
                        log::error!("❌ Failed to delete account {}: {}", user_id, e);
                        HttpResponse::InternalServerError().json(serde_json::json!({
                            "success": false,
                            "error": format!("Failed to delete account: {}", e)
                        }))
                    }
                }
            }
            Err(e) => {
                log::warn!("❌ Invalid token: {}", e);
                HttpResponse::Unauthorized().json(serde_json::json!({
                    "success": false,
                    "error": "Invalid or expired token"
                }))
            }
        },
        None => {
            log::warn!("❌ No valid Authorization header");
            HttpResponse::Unauthorized().json(serde_json::json!({
                "success": false,
                "error": "No valid Authorization header"
            }))
        }
    }
}

fn extract_bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
