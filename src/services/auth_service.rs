use crate::database::MongoDB;
use crate::models::{User, UserInfo};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user_id
    pub email: String,
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub is_active: bool,
    pub iat: usize, // issued at
    pub exp: usize, // expiration
    pub jti: String, // JWT ID
    pub aud: String, // audience
    pub iss: String, // issuer
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// doctor, nurse, pharmacist or admin
    pub fn is_staff(&self) -> bool {
        self.roles
            .iter()
            .any(|r| matches!(r.as_str(), "doctor" | "nurse" | "pharmacist" | "admin"))
    }
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub facility_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub refresh_token: Option<String>,
    pub user: UserInfo,
}

fn get_jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "default-secret-change-me".to_string())
}

fn get_jwt_issuer() -> String {
    std::env::var("JWT_ISSUER").unwrap_or_else(|_| "clinic-service".to_string())
}

fn get_jwt_audience() -> String {
    std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "clinic-api".to_string())
}

// Generate JWT token (24h)
pub fn generate_jwt(user: &User) -> Result<String, String> {
    let iat = Utc::now().timestamp() as usize;
    let exp = (Utc::now() + Duration::hours(24)).timestamp() as usize;
    let jti = Uuid::new_v4().to_string();

    let claims = Claims {
        sub: user.user_id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        roles: user.roles.clone(),
        is_active: user.is_active,
        iat,
        exp,
        jti,
        aud: get_jwt_audience(),
        iss: get_jwt_issuer(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(get_jwt_secret().as_ref()),
    )
    .map_err(|e| format!("Failed to generate token: {}", e))
}

// Generate refresh token (30 days)
pub fn generate_refresh_token(user_id: &str) -> Result<String, String> {
    let iat = Utc::now().timestamp() as usize;
    let exp = (Utc::now() + Duration::days(30)).timestamp() as usize;
    let jti = Uuid::new_v4().to_string();

    let claims = Claims {
        sub: user_id.to_string(),
        email: String::new(),
        name: None,
        roles: vec![],
        is_active: true,
        iat,
        exp,
        jti,
        aud: get_jwt_audience(),
        iss: get_jwt_issuer(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(get_jwt_secret().as_ref()),
    )
    .map_err(|e| format!("Failed to generate refresh token: {}", e))
}

// Verify JWT token
pub fn verify_token(token: &str) -> Result<Claims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[get_jwt_audience()]);

    let mut issuers = HashSet::new();
    issuers.insert(get_jwt_issuer());
    validation.iss = Some(issuers);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(get_jwt_secret().as_ref()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

// User login
pub async fn login(db: &MongoDB, request: &LoginRequest) -> Result<AuthResponse, String> {
    let collection = db.collection::<User>("users");

    let filter = doc! {
        "email": &request.email,
    };

    let user = collection
        .find_one(filter)
        .await
        .map_err(|e| format!("Database error: {}", e))?
        .ok_or_else(|| "Invalid credentials".to_string())?;

    let stored_password = user
        .password
        .as_ref()
        .ok_or_else(|| "Invalid credentials".to_string())?;

    let valid = verify(&request.password, stored_password)
        .map_err(|e| format!("Password verification error: {}", e))?;

    if !valid {
        return Err("Invalid credentials".to_string());
    }

    if !user.is_active {
        return Err("Account is inactive".to_string());
    }

    let token = generate_jwt(&user)?;
    let refresh_token = generate_refresh_token(&user.user_id)?;

    collection
        .update_one(
            doc! { "user_id": &user.user_id },
            doc! { "$set": { "last_login": BsonDateTime::now() } },
        )
        .await
        .map_err(|e| format!("Database error: {}", e))?;

    Ok(AuthResponse {
        success: true,
        token,
        refresh_token: Some(refresh_token),
        user: UserInfo::from(user),
    })
}

// Patient self-registration. Staff accounts are created by an admin
// through the users API.
pub async fn register(db: &MongoDB, request: &RegisterRequest) -> Result<AuthResponse, String> {
    let collection = db.collection::<User>("users");

    if request.email.trim().is_empty() {
        return Err("Email is required".to_string());
    }
    if request.password.len() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }

    let filter = doc! { "email": &request.email };

    if collection
        .find_one(filter)
        .await
        .map_err(|e| format!("Database error: {}", e))?
        .is_some()
    {
        return Err("User already exists".to_string());
    }

    let hashed_password =
        hash(&request.password, DEFAULT_COST).map_err(|e| format!("Failed to hash password: {}", e))?;

    let new_user_id = ObjectId::new().to_hex();

    let new_user = User {
        _id: None,
        user_id: new_user_id.clone(),
        email: request.email.clone(),
        password: Some(hashed_password),
        name: request.name.clone(),
        phone: request.phone.clone(),
        facility_id: request.facility_id.clone(),
        device_token: None,
        roles: vec!["patient".to_string()],
        is_active: true,
        created_at: Some(BsonDateTime::now()),
        updated_at: Some(BsonDateTime::now()),
        last_login: Some(BsonDateTime::now()),
    };

    collection
        .insert_one(&new_user)
        .await
        .map_err(|e| format!("Failed to create user: {}", e))?;

    let token = generate_jwt(&new_user)?;
    let refresh_token = generate_refresh_token(&new_user_id)?;

    log::info!("✅ User registered successfully: {}", request.email);

    Ok(AuthResponse {
        success: true,
        token,
        refresh_token: Some(refresh_token),
        user: UserInfo::from(new_user),
    })
}

// Refresh token
pub async fn refresh_token(
    db: &MongoDB,
    request: &RefreshTokenRequest,
) -> Result<AuthResponse, String> {
    let claims = verify_token(&request.refresh_token)?;

    let collection = db.collection::<User>("users");

    let filter = doc! {
        "user_id": &claims.sub,
    };

    let user = collection
        .find_one(filter)
        .await
        .map_err(|e| format!("Database error: {}", e))?
        .ok_or_else(|| "User not found".to_string())?;

    if !user.is_active {
        return Err("Account is inactive".to_string());
    }

    let token = generate_jwt(&user)?;
    let new_refresh_token = generate_refresh_token(&user.user_id)?;

    Ok(AuthResponse {
        success: true,
        token,
        refresh_token: Some(new_refresh_token),
        user: UserInfo::from(user),
    })
}

// Get current user
pub async fn get_current_user(db: &MongoDB, user_id: &str) -> Result<UserInfo, String> {
    let collection = db.collection::<User>("users");

    let filter = doc! {
        "user_id": user_id,
    };

    let user = collection
        .find_one(filter)
        .await
        .map_err(|e| format!("Database error: {}", e))?
        .ok_or_else(|| "User not found".to_string())?;

    Ok(UserInfo::from(user))
}

/// Delete user account and every document keyed to it
pub async fn delete_user_account(db: &MongoDB, user_id: &str) -> Result<(), String> {
    log::info!("🗑️ Deleting account for user_id: {}", user_id);

    let users_collection = db.database().collection::<User>("users");
    let delete_user_result = users_collection
        .delete_one(doc! { "user_id": user_id })
        .await
        .map_err(|e| format!("Failed to delete user: {}", e))?;

    if delete_user_result.deleted_count == 0 {
        log::warn!("⚠️ User {} not found in database", user_id);
        return Err(format!("User {} not found", user_id));
    }

    log::info!("✅ User {} deleted from users collection", user_id);

    // Cascade: appointments where the user is patient or staff
    let appointments = db
        .database()
        .collection::<mongodb::bson::Document>("appointments");
    let deleted_appts = appointments
        .delete_many(doc! { "$or": [ { "patient_id": user_id }, { "staff_id": user_id } ] })
        .await
        .map_err(|e| format!("Failed to delete appointments: {}", e))?;

    log::info!("✅ Deleted {} appointments for user {}", deleted_appts.deleted_count, user_id);

    // Medical records
    for coll_name in ["allergies", "conditions", "vitals", "test_results"] {
        let coll = db.database().collection::<mongodb::bson::Document>(coll_name);
        let result = coll
            .delete_many(doc! { "patient_id": user_id })
            .await
            .map_err(|e| format!("Failed to delete {}: {}", coll_name, e))?;
        log::info!("✅ Deleted {} {} records for user {}", result.deleted_count, coll_name, user_id);
    }

    // Bills stay for the financial audit trail, but notifications go
    let notifications = db
        .database()
        .collection::<mongodb::bson::Document>("notifications");
    let deleted_notifs = notifications
        .delete_many(doc! { "user_id": user_id })
        .await
        .map_err(|e| format!("Failed to delete notifications: {}", e))?;

    log::info!("✅ Deleted {} notifications for user {}", deleted_notifs.deleted_count, user_id);

    log::info!("🎉 Account and all data successfully deleted for user {}", user_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            _id: None,
            user_id: "abc123".to_string(),
            email: "pat@example.com".to_string(),
            password: None,
            name: Some("Pat".to_string()),
            phone: None,
            facility_id: None,
            device_token: None,
            roles: vec!["patient".to_string()],
            is_active: true,
            created_at: None,
            updated_at: None,
            last_login: None,
        }
    }

    #[test]
    fn jwt_round_trip() {
        let user = sample_user();
        let token = generate_jwt(&user).expect("token");
        let claims = verify_token(&token).expect("claims");
        assert_eq!(claims.sub, "abc123");
        assert_eq!(claims.email, "pat@example.com");
        assert!(claims.has_role("patient"));
        assert!(!claims.is_staff());
    }

    #[test]
    fn tampered_token_rejected() {
        let user = sample_user();
        let mut token = generate_jwt(&user).expect("token");
        token.push('x');
        assert!(verify_token(&token).is_err());
    }

    #[test]
    fn staff_role_detection() {
        let mut user = sample_user();
        user.roles = vec!["doctor".to_string()];
        let token = generate_jwt(&user).expect("token");
        let claims = verify_token(&token).expect("claims");
        assert!(claims.is_staff());
        assert!(!claims.has_role("admin"));
    }
}
