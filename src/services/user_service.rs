use crate::database::MongoDB;
use crate::models::{UpdateUserRequest, User, UserInfo, VALID_ROLES};
use crate::utils::error::AppError;
use futures::stream::StreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime};

pub async fn list_users(db: &MongoDB, role: Option<&str>) -> Result<Vec<UserInfo>, AppError> {
    let collection = db.collection::<User>("users");

    let mut filter = doc! {};
    if let Some(role) = role {
        filter.insert("roles", role);
    }

    let mut cursor = collection
        .find(filter)
        .sort(doc! { "email": 1 })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    let mut users = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(user) => users.push(UserInfo::from(user)),
            Err(e) => log::error!("❌ Failed to decode user: {}", e),
        }
    }

    Ok(users)
}

pub async fn get_user(db: &MongoDB, user_id: &str) -> Result<UserInfo, AppError> {
    let collection = db.collection::<User>("users");

    let user = collection
        .find_one(doc! { "user_id": user_id })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    Ok(UserInfo::from(user))
}

/// Admin profile/role update. Role grants are how staff accounts come
/// to exist: a patient registers, an admin promotes.
pub async fn update_user(
    db: &MongoDB,
    user_id: &str,
    request: &UpdateUserRequest,
) -> Result<UserInfo, AppError> {
    if let Some(roles) = &request.roles {
        if roles.is_empty() {
            return Err(AppError::InvalidRequest("Roles cannot be empty".to_string()));
        }
        for role in roles {
            if !VALID_ROLES.contains(&role.as_str()) {
                return Err(AppError::InvalidRequest(format!("Invalid role: {}", role)));
            }
        }
    }

    let mut set = doc! { "updated_at": BsonDateTime::now() };
    if let Some(name) = &request.name {
        set.insert("name", name);
    }
    if let Some(phone) = &request.phone {
        set.insert("phone", phone);
    }
    if let Some(facility_id) = &request.facility_id {
        set.insert("facility_id", facility_id);
    }
    if let Some(roles) = &request.roles {
        set.insert("roles", roles);
    }

    let collection = db.collection::<User>("users");
    let result = collection
        .update_one(doc! { "user_id": user_id }, doc! { "$set": set })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }

    get_user(db, user_id).await
}

/// Soft deactivation: the account stays for the audit trail but can no
/// longer log in or be booked
pub async fn deactivate_user(db: &MongoDB, user_id: &str) -> Result<(), AppError> {
    let collection = db.collection::<User>("users");

    let result = collection
        .update_one(
            doc! { "user_id": user_id },
            doc! { "$set": { "is_active": false, "updated_at": BsonDateTime::now() } },
        )
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }

    log::info!("🚫 User {} deactivated", user_id);
    Ok(())
}
