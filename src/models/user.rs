use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

/// User document (patients, staff and admins share the collection,
/// distinguished by `roles`)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub user_id: String, // PRIMARY IDENTIFIER - hex string, stable across responses
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>, // bcrypt hash
    pub name: Option<String>,
    pub phone: Option<String>,
    /// Facility the user belongs to (staff) or registered at (patients)
    pub facility_id: Option<String>,
    /// FCM device token for push notifications, if the client registered one
    pub device_token: Option<String>,
    #[serde(default = "default_roles")]
    pub roles: Vec<String>,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    pub created_at: Option<BsonDateTime>,
    pub updated_at: Option<BsonDateTime>,
    pub last_login: Option<BsonDateTime>,
}

fn default_roles() -> Vec<String> {
    vec!["patient".to_string()]
}

fn default_is_active() -> bool {
    true
}

/// Public profile returned by the API (never carries the password hash)
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub facility_id: Option<String>,
    pub roles: Vec<String>,
    pub is_active: bool,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        UserInfo {
            id: user.user_id,
            email: user.email,
            name: user.name,
            phone: user.phone,
            facility_id: user.facility_id,
            roles: user.roles,
            is_active: user.is_active,
        }
    }
}

/// Admin-side profile/role update
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub facility_id: Option<String>,
    pub roles: Option<Vec<String>>,
}

pub const VALID_ROLES: &[&str] = &["patient", "doctor", "nurse", "pharmacist", "admin"];
pub const BOOKABLE_ROLES: &[&str] = &["doctor", "nurse"];
