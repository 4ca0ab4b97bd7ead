use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Persisted notification. Read state is a plain boolean toggled via the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    /// e.g. "appointment_booked", "appointment_status", "reminder", "low_stock"
    pub kind: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: i64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct NotificationResponse {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub created_at: i64,
}

impl From<Notification> for NotificationResponse {
    fn from(notif: Notification) -> Self {
        NotificationResponse {
            id: notif.id.map(|id| id.to_hex()).unwrap_or_default(),
            kind: notif.kind,
            title: notif.title,
            body: notif.body,
            read: notif.read,
            created_at: notif.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NotificationListQuery {
    pub unread: Option<bool>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct DeviceTokenRequest {
    pub device_token: String,
}
