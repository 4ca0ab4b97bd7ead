use crate::database::MongoDB;
use crate::models::{Notification, NotificationResponse, User};
use chrono::Utc;
use futures::stream::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use tokio::sync::broadcast;

/// Event published to live SSE subscribers. Every subscriber receives
/// every event and filters by user_id.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub user_id: String,
    pub payload: String,
}

lazy_static::lazy_static! {
    static ref BROKER: broadcast::Sender<NotificationEvent> = broadcast::channel(256).0;
}

pub fn subscribe() -> broadcast::Receiver<NotificationEvent> {
    BROKER.subscribe()
}

/// Persist a notification, publish it to live SSE streams and push it
/// via FCM when the user registered a device token. Delivery past the
/// database write is best-effort: failures are logged, never surfaced.
pub async fn notify(db: &MongoDB, user_id: &str, kind: &str, title: &str, body: &str) {
    let notification = Notification {
        id: None,
        user_id: user_id.to_string(),
        kind: kind.to_string(),
        title: title.to_string(),
        body: body.to_string(),
        read: false,
        created_at: Utc::now().timestamp_millis(),
    };

    let collection = db.collection::<Notification>("notifications");
    let inserted_id = match collection.insert_one(&notification).await {
        Ok(result) => result.inserted_id.as_object_id(),
        Err(e) => {
            log::error!("❌ Failed to persist notification for {}: {}", user_id, e);
            return;
        }
    };

    let mut stored = notification;
    stored.id = inserted_id;

    let payload = match serde_json::to_string(&NotificationResponse::from(stored)) {
        Ok(json) => json,
        Err(e) => {
            log::error!("❌ Failed to serialize notification: {}", e);
            return;
        }
    };

    // No subscriber is not an error, just an empty room
    let _ = BROKER.send(NotificationEvent {
        user_id: user_id.to_string(),
        payload,
    });

    crate::api::metrics::increment_notification_count();

    push_fcm(db, user_id, title, body).await;
}

/// Best-effort FCM push (legacy HTTP endpoint). Skipped when no server
/// key is configured or the user never registered a device token.
async fn push_fcm(db: &MongoDB, user_id: &str, title: &str, body: &str) {
    let server_key = match std::env::var("FCM_SERVER_KEY") {
        Ok(key) if !key.is_empty() => key,
        _ => return,
    };

    let users = db.collection::<User>("users");
    let device_token = match users.find_one(doc! { "user_id": user_id }).await {
        Ok(Some(user)) => match user.device_token {
            Some(token) => token,
            None => return,
        },
        Ok(None) => return,
        Err(e) => {
            log::error!("❌ FCM token lookup failed for {}: {}", user_id, e);
            return;
        }
    };

    let client = reqwest::Client::new();
    let result = client
        .post("https://fcm.googleapis.com/fcm/send")
        .header("Authorization", format!("key={}", server_key))
        .json(&serde_json::json!({
            "to": device_token,
            "notification": {
                "title": title,
                "body": body,
            }
        }))
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => {
            log::debug!("📲 FCM push delivered to user {}", user_id);
        }
        Ok(response) => {
            log::warn!("⚠️ FCM push rejected for {}: HTTP {}", user_id, response.status());
        }
        Err(e) => {
            log::warn!("⚠️ FCM push failed for {}: {}", user_id, e);
        }
    }
}

/// List own notifications, newest first
pub async fn list_notifications(
    db: &MongoDB,
    user_id: &str,
    unread_only: bool,
) -> Result<Vec<NotificationResponse>, String> {
    let collection = db.collection::<Notification>("notifications");

    let mut filter = doc! { "user_id": user_id };
    if unread_only {
        filter.insert("read", false);
    }

    let mut cursor = collection
        .find(filter)
        .sort(doc! { "created_at": -1 })
        .await
        .map_err(|e| format!("Database error: {}", e))?;

    let mut notifications = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(notif) => notifications.push(NotificationResponse::from(notif)),
            Err(e) => log::error!("❌ Failed to decode notification: {}", e),
        }
    }

    Ok(notifications)
}

pub async fn mark_read(db: &MongoDB, user_id: &str, id: &ObjectId) -> Result<(), String> {
    let collection = db.collection::<Notification>("notifications");

    let result = collection
        .update_one(
            doc! { "_id": id, "user_id": user_id },
            doc! { "$set": { "read": true } },
        )
        .await
        .map_err(|e| format!("Database error: {}", e))?;

    if result.matched_count == 0 {
        return Err("Notification not found".to_string());
    }

    Ok(())
}

pub async fn mark_all_read(db: &MongoDB, user_id: &str) -> Result<u64, String> {
    let collection = db.collection::<Notification>("notifications");

    let result = collection
        .update_many(
            doc! { "user_id": user_id, "read": false },
            doc! { "$set": { "read": true } },
        )
        .await
        .map_err(|e| format!("Database error: {}", e))?;

    Ok(result.modified_count)
}

/// Store the FCM device token on the user document
pub async fn set_device_token(db: &MongoDB, user_id: &str, token: &str) -> Result<(), String> {
    let collection = db.collection::<User>("users");

    let result = collection
        .update_one(
            doc! { "user_id": user_id },
            doc! { "$set": { "device_token": token } },
        )
        .await
        .map_err(|e| format!("Database error: {}", e))?;

    if result.matched_count == 0 {
        return Err("User not found".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broker_delivers_to_subscribers() {
        let mut rx = subscribe();
        BROKER
            .send(NotificationEvent {
                user_id: "u1".to_string(),
                payload: "{\"kind\":\"test\"}".to_string(),
            })
            .expect("send");
        let event = rx.recv().await.expect("recv");
        assert_eq!(event.user_id, "u1");
        assert!(event.payload.contains("test"));
    }
}
