// ==================== APPOINTMENT REMINDER SCHEDULER ====================
// Hourly sweep that reminds patients of appointments starting within the
// next 24 hours. The reminder_sent flag makes the sweep idempotent: a
// restart or an overlapping tick never sends the same reminder twice.

use crate::{database::MongoDB, models::Appointment, services::notification_service};
use chrono::Utc;
use futures::stream::StreamExt;
use mongodb::bson::doc;
use tokio::time::{interval, Duration};

const REMINDER_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;
const SWEEP_INTERVAL_SECS: u64 = 3600;

/// Starts the reminder sweep: once immediately on startup, then hourly.
pub async fn start_reminder_scheduler(db: MongoDB) {
    log::info!("📅 Starting appointment reminder scheduler (runs every hour)");

    tokio::spawn(async move {
        log::info!("🚀 Running initial reminder sweep on startup...");
        match sweep_due_reminders(&db).await {
            Ok(count) => log::info!("✅ Startup reminder sweep completed: {} reminders sent", count),
            Err(e) => log::error!("❌ Startup reminder sweep failed: {}", e),
        }

        let mut interval = interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
        // First tick fires immediately and would duplicate the startup sweep
        interval.tick().await;

        loop {
            interval.tick().await;

            match sweep_due_reminders(&db).await {
                Ok(count) => {
                    if count > 0 {
                        log::info!("✅ Hourly reminder sweep: {} reminders sent", count);
                    } else {
                        log::debug!("⏰ Hourly reminder sweep: nothing due");
                    }
                }
                Err(e) => log::error!("❌ Hourly reminder sweep failed: {}", e),
            }
        }
    });

    log::info!("✅ Reminder scheduler started successfully");
}

/// Finds scheduled/confirmed appointments starting within the window that
/// have not been reminded yet, notifies the patient and flips the flag.
async fn sweep_due_reminders(db: &MongoDB) -> Result<usize, String> {
    let now = Utc::now().timestamp_millis();
    let horizon = now + REMINDER_WINDOW_MS;

    let collection = db.collection::<Appointment>("appointments");

    let filter = doc! {
        "start": { "$gte": now, "$lt": horizon },
        "status": { "$in": ["scheduled", "confirmed"] },
        "reminder_sent": { "$ne": true },
    };

    let mut cursor = collection
        .find(filter)
        .await
        .map_err(|e| format!("Database error: {}", e))?;

    let mut sent = 0;
    while let Some(result) = cursor.next().await {
        let appointment = match result {
            Ok(appointment) => appointment,
            Err(e) => {
                log::error!("  ❌ Failed to decode appointment: {}", e);
                continue;
            }
        };

        let id = match appointment.id {
            Some(id) => id,
            None => continue,
        };

        // Flip the flag first; if it was already set by a concurrent sweep
        // the update matches nothing and we skip the notification
        let update = collection
            .update_one(
                doc! { "_id": id, "reminder_sent": { "$ne": true } },
                doc! { "$set": { "reminder_sent": true } },
            )
            .await
            .map_err(|e| format!("Database error: {}", e))?;

        if update.modified_count == 0 {
            continue;
        }

        let minutes_until = (appointment.start - now) / 60_000;
        notification_service::notify(
            db,
            &appointment.patient_id,
            "reminder",
            "Upcoming appointment",
            &format!(
                "You have an appointment in about {}h{:02} ({})",
                minutes_until / 60,
                minutes_until % 60,
                appointment.reason
            ),
        )
        .await;

        sent += 1;
        log::debug!("  🔔 Reminder sent for appointment {}", id.to_hex());
    }

    Ok(sent)
}
