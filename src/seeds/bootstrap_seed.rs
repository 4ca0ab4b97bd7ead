use crate::database::MongoDB;
use crate::models::{Facility, User};
use crate::services::facility_service;
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use std::env;

/// Seeds the default facility and the bootstrap admin account.
/// Idempotent: nothing is inserted when the documents already exist.
/// Failures are logged, never fatal — the service still starts.
pub async fn seed_bootstrap_data(db: &MongoDB) {
    let facility_id = seed_default_facility(db).await;
    seed_bootstrap_admin(db, facility_id.as_deref()).await;
}

async fn seed_default_facility(db: &MongoDB) -> Option<String> {
    let collection = db.collection::<Facility>("facilities");

    let count = collection.count_documents(doc! {}).await.unwrap_or(0);
    if count > 0 {
        log::info!("🏥 Facilities: {} already in DB — skipping seed", count);
        // Reuse the first active facility for the admin account
        return match collection.find_one(doc! { "is_active": true }).await {
            Ok(Some(facility)) => facility.id.map(|id| id.to_hex()),
            _ => None,
        };
    }

    log::info!("🏥 Facilities: seeding default facility...");

    let now = Utc::now().timestamp_millis();
    let facility = Facility {
        id: None,
        name: env::var("DEFAULT_FACILITY_NAME").unwrap_or_else(|_| "Main Clinic".to_string()),
        address: env::var("DEFAULT_FACILITY_ADDRESS").unwrap_or_else(|_| "1 Health Way".to_string()),
        phone: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    match collection.insert_one(&facility).await {
        Ok(result) => {
            let id = result.inserted_id.as_object_id().map(|id| id.to_hex());
            log::info!("   ✅ Default facility created: {}", id.as_deref().unwrap_or("?"));
            facility_service::invalidate_facilities_cache();
            id
        }
        Err(e) => {
            log::error!("   ❌ Failed to seed default facility: {}", e);
            None
        }
    }
}

async fn seed_bootstrap_admin(db: &MongoDB, facility_id: Option<&str>) {
    let collection = db.collection::<User>("users");

    let count = collection
        .count_documents(doc! { "roles": "admin" })
        .await
        .unwrap_or(0);

    if count > 0 {
        log::info!("👤 Admin accounts: {} already in DB — skipping seed", count);
        return;
    }

    // No password, no admin. Forces operators to choose one instead of
    // shipping a default credential.
    let password = match env::var("BOOTSTRAP_ADMIN_PASSWORD") {
        Ok(password) if !password.is_empty() => password,
        _ => {
            log::warn!("⚠️ BOOTSTRAP_ADMIN_PASSWORD not set — no admin account seeded");
            return;
        }
    };

    let email = env::var("BOOTSTRAP_ADMIN_EMAIL").unwrap_or_else(|_| "admin@clinic.local".to_string());

    let password_hash = match bcrypt::hash(&password, bcrypt::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(e) => {
            log::error!("❌ Failed to hash bootstrap admin password: {}", e);
            return;
        }
    };

    log::info!("👤 Admin accounts: seeding bootstrap admin ({})...", email);

    let now = BsonDateTime::now();
    let admin = User {
        _id: None,
        user_id: ObjectId::new().to_hex(),
        email,
        password: Some(password_hash),
        name: Some("Administrator".to_string()),
        phone: None,
        facility_id: facility_id.map(|id| id.to_string()),
        device_token: None,
        roles: vec!["admin".to_string()],
        is_active: true,
        created_at: Some(now),
        updated_at: Some(now),
        last_login: None,
    };

    match collection.insert_one(&admin).await {
        Ok(_) => log::info!("   ✅ Bootstrap admin created"),
        Err(e) => log::error!("   ❌ Failed to seed bootstrap admin: {}", e),
    }
}
