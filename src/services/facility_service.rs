use crate::database::MongoDB;
use crate::models::{Facility, FacilityResponse, User, UserInfo, BOOKABLE_ROLES};
use crate::utils::cache;
use futures::stream::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};

const FACILITIES_CACHE_KEY: &str = "facilities:active";

/// List active facilities as a JSON array. The catalog changes rarely,
/// so the serialized response is kept in the process-local cache until
/// a facility write invalidates it.
pub async fn list_facilities(db: &MongoDB) -> Result<serde_json::Value, String> {
    if let Some(cached) = cache::get_cached(FACILITIES_CACHE_KEY) {
        if let Ok(facilities) = serde_json::from_str::<serde_json::Value>(&cached) {
            log::debug!("📋 Facilities served from cache");
            return Ok(facilities);
        }
    }

    let collection = db.collection::<Facility>("facilities");

    let mut cursor = collection
        .find(doc! { "is_active": true })
        .sort(doc! { "name": 1 })
        .await
        .map_err(|e| format!("Database error: {}", e))?;

    let mut facilities = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(facility) => facilities.push(FacilityResponse::from(facility)),
            Err(e) => log::error!("❌ Failed to decode facility: {}", e),
        }
    }

    let json = serde_json::to_value(&facilities).map_err(|e| format!("Serialize error: {}", e))?;

    if let Ok(serialized) = serde_json::to_string(&json) {
        cache::set_cache(FACILITIES_CACHE_KEY.to_string(), serialized);
    }

    Ok(json)
}

pub fn invalidate_facilities_cache() {
    cache::invalidate(FACILITIES_CACHE_KEY);
}

pub async fn get_facility(db: &MongoDB, id: &ObjectId) -> Result<FacilityResponse, String> {
    let collection = db.collection::<Facility>("facilities");

    let facility = collection
        .find_one(doc! { "_id": id })
        .await
        .map_err(|e| format!("Database error: {}", e))?
        .ok_or_else(|| "Facility not found".to_string())?;

    Ok(FacilityResponse::from(facility))
}

/// Bookable staff of a facility, optionally narrowed to one role
pub async fn list_staff(
    db: &MongoDB,
    facility_id: &str,
    role: Option<&str>,
) -> Result<Vec<UserInfo>, String> {
    let roles: Vec<&str> = match role {
        Some(role) => {
            if !BOOKABLE_ROLES.contains(&role) {
                return Err(format!("Role {} is not bookable", role));
            }
            vec![role]
        }
        None => BOOKABLE_ROLES.to_vec(),
    };

    let collection = db.collection::<User>("users");

    let mut cursor = collection
        .find(doc! {
            "facility_id": facility_id,
            "roles": { "$in": roles },
            "is_active": true,
        })
        .sort(doc! { "name": 1 })
        .await
        .map_err(|e| format!("Database error: {}", e))?;

    let mut staff = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(user) => staff.push(UserInfo::from(user)),
            Err(e) => log::error!("❌ Failed to decode staff member: {}", e),
        }
    }

    Ok(staff)
}
