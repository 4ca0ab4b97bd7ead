use crate::database::MongoDB;
use crate::models::{
    CreateMedicationRequest, Medication, StockAdjustRequest, UpdateMedicationRequest, User,
};
use crate::services::notification_service;
use crate::utils::error::AppError;
use chrono::Utc;
use futures::stream::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};

pub async fn create_medication(
    db: &MongoDB,
    request: &CreateMedicationRequest,
) -> Result<Medication, AppError> {
    if request.name.trim().is_empty() || request.sku.trim().is_empty() {
        return Err(AppError::InvalidRequest("Name and SKU are required".to_string()));
    }
    if request.stock < 0 || request.reorder_level < 0 || request.unit_price_cents < 0 {
        return Err(AppError::InvalidRequest(
            "Stock, reorder level and price cannot be negative".to_string(),
        ));
    }

    let collection = db.collection::<Medication>("medications");

    // SKU is unique per facility
    let duplicate = collection
        .find_one(doc! { "facility_id": &request.facility_id, "sku": &request.sku })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    if duplicate.is_some() {
        return Err(AppError::Conflict(format!(
            "SKU {} already exists at this facility",
            request.sku
        )));
    }

    let now = Utc::now().timestamp_millis();
    let mut medication = Medication {
        id: None,
        facility_id: request.facility_id.clone(),
        name: request.name.clone(),
        sku: request.sku.clone(),
        stock: request.stock,
        unit: request.unit.clone(),
        reorder_level: request.reorder_level,
        unit_price_cents: request.unit_price_cents,
        expires_at: request.expires_at,
        created_at: now,
        updated_at: now,
    };

    let result = collection
        .insert_one(&medication)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    medication.id = result.inserted_id.as_object_id();
    Ok(medication)
}

pub async fn get_medication(db: &MongoDB, id: &ObjectId) -> Result<Medication, AppError> {
    let collection = db.collection::<Medication>("medications");

    collection
        .find_one(doc! { "_id": id })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Medication not found".to_string()))
}

pub async fn list_medications(
    db: &MongoDB,
    facility_id: &str,
    search: Option<&str>,
) -> Result<Vec<Medication>, AppError> {
    let collection = db.collection::<Medication>("medications");

    let mut filter = doc! { "facility_id": facility_id };
    if let Some(term) = search {
        // case-insensitive substring match on the name
        filter.insert("name", doc! { "$regex": regex_escape(term), "$options": "i" });
    }

    let mut cursor = collection
        .find(filter)
        .sort(doc! { "name": 1 })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    let mut medications = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(med) => medications.push(med),
            Err(e) => log::error!("❌ Failed to decode medication: {}", e),
        }
    }

    Ok(medications)
}

pub async fn update_medication(
    db: &MongoDB,
    id: &ObjectId,
    request: &UpdateMedicationRequest,
) -> Result<Medication, AppError> {
    let mut set = doc! { "updated_at": Utc::now().timestamp_millis() };
    if let Some(name) = &request.name {
        set.insert("name", name);
    }
    if let Some(unit) = &request.unit {
        set.insert("unit", unit);
    }
    if let Some(reorder_level) = request.reorder_level {
        if reorder_level < 0 {
            return Err(AppError::InvalidRequest("Reorder level cannot be negative".to_string()));
        }
        set.insert("reorder_level", reorder_level);
    }
    if let Some(unit_price_cents) = request.unit_price_cents {
        if unit_price_cents < 0 {
            return Err(AppError::InvalidRequest("Price cannot be negative".to_string()));
        }
        set.insert("unit_price_cents", unit_price_cents);
    }
    if let Some(expires_at) = request.expires_at {
        set.insert("expires_at", expires_at);
    }

    let collection = db.collection::<Medication>("medications");
    let result = collection
        .update_one(doc! { "_id": id }, doc! { "$set": set })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound("Medication not found".to_string()));
    }

    get_medication(db, id).await
}

pub async fn restock(
    db: &MongoDB,
    id: &ObjectId,
    request: &StockAdjustRequest,
) -> Result<Medication, AppError> {
    if request.quantity <= 0 {
        return Err(AppError::InvalidRequest("Quantity must be positive".to_string()));
    }

    let collection = db.collection::<Medication>("medications");
    let result = collection
        .update_one(
            doc! { "_id": id },
            doc! {
                "$inc": { "stock": request.quantity },
                "$set": { "updated_at": Utc::now().timestamp_millis() },
            },
        )
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound("Medication not found".to_string()));
    }

    get_medication(db, id).await
}

/// Dispense decrements stock, never below zero. The guard is part of the
/// update filter so two concurrent dispenses cannot both pass the check.
pub async fn dispense(
    db: &MongoDB,
    id: &ObjectId,
    request: &StockAdjustRequest,
) -> Result<Medication, AppError> {
    if request.quantity <= 0 {
        return Err(AppError::InvalidRequest("Quantity must be positive".to_string()));
    }

    let collection = db.collection::<Medication>("medications");

    let result = collection
        .update_one(
            doc! { "_id": id, "stock": { "$gte": request.quantity } },
            doc! {
                "$inc": { "stock": -request.quantity },
                "$set": { "updated_at": Utc::now().timestamp_millis() },
            },
        )
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    if result.matched_count == 0 {
        // Either the medication is missing or the stock is insufficient
        let medication = get_medication(db, id).await?;
        return Err(AppError::Conflict(format!(
            "Insufficient stock: {} {} available, {} requested",
            medication.stock, medication.unit, request.quantity
        )));
    }

    let medication = get_medication(db, id).await?;

    if medication.stock <= medication.reorder_level {
        notify_pharmacists(db, &medication).await;
    }

    Ok(medication)
}

pub async fn low_stock_report(db: &MongoDB, facility_id: &str) -> Result<Vec<Medication>, AppError> {
    let collection = db.collection::<Medication>("medications");

    let mut cursor = collection
        .find(doc! {
            "facility_id": facility_id,
            "$expr": { "$lte": ["$stock", "$reorder_level"] },
        })
        .sort(doc! { "stock": 1 })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    let mut medications = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(med) => medications.push(med),
            Err(e) => log::error!("❌ Failed to decode medication: {}", e),
        }
    }

    Ok(medications)
}

/// Low-stock alert to every pharmacist of the facility
async fn notify_pharmacists(db: &MongoDB, medication: &Medication) {
    let users = db.collection::<User>("users");

    let mut cursor = match users
        .find(doc! {
            "facility_id": &medication.facility_id,
            "roles": "pharmacist",
            "is_active": true,
        })
        .await
    {
        Ok(cursor) => cursor,
        Err(e) => {
            log::error!("❌ Failed to look up pharmacists: {}", e);
            return;
        }
    };

    while let Some(result) = cursor.next().await {
        match result {
            Ok(pharmacist) => {
                notification_service::notify(
                    db,
                    &pharmacist.user_id,
                    "low_stock",
                    "Low stock",
                    &format!(
                        "{} is down to {} {} (reorder level {})",
                        medication.name, medication.stock, medication.unit, medication.reorder_level
                    ),
                )
                .await;
            }
            Err(e) => log::error!("❌ Failed to decode pharmacist: {}", e),
        }
    }
}

fn regex_escape(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if "\\.^$|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_escape_neutralizes_metacharacters() {
        assert_eq!(regex_escape("aspirin"), "aspirin");
        assert_eq!(regex_escape("5% (w/v)"), "5% \\(w/v\\)");
        assert_eq!(regex_escape("a.b*c"), "a\\.b\\*c");
    }
}
