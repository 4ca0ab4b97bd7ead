use crate::database::MongoDB;
use crate::models::{
    Allergy, Condition, CreateAllergyRequest, CreateConditionRequest, CreateTestResultRequest,
    CreateVitalRequest, TestResult, UpdateAllergyRequest, UpdateConditionRequest,
    UpdateTestResultRequest, UpdateVitalRequest, Vital,
};
use crate::utils::error::AppError;
use chrono::Utc;
use futures::stream::StreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};

// Hard plausibility bounds for vital readings; values outside these are
// sensor/typo errors, not medicine
const HEART_RATE_RANGE: (i32, i32) = (20, 300);
const TEMPERATURE_RANGE: (f64, f64) = (30.0, 45.0);
const PRESSURE_RANGE: (i32, i32) = (30, 300);

pub fn validate_vitals(request: &CreateVitalRequest) -> Result<(), String> {
    if request.systolic <= request.diastolic {
        return Err("Systolic pressure must exceed diastolic".to_string());
    }
    for (label, value) in [("systolic", request.systolic), ("diastolic", request.diastolic)] {
        if !(PRESSURE_RANGE.0..=PRESSURE_RANGE.1).contains(&value) {
            return Err(format!("Implausible {} pressure: {}", label, value));
        }
    }
    if !(HEART_RATE_RANGE.0..=HEART_RATE_RANGE.1).contains(&request.heart_rate) {
        return Err(format!("Implausible heart rate: {}", request.heart_rate));
    }
    if !(TEMPERATURE_RANGE.0..=TEMPERATURE_RANGE.1).contains(&request.temperature_c) {
        return Err(format!("Implausible temperature: {}", request.temperature_c));
    }
    if !(0..=100).contains(&request.spo2) {
        return Err(format!("SpO2 must be 0-100, got {}", request.spo2));
    }
    Ok(())
}

// ==================== ALLERGIES ====================

pub async fn create_allergy(
    db: &MongoDB,
    patient_id: &str,
    noted_by: &str,
    request: &CreateAllergyRequest,
) -> Result<Allergy, AppError> {
    if request.substance.trim().is_empty() {
        return Err(AppError::InvalidRequest("Substance is required".to_string()));
    }

    let now = Utc::now().timestamp_millis();
    let mut allergy = Allergy {
        id: None,
        patient_id: patient_id.to_string(),
        substance: request.substance.clone(),
        reaction: request.reaction.clone(),
        severity: request.severity,
        noted_by: noted_by.to_string(),
        deleted: false,
        created_at: now,
        updated_at: now,
    };

    let collection = db.collection::<Allergy>("allergies");
    let result = collection
        .insert_one(&allergy)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    allergy.id = result.inserted_id.as_object_id();
    Ok(allergy)
}

pub async fn list_allergies(db: &MongoDB, patient_id: &str) -> Result<Vec<Allergy>, AppError> {
    list_records::<Allergy>(db, "allergies", patient_id).await
}

pub async fn update_allergy(
    db: &MongoDB,
    patient_id: &str,
    id: &ObjectId,
    request: &UpdateAllergyRequest,
) -> Result<Allergy, AppError> {
    let mut set = doc! { "updated_at": Utc::now().timestamp_millis() };
    if let Some(substance) = &request.substance {
        set.insert("substance", substance);
    }
    if let Some(reaction) = &request.reaction {
        set.insert("reaction", reaction);
    }
    if let Some(severity) = &request.severity {
        set.insert("severity", severity.to_string());
    }

    update_record::<Allergy>(db, "allergies", patient_id, id, set).await
}

pub async fn delete_allergy(db: &MongoDB, patient_id: &str, id: &ObjectId) -> Result<(), AppError> {
    soft_delete(db, "allergies", patient_id, id).await
}

// ==================== CONDITIONS ====================

pub async fn create_condition(
    db: &MongoDB,
    patient_id: &str,
    noted_by: &str,
    request: &CreateConditionRequest,
) -> Result<Condition, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::InvalidRequest("Condition name is required".to_string()));
    }

    let now = Utc::now().timestamp_millis();
    let mut condition = Condition {
        id: None,
        patient_id: patient_id.to_string(),
        name: request.name.clone(),
        status: request.status,
        diagnosed_at: request.diagnosed_at,
        noted_by: noted_by.to_string(),
        deleted: false,
        created_at: now,
        updated_at: now,
    };

    let collection = db.collection::<Condition>("conditions");
    let result = collection
        .insert_one(&condition)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    condition.id = result.inserted_id.as_object_id();
    Ok(condition)
}

pub async fn list_conditions(db: &MongoDB, patient_id: &str) -> Result<Vec<Condition>, AppError> {
    list_records::<Condition>(db, "conditions", patient_id).await
}

pub async fn update_condition(
    db: &MongoDB,
    patient_id: &str,
    id: &ObjectId,
    request: &UpdateConditionRequest,
) -> Result<Condition, AppError> {
    let mut set = doc! { "updated_at": Utc::now().timestamp_millis() };
    if let Some(name) = &request.name {
        set.insert("name", name);
    }
    if let Some(status) = &request.status {
        set.insert(
            "status",
            mongodb::bson::to_bson(status).map_err(|e| AppError::DatabaseError(e.to_string()))?,
        );
    }
    if let Some(diagnosed_at) = request.diagnosed_at {
        set.insert("diagnosed_at", diagnosed_at);
    }

    update_record::<Condition>(db, "conditions", patient_id, id, set).await
}

pub async fn delete_condition(
    db: &MongoDB,
    patient_id: &str,
    id: &ObjectId,
) -> Result<(), AppError> {
    soft_delete(db, "conditions", patient_id, id).await
}

// ==================== VITALS ====================

pub async fn create_vital(
    db: &MongoDB,
    patient_id: &str,
    recorded_by: &str,
    request: &CreateVitalRequest,
) -> Result<Vital, AppError> {
    validate_vitals(request).map_err(AppError::InvalidRequest)?;

    let now = Utc::now().timestamp_millis();
    let mut vital = Vital {
        id: None,
        patient_id: patient_id.to_string(),
        systolic: request.systolic,
        diastolic: request.diastolic,
        heart_rate: request.heart_rate,
        temperature_c: request.temperature_c,
        spo2: request.spo2,
        recorded_at: request.recorded_at.unwrap_or(now),
        recorded_by: recorded_by.to_string(),
        deleted: false,
        created_at: now,
        updated_at: now,
    };

    let collection = db.collection::<Vital>("vitals");
    let result = collection
        .insert_one(&vital)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    vital.id = result.inserted_id.as_object_id();
    Ok(vital)
}

pub async fn list_vitals(db: &MongoDB, patient_id: &str) -> Result<Vec<Vital>, AppError> {
    list_records::<Vital>(db, "vitals", patient_id).await
}

/// Corrections re-validate the merged reading, so a partial update can
/// never leave an implausible combination behind
pub async fn update_vital(
    db: &MongoDB,
    patient_id: &str,
    id: &ObjectId,
    request: &UpdateVitalRequest,
) -> Result<Vital, AppError> {
    let collection = db.collection::<Vital>("vitals");

    let current = collection
        .find_one(doc! { "_id": id, "patient_id": patient_id, "deleted": { "$ne": true } })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Record not found".to_string()))?;

    let merged = CreateVitalRequest {
        systolic: request.systolic.unwrap_or(current.systolic),
        diastolic: request.diastolic.unwrap_or(current.diastolic),
        heart_rate: request.heart_rate.unwrap_or(current.heart_rate),
        temperature_c: request.temperature_c.unwrap_or(current.temperature_c),
        spo2: request.spo2.unwrap_or(current.spo2),
        recorded_at: Some(request.recorded_at.unwrap_or(current.recorded_at)),
    };
    validate_vitals(&merged).map_err(AppError::InvalidRequest)?;

    let set = doc! {
        "systolic": merged.systolic,
        "diastolic": merged.diastolic,
        "heart_rate": merged.heart_rate,
        "temperature_c": merged.temperature_c,
        "spo2": merged.spo2,
        "recorded_at": merged.recorded_at.unwrap_or(current.recorded_at),
        "updated_at": Utc::now().timestamp_millis(),
    };

    update_record::<Vital>(db, "vitals", patient_id, id, set).await
}

pub async fn delete_vital(db: &MongoDB, patient_id: &str, id: &ObjectId) -> Result<(), AppError> {
    soft_delete(db, "vitals", patient_id, id).await
}

// ==================== TEST RESULTS ====================

pub async fn create_test_result(
    db: &MongoDB,
    patient_id: &str,
    ordered_by: &str,
    request: &CreateTestResultRequest,
) -> Result<TestResult, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::InvalidRequest("Test name is required".to_string()));
    }

    let now = Utc::now().timestamp_millis();
    let mut test_result = TestResult {
        id: None,
        patient_id: patient_id.to_string(),
        name: request.name.clone(),
        value: request.value.clone(),
        unit: request.unit.clone(),
        reference_range: request.reference_range.clone(),
        flagged: request.flagged.unwrap_or(false),
        ordered_by: ordered_by.to_string(),
        deleted: false,
        created_at: now,
        updated_at: now,
    };

    let collection = db.collection::<TestResult>("test_results");
    let result = collection
        .insert_one(&test_result)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    test_result.id = result.inserted_id.as_object_id();
    Ok(test_result)
}

pub async fn list_test_results(db: &MongoDB, patient_id: &str) -> Result<Vec<TestResult>, AppError> {
    list_records::<TestResult>(db, "test_results", patient_id).await
}

pub async fn update_test_result(
    db: &MongoDB,
    patient_id: &str,
    id: &ObjectId,
    request: &UpdateTestResultRequest,
) -> Result<TestResult, AppError> {
    let mut set = doc! { "updated_at": Utc::now().timestamp_millis() };
    if let Some(value) = &request.value {
        set.insert("value", value);
    }
    if let Some(unit) = &request.unit {
        set.insert("unit", unit);
    }
    if let Some(reference_range) = &request.reference_range {
        set.insert("reference_range", reference_range);
    }
    if let Some(flagged) = request.flagged {
        set.insert("flagged", flagged);
    }

    update_record::<TestResult>(db, "test_results", patient_id, id, set).await
}

pub async fn delete_test_result(
    db: &MongoDB,
    patient_id: &str,
    id: &ObjectId,
) -> Result<(), AppError> {
    soft_delete(db, "test_results", patient_id, id).await
}

// ==================== SHARED PERSISTENCE HELPERS ====================

async fn list_records<T>(
    db: &MongoDB,
    collection_name: &str,
    patient_id: &str,
) -> Result<Vec<T>, AppError>
where
    T: serde::de::DeserializeOwned + Send + Sync,
{
    let collection = db.collection::<T>(collection_name);

    let mut cursor = collection
        .find(doc! { "patient_id": patient_id, "deleted": { "$ne": true } })
        .sort(doc! { "created_at": -1 })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    let mut records = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(record) => records.push(record),
            Err(e) => log::error!("❌ Failed to decode {} record: {}", collection_name, e),
        }
    }

    Ok(records)
}

async fn update_record<T>(
    db: &MongoDB,
    collection_name: &str,
    patient_id: &str,
    id: &ObjectId,
    set: Document,
) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned + Send + Sync,
{
    let collection = db.collection::<T>(collection_name);

    let result = collection
        .update_one(
            doc! { "_id": id, "patient_id": patient_id, "deleted": { "$ne": true } },
            doc! { "$set": set },
        )
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound("Record not found".to_string()));
    }

    collection
        .find_one(doc! { "_id": id })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Record not found".to_string()))
}

async fn soft_delete(
    db: &MongoDB,
    collection_name: &str,
    patient_id: &str,
    id: &ObjectId,
) -> Result<(), AppError> {
    let collection = db.collection::<Document>(collection_name);

    let result = collection
        .update_one(
            doc! { "_id": id, "patient_id": patient_id },
            doc! { "$set": { "deleted": true, "updated_at": Utc::now().timestamp_millis() } },
        )
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound("Record not found".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vitals() -> CreateVitalRequest {
        CreateVitalRequest {
            systolic: 120,
            diastolic: 80,
            heart_rate: 72,
            temperature_c: 36.8,
            spo2: 98,
            recorded_at: None,
        }
    }

    #[test]
    fn normal_vitals_pass() {
        assert!(validate_vitals(&vitals()).is_ok());
    }

    #[test]
    fn systolic_must_exceed_diastolic() {
        let mut v = vitals();
        v.systolic = 80;
        v.diastolic = 120;
        assert!(validate_vitals(&v).is_err());
    }

    #[test]
    fn implausible_readings_rejected() {
        let mut v = vitals();
        v.heart_rate = 500;
        assert!(validate_vitals(&v).is_err());

        let mut v = vitals();
        v.temperature_c = 20.0;
        assert!(validate_vitals(&v).is_err());

        let mut v = vitals();
        v.spo2 = 120;
        assert!(validate_vitals(&v).is_err());
    }
}
