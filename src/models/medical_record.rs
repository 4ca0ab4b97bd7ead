use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==================== ALLERGIES ====================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Mild => write!(f, "mild"),
            Severity::Moderate => write!(f, "moderate"),
            Severity::Severe => write!(f, "severe"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allergy {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub patient_id: String,
    pub substance: String,
    pub reaction: Option<String>,
    pub severity: Severity,
    /// User that recorded the entry (patient themself or staff)
    pub noted_by: String,
    #[serde(default)]
    pub deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateAllergyRequest {
    pub substance: String,
    pub reaction: Option<String>,
    pub severity: Severity,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAllergyRequest {
    pub substance: Option<String>,
    pub reaction: Option<String>,
    pub severity: Option<Severity>,
}

// ==================== CONDITIONS ====================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConditionStatus {
    Active,
    Managed,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub patient_id: String,
    pub name: String,
    pub status: ConditionStatus,
    /// Diagnosis date (Unix timestamp, milliseconds), when known
    pub diagnosed_at: Option<i64>,
    pub noted_by: String,
    #[serde(default)]
    pub deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateConditionRequest {
    pub name: String,
    pub status: ConditionStatus,
    pub diagnosed_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateConditionRequest {
    pub name: Option<String>,
    pub status: Option<ConditionStatus>,
    pub diagnosed_at: Option<i64>,
}

// ==================== VITALS ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vital {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub patient_id: String,
    pub systolic: i32,
    pub diastolic: i32,
    pub heart_rate: i32,
    pub temperature_c: f64,
    pub spo2: i32,
    /// Measurement time (Unix timestamp, milliseconds)
    pub recorded_at: i64,
    pub recorded_by: String,
    #[serde(default)]
    pub deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateVitalRequest {
    pub systolic: i32,
    pub diastolic: i32,
    pub heart_rate: i32,
    pub temperature_c: f64,
    pub spo2: i32,
    pub recorded_at: Option<i64>,
}

/// Correction of a recorded reading; merged values are re-validated
#[derive(Debug, Deserialize)]
pub struct UpdateVitalRequest {
    pub systolic: Option<i32>,
    pub diastolic: Option<i32>,
    pub heart_rate: Option<i32>,
    pub temperature_c: Option<f64>,
    pub spo2: Option<i32>,
    pub recorded_at: Option<i64>,
}

// ==================== TEST RESULTS ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub patient_id: String,
    pub name: String,
    pub value: String,
    pub unit: Option<String>,
    pub reference_range: Option<String>,
    pub flagged: bool,
    pub ordered_by: String,
    #[serde(default)]
    pub deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateTestResultRequest {
    pub name: String,
    pub value: String,
    pub unit: Option<String>,
    pub reference_range: Option<String>,
    pub flagged: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTestResultRequest {
    pub value: Option<String>,
    pub unit: Option<String>,
    pub reference_range: Option<String>,
    pub flagged: Option<bool>,
}
