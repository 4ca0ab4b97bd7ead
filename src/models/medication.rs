use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Pharmacy inventory item, scoped per facility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub facility_id: String,
    pub name: String,
    pub sku: String,
    pub stock: i64,
    pub unit: String,
    pub reorder_level: i64,
    pub unit_price_cents: i64,
    /// Expiry (Unix timestamp, milliseconds), when tracked
    pub expires_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateMedicationRequest {
    pub facility_id: String,
    pub name: String,
    pub sku: String,
    pub stock: i64,
    pub unit: String,
    pub reorder_level: i64,
    pub unit_price_cents: i64,
    pub expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMedicationRequest {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub reorder_level: Option<i64>,
    pub unit_price_cents: Option<i64>,
    pub expires_at: Option<i64>,
}

/// Restock/dispense adjustment; quantity must be positive
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct StockAdjustRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct MedicationListQuery {
    pub facility_id: String,
    pub search: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MedicationResponse {
    pub id: String,
    pub facility_id: String,
    pub name: String,
    pub sku: String,
    pub stock: i64,
    pub unit: String,
    pub reorder_level: i64,
    pub unit_price_cents: i64,
    pub expires_at: Option<i64>,
    pub low_stock: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Medication> for MedicationResponse {
    fn from(med: Medication) -> Self {
        MedicationResponse {
            id: med.id.map(|id| id.to_hex()).unwrap_or_default(),
            low_stock: med.stock <= med.reorder_level,
            facility_id: med.facility_id,
            name: med.name,
            sku: med.sku,
            stock: med.stock,
            unit: med.unit,
            reorder_level: med.reorder_level,
            unit_price_cents: med.unit_price_cents,
            expires_at: med.expires_at,
            created_at: med.created_at,
            updated_at: med.updated_at,
        }
    }
}
