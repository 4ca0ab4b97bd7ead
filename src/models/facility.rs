use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Hospital/clinic location. Scopes which staff a patient may book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FacilityResponse {
    pub id: String,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub is_active: bool,
}

impl From<Facility> for FacilityResponse {
    fn from(facility: Facility) -> Self {
        FacilityResponse {
            id: facility.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: facility.name,
            address: facility.address,
            phone: facility.phone,
            is_active: facility.is_active,
        }
    }
}
