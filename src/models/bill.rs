use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Billing line item. Amounts are integer cents.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LineItem {
    pub description: String,
    pub amount_cents: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Pending,
    Paid,
    Cancelled,
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillStatus::Pending => write!(f, "pending"),
            BillStatus::Paid => write!(f, "paid"),
            BillStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub patient_id: String,
    pub facility_id: String,
    pub appointment_id: Option<String>,
    pub line_items: Vec<LineItem>,
    /// Always recomputed server-side from line_items
    pub total_cents: i64,
    pub status: BillStatus,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateBillRequest {
    pub patient_id: String,
    pub facility_id: String,
    pub appointment_id: Option<String>,
    pub line_items: Vec<LineItem>,
    /// Optional client-side total; rejected when it disagrees with the server's sum
    pub total_cents: Option<i64>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct PayBillRequest {
    /// "card" (Stripe PaymentIntent) or "cash"
    pub provider: String,
    pub currency: Option<String>,
}

/// Append-only payment ledger row, recorded after the charge succeeded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub bill_id: String,
    pub patient_id: String,
    pub facility_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub provider: String,
    /// Vendor reference (Stripe payment-intent id); None for cash
    pub provider_ref: Option<String>,
    pub status: String,
    pub created_at: i64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BillResponse {
    pub id: String,
    pub patient_id: String,
    pub facility_id: String,
    pub appointment_id: Option<String>,
    pub line_items: Vec<LineItem>,
    pub total_cents: i64,
    pub status: BillStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Bill> for BillResponse {
    fn from(bill: Bill) -> Self {
        BillResponse {
            id: bill.id.map(|id| id.to_hex()).unwrap_or_default(),
            patient_id: bill.patient_id,
            facility_id: bill.facility_id,
            appointment_id: bill.appointment_id,
            line_items: bill.line_items,
            total_cents: bill.total_cents,
            status: bill.status,
            created_at: bill.created_at,
            updated_at: bill.updated_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PaymentResponse {
    pub id: String,
    pub bill_id: String,
    pub patient_id: String,
    pub facility_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub provider: String,
    pub provider_ref: Option<String>,
    pub status: String,
    pub created_at: i64,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        PaymentResponse {
            id: payment.id.map(|id| id.to_hex()).unwrap_or_default(),
            bill_id: payment.bill_id,
            patient_id: payment.patient_id,
            facility_id: payment.facility_id,
            amount_cents: payment.amount_cents,
            currency: payment.currency,
            provider: payment.provider,
            provider_ref: payment.provider_ref,
            status: payment.status,
            created_at: payment.created_at,
        }
    }
}
