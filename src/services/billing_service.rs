use crate::database::MongoDB;
use crate::models::{Bill, BillStatus, CreateBillRequest, LineItem, PayBillRequest, Payment};
use crate::services::notification_service;
use crate::utils::error::AppError;
use chrono::Utc;
use futures::stream::StreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};

/// Server-side total: Σ amount_cents × quantity
pub fn compute_total(line_items: &[LineItem]) -> Result<i64, String> {
    if line_items.is_empty() {
        return Err("Bill needs at least one line item".to_string());
    }

    let mut total: i64 = 0;
    for item in line_items {
        if item.amount_cents < 0 {
            return Err(format!("Negative amount on line item '{}'", item.description));
        }
        if item.quantity <= 0 {
            return Err(format!("Non-positive quantity on line item '{}'", item.description));
        }
        let line = item
            .amount_cents
            .checked_mul(item.quantity)
            .ok_or_else(|| "Line item total overflows".to_string())?;
        total = total
            .checked_add(line)
            .ok_or_else(|| "Bill total overflows".to_string())?;
    }

    Ok(total)
}

pub async fn create_bill(
    db: &MongoDB,
    created_by: &str,
    request: &CreateBillRequest,
) -> Result<Bill, AppError> {
    let total = compute_total(&request.line_items).map_err(AppError::InvalidRequest)?;

    // A client-supplied total that disagrees with the server sum is a bug
    // on the client or a tampering attempt, either way a 400
    if let Some(claimed) = request.total_cents {
        if claimed != total {
            return Err(AppError::InvalidRequest(format!(
                "Total mismatch: client sent {} but line items sum to {}",
                claimed, total
            )));
        }
    }

    let now = Utc::now().timestamp_millis();
    let mut bill = Bill {
        id: None,
        patient_id: request.patient_id.clone(),
        facility_id: request.facility_id.clone(),
        appointment_id: request.appointment_id.clone(),
        line_items: request.line_items.clone(),
        total_cents: total,
        status: BillStatus::Pending,
        created_by: created_by.to_string(),
        created_at: now,
        updated_at: now,
    };

    let collection = db.collection::<Bill>("bills");
    let result = collection
        .insert_one(&bill)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    bill.id = result.inserted_id.as_object_id();

    notification_service::notify(
        db,
        &bill.patient_id,
        "bill_created",
        "New bill",
        &format!("A bill of {} cents was issued to you", total),
    )
    .await;

    Ok(bill)
}

pub async fn get_bill(db: &MongoDB, id: &ObjectId) -> Result<Bill, AppError> {
    let collection = db.collection::<Bill>("bills");

    collection
        .find_one(doc! { "_id": id })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Bill not found".to_string()))
}

pub async fn list_bills(db: &MongoDB, patient_id: &str) -> Result<Vec<Bill>, AppError> {
    let collection = db.collection::<Bill>("bills");

    let mut cursor = collection
        .find(doc! { "patient_id": patient_id })
        .sort(doc! { "created_at": -1 })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    let mut bills = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(bill) => bills.push(bill),
            Err(e) => log::error!("❌ Failed to decode bill: {}", e),
        }
    }

    Ok(bills)
}

/// Cancelling is only possible while the bill is pending
pub async fn cancel_bill(db: &MongoDB, id: &ObjectId) -> Result<Bill, AppError> {
    let bill = get_bill(db, id).await?;

    if bill.status != BillStatus::Pending {
        return Err(AppError::Conflict(format!(
            "Cannot cancel a {} bill",
            bill.status
        )));
    }

    let collection = db.collection::<Bill>("bills");
    collection
        .update_one(
            doc! { "_id": id },
            doc! { "$set": { "status": "cancelled", "updated_at": Utc::now().timestamp_millis() } },
        )
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    get_bill(db, id).await
}

/// Status guard for paying: the pending check is part of the update
/// filter, so two concurrent pay requests cannot both claim the bill.
fn pending_claim(id: &ObjectId, now: i64) -> (Document, Document) {
    (
        doc! { "_id": id, "status": "pending" },
        doc! { "$set": { "status": "paid", "updated_at": now } },
    )
}

/// Roll a claimed bill back to pending after a failed vendor call or
/// ledger write, so the patient can retry
async fn release_claim(db: &MongoDB, id: &ObjectId) {
    let bills = db.collection::<Bill>("bills");
    let result = bills
        .update_one(
            doc! { "_id": id, "status": "paid" },
            doc! { "$set": { "status": "pending", "updated_at": Utc::now().timestamp_millis() } },
        )
        .await;

    if let Err(e) = result {
        log::error!("❌ Failed to release payment claim on bill {}: {}", id.to_hex(), e);
    }
}

/// Pay a pending bill. Card payments are delegated to Stripe (we create
/// a PaymentIntent and keep its id as the ledger reference); cash skips
/// the vendor call. The ledger row is append-only.
pub async fn pay_bill(
    db: &MongoDB,
    id: &ObjectId,
    request: &PayBillRequest,
) -> Result<Payment, AppError> {
    if request.provider != "card" && request.provider != "cash" {
        return Err(AppError::InvalidRequest(format!(
            "Unknown payment provider: {}",
            request.provider
        )));
    }

    let bill = get_bill(db, id).await?;

    if bill.status != BillStatus::Pending {
        return Err(AppError::Conflict(format!("Bill is already {}", bill.status)));
    }

    // Claim the bill before the vendor call; losing the race means
    // someone else is (or finished) paying it
    let bills = db.collection::<Bill>("bills");
    let (filter, update) = pending_claim(id, Utc::now().timestamp_millis());
    let claimed = bills
        .update_one(filter, update)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    if claimed.modified_count == 0 {
        let current = get_bill(db, id).await?;
        return Err(AppError::Conflict(format!("Bill is already {}", current.status)));
    }

    let currency = request.currency.clone().unwrap_or_else(|| "usd".to_string());

    let (provider_ref, provider_status) = match request.provider.as_str() {
        "card" => {
            match create_stripe_payment_intent(bill.total_cents, &currency, &id.to_hex()).await {
                Ok((intent_id, status)) => (Some(intent_id), status),
                Err(e) => {
                    release_claim(db, id).await;
                    return Err(e);
                }
            }
        }
        _ => (None, "succeeded".to_string()),
    };

    let payment = Payment {
        id: None,
        bill_id: id.to_hex(),
        patient_id: bill.patient_id.clone(),
        facility_id: bill.facility_id.clone(),
        amount_cents: bill.total_cents,
        currency,
        provider: request.provider.clone(),
        provider_ref,
        status: provider_status,
        created_at: Utc::now().timestamp_millis(),
    };

    let payments = db.collection::<Payment>("payments");
    let result = match payments.insert_one(&payment).await {
        Ok(result) => result,
        Err(e) => {
            release_claim(db, id).await;
            return Err(AppError::DatabaseError(e.to_string()));
        }
    };

    notification_service::notify(
        db,
        &bill.patient_id,
        "payment_recorded",
        "Payment received",
        &format!("Payment of {} cents recorded for bill {}", bill.total_cents, id.to_hex()),
    )
    .await;

    let mut stored = payment;
    stored.id = result.inserted_id.as_object_id();
    Ok(stored)
}

/// Create a Stripe PaymentIntent via the REST API. Card capture and PCI
/// scope live entirely on Stripe's side; we only keep the intent id.
async fn create_stripe_payment_intent(
    amount_cents: i64,
    currency: &str,
    bill_id: &str,
) -> Result<(String, String), AppError> {
    let secret_key = std::env::var("STRIPE_SECRET_KEY")
        .map_err(|_| AppError::VendorError("STRIPE_SECRET_KEY not configured".to_string()))?;

    let amount = amount_cents.to_string();
    let params = [
        ("amount", amount.as_str()),
        ("currency", currency),
        ("metadata[bill_id]", bill_id),
        ("automatic_payment_methods[enabled]", "true"),
    ];

    let client = reqwest::Client::new();
    let response = client
        .post("https://api.stripe.com/v1/payment_intents")
        .basic_auth(&secret_key, Option::<&str>::None)
        .form(&params)
        .send()
        .await
        .map_err(|e| AppError::VendorError(format!("Stripe request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        log::error!("❌ Stripe rejected payment intent (HTTP {}): {}", status, body);
        return Err(AppError::VendorError(format!(
            "Stripe rejected the payment (HTTP {})",
            status
        )));
    }

    let intent: serde_json::Value = response
        .json()
        .await
        .map_err(|e| AppError::VendorError(format!("Failed to parse Stripe response: {}", e)))?;

    let intent_id = intent["id"]
        .as_str()
        .ok_or_else(|| AppError::VendorError("No id in Stripe response".to_string()))?
        .to_string();
    let status = intent["status"].as_str().unwrap_or("unknown").to_string();

    log::info!("💳 Stripe payment intent {} created for bill {}", intent_id, bill_id);

    Ok((intent_id, status))
}

pub async fn list_payments(db: &MongoDB, patient_id: &str) -> Result<Vec<Payment>, AppError> {
    let collection = db.collection::<Payment>("payments");

    let mut cursor = collection
        .find(doc! { "patient_id": patient_id })
        .sort(doc! { "created_at": -1 })
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    let mut payments = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(payment) => payments.push(payment),
            Err(e) => log::error!("❌ Failed to decode payment: {}", e),
        }
    }

    Ok(payments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(description: &str, amount_cents: i64, quantity: i64) -> LineItem {
        LineItem {
            description: description.to_string(),
            amount_cents,
            quantity,
        }
    }

    #[test]
    fn total_is_sum_of_amount_times_quantity() {
        let items = vec![item("consultation", 5000, 1), item("dressing kit", 750, 3)];
        assert_eq!(compute_total(&items).unwrap(), 5000 + 2250);
    }

    #[test]
    fn empty_bill_rejected() {
        assert!(compute_total(&[]).is_err());
    }

    #[test]
    fn negative_amount_and_zero_quantity_rejected() {
        assert!(compute_total(&[item("refund?", -100, 1)]).is_err());
        assert!(compute_total(&[item("nothing", 100, 0)]).is_err());
    }

    #[test]
    fn overflow_rejected() {
        assert!(compute_total(&[item("absurd", i64::MAX, 2)]).is_err());
    }

    #[test]
    fn payment_claim_only_matches_pending_bills() {
        let id = ObjectId::new();
        let (filter, update) = pending_claim(&id, 1_700_000_000_000);

        assert_eq!(filter.get_object_id("_id").unwrap(), id);
        assert_eq!(filter.get_str("status").unwrap(), "pending");

        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("status").unwrap(), "paid");
        assert_eq!(set.get_i64("updated_at").unwrap(), 1_700_000_000_000);
    }
}
