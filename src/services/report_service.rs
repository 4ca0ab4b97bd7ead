use crate::database::MongoDB;
use crate::utils::error::AppError;
use futures::stream::StreamExt;
use mongodb::bson::{doc, Bson, Document};

/// Minutes of one business day (08:00-17:00)
const CAPACITY_MINUTES_PER_DAY: i64 = 540;

async fn run_pipeline(
    db: &MongoDB,
    collection_name: &str,
    pipeline: Vec<Document>,
) -> Result<Vec<serde_json::Value>, AppError> {
    let collection = db.collection::<Document>(collection_name);

    let mut cursor = collection
        .aggregate(pipeline)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    let mut rows = Vec::new();
    while let Some(result) = cursor.next().await {
        let document = result.map_err(|e| AppError::DatabaseError(e.to_string()))?;
        rows.push(Bson::Document(document).into());
    }

    Ok(rows)
}

/// Appointments per day over a range, bucketed by status
pub async fn appointments_per_day(
    db: &MongoDB,
    from: i64,
    to: i64,
) -> Result<Vec<serde_json::Value>, AppError> {
    let pipeline = vec![
        doc! { "$match": { "start": { "$gte": from, "$lt": to } } },
        doc! { "$group": {
            "_id": {
                "day": { "$dateToString": { "format": "%Y-%m-%d", "date": { "$toDate": "$start" } } },
                "status": "$status",
            },
            "count": { "$sum": 1 },
        }},
        doc! { "$project": {
            "_id": 0,
            "day": "$_id.day",
            "status": "$_id.status",
            "count": 1,
        }},
        doc! { "$sort": { "day": 1, "status": 1 } },
    ];

    run_pipeline(db, "appointments", pipeline).await
}

/// Revenue per facility: sum of succeeded ledger rows over a range
pub async fn revenue_per_facility(
    db: &MongoDB,
    from: i64,
    to: i64,
) -> Result<Vec<serde_json::Value>, AppError> {
    let pipeline = vec![
        doc! { "$match": {
            "created_at": { "$gte": from, "$lt": to },
            "status": "succeeded",
        }},
        doc! { "$group": {
            "_id": "$facility_id",
            "revenue_cents": { "$sum": "$amount_cents" },
            "payments": { "$sum": 1 },
        }},
        doc! { "$project": {
            "_id": 0,
            "facility_id": "$_id",
            "revenue_cents": 1,
            "payments": 1,
        }},
        doc! { "$sort": { "revenue_cents": -1 } },
    ];

    run_pipeline(db, "payments", pipeline).await
}

/// Booked minutes per staff member per day, against the fixed
/// business-hours capacity
pub async fn staff_utilization(
    db: &MongoDB,
    from: i64,
    to: i64,
) -> Result<Vec<serde_json::Value>, AppError> {
    let pipeline = vec![
        doc! { "$match": {
            "start": { "$gte": from, "$lt": to },
            "status": { "$ne": "cancelled" },
        }},
        doc! { "$group": {
            "_id": {
                "staff_id": "$staff_id",
                "day": { "$dateToString": { "format": "%Y-%m-%d", "date": { "$toDate": "$start" } } },
            },
            "booked_minutes": { "$sum": "$duration_minutes" },
            "appointments": { "$sum": 1 },
        }},
        doc! { "$project": {
            "_id": 0,
            "staff_id": "$_id.staff_id",
            "day": "$_id.day",
            "booked_minutes": 1,
            "appointments": 1,
            "capacity_minutes": CAPACITY_MINUTES_PER_DAY,
        }},
        doc! { "$sort": { "day": 1, "staff_id": 1 } },
    ];

    run_pipeline(db, "appointments", pipeline).await
}

/// Stock valuation per facility: Σ stock × unit_price_cents
pub async fn stock_valuation(db: &MongoDB) -> Result<Vec<serde_json::Value>, AppError> {
    let pipeline = vec![
        doc! { "$group": {
            "_id": "$facility_id",
            "valuation_cents": { "$sum": { "$multiply": ["$stock", "$unit_price_cents"] } },
            "items": { "$sum": 1 },
        }},
        doc! { "$project": {
            "_id": 0,
            "facility_id": "$_id",
            "valuation_cents": 1,
            "items": 1,
        }},
        doc! { "$sort": { "valuation_cents": -1 } },
    ];

    run_pipeline(db, "medications", pipeline).await
}
