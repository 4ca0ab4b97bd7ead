use mongodb::{Client, Collection, Database};
use std::error::Error;

#[derive(Clone)]
pub struct MongoDB {
    client: Client,
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Connection pool tuned for a small clinic deployment
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = uri
            .split('/')
            .last()
            .and_then(|s| s.split('?').next())
            .unwrap_or("ClinicService");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { client, db };

        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates necessary indexes for optimal query performance
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        // Unique index on users(email) - duplicate registrations must fail at the DB too
        let users = self.database().collection::<mongodb::bson::Document>("users");

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match users.create_index(email_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(email) unique"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // appointments(staff_id, start) - conflict scans, availability grids,
        // and the DB backstop against two identical-start bookings racing
        // past the overlap scan
        let appointments = self.database().collection::<mongodb::bson::Document>("appointments");

        match appointments.create_index(appointment_slot_index()).await {
            Ok(_) => log::info!("   ✅ Index created: appointments(staff_id, start) unique"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // appointments(patient_id, start) - patient dashboards
        let appt_patient_index = IndexModel::builder()
            .keys(doc! { "patient_id": 1, "start": 1 })
            .build();

        match appointments.create_index(appt_patient_index).await {
            Ok(_) => log::info!("   ✅ Index created: appointments(patient_id, start)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // notifications(user_id, read) - unread badge queries
        let notifications = self.database().collection::<mongodb::bson::Document>("notifications");

        let notif_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "read": 1 })
            .build();

        match notifications.create_index(notif_index).await {
            Ok(_) => log::info!("   ✅ Index created: notifications(user_id, read)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // bills(patient_id) and payments(patient_id) - billing lookups
        let bills = self.database().collection::<mongodb::bson::Document>("bills");

        let bills_index = IndexModel::builder()
            .keys(doc! { "patient_id": 1 })
            .build();

        match bills.create_index(bills_index).await {
            Ok(_) => log::info!("   ✅ Index created: bills(patient_id)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let payments = self.database().collection::<mongodb::bson::Document>("payments");

        let payments_index = IndexModel::builder()
            .keys(doc! { "patient_id": 1 })
            .build();

        match payments.create_index(payments_index).await {
            Ok(_) => log::info!("   ✅ Index created: payments(patient_id)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // medications(facility_id, name) - inventory listing and search
        let medications = self.database().collection::<mongodb::bson::Document>("medications");

        let meds_index = IndexModel::builder()
            .keys(doc! { "facility_id": 1, "name": 1 })
            .build();

        match medications.create_index(meds_index).await {
            Ok(_) => log::info!("   ✅ Index created: medications(facility_id, name)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // leave_records(staff_id, from) - leave window lookups during booking
        let leaves = self.database().collection::<mongodb::bson::Document>("leave_records");

        let leaves_index = IndexModel::builder()
            .keys(doc! { "staff_id": 1, "from": 1 })
            .build();

        match leaves.create_index(leaves_index).await {
            Ok(_) => log::info!("   ✅ Index created: leave_records(staff_id, from)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Unique (staff_id, start) slot index. Partial so a cancelled
/// appointment releases its slot for rebooking at the same start.
fn appointment_slot_index() -> mongodb::IndexModel {
    use mongodb::bson::doc;
    use mongodb::options::IndexOptions;

    mongodb::IndexModel::builder()
        .keys(doc! { "staff_id": 1, "start": 1 })
        .options(
            IndexOptions::builder()
                .unique(true)
                .partial_filter_expression(doc! {
                    "status": { "$in": ["scheduled", "confirmed", "completed", "no_show"] }
                })
                .build(),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn appointment_slot_index_is_unique_and_releases_cancelled_slots() {
        let index = appointment_slot_index();

        assert_eq!(index.keys, doc! { "staff_id": 1, "start": 1 });

        let options = index.options.unwrap();
        assert_eq!(options.unique, Some(true));

        let statuses = options
            .partial_filter_expression
            .unwrap()
            .get_document("status")
            .unwrap()
            .get_array("$in")
            .unwrap()
            .clone();
        assert!(!statuses.iter().any(|s| s.as_str() == Some("cancelled")));
        assert!(statuses.iter().any(|s| s.as_str() == Some("scheduled")));
    }
}
