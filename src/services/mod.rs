pub mod appointment_service;
pub mod auth_service;
pub mod billing_service;
pub mod facility_service;
pub mod notification_service;
pub mod pharmacy_service;
pub mod record_service;
pub mod report_service;
pub mod user_service;
