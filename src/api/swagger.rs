use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Clinic Service API",
        version = "1.0.0",
        description = "Complete API documentation for Clinic Service. \n\n**Authentication:** Most endpoints require JWT Bearer token authentication.\n\n**Features:**\n- Patient and staff accounts with role-based access\n- Facility catalog and bookable staff\n- Appointment scheduling with conflict-free slots\n- Medical records (allergies, conditions, vitals, test results)\n- Billing with Stripe card payments\n- Pharmacy inventory with low-stock alerts\n- Live notifications (SSE) and admin reports",
        contact(
            name = "Clinic Service Team",
            email = "support@clinic-service.com"
        )
    ),
    paths(
        // Auth endpoints
        crate::api::auth::login,
        crate::api::auth::register,
        crate::api::auth::verify_token,
        crate::api::auth::get_me,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,

        // Facilities
        crate::api::facilities::list_facilities,
    ),
    components(
        schemas(
            // Auth
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::AuthResponse,
            crate::models::UserInfo,

            // Health & Metrics
            crate::api::health::HealthResponse,
            crate::api::metrics::MetricsResponse,

            // Facilities
            crate::models::FacilityResponse,

            // Appointments
            crate::models::BookAppointmentRequest,
            crate::models::AppointmentResponse,
            crate::models::FreeSlot,

            // Billing
            crate::models::CreateBillRequest,
            crate::models::PayBillRequest,
            crate::models::BillResponse,
            crate::models::PaymentResponse,

            // Pharmacy
            crate::models::CreateMedicationRequest,
            crate::models::StockAdjustRequest,
            crate::models::MedicationResponse,

            // Notifications
            crate::models::NotificationResponse,
            crate::models::DeviceTokenRequest,
        )
    ),
    tags(
        (name = "Auth", description = "Authentication and account endpoints. Email/password with JWT access and refresh tokens."),
        (name = "Health", description = "Health check and system metrics endpoints for monitoring service status."),
        (name = "Facilities", description = "Facility catalog endpoints. List clinics and their bookable staff."),
        (name = "Appointments", description = "Appointment booking, availability, rescheduling and lifecycle updates."),
        (name = "Billing", description = "Bills and payments. Card payments go through Stripe, cash is recorded at the desk."),
        (name = "Pharmacy", description = "Per-facility medication inventory: restock, dispense and low-stock reporting."),
        (name = "Notifications", description = "Persisted notifications with a live SSE stream and optional FCM push."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your JWT token"))
                        .build(),
                ),
            );
        }
    }
}
