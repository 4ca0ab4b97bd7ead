mod api;
mod database;
mod jobs;
mod middleware;
mod models;
mod seeds;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::env;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Get configuration from environment
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    log::info!("🚀 Starting Clinic Service...");
    log::info!("📊 Database: {}", database_url);

    // Initialize MongoDB connection
    let db = database::MongoDB::new(&database_url)
        .await
        .expect("Failed to connect to MongoDB");

    let db_data = web::Data::new(db.clone());

    log::info!("✅ MongoDB connected successfully");

    // 🌱 Seed default facility and bootstrap admin
    seeds::bootstrap_seed::seed_bootstrap_data(&db).await;

    // 📅 Start appointment reminder sweep
    log::info!("📅 Starting background jobs...");
    jobs::reminder_scheduler::start_reminder_scheduler(db.clone()).await;
    log::info!("✅ Background jobs started");

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", host, port);

    // Start HTTP server
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin("http://localhost:3000") // Web frontend (dev)
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://127.0.0.1:3000")
            .allowed_origin("http://127.0.0.1:5173")
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CACHE_CONTROL,
            ])
            .expose_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(db_data.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            // Swagger UI
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()))
            // Health check
            .route("/health", web::get().to(api::health::health_check))
            // Metrics
            .route("/metrics", web::get().to(api::metrics::get_metrics))
            // Auth endpoints (public)
            .service(
                web::scope("/api/v1/auth")
                    .route("/login", web::post().to(api::auth::login))
                    .route("/register", web::post().to(api::auth::register))
                    .route("/refresh", web::post().to(api::auth::refresh_token))
                    .route("/verify", web::get().to(api::auth::verify_token))
                    .route("/me", web::get().to(api::auth::get_me))
                    .route("/delete-account", web::delete().to(api::auth::delete_account)),
            )
            // Facilities: public catalog (patients browse before logging in)
            .service(
                web::scope("/api/v1/facilities")
                    .route("", web::get().to(api::facilities::list_facilities))
                    .route("/{facility_id}/staff", web::get().to(api::facilities::list_staff))
                    .route("/{facility_id}", web::get().to(api::facilities::get_facility)),
            )
            // Users: account administration - Requires JWT
            .service(
                web::scope("/api/v1/users")
                    .wrap(middleware::auth::AuthMiddleware)
                    .service(api::users::list_users)
                    .service(api::users::deactivate_user)
                    .service(api::users::get_user)
                    .service(api::users::update_user),
            )
            // Appointments: booking, availability, leaves, lifecycle
            .service(
                web::scope("/api/v1/appointments")
                    .wrap(middleware::auth::AuthMiddleware)
                    .service(api::appointments::get_availability)
                    .service(api::appointments::create_leave)
                    .service(api::appointments::list_leaves)
                    .service(api::appointments::book_appointment)
                    .service(api::appointments::list_appointments)
                    .service(api::appointments::reschedule_appointment)
                    .service(api::appointments::update_status)
                    .service(api::appointments::cancel_appointment)
                    // Catch-all GET registered last
                    .service(api::appointments::get_appointment),
            )
            // Medical records, scoped per patient
            .service(
                web::scope("/api/v1/patients")
                    .wrap(middleware::auth::AuthMiddleware)
                    .service(api::patients::create_allergy)
                    .service(api::patients::list_allergies)
                    .service(api::patients::update_allergy)
                    .service(api::patients::delete_allergy)
                    .service(api::patients::create_condition)
                    .service(api::patients::list_conditions)
                    .service(api::patients::update_condition)
                    .service(api::patients::delete_condition)
                    .service(api::patients::create_vital)
                    .service(api::patients::list_vitals)
                    .service(api::patients::update_vital)
                    .service(api::patients::delete_vital)
                    .service(api::patients::create_test_result)
                    .service(api::patients::list_test_results)
                    .service(api::patients::update_test_result)
                    .service(api::patients::delete_test_result),
            )
            // Billing: bills and the payment ledger
            .service(
                web::scope("/api/v1/billing")
                    .wrap(middleware::auth::AuthMiddleware)
                    .service(api::billing::create_bill)
                    .service(api::billing::list_bills)
                    .service(api::billing::pay_bill)
                    .service(api::billing::cancel_bill)
                    .service(api::billing::list_payments)
                    // Catch-all GET registered last
                    .service(api::billing::get_bill),
            )
            // Pharmacy inventory
            .service(
                web::scope("/api/v1/pharmacy")
                    .wrap(middleware::auth::AuthMiddleware)
                    .service(api::pharmacy::create_medication)
                    .service(api::pharmacy::list_medications)
                    .service(api::pharmacy::low_stock)
                    .service(api::pharmacy::update_medication)
                    .service(api::pharmacy::restock)
                    .service(api::pharmacy::dispense)
                    // Catch-all GET registered last
                    .service(api::pharmacy::get_medication),
            )
            // Notifications: SSE stream + read state
            .service(
                web::scope("/api/v1/notifications")
                    .wrap(middleware::auth::AuthMiddleware)
                    .service(api::notifications::stream)
                    .service(api::notifications::mark_all_read)
                    .service(api::notifications::set_device_token)
                    .service(api::notifications::list_notifications)
                    .service(api::notifications::mark_read),
            )
            // Admin reports
            .service(
                web::scope("/api/v1/reports")
                    .wrap(middleware::auth::AuthMiddleware)
                    .service(api::reports::appointments_per_day)
                    .service(api::reports::revenue)
                    .service(api::reports::staff_utilization)
                    .service(api::reports::stock_valuation),
            )
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}
