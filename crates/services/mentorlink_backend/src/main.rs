// File: services/mentorlink_backend/src/main.rs
use axum::{routing::get, Router};
use mentorlink_common::services::{BoxedError, NotificationService};
use mentorlink_config::load_config;
use mentorlink_db::{
    AppointmentRepository, DbClient, InMemoryAppointmentRepository,
    InMemoryScheduleTemplateRepository, ScheduleTemplateRepository, SqlAppointmentRepository,
    SqlScheduleTemplateRepository,
};
use mentorlink_notify::EmailNotificationService;
use mentorlink_scheduling::routes as scheduling_routes;
use mentorlink_stripe::routes as stripe_routes;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    let config = Arc::new(load_config().expect("Failed to load config"));
    mentorlink_common::logging::init();

    // --- Stores ---
    // SQL-backed when a database is configured, in-memory otherwise. Every
    // downstream component only sees the store interfaces.
    let (appointments, schedules): (
        Arc<dyn AppointmentRepository>,
        Arc<dyn ScheduleTemplateRepository>,
    ) = match config.database.as_ref() {
        Some(db_config) => {
            let client = DbClient::from_config(db_config)
                .await
                .expect("Failed to connect to database");
            let appointments: Arc<dyn AppointmentRepository> =
                Arc::new(SqlAppointmentRepository::new(client.clone()));
            let schedules: Arc<dyn ScheduleTemplateRepository> =
                Arc::new(SqlScheduleTemplateRepository::new(client));
            appointments
                .init_schema()
                .await
                .expect("Failed to initialize appointment schema");
            schedules
                .init_schema()
                .await
                .expect("Failed to initialize schedule schema");
            (appointments, schedules)
        }
        None => {
            warn!("No database configured; appointments and schedules are stored in memory");
            (
                Arc::new(InMemoryAppointmentRepository::new()),
                Arc::new(InMemoryScheduleTemplateRepository::new()),
            )
        }
    };

    // --- Notifications (best effort, optional) ---
    let notifier: Option<Arc<dyn NotificationService<Error = BoxedError>>> =
        if config.use_notify && config.notify.is_some() {
            info!("ℹ️ Initializing email notification service...");
            Some(Arc::new(EmailNotificationService::new(config.clone())))
        } else {
            None
        };

    // --- Routers ---
    let api_router = Router::new().route("/", get(|| async { "Welcome to MentorLink API!" }));
    let scheduling_router = scheduling_routes::routes(
        config.clone(),
        appointments.clone(),
        schedules.clone(),
        notifier.clone(),
    );
    let stripe_router = stripe_routes::routes(config.clone(), appointments.clone(), notifier);

    let mut app = Router::new().nest(
        "/api",
        api_router.merge(scheduling_router).merge(stripe_router),
    );

    // Conditionally add Swagger UI and JSON endpoint if openapi feature enabled
    #[cfg(feature = "openapi")]
    {
        use mentorlink_scheduling::doc::SchedulingApiDoc;
        use mentorlink_stripe::doc::StripeApiDoc;
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        // Define the Merged OpenAPI Documentation struct
        #[derive(OpenApi)]
        #[openapi(
            info(
                title = "MentorLink API",
                version = "0.1.0",
                description = "MentorLink Service API Docs",
                license(name = "MIT", url = "https://opensource.org/licenses/MIT")
            ),
            components(),
            tags( (name = "MentorLink", description = "Core service endpoints")),
            servers( (url = "/api", description = "Main API Prefix")),
        )]
        struct ApiDoc;

        let mut openapi_doc = ApiDoc::openapi();
        openapi_doc.merge(SchedulingApiDoc::openapi());
        openapi_doc.merge(StripeApiDoc::openapi());
        info!("📖 Adding Swagger UI at /api/docs");

        let swagger_ui =
            SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", openapi_doc.clone());
        app = app.merge(swagger_ui);
    }

    // Serve static files in dev mode
    if cfg!(debug_assertions) {
        info!("Running in development mode, serving static files from ./dist");
        app = app.fallback_service(ServeDir::new("dist"));
    }

    // Bind and serve
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await.unwrap();
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    axum::serve(listener, app.into_make_service())
        .await
        .unwrap();
}
