// --- File: crates/mentorlink_stripe/src/routes.rs ---

use crate::handlers::{
    create_checkout_session_handler, stripe_checkout_cancel_handler,
    stripe_checkout_success_handler, stripe_webhook_handler, StripeState,
};
use axum::{
    routing::{get, post},
    Router,
};
use mentorlink_common::services::{BoxedError, NotificationService};
use mentorlink_config::AppConfig;
use mentorlink_db::AppointmentRepository;
use std::sync::Arc;

/// Creates a router containing all routes for the Stripe feature.
pub fn routes(
    config: Arc<AppConfig>,
    appointments: Arc<dyn AppointmentRepository>,
    notifier: Option<Arc<dyn NotificationService<Error = BoxedError>>>,
) -> Router {
    let stripe_state = Arc::new(StripeState {
        config,
        appointments,
        notifier,
    });

    Router::new()
        .route("/checkout", post(create_checkout_session_handler))
        .route("/payment-webhook", post(stripe_webhook_handler))
        // User-facing redirect endpoints (GET)
        .route("/checkout/success", get(stripe_checkout_success_handler))
        .route("/checkout/cancel", get(stripe_checkout_cancel_handler))
        .with_state(stripe_state)
}
