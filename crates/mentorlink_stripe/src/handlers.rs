// --- File: crates/mentorlink_stripe/src/handlers.rs ---
use crate::error::StripeError;
use crate::logic::{
    create_checkout_session, process_stripe_webhook, verify_stripe_signature,
    CreateCheckoutSessionRequest, CreateCheckoutSessionResponse, StripeEvent,
};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use mentorlink_common::services::{BoxedError, NotificationService};
use mentorlink_common::HttpStatusCode;
use mentorlink_config::AppConfig;
use mentorlink_db::AppointmentRepository;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

// --- State for Stripe Handlers ---
#[derive(Clone)]
pub struct StripeState {
    pub config: Arc<AppConfig>,
    pub appointments: Arc<dyn AppointmentRepository>,
    /// Best-effort booked notifications; absent when notify is disabled.
    pub notifier: Option<Arc<dyn NotificationService<Error = BoxedError>>>,
}

/// Axum handler to create a Stripe Checkout Session.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/checkout", // Path relative to /api
    request_body = CreateCheckoutSessionRequest,
    responses(
        (status = 200, description = "Stripe Checkout Session created", body = CreateCheckoutSessionResponse),
        (status = 400, description = "Bad Request (e.g., no usable price)"),
        (status = 500, description = "Internal Server Error or Stripe API error")
    ),
    tag = "Stripe"
))]
pub async fn create_checkout_session_handler(
    State(state): State<Arc<StripeState>>,
    Json(payload): Json<CreateCheckoutSessionRequest>,
) -> Result<Json<CreateCheckoutSessionResponse>, (StatusCode, String)> {
    if !state.config.use_stripe {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "Stripe service is disabled.".to_string(),
        ));
    }

    let Some(stripe_config) = state.config.stripe.as_ref() else {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Stripe configuration not loaded.".to_string(),
        ));
    };

    match create_checkout_session(stripe_config, payload).await {
        Ok(response) => Ok(Json(response)),
        Err(StripeError::ConfigError) => {
            error!("Stripe configuration error.");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Stripe configuration error on server.".to_string(),
            ))
        }
        Err(StripeError::InvalidPrice(msg)) => {
            error!("Stripe checkout price error: {}", msg);
            Err((StatusCode::BAD_REQUEST, msg))
        }
        Err(StripeError::RequestError(e)) => {
            error!("Stripe Reqwest Error: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to communicate with payment provider.".to_string(),
            ))
        }
        Err(StripeError::ParseError(e)) => {
            error!("Stripe Parse Error: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to understand payment provider response.".to_string(),
            ))
        }
        Err(StripeError::ApiError {
            status_code,
            message,
        }) => {
            error!("Stripe API Error ({}): {}", status_code, message);
            Err((
                StatusCode::from_u16(status_code).unwrap_or(StatusCode::BAD_GATEWAY),
                message,
            ))
        }
        Err(e) => {
            error!("Unexpected error creating checkout session: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unexpected server error".to_string(),
            ))
        }
    }
}

/// Axum handler for the payment provider's server-to-server webhook.
///
/// Response contract: 200 "received" for any event not requiring action and
/// for applied/duplicate bookings, 400 on signature or payload failure (the
/// provider must not retry), 500 on transient store failure (the provider
/// retries; safe because the booking transition is idempotent).
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/payment-webhook", // Path relative to /api
    responses(
        (status = 200, description = "Webhook received and acknowledged"),
        (status = 400, description = "Bad Request (e.g., invalid signature, bad payload)"),
        (status = 500, description = "Transient failure; provider should retry")
    ),
    tag = "Stripe Webhooks"
))]
pub async fn stripe_webhook_handler(
    State(state): State<Arc<StripeState>>,
    headers: HeaderMap,
    body: String, // Raw body for signature verification
) -> Response {
    info!("Received Stripe webhook...");

    if !state.config.use_stripe {
        return (StatusCode::SERVICE_UNAVAILABLE, "Stripe service disabled.").into_response();
    }

    // --- Verify Signature ---
    let webhook_secret = match std::env::var("STRIPE_WEBHOOK_SECRET") {
        Ok(s) => s,
        Err(_) => {
            error!("STRIPE_WEBHOOK_SECRET environment variable not set!");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let sig_header = headers
        .get("Stripe-Signature")
        .and_then(|h| h.to_str().ok());

    if let Err(e) = verify_stripe_signature(body.as_bytes(), sig_header, &webhook_secret) {
        error!("Stripe webhook signature verification failed: {}", e);
        return (StatusCode::BAD_REQUEST, format!("Invalid signature: {}", e)).into_response();
    }

    // --- Process Payload ---
    // Deserialize the raw body into StripeEvent AFTER signature verification
    let event: StripeEvent = match serde_json::from_str(&body) {
        Ok(ev) => ev,
        Err(e) => {
            error!("Failed to deserialize Stripe webhook event: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid payload format".to_string()).into_response();
        }
    };

    match process_stripe_webhook(event, state.appointments.as_ref(), state.notifier.clone()).await
    {
        Ok(outcome) => {
            info!("Stripe webhook processed: {:?}", outcome);
            (StatusCode::OK, "received").into_response()
        }
        Err(e) => {
            error!("Error processing Stripe webhook: {}", e);
            let status =
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, format!("Webhook processing error: {}", e)).into_response()
        }
    }
}

// --- Redirect Handlers (Client-Side) ---
// These are the success_url and cancel_url we give to Stripe.

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams, ToSchema))]
pub struct StripeRedirectQuery {
    // Stripe appends the checkout session ID to the success URL
    // e.g., ?session_id={CHECKOUT_SESSION_ID}
    #[cfg_attr(feature = "openapi", param(example = "cs_test_a1..."))]
    pub session_id: Option<String>,
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/checkout/success", // Path relative to /api
    params(StripeRedirectQuery),
    responses((status = 200, description = "Checkout success page", content_type = "text/html")),
    tag = "Stripe Redirects"
))]
pub async fn stripe_checkout_success_handler(
    Query(params): Query<StripeRedirectQuery>,
) -> Html<&'static str> {
    info!(
        "User redirected to Stripe success URL. Session ID: {:?}",
        params.session_id
    );
    Html("<h1>Payment Successful!</h1><p>Thank you for your payment. Your appointment will be confirmed shortly.</p><a href='/'>Back to Home</a>")
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/checkout/cancel", // Path relative to /api
    params(StripeRedirectQuery),
    responses((status = 200, description = "Checkout cancellation page", content_type = "text/html")),
    tag = "Stripe Redirects"
))]
pub async fn stripe_checkout_cancel_handler(
    Query(params): Query<StripeRedirectQuery>,
) -> Html<&'static str> {
    info!(
        "User redirected to Stripe cancel URL. Session ID: {:?}",
        params.session_id
    );
    Html("<h1>Payment Cancelled</h1><p>Your payment process was cancelled. You have not been charged and your appointment is still awaiting payment.</p><a href='/'>Back to Home</a>")
}
