// --- File: crates/mentorlink_stripe/src/logic.rs ---
use hmac::{Hmac, Mac};
use mentorlink_common::services::{BoxedError, NotificationService};
use mentorlink_config::StripeConfig;
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
#[cfg(feature = "openapi")]
use serde_json::json;
use sha2::Sha256;
use std::{
    collections::HashMap,
    env,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{error, info, warn};

// Import the StripeError from the error module
use crate::error::StripeError;

// Import the appointment store and the HTTP client
use mentorlink_common::HTTP_CLIENT;
use mentorlink_db::repositories::appointment::BookOutcome;
use mentorlink_db::AppointmentRepository;

// Conditionally import ToSchema if openapi feature is enabled
#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Replay window for webhook signatures. Events whose signed timestamp is
/// older or newer than this are rejected outright.
pub const WEBHOOK_TOLERANCE_SECONDS: i64 = 300;

// --- Data Structures ---

/// Denormalized appointment snapshot sent to checkout. It is embedded in the
/// session metadata so the webhook can reconcile (and notify) without a
/// secondary lookup even if the primary store is briefly unavailable.
#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CheckoutAppointment {
    #[cfg_attr(feature = "openapi", schema(example = "0a6e7c72-5f2e-4a6e-9f3e-9b1f6f6d2d11"))]
    pub id: String,
    pub mentor_id: String,
    pub mentee_id: String,
    #[cfg_attr(feature = "openapi", schema(example = "2024-06-01"))]
    pub date: String,
    #[cfg_attr(feature = "openapi", schema(example = "16:00"))]
    pub start_time: String,
    pub meeting_url: Option<String>,
    pub mentor_name: Option<String>,
}

/// Request from our frontend to create a Stripe Checkout Session.
#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CreateCheckoutSessionRequest {
    /// Pre-created Stripe price id; falls back to the configured default
    /// price, then to inline price_data from the configured unit amount.
    #[cfg_attr(feature = "openapi", schema(example = "price_1Nxxxx"))]
    pub price_id: Option<String>,
    pub appointment: CheckoutAppointment,
    #[cfg_attr(feature = "openapi", schema(example = "mentee@example.com"))]
    pub customer_email: Option<String>,
}

/// Response to our frontend after creating a Checkout Session.
#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CreateCheckoutSessionResponse {
    #[cfg_attr(
        feature = "openapi",
        schema(example = "https://checkout.stripe.com/pay/cs_test_a1...")
    )]
    pub url: String,
    #[cfg_attr(feature = "openapi", schema(example = "cs_test_a1..."))]
    pub session_id: String,
}

#[allow(dead_code)]
#[derive(Deserialize, Debug)]
struct StripeCheckoutSessionApiResponse {
    // Used for session creation response
    pub id: String,
    pub url: Option<String>,
}

/// Represents the `data` field within a Stripe Event.
#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StripeEventData {
    /// The actual object related to the event, e.g., a Checkout Session.
    /// Using serde_json::Value because the structure of 'object' varies by
    /// event type.
    pub object: serde_json::Value,
}

/// Represents the outer Stripe Event object.
#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StripeEvent {
    pub id: String,
    pub object: String, // "event"
    pub created: i64,   // Unix timestamp
    pub livemode: bool,
    #[serde(rename = "type")]
    pub event_type: String, // e.g., "checkout.session.completed"
    pub data: StripeEventData,
}

/// Specific structure for the `data.object` when event_type is
/// "checkout.session.completed". Only the fields we act on.
#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StripeCheckoutSessionObject {
    pub id: String,     // Checkout Session ID (cs_...)
    pub object: String, // "checkout.session"
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub customer_details: Option<StripeCustomerDetails>,
    pub metadata: Option<HashMap<String, String>>, // Metadata we passed
    pub payment_status: Option<String>, // e.g., "paid", "unpaid", "no_payment_required"
    pub status: Option<String>,         // e.g., "open", "complete", "expired"
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StripeCustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
}

/// What a verified, parsed webhook event resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// First delivery: the appointment transitioned accepted -> booked.
    Booked,
    /// Redelivery: the appointment was already booked; acknowledged as
    /// success without a state change.
    AlreadyBooked,
    /// Event required no action (wrong type, or session not paid).
    Ignored,
}

// --- Webhook Verification ---

/// Verifies the signature of an incoming Stripe webhook request.
///
/// # Arguments
/// * `payload_bytes` - The raw request body bytes.
/// * `sig_header` - The value of the 'Stripe-Signature' header.
/// * `secret` - The webhook signing secret (whsec_...).
///
/// Returns Ok(()) if the signature is valid and inside the replay window,
/// otherwise StripeError::WebhookSignatureError.
pub fn verify_stripe_signature(
    payload_bytes: &[u8],
    sig_header: Option<&str>,
    secret: &str,
) -> Result<(), StripeError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs() as i64;
    verify_stripe_signature_at(payload_bytes, sig_header, secret, now)
}

/// Timestamp-injected variant of [`verify_stripe_signature`]; the public
/// wrapper passes the current time.
pub fn verify_stripe_signature_at(
    payload_bytes: &[u8],
    sig_header: Option<&str>,
    secret: &str,
    now: i64,
) -> Result<(), StripeError> {
    let sig_header_value = sig_header.ok_or_else(|| {
        StripeError::WebhookSignatureError("Missing Stripe-Signature header".to_string())
    })?;

    let mut timestamp_str: Option<&str> = None;
    let mut v1_signatures_hex: Vec<&str> = Vec::new();

    for item in sig_header_value.split(',') {
        let parts: Vec<&str> = item.trim().splitn(2, '=').collect();
        if parts.len() == 2 {
            match parts[0] {
                "t" => timestamp_str = Some(parts[1]),
                "v1" => v1_signatures_hex.push(parts[1]),
                _ => {} // Ignore other parts like v0
            }
        }
    }

    let timestamp_str = timestamp_str.ok_or_else(|| {
        StripeError::WebhookSignatureError("Missing timestamp 't' in Stripe-Signature".to_string())
    })?;
    let parsed_timestamp = timestamp_str.parse::<i64>().map_err(|_| {
        StripeError::WebhookSignatureError(
            "Invalid timestamp format in Stripe-Signature".to_string(),
        )
    })?;

    if v1_signatures_hex.is_empty() {
        return Err(StripeError::WebhookSignatureError(
            "Missing v1 signature in Stripe-Signature".to_string(),
        ));
    }

    // Replays outside the tolerance window are rejected before any
    // signature comparison.
    if (now - parsed_timestamp).abs() > WEBHOOK_TOLERANCE_SECONDS {
        warn!(
            "Stripe signature timestamp outside tolerance. Now: {}, Event: {}",
            now, parsed_timestamp
        );
        return Err(StripeError::WebhookSignatureError(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    // Construct the signed payload string: "{t}.{raw body}"
    let signed_payload_string = format!(
        "{}.{}",
        timestamp_str,
        String::from_utf8_lossy(payload_bytes)
    );

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| {
        StripeError::WebhookSignatureError("Invalid webhook secret format for HMAC".to_string())
    })?;
    mac.update(signed_payload_string.as_bytes());
    let expected_signature_bytes = mac.finalize().into_bytes();
    let calculated_signature_hex = hex::encode(expected_signature_bytes);

    // Iterate through all provided v1 signatures and check for a match
    for provided_sig_hex in v1_signatures_hex {
        if constant_time_eq(
            calculated_signature_hex.as_bytes(),
            provided_sig_hex.as_bytes(),
        ) {
            return Ok(());
        }
    }

    warn!("Stripe signature mismatch; no v1 candidate matched");
    Err(StripeError::WebhookSignatureError(
        "Signature mismatch".to_string(),
    ))
}

/// Helper for constant-time string comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

// --- Webhook Processing Logic ---

/// Processes a verified Stripe webhook event.
///
/// Only "checkout.session.completed" with payment_status "paid" leads to a
/// state change: one conditional accepted -> booked transition keyed by the
/// appointment_id from the session metadata. The transition is idempotent, so
/// redelivered events acknowledge without touching the row, and store or
/// not-ready failures surface as retryable errors.
pub async fn process_stripe_webhook(
    event: StripeEvent,
    appointments: &dyn AppointmentRepository,
    notifier: Option<Arc<dyn NotificationService<Error = BoxedError>>>,
) -> Result<WebhookOutcome, StripeError> {
    info!("Processing Stripe event type: {}", event.event_type);

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: StripeCheckoutSessionObject = serde_json::from_value(event.data.object)
                .map_err(|e| {
                    StripeError::WebhookProcessingError(format!(
                        "Failed to parse checkout session object: {}",
                        e
                    ))
                })?;

            info!(
                "Checkout Session {} completed, payment status: {:?}",
                session.id, session.payment_status
            );

            if session.payment_status.as_deref() != Some("paid") {
                info!(
                    "Checkout session {} completed but not paid; no action taken.",
                    session.id
                );
                return Ok(WebhookOutcome::Ignored);
            }

            let metadata = session.metadata.clone().unwrap_or_default();
            let appointment_id = metadata
                .get("appointment_id")
                .ok_or(StripeError::MissingAppointmentReference)?;

            match appointments.mark_booked(appointment_id, &session.id).await? {
                BookOutcome::Booked(appointment) => {
                    info!(
                        "Appointment {} booked via checkout session {}",
                        appointment.id, session.id
                    );
                    dispatch_booked_notification(notifier, &session, &metadata);
                    Ok(WebhookOutcome::Booked)
                }
                BookOutcome::AlreadyBooked(_) => {
                    info!(
                        "Appointment {} already booked; duplicate delivery of {} acknowledged",
                        appointment_id, session.id
                    );
                    Ok(WebhookOutcome::AlreadyBooked)
                }
                BookOutcome::NotReady(status) => Err(StripeError::AppointmentNotReady(format!(
                    "appointment {} is {}, expected accepted",
                    appointment_id, status
                ))),
                BookOutcome::NotFound => Err(StripeError::AppointmentNotReady(format!(
                    "appointment {} not visible yet",
                    appointment_id
                ))),
            }
        }
        other => {
            info!("Received unhandled Stripe event type: {}", other);
            Ok(WebhookOutcome::Ignored)
        }
    }
}

/// Fire-and-forget booked notification. Built entirely from the metadata
/// snapshot the checkout call embedded, so no store lookups happen here; a
/// failure is logged and never affects the webhook response.
fn dispatch_booked_notification(
    notifier: Option<Arc<dyn NotificationService<Error = BoxedError>>>,
    session: &StripeCheckoutSessionObject,
    metadata: &HashMap<String, String>,
) {
    let Some(notifier) = notifier else {
        return;
    };
    let email = session
        .customer_details
        .as_ref()
        .and_then(|d| d.email.clone())
        .or_else(|| metadata.get("customer_email").cloned());
    let Some(email) = email else {
        return;
    };

    let mentor = metadata
        .get("mentor_name")
        .cloned()
        .unwrap_or_else(|| "your mentor".to_string());
    let date = metadata.get("appointment_date").cloned().unwrap_or_default();
    let time = metadata.get("start_time").cloned().unwrap_or_default();
    let meeting_url = metadata.get("meeting_url").cloned();

    tokio::spawn(async move {
        let subject = "Your appointment is booked.";
        let mut body = format!(
            "<p>Your appointment with {} on {} at {} has been booked.</p>",
            mentor, date, time
        );
        if let Some(url) = meeting_url {
            body.push_str(&format!("<p>Meeting link: <a href=\"{0}\">{0}</a></p>", url));
        }
        if let Err(err) = notifier.send_email(&email, subject, &body, true).await {
            warn!("Failed to send booked notification: {}", err);
        }
    });
}

// --- Checkout Session Creation ---

/// Creates a Stripe Checkout Session for an accepted appointment.
///
/// The appointment id and a denormalized snapshot (mentor name, date, time,
/// meeting link) are stored as session metadata; the provider returns them
/// verbatim on confirmation, which is what the reconciler keys on. Never
/// mutates the appointment.
pub async fn create_checkout_session(
    stripe_config: &StripeConfig,
    request_data: CreateCheckoutSessionRequest,
) -> Result<CreateCheckoutSessionResponse, StripeError> {
    info!(
        "[Stripe Logic] Creating Checkout Session for appointment {}",
        request_data.appointment.id
    );

    let stripe_secret_key = env::var("STRIPE_SECRET_KEY").map_err(|_| StripeError::ConfigError)?;

    let mut form_body: Vec<(String, String)> = vec![
        ("payment_method_types[]".to_string(), "card".to_string()),
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), stripe_config.success_url.clone()),
        ("cancel_url".to_string(), stripe_config.cancel_url.clone()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
    ];

    // --- Determine Price ---
    let price_id = request_data
        .price_id
        .clone()
        .or_else(|| stripe_config.price_id.clone());
    if let Some(price_id) = price_id {
        form_body.push(("line_items[0][price]".to_string(), price_id));
    } else {
        let unit_amount = stripe_config
            .unit_amount
            .ok_or_else(|| StripeError::InvalidPrice("no price_id and no unit_amount configured".to_string()))?;
        if unit_amount <= 0 {
            return Err(StripeError::InvalidPrice(format!(
                "unit_amount must be positive, got {}",
                unit_amount
            )));
        }
        let currency = stripe_config
            .currency
            .clone()
            .unwrap_or_else(|| "usd".to_string())
            .to_lowercase();
        let product_name = stripe_config
            .product_name
            .clone()
            .unwrap_or_else(|| "Mentorship session".to_string());

        form_body.push(("line_items[0][price_data][currency]".to_string(), currency));
        form_body.push((
            "line_items[0][price_data][product_data][name]".to_string(),
            product_name,
        ));
        form_body.push((
            "line_items[0][price_data][unit_amount]".to_string(),
            unit_amount.to_string(),
        ));
    }

    if let Some(email) = &request_data.customer_email {
        form_body.push(("customer_email".to_string(), email.clone()));
    }

    // Store the appointment reference and snapshot in Stripe metadata; the
    // webhook gets these back verbatim.
    let appointment = &request_data.appointment;
    form_body.push((
        "metadata[appointment_id]".to_string(),
        appointment.id.clone(),
    ));
    form_body.push((
        "metadata[mentor_id]".to_string(),
        appointment.mentor_id.clone(),
    ));
    form_body.push((
        "metadata[mentee_id]".to_string(),
        appointment.mentee_id.clone(),
    ));
    form_body.push((
        "metadata[appointment_date]".to_string(),
        appointment.date.clone(),
    ));
    form_body.push((
        "metadata[start_time]".to_string(),
        appointment.start_time.clone(),
    ));
    if let Some(meeting_url) = &appointment.meeting_url {
        form_body.push(("metadata[meeting_url]".to_string(), meeting_url.clone()));
    }
    if let Some(mentor_name) = &appointment.mentor_name {
        form_body.push(("metadata[mentor_name]".to_string(), mentor_name.clone()));
    }
    if let Some(email) = &request_data.customer_email {
        form_body.push(("metadata[customer_email]".to_string(), email.clone()));
    }

    let api_url = "https://api.stripe.com/v1/checkout/sessions";

    info!("[Stripe Logic] Sending request to Stripe API: {}", api_url);

    let response = HTTP_CLIENT
        .post(api_url)
        .basic_auth(stripe_secret_key, None::<&str>)
        .form(&form_body)
        .send()
        .await?;

    let status = response.status();
    let body_text = response.text().await?;

    info!("[Stripe Logic] Stripe API response status: {}", status);

    if status.is_success() {
        let stripe_response: StripeCheckoutSessionApiResponse = serde_json::from_str(&body_text)?;
        if let Some(url) = stripe_response.url {
            info!(
                "[Stripe Logic] Stripe Checkout Session created successfully. URL: {}",
                url
            );
            Ok(CreateCheckoutSessionResponse {
                url,
                session_id: stripe_response.id,
            })
        } else {
            error!(
                "[Stripe Logic] Stripe response missing checkout session URL: {}",
                body_text
            );
            Err(StripeError::InternalError(
                "Stripe response missing checkout URL".to_string(),
            ))
        }
    } else {
        let error_message = match serde_json::from_str::<serde_json::Value>(&body_text) {
            Ok(json_body) => json_body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or(&body_text)
                .to_string(),
            Err(_) => body_text,
        };
        error!(
            "[Stripe Logic] Stripe API request failed with HTTP status: {}. Message: {}",
            status, error_message
        );
        Err(StripeError::ApiError {
            status_code: status.as_u16(),
            message: error_message,
        })
    }
}
