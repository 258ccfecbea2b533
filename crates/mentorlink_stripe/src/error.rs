// --- File: crates/mentorlink_stripe/src/error.rs ---
use mentorlink_common::{external_service_error, HttpStatusCode, MentorLinkError};
use mentorlink_db::DbError;
use thiserror::Error;

/// Stripe-specific error types.
#[derive(Error, Debug)]
pub enum StripeError {
    /// Error occurred during a Stripe API request
    #[error("Stripe API request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Error returned by the Stripe API
    #[error("Stripe API returned an error: {message} (Status: {status_code})")]
    ApiError { status_code: u16, message: String },

    /// Error parsing Stripe API response
    #[error("Failed to parse Stripe API response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Missing or incomplete Stripe configuration
    #[error("Stripe configuration missing or incomplete")]
    ConfigError,

    /// Webhook signature verification failed
    #[error("Stripe webhook signature verification failed: {0}")]
    WebhookSignatureError(String),

    /// Webhook event processing error
    #[error("Stripe webhook event processing error: {0}")]
    WebhookProcessingError(String),

    /// Webhook metadata carried no appointment reference
    #[error("Missing appointment reference in webhook metadata")]
    MissingAppointmentReference,

    /// The checkout request resolved to no usable price
    #[error("Invalid price for checkout session: {0}")]
    InvalidPrice(String),

    /// The appointment is not in a bookable state yet; safe for the provider
    /// to retry because the booking transition is idempotent
    #[error("Appointment not ready for booking: {0}")]
    AppointmentNotReady(String),

    /// Appointment store failure; safe for the provider to retry
    #[error("Appointment store error: {0}")]
    StoreError(#[from] DbError),

    /// Internal processing error
    #[error("Internal processing error: {0}")]
    InternalError(String),
}

/// Convert StripeError to MentorLinkError
impl From<StripeError> for MentorLinkError {
    fn from(err: StripeError) -> Self {
        match err {
            StripeError::RequestError(e) => {
                MentorLinkError::HttpError(format!("Stripe request error: {}", e))
            }
            StripeError::ApiError {
                status_code,
                message,
            } => external_service_error(
                "Stripe API",
                format!("Status: {}, Message: {}", status_code, message),
            ),
            StripeError::ParseError(e) => {
                MentorLinkError::ParseError(format!("Stripe response parse error: {}", e))
            }
            StripeError::ConfigError => {
                MentorLinkError::ConfigError("Stripe configuration missing or incomplete".to_string())
            }
            StripeError::WebhookSignatureError(msg) => {
                MentorLinkError::AuthError(format!("Stripe webhook signature error: {}", msg))
            }
            StripeError::WebhookProcessingError(msg) => {
                MentorLinkError::ValidationError(format!("Stripe webhook processing error: {}", msg))
            }
            StripeError::MissingAppointmentReference => MentorLinkError::ValidationError(
                "Missing appointment reference in webhook metadata".to_string(),
            ),
            StripeError::InvalidPrice(msg) => {
                MentorLinkError::ValidationError(format!("Invalid checkout price: {}", msg))
            }
            StripeError::AppointmentNotReady(msg) => MentorLinkError::ConflictError(msg),
            StripeError::StoreError(e) => MentorLinkError::DatabaseError(e.to_string()),
            StripeError::InternalError(msg) => {
                MentorLinkError::InternalError(format!("Stripe internal error: {}", msg))
            }
        }
    }
}

/// Implement HttpStatusCode for StripeError to provide a consistent way to
/// convert StripeError to HTTP status codes.
///
/// Signature and malformed-payload failures are 400 (the provider must not
/// retry); store and not-ready failures are 500 so the provider's retry
/// mechanism redelivers — safe because the booking transition is idempotent.
impl HttpStatusCode for StripeError {
    fn status_code(&self) -> u16 {
        match self {
            StripeError::RequestError(_) => 500,
            StripeError::ApiError { status_code, .. } => *status_code,
            StripeError::ParseError(_) => 400,
            StripeError::ConfigError => 500,
            StripeError::WebhookSignatureError(_) => 400,
            StripeError::WebhookProcessingError(_) => 400,
            StripeError::MissingAppointmentReference => 400,
            StripeError::InvalidPrice(_) => 400,
            StripeError::AppointmentNotReady(_) => 500,
            StripeError::StoreError(_) => 500,
            StripeError::InternalError(_) => 500,
        }
    }
}
