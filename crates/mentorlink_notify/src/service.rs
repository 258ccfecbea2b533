// --- File: crates/mentorlink_notify/src/service.rs ---
//! Email notification adapter.
//!
//! Thin wrapper around a Resend-style transactional email API. Callers treat
//! delivery as best effort: the dispatchers spawn the send and only log a
//! failure, so this service never participates in appointment state.

use mentorlink_common::services::{BoxedError, NotificationResult, NotificationService};
use mentorlink_common::HTTP_CLIENT;
use mentorlink_config::AppConfig;
use serde::Deserialize;
use serde_json::json;
use std::env;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_API_URL: &str = "https://api.resend.com/emails";

/// Notification-specific error types.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Error occurred during an email API request
    #[error("Email API request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Error returned by the email API
    #[error("Email API returned an error: {message} (Status: {status_code})")]
    ApiError { status_code: u16, message: String },

    /// Missing or incomplete notification configuration
    #[error("Notification configuration missing or incomplete")]
    ConfigError,
}

#[derive(Deserialize, Debug)]
struct SendEmailApiResponse {
    id: Option<String>,
}

/// Email notification service implementation backed by an HTTP email API.
///
/// The API key is read from the RESEND_API_KEY environment variable; the
/// sender address and an optional API URL override come from the config.
pub struct EmailNotificationService {
    config: Arc<AppConfig>,
}

impl EmailNotificationService {
    /// Create a new email notification service
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }

    async fn send(
        &self,
        to: String,
        subject: String,
        body: String,
        is_html: bool,
    ) -> Result<NotificationResult, NotifyError> {
        let notify_config = self.config.notify.as_ref().ok_or(NotifyError::ConfigError)?;
        let api_key = env::var("RESEND_API_KEY").map_err(|_| NotifyError::ConfigError)?;
        let api_url = notify_config
            .api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let body_field = if is_html { "html" } else { "text" };
        let payload = json!({
            "from": notify_config.from_address,
            "to": to,
            "subject": subject,
            body_field: body,
        });

        debug!("Sending notification email to {}", to);

        let response = HTTP_CLIENT
            .post(&api_url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error from email API".to_string());
            return Err(NotifyError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let parsed: SendEmailApiResponse = response.json().await?;
        info!("Notification email sent to {}", to);
        Ok(NotificationResult {
            id: parsed.id.unwrap_or_default(),
            status: "sent".to_string(),
        })
    }
}

impl NotificationService for EmailNotificationService {
    type Error = BoxedError;

    fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> Pin<Box<dyn Future<Output = Result<NotificationResult, Self::Error>> + Send + '_>> {
        // Clone the values to avoid lifetime issues
        let to = to.to_string();
        let subject = subject.to_string();
        let body = body.to_string();

        Box::pin(async move {
            self.send(to, subject, body, is_html)
                .await
                .map_err(|err| BoxedError(Box::new(err)))
        })
    }
}
