// --- File: crates/mentorlink_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

// --- Database Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String, // e.g., DATABASE_URL loaded via APP_DATABASE__URL
}

// --- Stripe Config ---
// Holds non-secret Stripe config. Secrets loaded directly from env vars:
// STRIPE_SECRET_KEY, STRIPE_WEBHOOK_SECRET
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StripeConfig {
    pub success_url: String, // Mandatory
    pub cancel_url: String,  // Mandatory
    /// Pre-created Stripe price id; when absent, `unit_amount`/`currency` drive
    /// inline price_data.
    pub price_id: Option<String>,
    pub currency: Option<String>,
    pub unit_amount: Option<i64>,
    pub product_name: Option<String>,
}

// --- Notification Config ---
// Holds non-secret notification config. API key loaded directly from env var:
// RESEND_API_KEY
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NotifyConfig {
    pub from_address: String, // Mandatory
    pub api_url: Option<String>,
}

// --- Scheduling Config ---
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SchedulingConfig {
    /// Slot granularity in minutes; appointments are offered on this grid.
    pub granularity_minutes: Option<u32>,
}

// --- Unified App Configuration ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    // Server config is mandatory
    pub server: ServerConfig,

    // --- Runtime Flags (optional in config file, default to false) ---
    #[serde(default)]
    pub use_stripe: bool,
    #[serde(default)]
    pub use_notify: bool,

    // --- Optional Feature Configurations ---
    #[serde(default)]
    pub database: Option<DatabaseConfig>, // Central DB config
    #[serde(default)]
    pub stripe: Option<StripeConfig>,
    #[serde(default)]
    pub notify: Option<NotifyConfig>,
    #[serde(default)]
    pub scheduling: Option<SchedulingConfig>,
}
