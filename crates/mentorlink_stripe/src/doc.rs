// --- File: crates/mentorlink_stripe/src/doc.rs ---
#![allow(dead_code)]
#![cfg(feature = "openapi")]
use utoipa::OpenApi;

use crate::handlers::StripeRedirectQuery;
use crate::logic::{
    CheckoutAppointment, CreateCheckoutSessionRequest, CreateCheckoutSessionResponse,
    StripeCheckoutSessionObject, StripeCustomerDetails, StripeEvent, StripeEventData,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::create_checkout_session_handler,
        crate::handlers::stripe_webhook_handler,
        crate::handlers::stripe_checkout_success_handler,
        crate::handlers::stripe_checkout_cancel_handler,
    ),
    components(
        schemas(
            CheckoutAppointment,
            CreateCheckoutSessionRequest,
            CreateCheckoutSessionResponse,
            StripeEvent,
            StripeEventData,
            StripeCheckoutSessionObject,
            StripeCustomerDetails,
            StripeRedirectQuery
        )
    ),
    tags(
        (name = "Stripe", description = "Stripe Checkout integration"),
        (name = "Stripe Webhooks", description = "Stripe server-to-server webhooks"),
        (name = "Stripe Redirects", description = "User-facing redirect pages for Stripe Checkout")
    )
)]
pub struct StripeApiDoc;
