//! HTTP API handlers

pub mod billing;
pub mod documents;
pub mod feedback;
pub mod health;

pub use billing::{billing_webhook, create_checkout_session};
pub use documents::{entitlement_probe, get_document, list_history, submit_document};
pub use feedback::submit_feedback;
pub use health::health;
