//! Idempotent payment-event intake.

pub mod error;
pub mod event;
pub mod gate;
pub mod store;

pub use error::WebhookError;
pub use event::{EventKey, PaymentEvent, PaymentStatus};
pub use gate::{PaymentPostingConfig, PaymentWebhookGate, WebhookOutcome};
pub use store::ProcessedEventStore;
