//! Durable dedup seam for processed payment events.

use super::error::WebhookError;
use super::event::EventKey;

/// Permanent record of fully handled events.
///
/// The in-flight lock only covers its TTL window; this store is what makes
/// a redelivery hours later still a no-op.
pub trait ProcessedEventStore: Send + Sync {
    /// Returns true if the event was already handled to completion.
    fn already_processed(&self, key: &EventKey) -> Result<bool, WebhookError>;

    /// Records the event as handled. Called only after all effects of the
    /// event have been persisted.
    fn mark_processed(&self, key: &EventKey) -> Result<(), WebhookError>;
}
