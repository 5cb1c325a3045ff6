//! Inbound payment event contract.

use serde::{Deserialize, Serialize};

use keel_shared::types::Money;

/// Provider-reported payment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Funds captured; post the payment application.
    Succeeded,
    /// Attempt failed; record only.
    Failed,
    /// Still settling; record only.
    Pending,
}

/// One payment notification as delivered by a provider.
///
/// `(provider, external_id)` is the delivery identity: providers retry with
/// the same pair, so everything downstream dedups on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// Payment provider name (e.g. `stripe`).
    pub provider: String,
    /// Provider-side event identifier, stable across redeliveries.
    pub external_id: String,
    /// Reported payment state.
    pub status: PaymentStatus,
    /// Payment amount.
    pub amount: Money,
    /// Raw provider payload kept for audit.
    pub metadata: serde_json::Value,
}

impl PaymentEvent {
    /// The dedup key for this delivery.
    #[must_use]
    pub fn key(&self) -> EventKey {
        EventKey {
            provider: self.provider.clone(),
            external_id: self.external_id.clone(),
        }
    }
}

/// `(provider, external_id)` pair identifying one logical event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventKey {
    /// Payment provider name.
    pub provider: String,
    /// Provider-side event identifier.
    pub external_id: String,
}

impl std::fmt::Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.provider, self.external_id)
    }
}
