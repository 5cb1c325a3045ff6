//! Idempotent payment-event intake.
//!
//! Two layers keep duplicate deliveries from double-posting:
//! 1. a short-lived in-process lock (`moka` TTL cache) so concurrent
//!    deliveries of the same event collapse to one winner, and
//! 2. the durable [`ProcessedEventStore`] so replays after the lock expires
//!    are still recognized.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use moka::sync::Cache;
use tracing::{debug, info, warn};

use keel_shared::types::TransactionId;

use super::error::WebhookError;
use super::event::{EventKey, PaymentEvent, PaymentStatus};
use super::store::ProcessedEventStore;
use crate::ledger::{
    AccountCode, CreateTransactionInput, EntrySide, LedgerPostingService, LineInput,
    TransactionKind,
};

/// Default capacity of the in-flight lock cache.
const DEFAULT_LOCK_CAPACITY: u64 = 10_000;

/// Which accounts a successful payment moves money between.
#[derive(Debug, Clone)]
pub struct PaymentPostingConfig {
    /// Account debited with the received funds.
    pub deposit_account: AccountCode,
    /// Receivables account credited by the payment application.
    pub receivables_account: AccountCode,
    /// User recorded as the creator of webhook-driven transactions.
    pub posting_user: keel_shared::types::UserId,
}

/// What handling one delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A payment application was posted.
    Posted(TransactionId),
    /// The event was recorded but posted nothing (failed/pending payment).
    Recorded,
    /// Another delivery of the same event is being handled right now.
    DuplicateInFlight,
    /// The event was fully handled by an earlier delivery.
    AlreadyProcessed,
}

/// Serializes deliveries per event key and posts successful payments.
pub struct PaymentWebhookGate {
    locks: Cache<EventKey, ()>,
    processed: Arc<dyn ProcessedEventStore>,
    ledger: Arc<LedgerPostingService>,
    posting: PaymentPostingConfig,
}

impl PaymentWebhookGate {
    /// Creates a gate whose in-flight locks expire after `lock_ttl`.
    ///
    /// The TTL bounds how long a crashed handler can block redeliveries of
    /// its event.
    #[must_use]
    pub fn new(
        processed: Arc<dyn ProcessedEventStore>,
        ledger: Arc<LedgerPostingService>,
        posting: PaymentPostingConfig,
        lock_ttl: Duration,
    ) -> Self {
        let locks = Cache::builder()
            .max_capacity(DEFAULT_LOCK_CAPACITY)
            .time_to_live(lock_ttl)
            .build();
        Self {
            locks,
            processed,
            ledger,
            posting,
        }
    }

    /// Handles one delivery, exactly-once per event key.
    ///
    /// Duplicate deliveries return a duplicate outcome, never an error, so
    /// providers see them as successes and stop retrying. A `Pending`
    /// delivery is acknowledged without consuming the key; the terminal
    /// delivery for the same payment still goes through.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::InvalidEvent`] for unusable payloads, or
    /// posting/store failures. On error nothing durable is recorded and the
    /// in-flight lock is released, so redelivery retries the whole event.
    pub fn handle(
        &self,
        event: &PaymentEvent,
        fiscal_date: NaiveDate,
    ) -> Result<WebhookOutcome, WebhookError> {
        let key = event.key();
        if self.processed.already_processed(&key)? {
            debug!(event = %key, "Duplicate delivery of processed event");
            return Ok(WebhookOutcome::AlreadyProcessed);
        }

        // entry().or_insert is atomic per key: exactly one concurrent
        // delivery observes a fresh entry.
        let entry = self.locks.entry(key.clone()).or_insert(());
        if !entry.is_fresh() {
            debug!(event = %key, "Duplicate delivery while event is in flight");
            return Ok(WebhookOutcome::DuplicateInFlight);
        }

        // A previous holder may have finished between the durable check and
        // the lock grab.
        if self.processed.already_processed(&key)? {
            return Ok(WebhookOutcome::AlreadyProcessed);
        }

        match self.process(event, fiscal_date) {
            Ok(outcome) => {
                // Pending is not terminal: the provider will redeliver the
                // same key once the payment settles, and that delivery must
                // still be able to post. Only terminal statuses are marked
                // durably, and the in-flight lock is dropped so a prompt
                // follow-up is not mistaken for a duplicate.
                if event.status == PaymentStatus::Pending {
                    self.locks.invalidate(&key);
                } else {
                    self.processed.mark_processed(&key)?;
                }
                Ok(outcome)
            }
            Err(err) => {
                self.locks.invalidate(&key);
                warn!(event = %key, error = %err, "Payment event handling failed");
                Err(err)
            }
        }
    }

    fn process(
        &self,
        event: &PaymentEvent,
        fiscal_date: NaiveDate,
    ) -> Result<WebhookOutcome, WebhookError> {
        match event.status {
            PaymentStatus::Succeeded => {
                if !event.amount.is_positive() {
                    return Err(WebhookError::InvalidEvent(format!(
                        "succeeded payment with non-positive amount {}",
                        event.amount
                    )));
                }
                let outcome = self.ledger.post_transaction(CreateTransactionInput {
                    kind: TransactionKind::Receivable,
                    fiscal_date,
                    description: format!(
                        "Payment {} via {}",
                        event.external_id, event.provider
                    ),
                    customer_id: None,
                    vendor_id: None,
                    lines: vec![
                        LineInput {
                            account: self.posting.deposit_account.clone(),
                            side: EntrySide::Debit,
                            amount: event.amount,
                            description: None,
                        },
                        LineInput {
                            account: self.posting.receivables_account.clone(),
                            side: EntrySide::Credit,
                            amount: event.amount,
                            description: None,
                        },
                    ],
                    created_by: self.posting.posting_user,
                })?;
                info!(
                    event = %event.key(),
                    transaction_id = %outcome.transaction.header.id,
                    amount = %event.amount,
                    "Payment posted"
                );
                Ok(WebhookOutcome::Posted(outcome.transaction.header.id))
            }
            PaymentStatus::Failed | PaymentStatus::Pending => {
                debug!(event = %event.key(), status = ?event.status, "Payment event recorded");
                Ok(WebhookOutcome::Recorded)
            }
        }
    }
}
