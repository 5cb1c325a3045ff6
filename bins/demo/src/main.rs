//! End-to-end walkthrough of the Keel posting stack.
//!
//! Wires the in-memory store, fiscal calendar, segment schema, posting
//! service, and webhook gate together, then posts, reverses, and verifies
//! a few transactions.
//!
//! Usage: cargo run --bin demo

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keel_core::fiscal::{FiscalCalendar, LedgerModule};
use keel_core::ledger::{
    CreateTransactionInput, EntrySide, LedgerPostingService, LineInput, SegmentDefinition,
    SegmentSchema, TransactionKind,
};
use keel_core::webhook::{
    PaymentEvent, PaymentPostingConfig, PaymentStatus, PaymentWebhookGate,
};
use keel_shared::types::{Money, UserId};
use keel_shared::AppConfig;
use keel_store::MemoryStore;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keel=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;
    let store = Arc::new(MemoryStore::from_config(&config.ledger));

    let mut schema = SegmentSchema::new(vec![
        SegmentDefinition {
            position: 1,
            length: 2,
            name: "company".to_string(),
        },
        SegmentDefinition {
            position: 2,
            length: 3,
            name: "department".to_string(),
        },
        SegmentDefinition {
            position: 3,
            length: 4,
            name: "natural account".to_string(),
        },
    ])?;
    schema.add_value(1, "10")?;
    schema.add_value(2, "705")?;
    for natural in ["1105", "1200", "4000"] {
        schema.add_value(3, natural)?;
    }

    let calendar = FiscalCalendar::monthly_year(
        2026,
        NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
    )?;

    let service = Arc::new(LedgerPostingService::new(
        store.clone(),
        store.clone(),
        calendar,
        schema,
    )?);

    let cash = service.register_account(&["10", "705", "1105"], "Cash", true)?;
    let receivables =
        service.register_account(&["10", "705", "1200"], "Accounts Receivable", false)?;
    let revenue = service.register_account(&["10", "705", "4000"], "Revenue", true)?;
    info!(cash = %cash.code, receivables = %receivables.code, revenue = %revenue.code, "Chart of accounts ready");

    let user = UserId::new();
    let march = NaiveDate::from_ymd_opt(2026, 3, 15).expect("valid date");

    // Invoice a customer: debit receivables, credit revenue.
    let invoice = service.post_transaction(CreateTransactionInput {
        kind: TransactionKind::Receivable,
        fiscal_date: march,
        description: "Invoice INV-42".to_string(),
        customer_id: None,
        vendor_id: None,
        lines: vec![
            LineInput {
                account: receivables.code.clone(),
                side: EntrySide::Debit,
                amount: Money::new(dec!(49.50)),
                description: None,
            },
            LineInput {
                account: revenue.code.clone(),
                side: EntrySide::Credit,
                amount: Money::new(dec!(49.50)),
                description: None,
            },
        ],
        created_by: user,
    })?;
    info!(
        number = invoice.transaction.header.number,
        receivables = %store.account_balance(receivables.id),
        revenue = %store.account_balance(revenue.id),
        "Invoice posted"
    );

    // The customer pays via a provider webhook; a redelivery is a no-op.
    let gate = PaymentWebhookGate::new(
        store.clone(),
        service.clone(),
        PaymentPostingConfig {
            deposit_account: cash.code.clone(),
            receivables_account: receivables.code.clone(),
            posting_user: user,
        },
        Duration::from_secs(config.webhook.lock_ttl_secs),
    );
    let event = PaymentEvent {
        provider: "stripe".to_string(),
        external_id: "evt_inv42".to_string(),
        status: PaymentStatus::Succeeded,
        amount: Money::new(dec!(49.50)),
        metadata: serde_json::json!({ "invoice": "INV-42" }),
    };
    let first = gate.handle(&event, march)?;
    let replay = gate.handle(&event, march)?;
    info!(?first, ?replay, cash = %store.account_balance(cash.id), "Payment handled");

    // A mistaken manual entry, posted then reversed.
    let mistake = service.post_manual_transaction(CreateTransactionInput {
        kind: TransactionKind::Manual,
        fiscal_date: march,
        description: "Fat-fingered adjustment".to_string(),
        customer_id: None,
        vendor_id: None,
        lines: vec![
            LineInput {
                account: cash.code.clone(),
                side: EntrySide::Debit,
                amount: Money::new(dec!(1000)),
                description: None,
            },
            LineInput {
                account: revenue.code.clone(),
                side: EntrySide::Credit,
                amount: Money::new(dec!(1000)),
                description: None,
            },
        ],
        created_by: user,
    })?;
    let reversal = service.reverse_transaction(
        mistake.transaction.header.id,
        "entered in error",
        NaiveDate::from_ymd_opt(2026, 4, 1).expect("valid date"),
        user,
    )?;
    info!(
        reversed = %mistake.transaction.header.id,
        by = %reversal.transaction.header.id,
        cash = %store.account_balance(cash.id),
        "Mistake reversed"
    );

    // Closing March for the GL blocks further manual entries there.
    service.close_period(2026, 3, LedgerModule::GeneralLedger)?;

    let discrepancies = service.verify_balances()?;
    info!(count = discrepancies.len(), "Balance verification complete");

    Ok(())
}
