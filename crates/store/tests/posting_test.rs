//! Full-stack posting integration: service, fiscal calendar, and cascade
//! all running against one `MemoryStore`.

use std::sync::Arc;

use chrono::NaiveDate;
use rstest::rstest;
use rust_decimal_macros::dec;

use keel_core::fiscal::{FiscalCalendar, LedgerModule};
use keel_core::ledger::{
    AccountRecord, CreateTransactionInput, EntrySide, LedgerError, LedgerPostingService,
    LineInput, SegmentDefinition, SegmentSchema, TransactionKind, TransactionStatus,
};
use keel_shared::types::{Money, UserId};
use keel_store::MemoryStore;

struct Fixture {
    store: Arc<MemoryStore>,
    service: LedgerPostingService,
    cash: AccountRecord,
    revenue: AccountRecord,
}

fn fixture() -> Fixture {
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
    ])
    .unwrap();
    schema.add_value(1, "10").unwrap();
    schema.add_value(2, "705").unwrap();
    schema.add_value(3, "1105").unwrap();
    schema.add_value(3, "4000").unwrap();

    let store = Arc::new(MemoryStore::new());
    let calendar =
        FiscalCalendar::monthly_year(2026, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()).unwrap();
    let service =
        LedgerPostingService::new(store.clone(), store.clone(), calendar, schema).unwrap();
    let cash = service
        .register_account(&["10", "705", "1105"], "Cash", true)
        .unwrap();
    let revenue = service
        .register_account(&["10", "705", "4000"], "Revenue", true)
        .unwrap();
    Fixture {
        store,
        service,
        cash,
        revenue,
    }
}

fn sale(f: &Fixture, amount: Money) -> CreateTransactionInput {
    CreateTransactionInput {
        kind: TransactionKind::Manual,
        fiscal_date: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
        description: "Cash sale".to_string(),
        customer_id: None,
        vendor_id: None,
        lines: vec![
            LineInput {
                account: f.cash.code.clone(),
                side: EntrySide::Debit,
                amount,
                description: None,
            },
            LineInput {
                account: f.revenue.code.clone(),
                side: EntrySide::Credit,
                amount,
                description: None,
            },
        ],
        created_by: UserId::new(),
    }
}

#[test]
fn posting_updates_account_balances_through_the_cascade() {
    let f = fixture();
    let outcome = f
        .service
        .post_transaction(sale(&f, Money::new(dec!(49.50))))
        .unwrap();

    assert_eq!(outcome.transaction.header.status, TransactionStatus::Posted);
    assert_eq!(f.store.account_balance(f.cash.id), Money::new(dec!(49.50)));
    assert_eq!(
        f.store.account_balance(f.revenue.id),
        Money::new(dec!(-49.50))
    );
    assert!(f.service.verify_balances().unwrap().is_empty());
}

#[test]
fn posting_accumulates_across_transactions() {
    let f = fixture();
    for amount in [dec!(25.50), dec!(15.75), dec!(8.25)] {
        f.service.post_transaction(sale(&f, Money::new(amount))).unwrap();
    }
    assert_eq!(f.store.account_balance(f.cash.id), Money::new(dec!(49.50)));
}

#[test]
fn closed_period_posting_persists_nothing() {
    let f = fixture();
    f.service
        .close_period(2026, 3, LedgerModule::GeneralLedger)
        .unwrap();

    let err = f
        .service
        .post_transaction(sale(&f, Money::new(dec!(100))))
        .unwrap_err();
    assert!(matches!(err, LedgerError::PeriodClosed { .. }));

    assert_eq!(f.store.transaction_count(), 0);
    assert!(f.store.account_balance(f.cash.id).is_zero());

    // The consumed number is a permanent gap.
    let next = f.service.post_transaction({
        let mut input = sale(&f, Money::new(dec!(100)));
        input.kind = TransactionKind::Bank;
        input
    });
    assert_eq!(next.unwrap().transaction.header.number, 2);
}

#[rstest]
#[case(TransactionKind::Manual, LedgerModule::GeneralLedger)]
#[case(TransactionKind::Bank, LedgerModule::Bank)]
#[case(TransactionKind::Receivable, LedgerModule::Receivables)]
#[case(TransactionKind::Payable, LedgerModule::Payables)]
fn each_kind_is_gated_by_its_own_module_flag(
    #[case] kind: TransactionKind,
    #[case] module: LedgerModule,
) {
    let f = fixture();
    f.service.close_period(2026, 3, module).unwrap();

    let mut input = sale(&f, Money::new(dec!(5)));
    input.kind = kind;
    let err = f.service.post_transaction(input).unwrap_err();
    assert!(matches!(err, LedgerError::PeriodClosed { .. }));

    // Every other module flag is untouched and still posts.
    for other in [
        TransactionKind::Manual,
        TransactionKind::Bank,
        TransactionKind::Receivable,
        TransactionKind::Payable,
    ] {
        if other == kind {
            continue;
        }
        let mut input = sale(&f, Money::new(dec!(5)));
        input.kind = other;
        f.service.post_transaction(input).unwrap();
    }
}

#[test]
fn draft_does_not_touch_balances_until_posted() {
    let f = fixture();
    let draft = f
        .service
        .create_draft(sale(&f, Money::new(dec!(75))))
        .unwrap();
    assert!(f.store.account_balance(f.cash.id).is_zero());
    assert_eq!(f.store.transaction_count(), 1);

    f.service.post_draft(draft.header.id, UserId::new()).unwrap();
    assert_eq!(f.store.account_balance(f.cash.id), Money::new(dec!(75)));
}

#[test]
fn reversal_offsets_the_original_and_keeps_both() {
    let f = fixture();
    let outcome = f
        .service
        .post_transaction(sale(&f, Money::new(dec!(120.00001))))
        .unwrap();

    f.service
        .reverse_transaction(
            outcome.transaction.header.id,
            "duplicate entry",
            NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            UserId::new(),
        )
        .unwrap();

    assert!(f.store.account_balance(f.cash.id).is_zero());
    assert!(f.store.account_balance(f.revenue.id).is_zero());
    assert_eq!(f.store.transaction_count(), 2);
    assert!(f.service.verify_balances().unwrap().is_empty());
}

#[test]
fn reversal_into_closed_period_is_rejected() {
    let f = fixture();
    let outcome = f
        .service
        .post_transaction(sale(&f, Money::new(dec!(10))))
        .unwrap();
    f.service
        .close_period(2026, 4, LedgerModule::GeneralLedger)
        .unwrap();

    let err = f
        .service
        .reverse_transaction(
            outcome.transaction.header.id,
            "too late",
            NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            UserId::new(),
        )
        .unwrap_err();
    assert!(matches!(err, LedgerError::PeriodClosed { .. }));
    assert_eq!(f.store.account_balance(f.cash.id), Money::new(dec!(10)));
}
