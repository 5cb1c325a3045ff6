//! Property-based tests for LedgerPostingService.
//!
//! - Property 1: balanced line sets always post, unbalanced never do
//! - Property 2: the sum of all account balances is always zero
//! - Property 3: a reversal exactly negates its original

use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use keel_shared::types::{Money, UserId};

use super::error::LedgerError;
use super::segments::{SegmentDefinition, SegmentSchema};
use super::service::LedgerPostingService;
use super::testing::MemStore;
use super::types::{AccountRecord, CreateTransactionInput, EntrySide, LineInput, TransactionKind};
use crate::fiscal::FiscalCalendar;

/// Strategy to generate positive amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Money> {
    (1i64..1_000_000i64).prop_map(|cents| Money::new(Decimal::new(cents, 2)))
}

/// Strategy to generate up to five debit amounts.
fn debit_amounts() -> impl Strategy<Value = Vec<Money>> {
    prop::collection::vec(positive_amount(), 1..5)
}

struct Fixture {
    store: Arc<MemStore>,
    service: LedgerPostingService,
    expense_accounts: Vec<AccountRecord>,
    offset_account: AccountRecord,
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
            length: 4,
            name: "natural account".to_string(),
        },
    ])
    .unwrap();
    schema.add_value(1, "10").unwrap();
    for natural in ["5000", "5100", "5200", "5300", "5400", "2000"] {
        schema.add_value(2, natural).unwrap();
    }

    let store = Arc::new(MemStore::new());
    let calendar =
        FiscalCalendar::monthly_year(2026, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()).unwrap();
    let service =
        LedgerPostingService::new(store.clone(), store.clone(), calendar, schema).unwrap();

    let expense_accounts = ["5000", "5100", "5200", "5300", "5400"]
        .iter()
        .map(|natural| {
            service
                .register_account(&["10", natural], "Expense", true)
                .unwrap()
        })
        .collect();
    let offset_account = service
        .register_account(&["10", "2000"], "Accrued Liabilities", true)
        .unwrap();
    Fixture {
        store,
        service,
        expense_accounts,
        offset_account,
    }
}

/// Debits spread across the expense accounts, one balancing credit.
fn balanced_input(f: &Fixture, amounts: &[Money]) -> CreateTransactionInput {
    let mut lines: Vec<LineInput> = amounts
        .iter()
        .enumerate()
        .map(|(index, amount)| LineInput {
            account: f.expense_accounts[index % f.expense_accounts.len()]
                .code
                .clone(),
            side: EntrySide::Debit,
            amount: *amount,
            description: None,
        })
        .collect();
    lines.push(LineInput {
        account: f.offset_account.code.clone(),
        side: EntrySide::Credit,
        amount: amounts.iter().copied().sum(),
        description: None,
    });
    CreateTransactionInput {
        kind: TransactionKind::Manual,
        fiscal_date: NaiveDate::from_ymd_opt(2026, 6, 15).unwrap(),
        description: "Generated".to_string(),
        customer_id: None,
        vendor_id: None,
        lines,
        created_by: UserId::new(),
    }
}

fn total_of_all_balances(f: &Fixture) -> Money {
    f.expense_accounts
        .iter()
        .map(|account| f.store.balance_of(account.id))
        .sum::<Money>()
        + f.store.balance_of(f.offset_account.id)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 1: balanced posts, unbalanced never does
    // =========================================================================

    #[test]
    fn prop_balanced_transaction_always_posts(amounts in debit_amounts()) {
        let f = fixture();
        let outcome = f.service.post_transaction(balanced_input(&f, &amounts));
        prop_assert!(outcome.is_ok());
    }

    #[test]
    fn prop_unbalanced_transaction_never_posts(
        amounts in debit_amounts(),
        extra in positive_amount(),
    ) {
        let f = fixture();
        let mut input = balanced_input(&f, &amounts);
        // Skew the credit side so totals cannot match.
        let last = input.lines.last_mut().unwrap();
        last.amount = last.amount + extra;

        let result = f.service.post_transaction(input);
        prop_assert!(
            matches!(result, Err(LedgerError::UnbalancedTransaction { .. })),
            "expected UnbalancedTransaction, got {result:?}",
        );
        // The failed attempt must not have touched any balance.
        prop_assert!(total_of_all_balances(&f).is_zero());
    }

    // =========================================================================
    // Property 2: account balances always net to zero
    // =========================================================================

    #[test]
    fn prop_posted_balances_net_to_zero(
        batches in prop::collection::vec(debit_amounts(), 1..4),
    ) {
        let f = fixture();
        for amounts in &batches {
            f.service.post_transaction(balanced_input(&f, amounts)).unwrap();
        }
        prop_assert!(total_of_all_balances(&f).is_zero());
        prop_assert!(f.service.verify_balances().unwrap().is_empty());
    }

    // =========================================================================
    // Property 3: a reversal exactly negates its original
    // =========================================================================

    #[test]
    fn prop_reversal_exactly_negates(amounts in debit_amounts()) {
        let f = fixture();
        let outcome = f.service.post_transaction(balanced_input(&f, &amounts)).unwrap();

        let reversal = f.service.reverse_transaction(
            outcome.transaction.header.id,
            "generated",
            NaiveDate::from_ymd_opt(2026, 6, 20).unwrap(),
            UserId::new(),
        ).unwrap();

        for (original, mirrored) in outcome
            .transaction
            .lines
            .iter()
            .zip(&reversal.transaction.lines)
        {
            prop_assert_eq!(original.debit, mirrored.credit);
            prop_assert_eq!(original.credit, mirrored.debit);
            prop_assert_eq!(&original.account, &mirrored.account);
        }
        for account in f.expense_accounts.iter().chain([&f.offset_account]) {
            prop_assert!(f.store.balance_of(account.id).is_zero());
        }
    }
}
