//! Property tests over the whole ledger.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use strata_shared::types::{AccountId, LedgerScopeId, UserId};

use crate::chart::{AccountType, CreateAccountInput, Nature};
use crate::journal::{EntryInput, OpenTransactionInput};
use crate::ledger::GeneralLedger;

fn account(code: &str, account_type: AccountType, postable: bool) -> CreateAccountInput {
    CreateAccountInput {
        code: code.to_string(),
        name: format!("Account {code}"),
        account_type,
        nature: None,
        parent_code: None,
        accepts_posting: postable,
        requires_third_party: false,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Amounts as cents, kept positive and modest.
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1u64..=10_000_000).prop_map(|cents| Decimal::new(i64::try_from(cents).unwrap_or(1), 2))
}

struct Fixture {
    ledger: GeneralLedger,
    scope: LedgerScopeId,
    postables: Vec<AccountId>,
}

/// A small chart: one aggregate asset group with two leaves, plus
/// income and expense leaves.
fn fixture() -> Fixture {
    let mut ledger = GeneralLedger::new();
    let scope = LedgerScopeId::new();
    ledger
        .create_account(scope, account("11", AccountType::Asset, false))
        .unwrap();
    let cash = ledger
        .create_account(scope, account("1105", AccountType::Asset, true))
        .unwrap();
    let bank = ledger
        .create_account(scope, account("1110", AccountType::Asset, true))
        .unwrap();
    let fees = ledger
        .create_account(scope, account("4105", AccountType::Income, true))
        .unwrap();
    let upkeep = ledger
        .create_account(scope, account("5105", AccountType::Expense, true))
        .unwrap();
    Fixture {
        ledger,
        scope,
        postables: vec![cash, bank, fees, upkeep],
    }
}

fn post_pair(fx: &mut Fixture, debit_idx: usize, credit_idx: usize, amount: Decimal) {
    let debit = fx.postables[debit_idx % fx.postables.len()];
    let credit = fx.postables[credit_idx % fx.postables.len()];
    let txn = fx.ledger.open_transaction(
        fx.scope,
        OpenTransactionInput {
            date: date(2025, 3, 15),
            description: "prop".to_string(),
            source: None,
            apartment: None,
            created_by: UserId::new(),
        },
    );
    fx.ledger
        .add_entry(txn, EntryInput::debit(debit, amount))
        .unwrap();
    fx.ledger
        .add_entry(txn, EntryInput::credit(credit, amount))
        .unwrap();
    fx.ledger.post(txn).unwrap();
}

/// Converts a nature-signed balance back to raw debit-minus-credit.
fn raw_of(fx: &Fixture, id: AccountId, as_of: NaiveDate) -> Decimal {
    let balance = fx.ledger.balance_of(id, as_of).unwrap();
    match fx.ledger.account(id).unwrap().nature {
        Nature::Debit => balance,
        Nature::Credit => -balance,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Total debits always equal total credits, whatever gets posted.
    #[test]
    fn prop_trial_balance_nets_to_zero(
        moves in prop::collection::vec(
            (0usize..4, 0usize..4, amount_strategy()),
            1..20,
        )
    ) {
        let mut fx = fixture();
        for (debit_idx, credit_idx, amount) in moves {
            post_pair(&mut fx, debit_idx, credit_idx, amount);
        }
        let as_of = date(2025, 12, 31);
        let total: Decimal = fx
            .ledger
            .trial_balance(fx.scope, as_of)
            .unwrap()
            .into_iter()
            .map(|(id, _)| raw_of(&fx, id, as_of))
            .sum();
        prop_assert_eq!(total, Decimal::ZERO);
    }

    /// A parent's balance is exactly the sum of its children's.
    #[test]
    fn prop_parent_sums_children(
        moves in prop::collection::vec(
            (0usize..4, 0usize..4, amount_strategy()),
            1..20,
        )
    ) {
        let mut fx = fixture();
        for (debit_idx, credit_idx, amount) in moves {
            post_pair(&mut fx, debit_idx, credit_idx, amount);
        }
        let as_of = date(2025, 12, 31);
        let group = fx.ledger.find_account(fx.scope, "11").unwrap().id;
        let cash = fx.postables[0];
        let bank = fx.postables[1];
        let expected = fx.ledger.balance_of(cash, as_of).unwrap()
            + fx.ledger.balance_of(bank, as_of).unwrap();
        prop_assert_eq!(fx.ledger.balance_of(group, as_of).unwrap(), expected);
    }

    /// Reversing every posted transaction returns all balances to zero.
    #[test]
    fn prop_reversal_restores_zero(
        moves in prop::collection::vec(
            (0usize..4, 0usize..4, amount_strategy()),
            1..12,
        )
    ) {
        let mut fx = fixture();
        let mut posted = Vec::new();
        for (debit_idx, credit_idx, amount) in moves {
            let debit = fx.postables[debit_idx % fx.postables.len()];
            let credit = fx.postables[credit_idx % fx.postables.len()];
            let txn = fx.ledger.open_transaction(
                fx.scope,
                OpenTransactionInput {
                    date: date(2025, 3, 15),
                    description: "prop".to_string(),
                    source: None,
                    apartment: None,
                    created_by: UserId::new(),
                },
            );
            fx.ledger.add_entry(txn, EntryInput::debit(debit, amount)).unwrap();
            fx.ledger.add_entry(txn, EntryInput::credit(credit, amount)).unwrap();
            fx.ledger.post(txn).unwrap();
            posted.push(txn);
        }
        for txn in posted {
            fx.ledger.reverse(txn, None, UserId::new()).unwrap();
        }
        let as_of = date(2025, 12, 31);
        for &id in &fx.postables {
            prop_assert_eq!(fx.ledger.balance_of(id, as_of).unwrap(), Decimal::ZERO);
        }
        prop_assert!(fx.ledger.trial_balance(fx.scope, as_of).unwrap().is_empty());
    }

    /// Reading balances is pure: repeating the same queries with no
    /// postings in between returns identical results.
    #[test]
    fn prop_balance_queries_are_idempotent(
        moves in prop::collection::vec(
            (0usize..4, 0usize..4, amount_strategy()),
            1..20,
        )
    ) {
        let mut fx = fixture();
        for (debit_idx, credit_idx, amount) in moves {
            post_pair(&mut fx, debit_idx, credit_idx, amount);
        }
        let as_of = date(2025, 12, 31);
        for &id in &fx.postables {
            let first = fx.ledger.balance_of(id, as_of).unwrap();
            let second = fx.ledger.balance_of(id, as_of).unwrap();
            prop_assert_eq!(first, second);
        }
        let first = fx.ledger.trial_balance(fx.scope, as_of).unwrap();
        let second = fx.ledger.trial_balance(fx.scope, as_of).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Posting a transaction whose sides differ always fails and never
    /// moves a balance.
    #[test]
    fn prop_unbalanced_never_posts(
        debit_amount in amount_strategy(),
        delta in amount_strategy(),
    ) {
        let mut fx = fixture();
        let txn = fx.ledger.open_transaction(
            fx.scope,
            OpenTransactionInput {
                date: date(2025, 3, 15),
                description: "prop".to_string(),
                source: None,
                apartment: None,
                created_by: UserId::new(),
            },
        );
        fx.ledger
            .add_entry(txn, EntryInput::debit(fx.postables[0], debit_amount))
            .unwrap();
        fx.ledger
            .add_entry(txn, EntryInput::credit(fx.postables[2], debit_amount + delta))
            .unwrap();
        prop_assert!(fx.ledger.post(txn).is_err());
        let as_of = date(2025, 12, 31);
        prop_assert_eq!(
            fx.ledger.balance_of(fx.postables[0], as_of).unwrap(),
            Decimal::ZERO
        );
    }
}
