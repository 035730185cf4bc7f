//! The general ledger facade.
//!
//! Owns the chart, the journal and the closure book for a deployment
//! and wires their cross-checks together: entry counts guard account
//! lifecycle changes, completed closures guard posting dates. External
//! callers go through this type; the component services stay usable on
//! their own for finer-grained setups.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use strata_shared::types::{
    AccountId, ClosureId, EntryId, LedgerScopeId, TransactionId, UserId,
};

use crate::balance::BalanceCalculator;
use crate::chart::{Account, AccountRegistry, CreateAccountInput};
use crate::closure::{CloseInput, ClosureBook, PeriodClosure};
use crate::error::LedgerError;
use crate::journal::{EntryInput, Journal, OpenTransactionInput, Transaction};

/// A complete in-memory general ledger.
#[derive(Debug, Default)]
pub struct GeneralLedger {
    registry: AccountRegistry,
    journal: Journal,
    closures: ClosureBook,
}

impl GeneralLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Chart of accounts ==========

    /// Creates an account. See [`AccountRegistry::create_account`].
    pub fn create_account(
        &mut self,
        scope: LedgerScopeId,
        input: CreateAccountInput,
    ) -> Result<AccountId, LedgerError> {
        self.registry.create_account(scope, input)
    }

    /// Seeds a chart of accounts. See [`AccountRegistry::seed`].
    pub fn seed_chart(
        &mut self,
        scope: LedgerScopeId,
        inputs: Vec<CreateAccountInput>,
    ) -> Result<Vec<AccountId>, LedgerError> {
        self.registry.seed(scope, inputs)
    }

    /// Looks up an account by ID.
    pub fn account(&self, id: AccountId) -> Result<&Account, LedgerError> {
        self.registry.get(id)
    }

    /// Looks up an account by code within a scope.
    #[must_use]
    pub fn find_account(&self, scope: LedgerScopeId, code: &str) -> Option<&Account> {
        self.registry.find_by_code(scope, code)
    }

    /// Changes whether an account accepts direct posting, guarded by
    /// its journal entry count.
    pub fn set_postable(&mut self, id: AccountId, postable: bool) -> Result<(), LedgerError> {
        let Self {
            registry, journal, ..
        } = self;
        registry.set_postable(id, postable, |account| journal.entry_count(account))
    }

    /// Deactivates an account, keeping its history.
    pub fn deactivate_account(&mut self, id: AccountId) -> Result<(), LedgerError> {
        self.registry.deactivate(id)
    }

    /// Reactivates a previously deactivated account.
    pub fn reactivate_account(&mut self, id: AccountId) -> Result<(), LedgerError> {
        self.registry.reactivate(id)
    }

    /// Deletes an account that has never been posted to.
    pub fn delete_account(&mut self, id: AccountId) -> Result<(), LedgerError> {
        let Self {
            registry, journal, ..
        } = self;
        registry.delete(id, |account| journal.entry_count(account))
    }

    // ========== Journal ==========

    /// Opens a draft transaction.
    pub fn open_transaction(
        &mut self,
        scope: LedgerScopeId,
        input: OpenTransactionInput,
    ) -> TransactionId {
        self.journal.open(scope, input)
    }

    /// Appends an entry line to a draft.
    pub fn add_entry(
        &mut self,
        transaction: TransactionId,
        input: EntryInput,
    ) -> Result<EntryId, LedgerError> {
        let Self {
            registry, journal, ..
        } = self;
        journal.add_entry(transaction, registry, input)
    }

    /// Posts a draft, checking it against completed period closures.
    pub fn post(&mut self, transaction: TransactionId) -> Result<(), LedgerError> {
        let Self {
            registry,
            journal,
            closures,
        } = self;
        journal.post(transaction, registry, |scope, date| {
            closures.is_closed(scope, date)
        })
    }

    /// Cancels a draft.
    pub fn cancel(&mut self, transaction: TransactionId) -> Result<(), LedgerError> {
        self.journal.cancel(transaction)
    }

    /// Reverses a posted transaction with a mirrored one.
    pub fn reverse(
        &mut self,
        transaction: TransactionId,
        date: Option<NaiveDate>,
        reversed_by: UserId,
    ) -> Result<TransactionId, LedgerError> {
        self.journal.reverse(transaction, date, reversed_by)
    }

    /// Looks up a transaction by ID.
    pub fn transaction(&self, id: TransactionId) -> Result<&Transaction, LedgerError> {
        self.journal.get(id)
    }

    // ========== Balances ==========

    /// Balance of an account as of a date.
    pub fn balance_of(&self, account: AccountId, as_of: NaiveDate) -> Result<Decimal, LedgerError> {
        BalanceCalculator::new(&self.registry, &self.journal).balance_of(account, as_of)
    }

    /// Natural-balance movement of an account within a window.
    pub fn activity_between(
        &self,
        account: AccountId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Decimal, LedgerError> {
        BalanceCalculator::new(&self.registry, &self.journal).activity_between(account, start, end)
    }

    /// Trial balance of a scope as of a date.
    pub fn trial_balance(
        &self,
        scope: LedgerScopeId,
        as_of: NaiveDate,
    ) -> Result<Vec<(AccountId, Decimal)>, LedgerError> {
        BalanceCalculator::new(&self.registry, &self.journal).trial_balance(scope, as_of)
    }

    // ========== Period closure ==========

    /// Closes a fiscal period.
    pub fn close_period(
        &mut self,
        scope: LedgerScopeId,
        input: CloseInput,
    ) -> Result<ClosureId, LedgerError> {
        let Self {
            registry,
            journal,
            closures,
        } = self;
        closures.close(registry, journal, scope, input)
    }

    /// Reverses a completed closure, reopening its period.
    pub fn reverse_closure(
        &mut self,
        id: ClosureId,
        reversed_by: UserId,
    ) -> Result<Option<TransactionId>, LedgerError> {
        let Self {
            journal, closures, ..
        } = self;
        closures.reverse_closure(journal, id, reversed_by)
    }

    /// Looks up a closure by ID.
    pub fn closure(&self, id: ClosureId) -> Result<&PeriodClosure, LedgerError> {
        self.closures.get(id)
    }

    /// Whether a date falls inside a completed closure of a scope.
    #[must_use]
    pub fn is_closed(&self, scope: LedgerScopeId, date: NaiveDate) -> bool {
        self.closures.is_closed(scope, date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::AccountType;
    use crate::closure::{ClosureStatus, PeriodType};
    use crate::journal::TransactionStatus;
    use rust_decimal_macros::dec;

    fn account(code: &str, account_type: AccountType) -> CreateAccountInput {
        CreateAccountInput {
            code: code.to_string(),
            name: format!("Account {code}"),
            account_type,
            nature: None,
            parent_code: None,
            accepts_posting: true,
            requires_third_party: false,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn open_input(on: NaiveDate) -> OpenTransactionInput {
        OpenTransactionInput {
            date: on,
            description: "test".to_string(),
            source: None,
            apartment: None,
            created_by: UserId::new(),
        }
    }

    #[test]
    fn test_balanced_posting_moves_both_balances() {
        let mut ledger = GeneralLedger::new();
        let scope = LedgerScopeId::new();
        let asset = ledger
            .create_account(scope, account("1105", AccountType::Asset))
            .unwrap();
        let income = ledger
            .create_account(scope, account("4105", AccountType::Income))
            .unwrap();

        let txn = ledger.open_transaction(scope, open_input(date(2025, 3, 15)));
        ledger
            .add_entry(txn, EntryInput::debit(asset, dec!(100000)))
            .unwrap();
        ledger
            .add_entry(txn, EntryInput::credit(income, dec!(100000)))
            .unwrap();
        ledger.post(txn).unwrap();

        let as_of = date(2025, 3, 31);
        assert_eq!(ledger.balance_of(asset, as_of).unwrap(), dec!(100000));
        assert_eq!(ledger.balance_of(income, as_of).unwrap(), dec!(100000));
    }

    #[test]
    fn test_unbalanced_posting_fails() {
        let mut ledger = GeneralLedger::new();
        let scope = LedgerScopeId::new();
        let asset = ledger
            .create_account(scope, account("1105", AccountType::Asset))
            .unwrap();
        let income = ledger
            .create_account(scope, account("4105", AccountType::Income))
            .unwrap();

        let txn = ledger.open_transaction(scope, open_input(date(2025, 3, 15)));
        ledger
            .add_entry(txn, EntryInput::debit(asset, dec!(60000)))
            .unwrap();
        ledger
            .add_entry(txn, EntryInput::credit(income, dec!(50000)))
            .unwrap();

        match ledger.post(txn) {
            Err(LedgerError::Unbalanced { debit, credit }) => {
                assert_eq!(debit, dec!(60000));
                assert_eq!(credit, dec!(50000));
            }
            other => panic!("expected Unbalanced, got {other:?}"),
        }
    }

    #[test]
    fn test_entry_against_aggregate_account_fails() {
        let mut ledger = GeneralLedger::new();
        let scope = LedgerScopeId::new();
        let mut group = account("11", AccountType::Asset);
        group.accepts_posting = false;
        let group = ledger.create_account(scope, group).unwrap();

        let txn = ledger.open_transaction(scope, open_input(date(2025, 3, 15)));
        assert!(matches!(
            ledger.add_entry(txn, EntryInput::debit(group, dec!(100))),
            Err(LedgerError::AccountNotPostable(_))
        ));
    }

    #[test]
    fn test_annual_close_twice_fails() {
        let mut ledger = GeneralLedger::new();
        let scope = LedgerScopeId::new();
        let asset = ledger
            .create_account(scope, account("1105", AccountType::Asset))
            .unwrap();
        let income = ledger
            .create_account(scope, account("4105", AccountType::Income))
            .unwrap();
        let result = ledger
            .create_account(scope, account("3105", AccountType::Equity))
            .unwrap();

        let txn = ledger.open_transaction(scope, open_input(date(2025, 6, 1)));
        ledger
            .add_entry(txn, EntryInput::debit(asset, dec!(500)))
            .unwrap();
        ledger
            .add_entry(txn, EntryInput::credit(income, dec!(500)))
            .unwrap();
        ledger.post(txn).unwrap();

        let input = CloseInput {
            fiscal_year: 2025,
            period_type: PeriodType::Annual,
            start: date(2025, 1, 1),
            end: date(2025, 12, 31),
            result_account: result,
            closed_by: UserId::new(),
        };
        ledger.close_period(scope, input.clone()).unwrap();
        assert!(matches!(
            ledger.close_period(scope, input),
            Err(LedgerError::AlreadyClosed {
                fiscal_year: 2025,
                ..
            })
        ));
    }

    #[test]
    fn test_posting_into_completed_closure_fails() {
        let mut ledger = GeneralLedger::new();
        let scope = LedgerScopeId::new();
        let asset = ledger
            .create_account(scope, account("1105", AccountType::Asset))
            .unwrap();
        let income = ledger
            .create_account(scope, account("4105", AccountType::Income))
            .unwrap();
        let result = ledger
            .create_account(scope, account("3105", AccountType::Equity))
            .unwrap();

        let closure = ledger
            .close_period(
                scope,
                CloseInput {
                    fiscal_year: 2025,
                    period_type: PeriodType::Monthly,
                    start: date(2025, 3, 1),
                    end: date(2025, 3, 31),
                    result_account: result,
                    closed_by: UserId::new(),
                },
            )
            .unwrap();
        assert_eq!(
            ledger.closure(closure).unwrap().status,
            ClosureStatus::Completed
        );

        let txn = ledger.open_transaction(scope, open_input(date(2025, 3, 15)));
        ledger
            .add_entry(txn, EntryInput::debit(asset, dec!(100)))
            .unwrap();
        ledger
            .add_entry(txn, EntryInput::credit(income, dec!(100)))
            .unwrap();
        assert!(matches!(
            ledger.post(txn),
            Err(LedgerError::PeriodClosed(_))
        ));

        // Outside the closed window the draft would post fine.
        let txn = ledger.open_transaction(scope, open_input(date(2025, 4, 1)));
        ledger
            .add_entry(txn, EntryInput::debit(asset, dec!(100)))
            .unwrap();
        ledger
            .add_entry(txn, EntryInput::credit(income, dec!(100)))
            .unwrap();
        assert!(ledger.post(txn).is_ok());
    }

    #[test]
    fn test_account_lifecycle_guarded_by_entries() {
        let mut ledger = GeneralLedger::new();
        let scope = LedgerScopeId::new();
        let asset = ledger
            .create_account(scope, account("1105", AccountType::Asset))
            .unwrap();
        let income = ledger
            .create_account(scope, account("4105", AccountType::Income))
            .unwrap();

        // Untouched accounts can be deleted.
        let scratch = ledger
            .create_account(scope, account("1110", AccountType::Asset))
            .unwrap();
        ledger.delete_account(scratch).unwrap();

        let txn = ledger.open_transaction(scope, open_input(date(2025, 3, 15)));
        ledger
            .add_entry(txn, EntryInput::debit(asset, dec!(100)))
            .unwrap();
        ledger
            .add_entry(txn, EntryInput::credit(income, dec!(100)))
            .unwrap();
        ledger.post(txn).unwrap();

        assert!(matches!(
            ledger.delete_account(asset),
            Err(LedgerError::AccountInUse(_))
        ));
        assert!(matches!(
            ledger.set_postable(asset, false),
            Err(LedgerError::AccountInUse(_))
        ));

        // Deactivation always works and blocks new entries only.
        ledger.deactivate_account(asset).unwrap();
        let txn = ledger.open_transaction(scope, open_input(date(2025, 3, 16)));
        assert!(matches!(
            ledger.add_entry(txn, EntryInput::debit(asset, dec!(1))),
            Err(LedgerError::AccountInactive(_))
        ));
        assert_eq!(
            ledger.balance_of(asset, date(2025, 3, 31)).unwrap(),
            dec!(100)
        );
        ledger.reactivate_account(asset).unwrap();
    }

    #[test]
    fn test_reversal_through_facade_nets_to_zero() {
        let mut ledger = GeneralLedger::new();
        let scope = LedgerScopeId::new();
        let asset = ledger
            .create_account(scope, account("1105", AccountType::Asset))
            .unwrap();
        let income = ledger
            .create_account(scope, account("4105", AccountType::Income))
            .unwrap();

        let txn = ledger.open_transaction(scope, open_input(date(2025, 3, 15)));
        ledger
            .add_entry(txn, EntryInput::debit(asset, dec!(250)))
            .unwrap();
        ledger
            .add_entry(txn, EntryInput::credit(income, dec!(250)))
            .unwrap();
        ledger.post(txn).unwrap();

        let reversal = ledger.reverse(txn, None, UserId::new()).unwrap();
        assert_eq!(
            ledger.transaction(reversal).unwrap().status,
            TransactionStatus::Posted
        );
        let as_of = date(2025, 3, 31);
        assert_eq!(ledger.balance_of(asset, as_of).unwrap(), dec!(0));
        assert_eq!(ledger.balance_of(income, as_of).unwrap(), dec!(0));
        assert!(ledger.trial_balance(scope, as_of).unwrap().is_empty());
    }
}
