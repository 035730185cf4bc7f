//! Fiscal period closure.
//!
//! Closing a period zeroes every postable income and expense account
//! over the period window and books the net result into a designated
//! equity account, all inside one ordinary posted transaction. A
//! completed closure freezes the window: no new transaction may post
//! into it, and undoing a closure means reversing its transaction.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strata_shared::types::{AccountId, ClosureId, LedgerScopeId, TransactionId, UserId};
use tracing::info;

use crate::balance::BalanceCalculator;
use crate::chart::AccountRegistry;
use crate::error::LedgerError;
use crate::journal::{
    EntryInput, Journal, OpenTransactionInput, SourceDocument, SourceKind,
};

/// Granularity of a closed period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    /// Calendar month.
    Monthly,
    /// Full fiscal year.
    Annual,
}

/// Closure lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosureStatus {
    /// Being computed; does not freeze the period.
    Draft,
    /// Effective; the period is frozen.
    Completed,
    /// Undone; the period is open again.
    Reversed,
}

/// Record of a period closure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodClosure {
    /// Unique identifier.
    pub id: ClosureId,
    /// The ledger scope this closure belongs to.
    pub scope: LedgerScopeId,
    /// Fiscal year the period belongs to.
    pub fiscal_year: i32,
    /// Period granularity.
    pub period_type: PeriodType,
    /// First date of the closed window, inclusive.
    pub period_start: NaiveDate,
    /// Last date of the closed window, inclusive.
    pub period_end: NaiveDate,
    /// Date the closure was performed.
    pub closure_date: NaiveDate,
    /// Lifecycle status.
    pub status: ClosureStatus,
    /// Natural income activity over the window.
    pub total_income: Decimal,
    /// Natural expense activity over the window.
    pub total_expenses: Decimal,
    /// Income minus expenses.
    pub net_result: Decimal,
    /// The closing transaction; `None` for zero-activity periods.
    pub transaction_id: Option<TransactionId>,
    /// User who performed the closure.
    pub closed_by: UserId,
}

/// Input for closing a period.
#[derive(Debug, Clone)]
pub struct CloseInput {
    /// Fiscal year of the period.
    pub fiscal_year: i32,
    /// Period granularity.
    pub period_type: PeriodType,
    /// First date of the window, inclusive.
    pub start: NaiveDate,
    /// Last date of the window, inclusive.
    pub end: NaiveDate,
    /// Equity account receiving the net result.
    pub result_account: AccountId,
    /// User performing the closure.
    pub closed_by: UserId,
}

/// Book of period closures across scopes.
#[derive(Debug, Default)]
pub struct ClosureBook {
    closures: HashMap<ClosureId, PeriodClosure>,
}

impl ClosureBook {
    /// Creates an empty closure book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a closure by ID.
    ///
    /// # Errors
    ///
    /// Returns `ClosureNotFound` if the ID is unknown.
    pub fn get(&self, id: ClosureId) -> Result<&PeriodClosure, LedgerError> {
        self.closures
            .get(&id)
            .ok_or(LedgerError::ClosureNotFound(id))
    }

    /// Whether a date falls inside any completed closure of a scope.
    #[must_use]
    pub fn is_closed(&self, scope: LedgerScopeId, date: NaiveDate) -> bool {
        self.closures.values().any(|c| {
            c.scope == scope
                && c.status == ClosureStatus::Completed
                && c.period_start <= date
                && date <= c.period_end
        })
    }

    /// Iterates closures of a scope, in no particular order.
    pub fn closures_in(&self, scope: LedgerScopeId) -> impl Iterator<Item = &PeriodClosure> {
        self.closures.values().filter(move |c| c.scope == scope)
    }

    /// Closes a period: zeroes income and expense accounts over the
    /// window and books the net result into `result_account`.
    ///
    /// The closing transaction is dated on the window's last day and is
    /// posted atomically with the closure record. Periods with no
    /// income or expense activity complete without a transaction.
    ///
    /// # Errors
    ///
    /// - `AlreadyClosed` if a completed closure for the same period exists
    /// - `AccountNotFound` / `AccountInactive` / `AccountNotPostable`
    ///   if the result account is unfit
    pub fn close(
        &mut self,
        registry: &AccountRegistry,
        journal: &mut Journal,
        scope: LedgerScopeId,
        input: CloseInput,
    ) -> Result<ClosureId, LedgerError> {
        if let Some(existing) = self.closures.values().find(|c| {
            c.scope == scope
                && c.status == ClosureStatus::Completed
                && c.fiscal_year == input.fiscal_year
                && c.period_type == input.period_type
                && c.period_start == input.start
        }) {
            return Err(LedgerError::AlreadyClosed {
                fiscal_year: existing.fiscal_year,
                period_start: existing.period_start,
            });
        }

        let result_account = registry.get(input.result_account)?;
        if !result_account.is_active {
            return Err(LedgerError::AccountInactive(input.result_account));
        }
        if !result_account.accepts_posting {
            return Err(LedgerError::AccountNotPostable(input.result_account));
        }

        // Activity is read before the journal is mutated.
        let mut zeroings: Vec<(AccountId, Decimal)> = Vec::new();
        let mut total_income = Decimal::ZERO;
        let mut total_expenses = Decimal::ZERO;
        {
            let calc = BalanceCalculator::new(registry, journal);
            for account in registry.accounts_in(scope) {
                if !account.accepts_posting || !account.account_type.closes_at_period_end() {
                    continue;
                }
                let raw = calc.raw_activity_between(account.id, input.start, input.end)?;
                if raw == Decimal::ZERO {
                    continue;
                }
                zeroings.push((account.id, raw));
                let natural = account.nature.signed(raw, Decimal::ZERO);
                match account.account_type {
                    crate::chart::AccountType::Income => total_income += natural,
                    _ => total_expenses += natural,
                }
            }
        }

        let net_result = total_income - total_expenses;
        let id = ClosureId::new();

        let transaction_id = if zeroings.is_empty() {
            None
        } else {
            let txn = journal.open(
                scope,
                OpenTransactionInput {
                    date: input.end,
                    description: format!(
                        "Period closure {} / {}",
                        input.fiscal_year, input.start
                    ),
                    source: Some(SourceDocument {
                        kind: SourceKind::Closure,
                        id: id.into_inner(),
                    }),
                    apartment: None,
                    created_by: input.closed_by,
                },
            );
            if let Err(err) = Self::write_closing_entries(
                journal,
                txn,
                &zeroings,
                input.result_account,
            ) {
                // Leave no half-built closing transaction behind.
                let _ = journal.cancel(txn);
                return Err(err);
            }
            journal.post_internal(txn)?;
            Some(txn)
        };

        let closure = PeriodClosure {
            id,
            scope,
            fiscal_year: input.fiscal_year,
            period_type: input.period_type,
            period_start: input.start,
            period_end: input.end,
            closure_date: Utc::now().date_naive(),
            status: ClosureStatus::Completed,
            total_income,
            total_expenses,
            net_result,
            transaction_id,
            closed_by: input.closed_by,
        };
        info!(
            closure_id = %id,
            scope = %scope,
            period_start = %closure.period_start,
            net_result = %closure.net_result,
            "period closed"
        );
        self.closures.insert(id, closure);
        Ok(id)
    }

    /// Reverses a completed closure, reopening the period.
    ///
    /// The closing transaction (if any) is reversed through the
    /// journal's standard mirror mechanism, restoring income and
    /// expense balances.
    ///
    /// # Errors
    ///
    /// - `ClosureNotFound` if the ID is unknown
    /// - `NotCompleted` unless the closure is completed
    pub fn reverse_closure(
        &mut self,
        journal: &mut Journal,
        id: ClosureId,
        reversed_by: UserId,
    ) -> Result<Option<TransactionId>, LedgerError> {
        let closure = self
            .closures
            .get(&id)
            .ok_or(LedgerError::ClosureNotFound(id))?;
        if closure.status != ClosureStatus::Completed {
            return Err(LedgerError::NotCompleted(id));
        }

        let reversal = match closure.transaction_id {
            Some(txn) => Some(journal.reverse(txn, None, reversed_by)?),
            None => None,
        };
        if let Some(closure) = self.closures.get_mut(&id) {
            closure.status = ClosureStatus::Reversed;
        }
        info!(closure_id = %id, "period closure reversed");
        Ok(reversal)
    }

    /// Writes the zeroing entries plus the balancing result entry.
    ///
    /// A break-even period needs no result entry: the zeroing lines
    /// already balance, and a zero-amount line would be rejected.
    fn write_closing_entries(
        journal: &mut Journal,
        txn: TransactionId,
        zeroings: &[(AccountId, Decimal)],
        result_account: AccountId,
    ) -> Result<(), LedgerError> {
        let mut total_debit = Decimal::ZERO;
        let mut total_credit = Decimal::ZERO;
        for &(account, raw) in zeroings {
            // A positive raw movement (net debits) is zeroed by a credit.
            let input = if raw > Decimal::ZERO {
                total_credit += raw;
                EntryInput::credit(account, raw)
            } else {
                total_debit += -raw;
                EntryInput::debit(account, -raw)
            };
            journal.append_entry_internal(txn, input)?;
        }
        if total_debit != total_credit {
            let input = if total_debit > total_credit {
                EntryInput::credit(result_account, total_debit - total_credit)
            } else {
                EntryInput::debit(result_account, total_credit - total_debit)
            };
            journal.append_entry_internal(txn, input)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{AccountType, CreateAccountInput};
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

    struct Fixture {
        scope: LedgerScopeId,
        registry: AccountRegistry,
        journal: Journal,
        cash: AccountId,
        fees: AccountId,
        maintenance: AccountId,
        result: AccountId,
    }

    fn fixture() -> Fixture {
        let scope = LedgerScopeId::new();
        let mut registry = AccountRegistry::new();
        let cash = registry
            .create_account(scope, account("1105", AccountType::Asset))
            .unwrap();
        let fees = registry
            .create_account(scope, account("4105", AccountType::Income))
            .unwrap();
        let maintenance = registry
            .create_account(scope, account("5105", AccountType::Expense))
            .unwrap();
        let result = registry
            .create_account(scope, account("3105", AccountType::Equity))
            .unwrap();
        Fixture {
            scope,
            registry,
            journal: Journal::new(),
            cash,
            fees,
            maintenance,
            result,
        }
    }

    fn post_pair(
        journal: &mut Journal,
        registry: &AccountRegistry,
        scope: LedgerScopeId,
        on: NaiveDate,
        debit: AccountId,
        credit: AccountId,
        amount: Decimal,
    ) {
        let txn = journal.open(
            scope,
            OpenTransactionInput {
                date: on,
                description: "test".to_string(),
                source: None,
                apartment: None,
                created_by: UserId::new(),
            },
        );
        journal
            .add_entry(txn, registry, EntryInput::debit(debit, amount))
            .unwrap();
        journal
            .add_entry(txn, registry, EntryInput::credit(credit, amount))
            .unwrap();
        journal.post(txn, registry, |_, _| false).unwrap();
    }

    fn close_input(fx: &Fixture) -> CloseInput {
        CloseInput {
            fiscal_year: 2025,
            period_type: PeriodType::Monthly,
            start: date(2025, 3, 1),
            end: date(2025, 3, 31),
            result_account: fx.result,
            closed_by: UserId::new(),
        }
    }

    #[test]
    fn test_close_zeroes_result_accounts() {
        let mut fx = fixture();
        post_pair(
            &mut fx.journal,
            &fx.registry,
            fx.scope,
            date(2025, 3, 10),
            fx.cash,
            fx.fees,
            dec!(300),
        );
        post_pair(
            &mut fx.journal,
            &fx.registry,
            fx.scope,
            date(2025, 3, 20),
            fx.maintenance,
            fx.cash,
            dec!(120),
        );

        let mut book = ClosureBook::new();
        let input = close_input(&fx);
        let id = book
            .close(&fx.registry, &mut fx.journal, fx.scope, input)
            .unwrap();

        let closure = book.get(id).unwrap();
        assert_eq!(closure.status, ClosureStatus::Completed);
        assert_eq!(closure.total_income, dec!(300));
        assert_eq!(closure.total_expenses, dec!(120));
        assert_eq!(closure.net_result, dec!(180));

        let txn = fx.journal.get(closure.transaction_id.unwrap()).unwrap();
        assert_eq!(txn.status, TransactionStatus::Posted);
        assert_eq!(txn.transaction_date, date(2025, 3, 31));
        assert!(txn.is_balanced());

        // Income and expenses are flat after closing; the result
        // account carries the surplus.
        let calc = BalanceCalculator::new(&fx.registry, &fx.journal);
        let end = date(2025, 3, 31);
        assert_eq!(calc.balance_of(fx.fees, end).unwrap(), dec!(0));
        assert_eq!(calc.balance_of(fx.maintenance, end).unwrap(), dec!(0));
        assert_eq!(calc.balance_of(fx.result, end).unwrap(), dec!(180));
        assert_eq!(calc.balance_of(fx.cash, end).unwrap(), dec!(180));
    }

    #[test]
    fn test_close_with_deficit() {
        let mut fx = fixture();
        post_pair(
            &mut fx.journal,
            &fx.registry,
            fx.scope,
            date(2025, 3, 10),
            fx.cash,
            fx.fees,
            dec!(100),
        );
        post_pair(
            &mut fx.journal,
            &fx.registry,
            fx.scope,
            date(2025, 3, 20),
            fx.maintenance,
            fx.cash,
            dec!(250),
        );

        let mut book = ClosureBook::new();
        let input = close_input(&fx);
        let id = book
            .close(&fx.registry, &mut fx.journal, fx.scope, input)
            .unwrap();
        let closure = book.get(id).unwrap();
        assert_eq!(closure.net_result, dec!(-150));

        let calc = BalanceCalculator::new(&fx.registry, &fx.journal);
        // Equity shrinks by the deficit.
        assert_eq!(
            calc.balance_of(fx.result, date(2025, 3, 31)).unwrap(),
            dec!(-150)
        );
    }

    #[test]
    fn test_close_break_even_period() {
        let mut fx = fixture();
        post_pair(
            &mut fx.journal,
            &fx.registry,
            fx.scope,
            date(2025, 3, 10),
            fx.cash,
            fx.fees,
            dec!(200),
        );
        post_pair(
            &mut fx.journal,
            &fx.registry,
            fx.scope,
            date(2025, 3, 20),
            fx.maintenance,
            fx.cash,
            dec!(200),
        );

        let mut book = ClosureBook::new();
        let input = close_input(&fx);
        let id = book
            .close(&fx.registry, &mut fx.journal, fx.scope, input)
            .unwrap();

        // Income exactly offsets expenses: the zeroing lines balance on
        // their own and no result entry is written.
        let closure = book.get(id).unwrap();
        assert_eq!(closure.status, ClosureStatus::Completed);
        assert_eq!(closure.net_result, dec!(0));

        let txn = fx.journal.get(closure.transaction_id.unwrap()).unwrap();
        assert_eq!(txn.status, TransactionStatus::Posted);
        assert!(txn.is_balanced());
        assert_eq!(txn.entries.len(), 2);
        assert!(txn.entries.iter().all(|e| e.account_id != fx.result));

        let calc = BalanceCalculator::new(&fx.registry, &fx.journal);
        let end = date(2025, 3, 31);
        assert_eq!(calc.balance_of(fx.fees, end).unwrap(), dec!(0));
        assert_eq!(calc.balance_of(fx.maintenance, end).unwrap(), dec!(0));
        assert_eq!(calc.balance_of(fx.result, end).unwrap(), dec!(0));
    }

    #[test]
    fn test_double_close_rejected() {
        let mut fx = fixture();
        post_pair(
            &mut fx.journal,
            &fx.registry,
            fx.scope,
            date(2025, 3, 10),
            fx.cash,
            fx.fees,
            dec!(100),
        );

        let mut book = ClosureBook::new();
        let input = close_input(&fx);
        book.close(&fx.registry, &mut fx.journal, fx.scope, input.clone())
            .unwrap();
        assert!(matches!(
            book.close(&fx.registry, &mut fx.journal, fx.scope, input),
            Err(LedgerError::AlreadyClosed { .. })
        ));
    }

    #[test]
    fn test_zero_activity_close_has_no_transaction() {
        let mut fx = fixture();
        let mut book = ClosureBook::new();
        let input = close_input(&fx);
        let id = book
            .close(&fx.registry, &mut fx.journal, fx.scope, input)
            .unwrap();
        let closure = book.get(id).unwrap();
        assert_eq!(closure.status, ClosureStatus::Completed);
        assert!(closure.transaction_id.is_none());
        assert_eq!(closure.net_result, dec!(0));

        // The period is still frozen.
        assert!(book.is_closed(fx.scope, date(2025, 3, 15)));
    }

    #[test]
    fn test_closed_period_blocks_posting() {
        let mut fx = fixture();
        post_pair(
            &mut fx.journal,
            &fx.registry,
            fx.scope,
            date(2025, 3, 10),
            fx.cash,
            fx.fees,
            dec!(100),
        );
        let mut book = ClosureBook::new();
        let input = close_input(&fx);
        book.close(&fx.registry, &mut fx.journal, fx.scope, input)
            .unwrap();

        let txn = fx.journal.open(
            fx.scope,
            OpenTransactionInput {
                date: date(2025, 3, 15),
                description: "late".to_string(),
                source: None,
                apartment: None,
                created_by: UserId::new(),
            },
        );
        fx.journal
            .add_entry(txn, &fx.registry, EntryInput::debit(fx.cash, dec!(10)))
            .unwrap();
        fx.journal
            .add_entry(txn, &fx.registry, EntryInput::credit(fx.fees, dec!(10)))
            .unwrap();
        let result = fx
            .journal
            .post(txn, &fx.registry, |scope, on| book.is_closed(scope, on));
        assert!(matches!(result, Err(LedgerError::PeriodClosed(_))));
    }

    #[test]
    fn test_reverse_closure_restores_balances() {
        let mut fx = fixture();
        post_pair(
            &mut fx.journal,
            &fx.registry,
            fx.scope,
            date(2025, 3, 10),
            fx.cash,
            fx.fees,
            dec!(300),
        );
        let mut book = ClosureBook::new();
        let input = close_input(&fx);
        let id = book
            .close(&fx.registry, &mut fx.journal, fx.scope, input)
            .unwrap();

        book.reverse_closure(&mut fx.journal, id, UserId::new())
            .unwrap();
        assert_eq!(book.get(id).unwrap().status, ClosureStatus::Reversed);
        assert!(!book.is_closed(fx.scope, date(2025, 3, 15)));

        let calc = BalanceCalculator::new(&fx.registry, &fx.journal);
        let end = date(2025, 3, 31);
        assert_eq!(calc.balance_of(fx.fees, end).unwrap(), dec!(300));
        assert_eq!(calc.balance_of(fx.result, end).unwrap(), dec!(0));

        // Reversing twice is rejected.
        assert!(matches!(
            book.reverse_closure(&mut fx.journal, id, UserId::new()),
            Err(LedgerError::NotCompleted(_))
        ));
    }

    #[test]
    fn test_reclose_after_reversal() {
        let mut fx = fixture();
        post_pair(
            &mut fx.journal,
            &fx.registry,
            fx.scope,
            date(2025, 3, 10),
            fx.cash,
            fx.fees,
            dec!(300),
        );
        let mut book = ClosureBook::new();
        let input = close_input(&fx);
        let id = book
            .close(&fx.registry, &mut fx.journal, fx.scope, input)
            .unwrap();
        book.reverse_closure(&mut fx.journal, id, UserId::new())
            .unwrap();

        // The same period can be closed again and nets out the same.
        let input = close_input(&fx);
        let second = book
            .close(&fx.registry, &mut fx.journal, fx.scope, input)
            .unwrap();
        let closure = book.get(second).unwrap();
        assert_eq!(closure.net_result, dec!(300));

        let calc = BalanceCalculator::new(&fx.registry, &fx.journal);
        let end = date(2025, 3, 31);
        assert_eq!(calc.balance_of(fx.fees, end).unwrap(), dec!(0));
        assert_eq!(calc.balance_of(fx.result, end).unwrap(), dec!(300));
    }

    #[test]
    fn test_result_account_must_be_postable() {
        let mut fx = fixture();
        fx.registry
            .set_postable(fx.result, false, |_| 0)
            .unwrap();
        let mut book = ClosureBook::new();
        let input = close_input(&fx);
        assert!(matches!(
            book.close(&fx.registry, &mut fx.journal, fx.scope, input),
            Err(LedgerError::AccountNotPostable(_))
        ));
    }
}
