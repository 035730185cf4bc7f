//! Balance calculation over posted entries.
//!
//! Balances are never stored. Every figure is recomputed from the
//! posted journal on demand, so there is no cached aggregate to drift
//! out of sync with the entries.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use strata_shared::types::{AccountId, LedgerScopeId};

use crate::chart::AccountRegistry;
use crate::error::LedgerError;
use crate::journal::{Journal, TransactionStatus};

/// Read-only balance calculator over a registry and journal.
pub struct BalanceCalculator<'a> {
    registry: &'a AccountRegistry,
    journal: &'a Journal,
}

impl<'a> BalanceCalculator<'a> {
    /// Creates a calculator borrowing the chart and the journal.
    #[must_use]
    pub fn new(registry: &'a AccountRegistry, journal: &'a Journal) -> Self {
        Self { registry, journal }
    }

    /// Balance of an account as of a date, signed by its nature.
    ///
    /// Postable accounts sum their own posted entries dated on or
    /// before `as_of`. Non-postable accounts aggregate their direct
    /// children recursively; any stray own entries are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account is unknown.
    pub fn balance_of(&self, account: AccountId, as_of: NaiveDate) -> Result<Decimal, LedgerError> {
        let acc = self.registry.get(account)?;
        if acc.accepts_posting {
            let raw = self.raw_sum(acc.scope, account, None, as_of);
            return Ok(acc.nature.signed(raw.0, raw.1));
        }
        let mut total = Decimal::ZERO;
        for child in self.registry.children(account)? {
            total += self.balance_of(child.id, as_of)?;
        }
        Ok(total)
    }

    /// Natural-balance movement of an account within a date window.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account is unknown.
    pub fn activity_between(
        &self,
        account: AccountId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Decimal, LedgerError> {
        let acc = self.registry.get(account)?;
        if acc.accepts_posting {
            let raw = self.raw_sum(acc.scope, account, Some(start), end);
            return Ok(acc.nature.signed(raw.0, raw.1));
        }
        let mut total = Decimal::ZERO;
        for child in self.registry.children(account)? {
            total += self.activity_between(child.id, start, end)?;
        }
        Ok(total)
    }

    /// Raw debit-minus-credit movement within a date window, unsigned
    /// by nature. The closure engine zeroes accounts from this figure.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account is unknown.
    pub fn raw_activity_between(
        &self,
        account: AccountId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Decimal, LedgerError> {
        let acc = self.registry.get(account)?;
        let (debit, credit) = self.raw_sum(acc.scope, account, Some(start), end);
        Ok(debit - credit)
    }

    /// Trial balance for a scope: every active account with a non-zero
    /// balance as of the date, in code order.
    ///
    /// Only postable accounts are listed so the debit and credit sides
    /// net to zero without double-counting the hierarchy.
    ///
    /// # Errors
    ///
    /// Propagates `AccountNotFound` from balance lookups.
    pub fn trial_balance(
        &self,
        scope: LedgerScopeId,
        as_of: NaiveDate,
    ) -> Result<Vec<(AccountId, Decimal)>, LedgerError> {
        let mut rows = Vec::new();
        for account in self.registry.accounts_in(scope) {
            if !account.is_active || !account.accepts_posting {
                continue;
            }
            let balance = self.balance_of(account.id, as_of)?;
            if balance != Decimal::ZERO {
                rows.push((account.id, balance));
            }
        }
        Ok(rows)
    }

    /// Sums posted debits and credits against an account in a window.
    fn raw_sum(
        &self,
        scope: LedgerScopeId,
        account: AccountId,
        start: Option<NaiveDate>,
        end: NaiveDate,
    ) -> (Decimal, Decimal) {
        let mut debit = Decimal::ZERO;
        let mut credit = Decimal::ZERO;
        for transaction in self.journal.transactions_in(scope) {
            if transaction.status != TransactionStatus::Posted {
                continue;
            }
            if transaction.transaction_date > end {
                continue;
            }
            if let Some(start) = start {
                if transaction.transaction_date < start {
                    continue;
                }
            }
            for entry in &transaction.entries {
                if entry.account_id == account {
                    debit += entry.debit;
                    credit += entry.credit;
                }
            }
        }
        (debit, credit)
    }
}
