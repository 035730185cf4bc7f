//! Journal service: draft lifecycle, posting and reversal.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use strata_shared::types::{
    ApartmentId, EntryId, LedgerScopeId, TransactionId, UserId,
};
use tracing::info;

use crate::chart::AccountRegistry;
use crate::error::LedgerError;

use super::entry::{validate_amounts, Entry, EntryInput};
use super::transaction::{SourceDocument, Transaction, TransactionStatus};
use super::validation::validate_postable;

/// Input for opening a draft transaction.
#[derive(Debug, Clone)]
pub struct OpenTransactionInput {
    /// Accounting date.
    pub date: NaiveDate,
    /// Human-readable description.
    pub description: String,
    /// Originating business document, if any.
    pub source: Option<SourceDocument>,
    /// Apartment this transaction concerns, if any.
    pub apartment: Option<ApartmentId>,
    /// User creating the transaction.
    pub created_by: UserId,
}

/// In-memory journal over all scopes.
///
/// Account-level checks are delegated to the [`AccountRegistry`] passed
/// into [`add_entry`](Self::add_entry); the period-closed check is
/// injected into [`post`](Self::post) so the journal stays independent
/// of the closure book.
#[derive(Debug, Default)]
pub struct Journal {
    transactions: std::collections::HashMap<TransactionId, Transaction>,
}

impl Journal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new draft transaction.
    pub fn open(&mut self, scope: LedgerScopeId, input: OpenTransactionInput) -> TransactionId {
        let id = TransactionId::new();
        let transaction = Transaction {
            id,
            scope,
            transaction_date: input.date,
            description: input.description,
            source: input.source,
            apartment_id: input.apartment,
            status: TransactionStatus::Draft,
            total_debit: Decimal::ZERO,
            total_credit: Decimal::ZERO,
            created_by: input.created_by,
            created_at: Utc::now(),
            posted_at: None,
            entries: Vec::new(),
        };
        self.transactions.insert(id, transaction);
        id
    }

    /// Looks up a transaction by ID.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` if the ID is unknown.
    pub fn get(&self, id: TransactionId) -> Result<&Transaction, LedgerError> {
        self.transactions
            .get(&id)
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    /// Appends an entry line to a draft, validating against the chart.
    ///
    /// # Errors
    ///
    /// - `TransactionNotDraft` if the transaction is posted or cancelled
    /// - `AmbiguousEntry` if the amounts are not one-sided positive
    /// - `AccountNotFound` if the account is unknown or in another scope
    /// - `AccountInactive` / `AccountNotPostable` per account state
    /// - `ThirdPartyRequired` if the account demands a reference and
    ///   none was given
    pub fn add_entry(
        &mut self,
        id: TransactionId,
        registry: &AccountRegistry,
        input: EntryInput,
    ) -> Result<EntryId, LedgerError> {
        let transaction = self
            .transactions
            .get(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?;
        if !transaction.status.is_editable() {
            return Err(LedgerError::TransactionNotDraft(id));
        }
        validate_amounts(input.debit, input.credit)?;

        let account = registry.get(input.account)?;
        if account.scope != transaction.scope {
            // Cross-scope references behave like unknown accounts.
            return Err(LedgerError::AccountNotFound(input.account));
        }
        if !account.is_active {
            return Err(LedgerError::AccountInactive(input.account));
        }
        if !account.accepts_posting {
            return Err(LedgerError::AccountNotPostable(input.account));
        }
        if account.requires_third_party && input.third_party.is_none() {
            return Err(LedgerError::ThirdPartyRequired(input.account));
        }

        self.push_entry(id, input)
    }

    /// Appends an entry line with amount and draft checks only.
    ///
    /// The closure engine uses this to write result entries against
    /// accounts regardless of their third-party flag.
    pub(crate) fn append_entry_internal(
        &mut self,
        id: TransactionId,
        input: EntryInput,
    ) -> Result<EntryId, LedgerError> {
        let transaction = self
            .transactions
            .get(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?;
        if !transaction.status.is_editable() {
            return Err(LedgerError::TransactionNotDraft(id));
        }
        validate_amounts(input.debit, input.credit)?;
        self.push_entry(id, input)
    }

    fn push_entry(&mut self, id: TransactionId, input: EntryInput) -> Result<EntryId, LedgerError> {
        let transaction = self
            .transactions
            .get_mut(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?;
        let entry_id = EntryId::new();
        let line_no = u32::try_from(transaction.entries.len() + 1).unwrap_or(u32::MAX);
        transaction.total_debit += input.debit;
        transaction.total_credit += input.credit;
        transaction.entries.push(Entry {
            id: entry_id,
            transaction_id: id,
            account_id: input.account,
            line_no,
            description: input.description,
            debit: input.debit,
            credit: input.credit,
            third_party: input.third_party,
            cost_center: input.cost_center,
        });
        Ok(entry_id)
    }

    /// Posts a draft, making it immutable and balance-effective.
    ///
    /// Account conditions are re-checked against the registry at post
    /// time: an account deactivated or made non-postable after the
    /// entry was drafted blocks the whole transaction. `is_closed`
    /// reports whether a date falls inside a completed period closure
    /// for a scope.
    ///
    /// # Errors
    ///
    /// - `TransactionNotDraft` if already posted or cancelled
    /// - `EmptyTransaction` / `Unbalanced` per posting validation
    /// - `AccountNotFound` / `AccountInactive` / `AccountNotPostable`
    ///   when an entry's account no longer accepts postings
    /// - `PeriodClosed` if the transaction date is inside a closed period
    pub fn post<F>(
        &mut self,
        id: TransactionId,
        registry: &AccountRegistry,
        is_closed: F,
    ) -> Result<(), LedgerError>
    where
        F: Fn(LedgerScopeId, NaiveDate) -> bool,
    {
        let transaction = self
            .transactions
            .get(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?;
        if !transaction.status.is_editable() {
            return Err(LedgerError::TransactionNotDraft(id));
        }
        validate_postable(transaction)?;
        for entry in &transaction.entries {
            let account = registry.get(entry.account_id)?;
            if !account.is_active {
                return Err(LedgerError::AccountInactive(entry.account_id));
            }
            if !account.accepts_posting {
                return Err(LedgerError::AccountNotPostable(entry.account_id));
            }
        }
        if is_closed(transaction.scope, transaction.transaction_date) {
            return Err(LedgerError::PeriodClosed(transaction.transaction_date));
        }
        self.mark_posted(id)
    }

    /// Posts a draft without re-checking accounts or the period guard.
    ///
    /// Reserved for the engine-built transactions (reversals, closing
    /// entries) whose lines mirror already-posted activity.
    pub(crate) fn post_internal(&mut self, id: TransactionId) -> Result<(), LedgerError> {
        let transaction = self
            .transactions
            .get(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?;
        if !transaction.status.is_editable() {
            return Err(LedgerError::TransactionNotDraft(id));
        }
        validate_postable(transaction)?;
        self.mark_posted(id)
    }

    fn mark_posted(&mut self, id: TransactionId) -> Result<(), LedgerError> {
        let transaction = self
            .transactions
            .get_mut(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?;
        transaction.status = TransactionStatus::Posted;
        transaction.posted_at = Some(Utc::now());
        info!(
            transaction_id = %id,
            date = %transaction.transaction_date,
            total = %transaction.total_debit,
            "transaction posted"
        );
        Ok(())
    }

    /// Cancels a draft. Cancelled transactions never affect balances.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotDraft` if the transaction is not a draft.
    pub fn cancel(&mut self, id: TransactionId) -> Result<(), LedgerError> {
        let transaction = self
            .transactions
            .get_mut(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?;
        if !transaction.status.is_editable() {
            return Err(LedgerError::TransactionNotDraft(id));
        }
        transaction.status = TransactionStatus::Cancelled;
        Ok(())
    }

    /// Reverses a posted transaction by posting a mirror image.
    ///
    /// Every entry reappears with debit and credit swapped; third-party
    /// and cost-center references are preserved so sub-ledgers net out.
    /// The reversal is dated `date` (defaulting to the original date,
    /// never earlier than it) and posts immediately: reversals are the
    /// sanctioned correction path even into closed periods.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotPosted` unless the original is posted.
    pub fn reverse(
        &mut self,
        id: TransactionId,
        date: Option<NaiveDate>,
        reversed_by: UserId,
    ) -> Result<TransactionId, LedgerError> {
        let original = self
            .transactions
            .get(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?;
        if original.status != TransactionStatus::Posted {
            return Err(LedgerError::TransactionNotPosted(id));
        }

        let reversal_date = date
            .unwrap_or(original.transaction_date)
            .max(original.transaction_date);
        let reversal_id = self.open(
            original.scope,
            OpenTransactionInput {
                date: reversal_date,
                description: format!("Reversal: {}", original.description),
                source: original.source,
                apartment: original.apartment_id,
                created_by: reversed_by,
            },
        );
        let mirrored: Vec<EntryInput> = self
            .transactions
            .get(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?
            .entries
            .iter()
            .map(|entry| EntryInput {
                account: entry.account_id,
                description: entry.description.clone(),
                debit: entry.credit,
                credit: entry.debit,
                third_party: entry.third_party,
                cost_center: entry.cost_center,
            })
            .collect();
        for input in mirrored {
            self.append_entry_internal(reversal_id, input)?;
        }
        self.post_internal(reversal_id)?;
        info!(original = %id, reversal = %reversal_id, "transaction reversed");
        Ok(reversal_id)
    }

    /// Counts posted-or-draft entry lines referencing an account.
    #[must_use]
    pub fn entry_count(&self, account: strata_shared::types::AccountId) -> u64 {
        self.transactions
            .values()
            .filter(|t| t.status != TransactionStatus::Cancelled)
            .flat_map(|t| &t.entries)
            .filter(|e| e.account_id == account)
            .count() as u64
    }

    /// Iterates all transactions in a scope, in no particular order.
    pub fn transactions_in(
        &self,
        scope: LedgerScopeId,
    ) -> impl Iterator<Item = &Transaction> {
        self.transactions
            .values()
            .filter(move |t| t.scope == scope)
    }
}
