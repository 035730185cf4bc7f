//! Journal repository for transaction and entry database operations.
//!
//! Enforces the same posting state machine as the in-memory core, with
//! row locks and serializable transactions where drafts turn into
//! posted history.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    IsolationLevel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use strata_core::journal::entry::validate_amounts;
use strata_core::{EntryInput, LedgerError, OpenTransactionInput};
use strata_shared::types::{AccountId, EntryId, LedgerScopeId, TransactionId, UserId};
use tracing::info;

use crate::entities::{
    accounts, ledger_entries, period_closures,
    sea_orm_active_enums::{ClosureStatus, SourceKind, ThirdPartyKind, TransactionStatus},
    transactions,
};

/// Error types for journal operations.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// Ledger rule violation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// A transaction header with its entry lines.
#[derive(Debug, Clone)]
pub struct TransactionWithEntries {
    /// Transaction header.
    pub transaction: transactions::Model,
    /// Entry lines in line order.
    pub entries: Vec<ledger_entries::Model>,
}

/// Journal repository for the transaction lifecycle.
#[derive(Debug, Clone)]
pub struct JournalRepository {
    db: DatabaseConnection,
}

impl JournalRepository {
    /// Creates a new journal repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Opens a draft transaction.
    ///
    /// # Errors
    ///
    /// Returns a database error on insert failure.
    pub async fn open(
        &self,
        scope: LedgerScopeId,
        input: OpenTransactionInput,
    ) -> Result<transactions::Model, JournalError> {
        let (source_kind, source_id) = match input.source {
            Some(doc) => (Some(map_source_kind(doc.kind)), Some(doc.id)),
            None => (None, None),
        };
        let transaction = transactions::ActiveModel {
            id: Set(TransactionId::new().into_inner()),
            scope_id: Set(scope.into_inner()),
            transaction_date: Set(input.date),
            description: Set(input.description),
            source_kind: Set(source_kind),
            source_id: Set(source_id),
            apartment_id: Set(input.apartment.map(strata_shared::types::ApartmentId::into_inner)),
            status: Set(TransactionStatus::Draft),
            total_debit: Set(Decimal::ZERO),
            total_credit: Set(Decimal::ZERO),
            created_by: Set(input.created_by.into_inner()),
            created_at: Set(Utc::now().into()),
            posted_at: Set(None),
        };
        Ok(transaction.insert(&self.db).await?)
    }

    /// Appends an entry line to a draft, validating against the chart.
    ///
    /// # Errors
    ///
    /// Returns the same rule violations as the in-memory journal:
    /// `TransactionNotDraft`, `AmbiguousEntry`, `AccountNotFound`,
    /// `AccountInactive`, `AccountNotPostable`, `ThirdPartyRequired`.
    pub async fn add_entry(
        &self,
        id: TransactionId,
        input: EntryInput,
    ) -> Result<ledger_entries::Model, JournalError> {
        validate_amounts(input.debit, input.credit)?;

        let txn = self.db.begin().await?;
        let transaction = Self::lock_transaction(&txn, id).await?;
        if transaction.status != TransactionStatus::Draft {
            return Err(LedgerError::TransactionNotDraft(id).into());
        }

        let account = accounts::Entity::find_by_id(input.account.into_inner())
            .one(&txn)
            .await?
            .filter(|a| a.scope_id == transaction.scope_id)
            .ok_or(LedgerError::AccountNotFound(input.account))?;
        if !account.is_active {
            return Err(LedgerError::AccountInactive(input.account).into());
        }
        if !account.accepts_posting {
            return Err(LedgerError::AccountNotPostable(input.account).into());
        }
        if account.requires_third_party && input.third_party.is_none() {
            return Err(LedgerError::ThirdPartyRequired(input.account).into());
        }

        let line_no = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::TransactionId.eq(transaction.id))
            .count(&txn)
            .await?;
        let (third_party_kind, third_party_id) = match input.third_party {
            Some(tp) => (Some(map_third_party_kind(tp.kind)), Some(tp.id)),
            None => (None, None),
        };
        let entry = ledger_entries::ActiveModel {
            id: Set(EntryId::new().into_inner()),
            transaction_id: Set(transaction.id),
            account_id: Set(input.account.into_inner()),
            line_no: Set(i32::try_from(line_no + 1).unwrap_or(i32::MAX)),
            description: Set(input.description),
            debit: Set(input.debit),
            credit: Set(input.credit),
            third_party_kind: Set(third_party_kind),
            third_party_id: Set(third_party_id),
            cost_center_id: Set(input.cost_center.map(strata_shared::types::CostCenterId::into_inner)),
        };
        let entry = entry.insert(&txn).await?;

        let mut header: transactions::ActiveModel = transaction.clone().into();
        header.total_debit = Set(transaction.total_debit + input.debit);
        header.total_credit = Set(transaction.total_credit + input.credit);
        header.update(&txn).await?;

        txn.commit().await?;
        Ok(entry)
    }

    /// Posts a draft, making it immutable and balance-effective.
    ///
    /// Every entry's account is re-checked at post time: one that was
    /// deactivated or made non-postable since the draft was written
    /// blocks the whole transaction. Runs under serializable isolation
    /// so two concurrent posts into a period being closed cannot both
    /// succeed.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotDraft`, `EmptyTransaction`, `Unbalanced`,
    /// `AccountInactive`, `AccountNotPostable` or `PeriodClosed` per
    /// the posting rules.
    pub async fn post(&self, id: TransactionId) -> Result<transactions::Model, JournalError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await?;
        let transaction = Self::lock_transaction(&txn, id).await?;
        if transaction.status != TransactionStatus::Draft {
            return Err(LedgerError::TransactionNotDraft(id).into());
        }

        let entries = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::TransactionId.eq(transaction.id))
            .find_also_related(accounts::Entity)
            .all(&txn)
            .await?;
        if entries.is_empty() {
            return Err(LedgerError::EmptyTransaction.into());
        }
        for (entry, account) in entries {
            let account_id = AccountId::from_uuid(entry.account_id);
            let account = account.ok_or(LedgerError::AccountNotFound(account_id))?;
            if !account.is_active {
                return Err(LedgerError::AccountInactive(account_id).into());
            }
            if !account.accepts_posting {
                return Err(LedgerError::AccountNotPostable(account_id).into());
            }
        }
        if transaction.total_debit != transaction.total_credit {
            return Err(LedgerError::Unbalanced {
                debit: transaction.total_debit,
                credit: transaction.total_credit,
            }
            .into());
        }
        Self::ensure_period_open(&txn, transaction.scope_id, transaction.transaction_date).await?;

        let date = transaction.transaction_date;
        let total = transaction.total_debit;
        let mut header: transactions::ActiveModel = transaction.into();
        header.status = Set(TransactionStatus::Posted);
        header.posted_at = Set(Some(Utc::now().into()));
        let posted = header.update(&txn).await?;
        txn.commit().await?;

        info!(transaction_id = %id, date = %date, total = %total, "transaction posted");
        Ok(posted)
    }

    /// Cancels a draft.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotDraft` if the transaction is not a draft.
    pub async fn cancel(&self, id: TransactionId) -> Result<(), JournalError> {
        let txn = self.db.begin().await?;
        let transaction = Self::lock_transaction(&txn, id).await?;
        if transaction.status != TransactionStatus::Draft {
            return Err(LedgerError::TransactionNotDraft(id).into());
        }
        let mut header: transactions::ActiveModel = transaction.into();
        header.status = Set(TransactionStatus::Cancelled);
        header.update(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Reverses a posted transaction by posting a mirror image.
    ///
    /// The reversal is dated no earlier than the original and posts
    /// immediately, even into a closed period.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotPosted` unless the original is posted.
    pub async fn reverse(
        &self,
        id: TransactionId,
        date: Option<NaiveDate>,
        reversed_by: UserId,
    ) -> Result<transactions::Model, JournalError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await?;
        let original = Self::lock_transaction(&txn, id).await?;
        if original.status != TransactionStatus::Posted {
            return Err(LedgerError::TransactionNotPosted(id).into());
        }
        let entries = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::TransactionId.eq(original.id))
            .order_by_asc(ledger_entries::Column::LineNo)
            .all(&txn)
            .await?;

        let reversal_date = date
            .unwrap_or(original.transaction_date)
            .max(original.transaction_date);
        let now = Utc::now();
        let reversal = transactions::ActiveModel {
            id: Set(TransactionId::new().into_inner()),
            scope_id: Set(original.scope_id),
            transaction_date: Set(reversal_date),
            description: Set(format!("Reversal: {}", original.description)),
            source_kind: Set(original.source_kind.clone()),
            source_id: Set(original.source_id),
            apartment_id: Set(original.apartment_id),
            status: Set(TransactionStatus::Posted),
            total_debit: Set(original.total_credit),
            total_credit: Set(original.total_debit),
            created_by: Set(reversed_by.into_inner()),
            created_at: Set(now.into()),
            posted_at: Set(Some(now.into())),
        };
        let reversal = reversal.insert(&txn).await?;

        for entry in entries {
            let mirrored = ledger_entries::ActiveModel {
                id: Set(EntryId::new().into_inner()),
                transaction_id: Set(reversal.id),
                account_id: Set(entry.account_id),
                line_no: Set(entry.line_no),
                description: Set(entry.description),
                debit: Set(entry.credit),
                credit: Set(entry.debit),
                third_party_kind: Set(entry.third_party_kind),
                third_party_id: Set(entry.third_party_id),
                cost_center_id: Set(entry.cost_center_id),
            };
            mirrored.insert(&txn).await?;
        }
        txn.commit().await?;

        info!(original = %id, reversal = %reversal.id, "transaction reversed");
        Ok(reversal)
    }

    /// Loads a transaction with its entries in line order.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` if the ID is unknown.
    pub async fn get_with_entries(
        &self,
        id: TransactionId,
    ) -> Result<TransactionWithEntries, JournalError> {
        let transaction = transactions::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(LedgerError::TransactionNotFound(id))?;
        let entries = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::TransactionId.eq(transaction.id))
            .order_by_asc(ledger_entries::Column::LineNo)
            .all(&self.db)
            .await?;
        Ok(TransactionWithEntries {
            transaction,
            entries,
        })
    }

    /// Loads and row-locks a transaction header.
    async fn lock_transaction(
        txn: &DatabaseTransaction,
        id: TransactionId,
    ) -> Result<transactions::Model, JournalError> {
        transactions::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| LedgerError::TransactionNotFound(id).into())
    }

    /// Fails with `PeriodClosed` if the date sits in a completed closure.
    pub(crate) async fn ensure_period_open(
        txn: &DatabaseTransaction,
        scope_id: uuid::Uuid,
        date: NaiveDate,
    ) -> Result<(), JournalError> {
        let closed = period_closures::Entity::find()
            .filter(period_closures::Column::ScopeId.eq(scope_id))
            .filter(period_closures::Column::Status.eq(ClosureStatus::Completed))
            .filter(period_closures::Column::PeriodStart.lte(date))
            .filter(period_closures::Column::PeriodEnd.gte(date))
            .count(txn)
            .await?;
        if closed > 0 {
            return Err(LedgerError::PeriodClosed(date).into());
        }
        Ok(())
    }
}

pub(crate) fn map_source_kind(kind: strata_core::journal::SourceKind) -> SourceKind {
    match kind {
        strata_core::journal::SourceKind::Invoice => SourceKind::Invoice,
        strata_core::journal::SourceKind::Payment => SourceKind::Payment,
        strata_core::journal::SourceKind::Expense => SourceKind::Expense,
        strata_core::journal::SourceKind::Closure => SourceKind::Closure,
    }
}

fn map_third_party_kind(kind: strata_core::chart::ThirdPartyKind) -> ThirdPartyKind {
    match kind {
        strata_core::chart::ThirdPartyKind::Apartment => ThirdPartyKind::Apartment,
        strata_core::chart::ThirdPartyKind::Provider => ThirdPartyKind::Provider,
    }
}
