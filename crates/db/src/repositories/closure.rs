//! Closure repository for fiscal period closure database operations.
//!
//! A closure computes income and expense activity, books the zeroing
//! transaction and records the closure row inside one serializable
//! database transaction, so a concurrent post into the same window
//! either lands before the freeze or fails the period guard.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    FromQueryResult, IsolationLevel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use strata_core::{CloseInput, LedgerError, Nature};
use strata_shared::types::{ClosureId, EntryId, LedgerScopeId, TransactionId, UserId};
use tracing::info;
use uuid::Uuid;

use crate::entities::{
    accounts, ledger_entries, period_closures,
    sea_orm_active_enums::{
        AccountType, ClosureStatus, PeriodType, SourceKind, TransactionStatus,
    },
    transactions,
};

/// Error types for closure operations.
#[derive(Debug, thiserror::Error)]
pub enum ClosureError {
    /// Ledger rule violation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

#[derive(Debug, FromQueryResult)]
struct AccountSums {
    account_id: Uuid,
    debit: Option<Decimal>,
    credit: Option<Decimal>,
}

/// Closure repository for period closure and reopening.
#[derive(Debug, Clone)]
pub struct ClosureRepository {
    db: DatabaseConnection,
}

impl ClosureRepository {
    /// Creates a new closure repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Looks up a closure by ID.
    ///
    /// # Errors
    ///
    /// Returns `ClosureNotFound` if the ID is unknown.
    pub async fn get(&self, id: ClosureId) -> Result<period_closures::Model, ClosureError> {
        period_closures::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::ClosureNotFound(id).into())
    }

    /// Whether a date falls inside any completed closure of a scope.
    ///
    /// # Errors
    ///
    /// Returns a database error on query failure.
    pub async fn is_closed(
        &self,
        scope: LedgerScopeId,
        date: NaiveDate,
    ) -> Result<bool, ClosureError> {
        let count = period_closures::Entity::find()
            .filter(period_closures::Column::ScopeId.eq(scope.into_inner()))
            .filter(period_closures::Column::Status.eq(ClosureStatus::Completed))
            .filter(period_closures::Column::PeriodStart.lte(date))
            .filter(period_closures::Column::PeriodEnd.gte(date))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    /// Closes a period, zeroing income and expense accounts into the
    /// result account.
    ///
    /// # Errors
    ///
    /// - `AlreadyClosed` if a completed closure for the period exists
    /// - `AccountNotFound` / `AccountInactive` / `AccountNotPostable`
    ///   if the result account is unfit
    pub async fn close(
        &self,
        scope: LedgerScopeId,
        input: CloseInput,
    ) -> Result<period_closures::Model, ClosureError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await?;

        let period_type = map_period_type(input.period_type);
        let existing = period_closures::Entity::find()
            .filter(period_closures::Column::ScopeId.eq(scope.into_inner()))
            .filter(period_closures::Column::Status.eq(ClosureStatus::Completed))
            .filter(period_closures::Column::FiscalYear.eq(input.fiscal_year))
            .filter(period_closures::Column::PeriodType.eq(period_type))
            .filter(period_closures::Column::PeriodStart.eq(input.start))
            .one(&txn)
            .await?;
        if let Some(existing) = existing {
            return Err(LedgerError::AlreadyClosed {
                fiscal_year: existing.fiscal_year,
                period_start: existing.period_start,
            }
            .into());
        }

        let result_account = accounts::Entity::find_by_id(input.result_account.into_inner())
            .one(&txn)
            .await?
            .filter(|a| a.scope_id == scope.into_inner())
            .ok_or(LedgerError::AccountNotFound(input.result_account))?;
        if !result_account.is_active {
            return Err(LedgerError::AccountInactive(input.result_account).into());
        }
        if !result_account.accepts_posting {
            return Err(LedgerError::AccountNotPostable(input.result_account).into());
        }

        // Activity of every postable income/expense account in the window.
        let closing_accounts = accounts::Entity::find()
            .filter(accounts::Column::ScopeId.eq(scope.into_inner()))
            .filter(accounts::Column::AcceptsPosting.eq(true))
            .filter(
                accounts::Column::AccountType
                    .is_in([AccountType::Income, AccountType::Expense]),
            )
            .order_by_asc(accounts::Column::Code)
            .all(&txn)
            .await?;
        let sums = window_sums(&txn, scope.into_inner(), input.start, input.end).await?;

        let mut zeroings: Vec<(Uuid, Decimal)> = Vec::new();
        let mut total_income = Decimal::ZERO;
        let mut total_expenses = Decimal::ZERO;
        for account in &closing_accounts {
            let Some(&(debit, credit)) = sums.get(&account.id) else {
                continue;
            };
            let raw = debit - credit;
            if raw == Decimal::ZERO {
                continue;
            }
            zeroings.push((account.id, raw));
            let nature: Nature = account.nature.into();
            let natural = nature.signed(raw, Decimal::ZERO);
            match account.account_type {
                AccountType::Income => total_income += natural,
                _ => total_expenses += natural,
            }
        }
        let net_result = total_income - total_expenses;

        let closure_id = ClosureId::new();
        let transaction_id = if zeroings.is_empty() {
            None
        } else {
            Some(
                insert_closing_transaction(
                    &txn,
                    scope,
                    closure_id,
                    &input,
                    &zeroings,
                    result_account.id,
                )
                .await?,
            )
        };

        let now = Utc::now();
        let closure = period_closures::ActiveModel {
            id: Set(closure_id.into_inner()),
            scope_id: Set(scope.into_inner()),
            fiscal_year: Set(input.fiscal_year),
            period_type: Set(period_type),
            period_start: Set(input.start),
            period_end: Set(input.end),
            closure_date: Set(now.date_naive()),
            status: Set(ClosureStatus::Completed),
            total_income: Set(total_income),
            total_expenses: Set(total_expenses),
            net_result: Set(net_result),
            transaction_id: Set(transaction_id),
            closed_by: Set(input.closed_by.into_inner()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        let closure = closure.insert(&txn).await?;
        txn.commit().await?;

        info!(
            closure_id = %closure_id,
            scope = %scope,
            period_start = %closure.period_start,
            net_result = %closure.net_result,
            "period closed"
        );
        Ok(closure)
    }

    /// Reverses a completed closure, reopening the period.
    ///
    /// # Errors
    ///
    /// - `ClosureNotFound` if the ID is unknown
    /// - `NotCompleted` unless the closure is completed
    pub async fn reverse_closure(
        &self,
        id: ClosureId,
        reversed_by: UserId,
    ) -> Result<Option<TransactionId>, ClosureError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await?;
        let closure = period_closures::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(LedgerError::ClosureNotFound(id))?;
        if closure.status != ClosureStatus::Completed {
            return Err(LedgerError::NotCompleted(id).into());
        }

        let reversal_id = match closure.transaction_id {
            Some(original_id) => Some(
                insert_mirror_transaction(&txn, original_id, reversed_by).await?,
            ),
            None => None,
        };

        let mut model: period_closures::ActiveModel = closure.into();
        model.status = Set(ClosureStatus::Reversed);
        model.updated_at = Set(Utc::now().into());
        model.update(&txn).await?;
        txn.commit().await?;

        info!(closure_id = %id, "period closure reversed");
        Ok(reversal_id.map(TransactionId::from_uuid))
    }
}

/// Grouped debit/credit sums over posted entries inside a window.
async fn window_sums(
    txn: &DatabaseTransaction,
    scope_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<std::collections::HashMap<Uuid, (Decimal, Decimal)>, ClosureError> {
    let rows = ledger_entries::Entity::find()
        .select_only()
        .column(ledger_entries::Column::AccountId)
        .column_as(ledger_entries::Column::Debit.sum(), "debit")
        .column_as(ledger_entries::Column::Credit.sum(), "credit")
        .inner_join(transactions::Entity)
        .filter(transactions::Column::ScopeId.eq(scope_id))
        .filter(transactions::Column::Status.eq(TransactionStatus::Posted))
        .filter(transactions::Column::TransactionDate.gte(start))
        .filter(transactions::Column::TransactionDate.lte(end))
        .group_by(ledger_entries::Column::AccountId)
        .into_model::<AccountSums>()
        .all(txn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            (
                row.account_id,
                (
                    row.debit.unwrap_or(Decimal::ZERO),
                    row.credit.unwrap_or(Decimal::ZERO),
                ),
            )
        })
        .collect())
}

/// Inserts the posted closing transaction with zeroing and result lines.
async fn insert_closing_transaction(
    txn: &DatabaseTransaction,
    scope: LedgerScopeId,
    closure_id: ClosureId,
    input: &CloseInput,
    zeroings: &[(Uuid, Decimal)],
    result_account: Uuid,
) -> Result<Uuid, ClosureError> {
    let now = Utc::now();
    let mut total_debit = Decimal::ZERO;
    let mut total_credit = Decimal::ZERO;
    // Lines: credit what ran net-debit, debit what ran net-credit.
    let mut lines: Vec<(Uuid, Decimal, Decimal)> = Vec::with_capacity(zeroings.len() + 1);
    for &(account_id, raw) in zeroings {
        if raw > Decimal::ZERO {
            total_credit += raw;
            lines.push((account_id, Decimal::ZERO, raw));
        } else {
            total_debit += -raw;
            lines.push((account_id, -raw, Decimal::ZERO));
        }
    }
    // Break-even windows balance on the zeroing lines alone; a
    // zero-amount result line would violate the one-sided check.
    if total_debit > total_credit {
        lines.push((result_account, Decimal::ZERO, total_debit - total_credit));
        total_credit = total_debit;
    } else if total_credit > total_debit {
        lines.push((result_account, total_credit - total_debit, Decimal::ZERO));
        total_debit = total_credit;
    }

    let transaction = transactions::ActiveModel {
        id: Set(TransactionId::new().into_inner()),
        scope_id: Set(scope.into_inner()),
        transaction_date: Set(input.end),
        description: Set(format!(
            "Period closure {} / {}",
            input.fiscal_year, input.start
        )),
        source_kind: Set(Some(SourceKind::Closure)),
        source_id: Set(Some(closure_id.into_inner())),
        apartment_id: Set(None),
        status: Set(TransactionStatus::Posted),
        total_debit: Set(total_debit),
        total_credit: Set(total_credit),
        created_by: Set(input.closed_by.into_inner()),
        created_at: Set(now.into()),
        posted_at: Set(Some(now.into())),
    };
    let transaction = transaction.insert(txn).await?;

    for (line_no, (account_id, debit, credit)) in lines.into_iter().enumerate() {
        let entry = ledger_entries::ActiveModel {
            id: Set(EntryId::new().into_inner()),
            transaction_id: Set(transaction.id),
            account_id: Set(account_id),
            line_no: Set(i32::try_from(line_no + 1).unwrap_or(i32::MAX)),
            description: Set(None),
            debit: Set(debit),
            credit: Set(credit),
            third_party_kind: Set(None),
            third_party_id: Set(None),
            cost_center_id: Set(None),
        };
        entry.insert(txn).await?;
    }
    Ok(transaction.id)
}

/// Inserts a posted mirror of a posted transaction.
async fn insert_mirror_transaction(
    txn: &DatabaseTransaction,
    original_id: Uuid,
    reversed_by: UserId,
) -> Result<Uuid, ClosureError> {
    let original = transactions::Entity::find_by_id(original_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or(LedgerError::TransactionNotFound(TransactionId::from_uuid(
            original_id,
        )))?;
    if original.status != TransactionStatus::Posted {
        return Err(
            LedgerError::TransactionNotPosted(TransactionId::from_uuid(original_id)).into(),
        );
    }
    let entries = ledger_entries::Entity::find()
        .filter(ledger_entries::Column::TransactionId.eq(original.id))
        .order_by_asc(ledger_entries::Column::LineNo)
        .all(txn)
        .await?;

    let now = Utc::now();
    let reversal = transactions::ActiveModel {
        id: Set(TransactionId::new().into_inner()),
        scope_id: Set(original.scope_id),
        transaction_date: Set(original.transaction_date),
        description: Set(format!("Reversal: {}", original.description)),
        source_kind: Set(original.source_kind),
        source_id: Set(original.source_id),
        apartment_id: Set(original.apartment_id),
        status: Set(TransactionStatus::Posted),
        total_debit: Set(original.total_credit),
        total_credit: Set(original.total_debit),
        created_by: Set(reversed_by.into_inner()),
        created_at: Set(now.into()),
        posted_at: Set(Some(now.into())),
    };
    let reversal = reversal.insert(txn).await?;

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
        mirrored.insert(txn).await?;
    }
    Ok(reversal.id)
}

fn map_period_type(period_type: strata_core::PeriodType) -> PeriodType {
    match period_type {
        strata_core::PeriodType::Monthly => PeriodType::Monthly,
        strata_core::PeriodType::Annual => PeriodType::Annual,
    }
}
