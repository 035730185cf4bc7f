//! Balance repository: aggregate queries over posted entries.
//!
//! Leaf balances come from one grouped SUM over the posted entries;
//! the hierarchy roll-up happens in memory over the scope's chart,
//! mirroring the in-memory calculator.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect,
};
use strata_core::chart::AccountCode;
use strata_core::{LedgerError, Nature};
use strata_shared::types::{AccountId, LedgerScopeId};
use uuid::Uuid;

use crate::entities::{
    accounts, ledger_entries, sea_orm_active_enums::TransactionStatus, transactions,
};

/// Error types for balance queries.
#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    /// Ledger rule violation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// One row of a trial balance.
#[derive(Debug, Clone)]
pub struct TrialBalanceRow {
    /// The account.
    pub account: accounts::Model,
    /// Nature-signed balance.
    pub balance: Decimal,
}

#[derive(Debug, FromQueryResult)]
struct AccountSums {
    account_id: Uuid,
    debit: Option<Decimal>,
    credit: Option<Decimal>,
}

/// Balance repository for read-only aggregate queries.
#[derive(Debug, Clone)]
pub struct BalanceRepository {
    db: DatabaseConnection,
}

impl BalanceRepository {
    /// Creates a new balance repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Balance of an account as of a date, signed by its nature.
    ///
    /// Postable accounts sum their own posted entries; non-postable
    /// accounts aggregate their code-derived subtree.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account is unknown.
    pub async fn balance_of(
        &self,
        account: AccountId,
        as_of: NaiveDate,
    ) -> Result<Decimal, BalanceError> {
        let target = accounts::Entity::find_by_id(account.into_inner())
            .one(&self.db)
            .await?
            .ok_or(LedgerError::AccountNotFound(account))?;
        let scope = LedgerScopeId::from_uuid(target.scope_id);
        let chart = self.chart_of(scope).await?;
        let sums = self.sums_for(scope, None, as_of).await?;
        balance_from_sums(&target, &chart, &sums)
    }

    /// Natural-balance movement of an account within a date window.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account is unknown.
    pub async fn activity_between(
        &self,
        account: AccountId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Decimal, BalanceError> {
        let target = accounts::Entity::find_by_id(account.into_inner())
            .one(&self.db)
            .await?
            .ok_or(LedgerError::AccountNotFound(account))?;
        let scope = LedgerScopeId::from_uuid(target.scope_id);
        let chart = self.chart_of(scope).await?;
        let sums = self.sums_for(scope, Some(start), end).await?;
        balance_from_sums(&target, &chart, &sums)
    }

    /// Trial balance for a scope: every active postable account with a
    /// non-zero balance as of the date, in code order.
    ///
    /// # Errors
    ///
    /// Returns a database error on query failure.
    pub async fn trial_balance(
        &self,
        scope: LedgerScopeId,
        as_of: NaiveDate,
    ) -> Result<Vec<TrialBalanceRow>, BalanceError> {
        let chart = self.chart_of(scope).await?;
        let sums = self.sums_for(scope, None, as_of).await?;
        let mut rows = Vec::new();
        for account in &chart {
            if !account.is_active || !account.accepts_posting {
                continue;
            }
            let (debit, credit) = sums.get(&account.id).copied().unwrap_or_default();
            let nature: Nature = account.nature.into();
            let balance = nature.signed(debit, credit);
            if balance != Decimal::ZERO {
                rows.push(TrialBalanceRow {
                    account: account.clone(),
                    balance,
                });
            }
        }
        Ok(rows)
    }

    /// Raw debit-minus-credit movement per account within a window,
    /// keyed by raw account ID. Used by the closure engine.
    ///
    /// # Errors
    ///
    /// Returns a database error on query failure.
    pub async fn raw_activity(
        &self,
        scope: LedgerScopeId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<Uuid, Decimal>, BalanceError> {
        let sums = self.sums_for(scope, Some(start), end).await?;
        Ok(sums
            .into_iter()
            .map(|(id, (debit, credit))| (id, debit - credit))
            .collect())
    }

    /// Loads the full chart of a scope in code order.
    async fn chart_of(&self, scope: LedgerScopeId) -> Result<Vec<accounts::Model>, BalanceError> {
        Ok(accounts::Entity::find()
            .filter(accounts::Column::ScopeId.eq(scope.into_inner()))
            .order_by_asc(accounts::Column::Code)
            .all(&self.db)
            .await?)
    }

    /// Grouped debit/credit sums over posted entries in a window.
    async fn sums_for(
        &self,
        scope: LedgerScopeId,
        start: Option<NaiveDate>,
        end: NaiveDate,
    ) -> Result<HashMap<Uuid, (Decimal, Decimal)>, BalanceError> {
        let mut query = ledger_entries::Entity::find()
            .select_only()
            .column(ledger_entries::Column::AccountId)
            .column_as(ledger_entries::Column::Debit.sum(), "debit")
            .column_as(ledger_entries::Column::Credit.sum(), "credit")
            .inner_join(transactions::Entity)
            .filter(transactions::Column::ScopeId.eq(scope.into_inner()))
            .filter(transactions::Column::Status.eq(TransactionStatus::Posted))
            .filter(transactions::Column::TransactionDate.lte(end));
        if let Some(start) = start {
            query = query.filter(transactions::Column::TransactionDate.gte(start));
        }
        let rows = query
            .group_by(ledger_entries::Column::AccountId)
            .into_model::<AccountSums>()
            .all(&self.db)
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
}

/// Rolls the grouped sums up the code hierarchy for one account.
fn balance_from_sums(
    target: &accounts::Model,
    chart: &[accounts::Model],
    sums: &HashMap<Uuid, (Decimal, Decimal)>,
) -> Result<Decimal, BalanceError> {
    if target.accepts_posting {
        let (debit, credit) = sums.get(&target.id).copied().unwrap_or_default();
        let nature: Nature = target.nature.into();
        return Ok(nature.signed(debit, credit));
    }
    let target_code = AccountCode::parse(&target.code)?;
    let mut total = Decimal::ZERO;
    for child in chart {
        let child_code = AccountCode::parse(&child.code)?;
        if child_code.parent().as_ref() == Some(&target_code) {
            total += balance_from_sums(child, chart, sums)?;
        }
    }
    Ok(total)
}
