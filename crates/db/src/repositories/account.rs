//! Account repository for chart of accounts database operations.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use strata_core::chart::AccountCode;
use strata_core::{CreateAccountInput, LedgerError};
use strata_shared::types::{AccountId, LedgerScopeId};
use uuid::Uuid;

use crate::entities::{
    accounts, ledger_entries,
    sea_orm_active_enums::TransactionStatus,
    transactions,
};

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Ledger rule violation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Account repository for chart of accounts CRUD.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an account within a scope.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCode`, `DuplicateCode` or `OrphanAccount` per
    /// the chart rules, or a database error.
    pub async fn create_account(
        &self,
        scope: LedgerScopeId,
        input: CreateAccountInput,
    ) -> Result<accounts::Model, AccountError> {
        let code = AccountCode::parse(&input.code)?;

        let existing = accounts::Entity::find()
            .filter(accounts::Column::ScopeId.eq(scope.into_inner()))
            .filter(accounts::Column::Code.eq(code.as_str()))
            .count(&self.db)
            .await?;
        if existing > 0 {
            return Err(LedgerError::DuplicateCode(input.code).into());
        }

        if let Some(parent_code) = &input.parent_code {
            let parent_code = AccountCode::parse(parent_code)?;
            if code.parent().as_ref() != Some(&parent_code) {
                return Err(LedgerError::InvalidCode(input.code).into());
            }
            let parent = accounts::Entity::find()
                .filter(accounts::Column::ScopeId.eq(scope.into_inner()))
                .filter(accounts::Column::Code.eq(parent_code.as_str()))
                .count(&self.db)
                .await?;
            if parent == 0 {
                return Err(LedgerError::OrphanAccount {
                    code: input.code,
                    parent: parent_code.as_str().to_string(),
                }
                .into());
            }
        }

        let now = Utc::now().into();
        let account = accounts::ActiveModel {
            id: Set(AccountId::new().into_inner()),
            scope_id: Set(scope.into_inner()),
            code: Set(code.as_str().to_string()),
            name: Set(input.name),
            account_type: Set(input.account_type.into()),
            nature: Set(input
                .nature
                .unwrap_or_else(|| input.account_type.natural_balance())
                .into()),
            accepts_posting: Set(input.accepts_posting),
            requires_third_party: Set(input.requires_third_party),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(account.insert(&self.db).await?)
    }

    /// Bulk-creates accounts, e.g. from a seeded chart.
    ///
    /// # Errors
    ///
    /// Fails on the first row that violates a chart rule.
    pub async fn seed(
        &self,
        scope: LedgerScopeId,
        inputs: Vec<CreateAccountInput>,
    ) -> Result<Vec<accounts::Model>, AccountError> {
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            created.push(self.create_account(scope, input).await?);
        }
        Ok(created)
    }

    /// Looks up an account by ID.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the ID is unknown.
    pub async fn get(&self, id: AccountId) -> Result<accounts::Model, AccountError> {
        accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(id).into())
    }

    /// Looks up an account by code within a scope.
    ///
    /// # Errors
    ///
    /// Returns a database error on query failure.
    pub async fn find_by_code(
        &self,
        scope: LedgerScopeId,
        code: &str,
    ) -> Result<Option<accounts::Model>, AccountError> {
        Ok(accounts::Entity::find()
            .filter(accounts::Column::ScopeId.eq(scope.into_inner()))
            .filter(accounts::Column::Code.eq(code))
            .one(&self.db)
            .await?)
    }

    /// Lists all accounts of a scope in code order.
    ///
    /// # Errors
    ///
    /// Returns a database error on query failure.
    pub async fn list(&self, scope: LedgerScopeId) -> Result<Vec<accounts::Model>, AccountError> {
        Ok(accounts::Entity::find()
            .filter(accounts::Column::ScopeId.eq(scope.into_inner()))
            .order_by_asc(accounts::Column::Code)
            .all(&self.db)
            .await?)
    }

    /// Changes whether an account accepts direct posting.
    ///
    /// Revoking posting considers the whole code subtree: a summary
    /// account over accounts with posted history keeps its flag.
    ///
    /// # Errors
    ///
    /// Returns `AccountInUse` when the account or any descendant has
    /// non-cancelled journal entries.
    pub async fn set_postable(&self, id: AccountId, postable: bool) -> Result<(), AccountError> {
        let account = self.get(id).await?;
        if !postable {
            let subtree: Vec<Uuid> = accounts::Entity::find()
                .filter(accounts::Column::ScopeId.eq(account.scope_id))
                .filter(accounts::Column::Code.starts_with(&account.code))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|a| a.id)
                .collect();
            let entries = ledger_entries::Entity::find()
                .filter(ledger_entries::Column::AccountId.is_in(subtree))
                .inner_join(transactions::Entity)
                .filter(transactions::Column::Status.ne(TransactionStatus::Cancelled))
                .count(&self.db)
                .await?;
            if entries > 0 {
                return Err(LedgerError::AccountInUse(id).into());
            }
        }
        let mut active: accounts::ActiveModel = account.into();
        active.accepts_posting = Set(postable);
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await?;
        Ok(())
    }

    /// Deactivates an account, keeping its history.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the ID is unknown.
    pub async fn deactivate(&self, id: AccountId) -> Result<(), AccountError> {
        self.set_active(id, false).await
    }

    /// Reactivates a previously deactivated account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the ID is unknown.
    pub async fn reactivate(&self, id: AccountId) -> Result<(), AccountError> {
        self.set_active(id, true).await
    }

    /// Physically deletes an account that has never been posted to.
    ///
    /// # Errors
    ///
    /// Returns `AccountInUse` if any journal entry references the
    /// account.
    pub async fn delete(&self, id: AccountId) -> Result<(), AccountError> {
        let account = self.get(id).await?;
        if self.entry_count(id).await? > 0 {
            return Err(LedgerError::AccountInUse(id).into());
        }
        accounts::Entity::delete_by_id(account.id)
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Counts non-cancelled journal entries referencing an account.
    ///
    /// # Errors
    ///
    /// Returns a database error on query failure.
    pub async fn entry_count(&self, id: AccountId) -> Result<u64, AccountError> {
        Ok(ledger_entries::Entity::find()
            .filter(ledger_entries::Column::AccountId.eq(id.into_inner()))
            .inner_join(transactions::Entity)
            .filter(transactions::Column::Status.ne(TransactionStatus::Cancelled))
            .count(&self.db)
            .await?)
    }

    async fn set_active(&self, id: AccountId, active: bool) -> Result<(), AccountError> {
        let account = self.get(id).await?;
        let mut model: accounts::ActiveModel = account.into();
        model.is_active = Set(active);
        model.updated_at = Set(Utc::now().into());
        model.update(&self.db).await?;
        Ok(())
    }
}
