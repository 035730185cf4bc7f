//! The account registry: owns the account hierarchy per ledger scope.
//!
//! The registry is read-mostly and holds no balances; it resolves
//! account lookups for the journal and guards the account lifecycle.
//! Every call takes the ledger scope (or an `AccountId` resolved
//! through it) explicitly - there is no ambient tenant state.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use strata_shared::types::{AccountId, LedgerScopeId};
use tracing::warn;

use super::account::{Account, AccountType, Nature};
use super::code::AccountCode;
use crate::error::LedgerError;

/// Input for creating an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountInput {
    /// Account code (digit string, length encodes the level).
    pub code: String,
    /// Display name.
    pub name: String,
    /// Account classification.
    pub account_type: AccountType,
    /// Natural balance side; defaults to the type's convention.
    pub nature: Option<Nature>,
    /// Explicit parent code. When given it must be the code-derived
    /// parent and must already exist.
    pub parent_code: Option<String>,
    /// Whether entries may target this account directly.
    pub accepts_posting: bool,
    /// Whether entries must carry a third-party reference.
    pub requires_third_party: bool,
}

/// In-memory, multi-scope chart of accounts.
#[derive(Debug, Default)]
pub struct AccountRegistry {
    accounts: HashMap<AccountId, Account>,
    by_code: HashMap<LedgerScopeId, BTreeMap<AccountCode, AccountId>>,
}

impl AccountRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an account within a scope.
    ///
    /// # Errors
    ///
    /// - `InvalidCode` if the code shape is invalid or an explicit
    ///   parent code is not the code-derived parent
    /// - `DuplicateCode` if the code already exists in the scope
    /// - `OrphanAccount` if an explicit parent code is not found
    pub fn create_account(
        &mut self,
        scope: LedgerScopeId,
        input: CreateAccountInput,
    ) -> Result<AccountId, LedgerError> {
        let code = AccountCode::parse(&input.code)?;

        if let Some(codes) = self.by_code.get(&scope) {
            if codes.contains_key(&code) {
                return Err(LedgerError::DuplicateCode(input.code));
            }
        }

        if let Some(parent_code) = &input.parent_code {
            let parent_code = AccountCode::parse(parent_code)?;
            if code.parent().as_ref() != Some(&parent_code) {
                // A prefix-violating hierarchy could never be resolved back.
                return Err(LedgerError::InvalidCode(input.code));
            }
            if self.find_by_code(scope, parent_code.as_str()).is_none() {
                return Err(LedgerError::OrphanAccount {
                    code: input.code,
                    parent: parent_code.as_str().to_string(),
                });
            }
        }

        if let Some(parent) = self.resolve_parent(scope, &code) {
            if parent.accepts_posting {
                warn!(
                    scope = %scope,
                    code = %code,
                    parent = %parent.code,
                    "parent of new account still accepts posting"
                );
            }
        }

        let id = AccountId::new();
        let account = Account {
            id,
            scope,
            code: code.clone(),
            name: input.name,
            account_type: input.account_type,
            nature: input
                .nature
                .unwrap_or_else(|| input.account_type.natural_balance()),
            accepts_posting: input.accepts_posting,
            requires_third_party: input.requires_third_party,
            is_active: true,
        };

        self.accounts.insert(id, account);
        self.by_code.entry(scope).or_default().insert(code, id);
        Ok(id)
    }

    /// Bulk-creates accounts, e.g. from a seeded chart.
    ///
    /// Rows are processed in order; derived parents missing at insert
    /// time are tolerated (seed repair happens out of order), explicit
    /// parent references are not.
    pub fn seed(
        &mut self,
        scope: LedgerScopeId,
        inputs: Vec<CreateAccountInput>,
    ) -> Result<Vec<AccountId>, LedgerError> {
        let mut ids = Vec::with_capacity(inputs.len());
        for input in inputs {
            ids.push(self.create_account(scope, input)?);
        }
        Ok(ids)
    }

    /// Looks up an account by ID.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the ID is unknown.
    pub fn get(&self, id: AccountId) -> Result<&Account, LedgerError> {
        self.accounts
            .get(&id)
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Looks up an account by code within a scope.
    #[must_use]
    pub fn find_by_code(&self, scope: LedgerScopeId, code: &str) -> Option<&Account> {
        let code = AccountCode::parse(code).ok()?;
        let id = self.by_code.get(&scope)?.get(&code)?;
        self.accounts.get(id)
    }

    /// Resolves the code-derived parent of an account code.
    ///
    /// A missing expected parent is a data-integrity warning, not a
    /// failure: charts are seeded and repaired out of order.
    #[must_use]
    pub fn resolve_parent(&self, scope: LedgerScopeId, code: &AccountCode) -> Option<&Account> {
        let parent_code = code.parent()?;
        let found = self
            .by_code
            .get(&scope)
            .and_then(|codes| codes.get(&parent_code))
            .and_then(|id| self.accounts.get(id));
        if found.is_none() {
            warn!(
                scope = %scope,
                code = %code,
                parent = %parent_code,
                "derived parent account missing"
            );
        }
        found
    }

    /// Returns the direct children of an account, in code order.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the ID is unknown.
    pub fn children(&self, id: AccountId) -> Result<Vec<&Account>, LedgerError> {
        let account = self.get(id)?;
        let Some(codes) = self.by_code.get(&account.scope) else {
            return Ok(Vec::new());
        };
        Ok(codes
            .values()
            .filter_map(|child_id| self.accounts.get(child_id))
            .filter(|child| child.code.parent().as_ref() == Some(&account.code))
            .collect())
    }

    /// Iterates all accounts in a scope, in code order.
    pub fn accounts_in(&self, scope: LedgerScopeId) -> impl Iterator<Item = &Account> {
        self.by_code
            .get(&scope)
            .into_iter()
            .flat_map(|codes| codes.values())
            .filter_map(move |id| self.accounts.get(id))
    }

    /// Changes whether an account accepts direct posting.
    ///
    /// `entry_count` reports how many journal entries reference an
    /// account. Revoking posting is blocked while the account, or any
    /// account under it in the code hierarchy, carries entries: a
    /// summary account over posted history must stay queryable as-is.
    ///
    /// # Errors
    ///
    /// Returns `AccountInUse` when revoking posting on an account whose
    /// subtree already has entries.
    pub fn set_postable<F>(
        &mut self,
        id: AccountId,
        postable: bool,
        entry_count: F,
    ) -> Result<(), LedgerError>
    where
        F: Fn(AccountId) -> u64,
    {
        if !postable {
            let account = self.get(id)?;
            let scope = account.scope;
            let code = account.code.clone();
            let in_use = entry_count(id) > 0
                || self
                    .accounts_in(scope)
                    .any(|a| code.is_ancestor_of(&a.code) && entry_count(a.id) > 0);
            if in_use {
                return Err(LedgerError::AccountInUse(id));
            }
        }
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(LedgerError::AccountNotFound(id))?;
        account.accepts_posting = postable;
        Ok(())
    }

    /// Deactivates an account. History is preserved; the account simply
    /// stops accepting new entries.
    pub fn deactivate(&mut self, id: AccountId) -> Result<(), LedgerError> {
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(LedgerError::AccountNotFound(id))?;
        account.is_active = false;
        Ok(())
    }

    /// Reactivates a previously deactivated account.
    pub fn reactivate(&mut self, id: AccountId) -> Result<(), LedgerError> {
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(LedgerError::AccountNotFound(id))?;
        account.is_active = true;
        Ok(())
    }

    /// Physically deletes an account.
    ///
    /// Only allowed while zero entries reference it; financial history
    /// never silently disappears.
    ///
    /// # Errors
    ///
    /// Returns `AccountInUse` if any journal entry references the
    /// account.
    pub fn delete<F>(&mut self, id: AccountId, entry_count: F) -> Result<(), LedgerError>
    where
        F: Fn(AccountId) -> u64,
    {
        let account = self.get(id)?;
        if entry_count(id) > 0 {
            return Err(LedgerError::AccountInUse(id));
        }
        let scope = account.scope;
        let code = account.code.clone();
        self.accounts.remove(&id);
        if let Some(codes) = self.by_code.get_mut(&scope) {
            codes.remove(&code);
        }
        Ok(())
    }
}
