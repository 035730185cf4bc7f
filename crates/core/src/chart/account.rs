//! Account domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strata_shared::types::{AccountId, ApartmentId, LedgerScopeId, ProviderId};
use uuid::Uuid;

use super::code::AccountCode;

/// Account classification.
///
/// The order-account classes (8 and 9 in the chart the platform seeds)
/// track memoranda that never hit the balance sheet but still follow
/// double-entry rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Asset accounts (cash, receivables, property).
    Asset,
    /// Liability accounts (payables, advance collections).
    Liability,
    /// Equity accounts (reserves, period results).
    Equity,
    /// Income accounts (fees, fines, interest).
    Income,
    /// Expense accounts (maintenance, utilities, payroll).
    Expense,
    /// Debit-natured order accounts.
    OrderDebit,
    /// Credit-natured order accounts.
    OrderCredit,
}

impl AccountType {
    /// The side on which this account type conventionally grows.
    #[must_use]
    pub fn natural_balance(self) -> Nature {
        match self {
            Self::Asset | Self::Expense | Self::OrderDebit => Nature::Debit,
            Self::Liability | Self::Equity | Self::Income | Self::OrderCredit => Nature::Credit,
        }
    }

    /// Returns true for the result-statement types zeroed at period end.
    #[must_use]
    pub fn closes_at_period_end(self) -> bool {
        matches!(self, Self::Income | Self::Expense)
    }
}

/// Natural balance side of an account.
///
/// - Debit-natured: balance += debit - credit (asset, expense)
/// - Credit-natured: balance += credit - debit (liability, equity, income)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nature {
    /// Balance grows with debits.
    Debit,
    /// Balance grows with credits.
    Credit,
}

impl Nature {
    /// Applies the natural-balance sign to a raw debit/credit pair.
    #[must_use]
    pub fn signed(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }
}

/// Kind of third party referenced by an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThirdPartyKind {
    /// An apartment in the complex (receivables sub-ledger).
    Apartment,
    /// A provider (payables sub-ledger).
    Provider,
}

/// A third-party reference for sub-ledger tracking.
///
/// Required on entries against accounts flagged `requires_third_party`
/// (receivables per apartment, payables per provider).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThirdParty {
    /// The kind of third party.
    pub kind: ThirdPartyKind,
    /// The referenced entity ID.
    pub id: Uuid,
}

impl ThirdParty {
    /// Reference to an apartment.
    #[must_use]
    pub const fn apartment(id: ApartmentId) -> Self {
        Self {
            kind: ThirdPartyKind::Apartment,
            id: id.into_inner(),
        }
    }

    /// Reference to a provider.
    #[must_use]
    pub const fn provider(id: ProviderId) -> Self {
        Self {
            kind: ThirdPartyKind::Provider,
            id: id.into_inner(),
        }
    }
}

/// A chart of accounts entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// The ledger scope this account belongs to.
    pub scope: LedgerScopeId,
    /// The hierarchical account code, unique within the scope.
    pub code: AccountCode,
    /// Display name.
    pub name: String,
    /// Account classification.
    pub account_type: AccountType,
    /// Natural balance side.
    pub nature: Nature,
    /// Whether entries may target this account directly.
    ///
    /// Non-postable accounts only aggregate their children.
    pub accepts_posting: bool,
    /// Whether entries must carry a third-party reference.
    pub requires_third_party: bool,
    /// Whether the account is active.
    pub is_active: bool,
}

impl Account {
    /// The hierarchy level derived from the code.
    #[must_use]
    pub fn level(&self) -> u8 {
        self.code.level()
    }
}
