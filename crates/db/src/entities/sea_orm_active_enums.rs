//! `SeaORM` active enums mapping the PostgreSQL enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account classification.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_type")]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Asset accounts.
    #[sea_orm(string_value = "asset")]
    Asset,
    /// Liability accounts.
    #[sea_orm(string_value = "liability")]
    Liability,
    /// Equity accounts.
    #[sea_orm(string_value = "equity")]
    Equity,
    /// Income accounts.
    #[sea_orm(string_value = "income")]
    Income,
    /// Expense accounts.
    #[sea_orm(string_value = "expense")]
    Expense,
    /// Debit-natured order accounts.
    #[sea_orm(string_value = "order_debit")]
    OrderDebit,
    /// Credit-natured order accounts.
    #[sea_orm(string_value = "order_credit")]
    OrderCredit,
}

impl From<strata_core::AccountType> for AccountType {
    fn from(value: strata_core::AccountType) -> Self {
        match value {
            strata_core::AccountType::Asset => Self::Asset,
            strata_core::AccountType::Liability => Self::Liability,
            strata_core::AccountType::Equity => Self::Equity,
            strata_core::AccountType::Income => Self::Income,
            strata_core::AccountType::Expense => Self::Expense,
            strata_core::AccountType::OrderDebit => Self::OrderDebit,
            strata_core::AccountType::OrderCredit => Self::OrderCredit,
        }
    }
}

impl From<AccountType> for strata_core::AccountType {
    fn from(value: AccountType) -> Self {
        match value {
            AccountType::Asset => Self::Asset,
            AccountType::Liability => Self::Liability,
            AccountType::Equity => Self::Equity,
            AccountType::Income => Self::Income,
            AccountType::Expense => Self::Expense,
            AccountType::OrderDebit => Self::OrderDebit,
            AccountType::OrderCredit => Self::OrderCredit,
        }
    }
}

/// Natural balance side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_nature")]
#[serde(rename_all = "lowercase")]
pub enum Nature {
    /// Balance grows with debits.
    #[sea_orm(string_value = "debit")]
    Debit,
    /// Balance grows with credits.
    #[sea_orm(string_value = "credit")]
    Credit,
}

impl From<strata_core::Nature> for Nature {
    fn from(value: strata_core::Nature) -> Self {
        match value {
            strata_core::Nature::Debit => Self::Debit,
            strata_core::Nature::Credit => Self::Credit,
        }
    }
}

impl From<Nature> for strata_core::Nature {
    fn from(value: Nature) -> Self {
        match value {
            Nature::Debit => Self::Debit,
            Nature::Credit => Self::Credit,
        }
    }
}

/// Transaction lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_status")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Editable draft.
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Immutable, balance-effective.
    #[sea_orm(string_value = "posted")]
    Posted,
    /// Discarded draft.
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Kind of business document behind a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "source_kind")]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Issued invoice.
    #[sea_orm(string_value = "invoice")]
    Invoice,
    /// Received payment.
    #[sea_orm(string_value = "payment")]
    Payment,
    /// Supplier expense.
    #[sea_orm(string_value = "expense")]
    Expense,
    /// Fiscal period closure.
    #[sea_orm(string_value = "closure")]
    Closure,
}

/// Kind of third party referenced by an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "third_party_kind")]
#[serde(rename_all = "lowercase")]
pub enum ThirdPartyKind {
    /// An apartment (receivables sub-ledger).
    #[sea_orm(string_value = "apartment")]
    Apartment,
    /// A provider (payables sub-ledger).
    #[sea_orm(string_value = "provider")]
    Provider,
}

/// Granularity of a closed period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "period_type")]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    /// Calendar month.
    #[sea_orm(string_value = "monthly")]
    Monthly,
    /// Full fiscal year.
    #[sea_orm(string_value = "annual")]
    Annual,
}

/// Closure lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "closure_status")]
#[serde(rename_all = "lowercase")]
pub enum ClosureStatus {
    /// Being computed.
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Effective; the period is frozen.
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Undone; the period is open again.
    #[sea_orm(string_value = "reversed")]
    Reversed,
}
