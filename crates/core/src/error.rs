//! Ledger error types for validation and state errors.
//!
//! Every mutating operation returns one of these synchronously to its
//! caller; nothing is swallowed or retried inside the core. The external
//! application layer is expected to surface the error kind verbatim, so
//! each variant carries a stable `code()`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use strata_shared::types::{AccountId, ClosureId, TransactionId};
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Chart of accounts ==========
    /// Account code does not map to a valid hierarchy level.
    #[error("Invalid account code '{0}'")]
    InvalidCode(String),

    /// Account code already exists within the ledger scope.
    #[error("Account code '{0}' already exists in this scope")]
    DuplicateCode(String),

    /// An explicit parent code was given but no such account exists.
    #[error("Parent account '{parent}' for '{code}' not found")]
    OrphanAccount {
        /// The code of the account being created.
        code: String,
        /// The missing parent code.
        parent: String,
    },

    /// Account has journal entries and cannot be altered this way.
    #[error("Account {0} has journal entries and is in use")]
    AccountInUse(AccountId),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Account is inactive and cannot receive entries.
    #[error("Account {0} is inactive")]
    AccountInactive(AccountId),

    /// Account does not accept direct posting.
    #[error("Account {0} does not accept posting")]
    AccountNotPostable(AccountId),

    // ========== Journal entries ==========
    /// Entry on this account must carry a third-party reference.
    #[error("Account {0} requires a third-party reference on every entry")]
    ThirdPartyRequired(AccountId),

    /// Entry must carry exactly one positive amount, debit or credit.
    #[error("Entry must carry exactly one positive amount (debit or credit)")]
    AmbiguousEntry,

    // ========== Transaction state ==========
    /// Operation is only valid while the transaction is a draft.
    #[error("Transaction {0} is not a draft")]
    TransactionNotDraft(TransactionId),

    /// Operation is only valid on a posted transaction.
    #[error("Transaction {0} is not posted")]
    TransactionNotPosted(TransactionId),

    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Transaction debits and credits do not match.
    #[error("Transaction is not balanced. Debit: {debit}, Credit: {credit}")]
    Unbalanced {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// Transaction has no entries.
    #[error("Transaction has no entries")]
    EmptyTransaction,

    // ========== Period closure ==========
    /// Transaction date falls inside a completed period closure.
    #[error("Period containing {0} is closed")]
    PeriodClosed(NaiveDate),

    /// A completed closure already exists for this period.
    #[error("Period starting {period_start} of fiscal year {fiscal_year} is already closed")]
    AlreadyClosed {
        /// Fiscal year of the conflicting closure.
        fiscal_year: i32,
        /// Period start date of the conflicting closure.
        period_start: NaiveDate,
    },

    /// Closure is not in completed status.
    #[error("Closure {0} is not completed")]
    NotCompleted(ClosureId),

    /// Closure not found.
    #[error("Closure not found: {0}")]
    ClosureNotFound(ClosureId),
}

impl LedgerError {
    /// Returns the stable error code for the caller contract.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCode(_) => "INVALID_CODE",
            Self::DuplicateCode(_) => "DUPLICATE_CODE",
            Self::OrphanAccount { .. } => "ORPHAN_ACCOUNT",
            Self::AccountInUse(_) => "ACCOUNT_IN_USE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::AccountNotPostable(_) => "ACCOUNT_NOT_POSTABLE",
            Self::ThirdPartyRequired(_) => "THIRD_PARTY_REQUIRED",
            Self::AmbiguousEntry => "AMBIGUOUS_ENTRY",
            Self::TransactionNotDraft(_) => "TRANSACTION_NOT_DRAFT",
            Self::TransactionNotPosted(_) => "TRANSACTION_NOT_POSTED",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::Unbalanced { .. } => "UNBALANCED",
            Self::EmptyTransaction => "EMPTY_TRANSACTION",
            Self::PeriodClosed(_) => "PERIOD_CLOSED",
            Self::AlreadyClosed { .. } => "ALREADY_CLOSED",
            Self::NotCompleted(_) => "NOT_COMPLETED",
            Self::ClosureNotFound(_) => "CLOSURE_NOT_FOUND",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            LedgerError::InvalidCode("abc".to_string()).code(),
            "INVALID_CODE"
        );
        assert_eq!(
            LedgerError::Unbalanced {
                debit: Decimal::new(100, 2),
                credit: Decimal::new(50, 2),
            }
            .code(),
            "UNBALANCED"
        );
        assert_eq!(LedgerError::AmbiguousEntry.code(), "AMBIGUOUS_ENTRY");
        assert_eq!(LedgerError::EmptyTransaction.code(), "EMPTY_TRANSACTION");
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::Unbalanced {
            debit: Decimal::new(10000, 2),
            credit: Decimal::new(5000, 2),
        };
        assert_eq!(
            err.to_string(),
            "Transaction is not balanced. Debit: 100.00, Credit: 50.00"
        );

        let err = LedgerError::AlreadyClosed {
            fiscal_year: 2025,
            period_start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "Period starting 2025-01-01 of fiscal year 2025 is already closed"
        );
    }

    #[test]
    fn test_account_error_display_includes_id() {
        let id = AccountId::from_uuid(Uuid::nil());
        let err = LedgerError::AccountNotPostable(id);
        assert!(err.to_string().contains(&Uuid::nil().to_string()));
    }
}
