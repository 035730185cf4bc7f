//! Journal entry lines.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strata_shared::types::{AccountId, CostCenterId, EntryId, TransactionId};

use crate::chart::ThirdParty;
use crate::error::LedgerError;

/// Input for appending an entry line to a draft transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryInput {
    /// Target account.
    pub account: AccountId,
    /// Optional line description; falls back to the transaction's.
    pub description: Option<String>,
    /// Debit amount. Exactly one of debit/credit must be positive.
    pub debit: Decimal,
    /// Credit amount. Exactly one of debit/credit must be positive.
    pub credit: Decimal,
    /// Third-party reference for sub-ledger accounts.
    pub third_party: Option<ThirdParty>,
    /// Optional analytic cost center.
    pub cost_center: Option<CostCenterId>,
}

impl EntryInput {
    /// Debit entry with no third party or cost center.
    #[must_use]
    pub fn debit(account: AccountId, amount: Decimal) -> Self {
        Self {
            account,
            description: None,
            debit: amount,
            credit: Decimal::ZERO,
            third_party: None,
            cost_center: None,
        }
    }

    /// Credit entry with no third party or cost center.
    #[must_use]
    pub fn credit(account: AccountId, amount: Decimal) -> Self {
        Self {
            account,
            description: None,
            debit: Decimal::ZERO,
            credit: amount,
            third_party: None,
            cost_center: None,
        }
    }

    /// Attaches a third-party reference.
    #[must_use]
    pub fn with_third_party(mut self, third_party: ThirdParty) -> Self {
        self.third_party = Some(third_party);
        self
    }

    /// Attaches a cost center.
    #[must_use]
    pub fn with_cost_center(mut self, cost_center: CostCenterId) -> Self {
        self.cost_center = Some(cost_center);
        self
    }
}

/// A single debit-or-credit line of a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Unique identifier.
    pub id: EntryId,
    /// The owning transaction.
    pub transaction_id: TransactionId,
    /// The account this line hits.
    pub account_id: AccountId,
    /// 1-based position within the transaction.
    pub line_no: u32,
    /// Line description.
    pub description: Option<String>,
    /// Debit amount (zero when the line is a credit).
    pub debit: Decimal,
    /// Credit amount (zero when the line is a debit).
    pub credit: Decimal,
    /// Third-party reference for sub-ledger accounts.
    pub third_party: Option<ThirdParty>,
    /// Optional analytic cost center.
    pub cost_center: Option<CostCenterId>,
}

impl Entry {
    /// Debit minus credit; positive means the line debits the account.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// Checks the one-sided-positive-amount rule for an entry line.
///
/// # Errors
///
/// Returns `AmbiguousEntry` if both sides are zero, both are non-zero,
/// or either side is negative.
pub fn validate_amounts(debit: Decimal, credit: Decimal) -> Result<(), LedgerError> {
    if debit < Decimal::ZERO || credit < Decimal::ZERO {
        return Err(LedgerError::AmbiguousEntry);
    }
    let debit_set = debit > Decimal::ZERO;
    let credit_set = credit > Decimal::ZERO;
    if debit_set == credit_set {
        return Err(LedgerError::AmbiguousEntry);
    }
    Ok(())
}
