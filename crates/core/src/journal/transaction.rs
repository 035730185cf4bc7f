//! Transaction types and the posting state machine.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strata_shared::types::{ApartmentId, LedgerScopeId, TransactionId, UserId};
use uuid::Uuid;

use super::entry::Entry;

/// Transaction lifecycle.
///
/// `Draft -> Posted` and `Draft -> Cancelled` are the only allowed
/// moves. Posted and cancelled transactions are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Editable; entries may be added.
    Draft,
    /// Immutable; affects balances.
    Posted,
    /// Discarded draft; never affects balances.
    Cancelled,
}

impl TransactionStatus {
    /// Whether entries may still be added or the transaction cancelled.
    #[must_use]
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Whether the transaction has reached a final state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Posted | Self::Cancelled)
    }
}

/// Kind of business document a transaction originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Issued invoice (fees, fines).
    Invoice,
    /// Received payment.
    Payment,
    /// Supplier expense.
    Expense,
    /// Fiscal period closure.
    Closure,
}

/// Reference to the business document that produced a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Document kind.
    pub kind: SourceKind,
    /// Document ID in its own store.
    pub id: Uuid,
}

/// A journal transaction: a dated, balanced group of entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier.
    pub id: TransactionId,
    /// The ledger scope this transaction belongs to.
    pub scope: LedgerScopeId,
    /// Accounting date (independent of creation time).
    pub transaction_date: NaiveDate,
    /// Human-readable description.
    pub description: String,
    /// Originating business document, if any.
    pub source: Option<SourceDocument>,
    /// Apartment this transaction concerns, if any.
    pub apartment_id: Option<ApartmentId>,
    /// Lifecycle status.
    pub status: TransactionStatus,
    /// Cached sum of entry debits.
    pub total_debit: Decimal,
    /// Cached sum of entry credits.
    pub total_credit: Decimal,
    /// User who created the transaction.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Posting timestamp, set on the draft-to-posted move.
    pub posted_at: Option<DateTime<Utc>>,
    /// Entry lines in order.
    pub entries: Vec<Entry>,
}

impl Transaction {
    /// Whether totals balance exactly.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(TransactionStatus::Draft.is_editable());
        assert!(!TransactionStatus::Draft.is_terminal());
        assert!(!TransactionStatus::Posted.is_editable());
        assert!(TransactionStatus::Posted.is_terminal());
        assert!(!TransactionStatus::Cancelled.is_editable());
        assert!(TransactionStatus::Cancelled.is_terminal());
    }
}
