//! Posting-time validation of a whole transaction.

use crate::error::LedgerError;

use super::transaction::Transaction;

/// Validates that a draft is fit to post.
///
/// # Errors
///
/// - `EmptyTransaction` if there are no entry lines
/// - `Unbalanced` if total debits and credits differ (exact
///   `Decimal` comparison, no tolerance)
pub fn validate_postable(transaction: &Transaction) -> Result<(), LedgerError> {
    if transaction.entries.is_empty() {
        return Err(LedgerError::EmptyTransaction);
    }
    if !transaction.is_balanced() {
        return Err(LedgerError::Unbalanced {
            debit: transaction.total_debit,
            credit: transaction.total_credit,
        });
    }
    Ok(())
}
