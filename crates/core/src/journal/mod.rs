//! The journal: transactions, entries and the posting state machine.
//!
//! Transactions are created as drafts, accumulate entries, and become
//! immutable once posted. Posted transactions are only ever undone by
//! posting a mirrored reversal, never by mutation.

pub mod entry;
pub mod service;
pub mod transaction;
pub mod validation;

pub use entry::{Entry, EntryInput};
pub use service::{Journal, OpenTransactionInput};
pub use transaction::{SourceDocument, SourceKind, Transaction, TransactionStatus};
