//! Double-entry ledger core for the strata administration platform.
//!
//! This crate contains pure business logic with ZERO web or database
//! dependencies. Every financial event in the surrounding platform
//! (invoices, payments, expenses, period closures) posts through here.
//!
//! # Modules
//!
//! - `chart` - Hierarchical chart of accounts and the account registry
//! - `journal` - Transactions, entries, and the posting state machine
//! - `balance` - Balance aggregation over the account hierarchy
//! - `closure` - Fiscal period closure and reversal
//! - `ledger` - The `GeneralLedger` facade external callers use

pub mod balance;
pub mod chart;
pub mod closure;
pub mod error;
pub mod journal;
pub mod ledger;

#[cfg(test)]
mod ledger_props;

pub use balance::BalanceCalculator;
pub use chart::{
    Account, AccountCode, AccountRegistry, AccountType, CreateAccountInput, Nature, ThirdParty,
};
pub use closure::{CloseInput, ClosureBook, ClosureStatus, PeriodClosure, PeriodType};
pub use error::LedgerError;
pub use journal::{
    Entry, EntryInput, Journal, OpenTransactionInput, SourceDocument, Transaction,
    TransactionStatus,
};
pub use ledger::GeneralLedger;
