//! Repository abstractions for ledger data access.
//!
//! Each repository owns one concern and enforces the same rules as the
//! in-memory core: the posting state machine, the period-closure guard
//! and the account lifecycle guards hold at the database layer too.

pub mod account;
pub mod balance;
pub mod closure;
pub mod journal;

pub use account::AccountRepository;
pub use balance::BalanceRepository;
pub use closure::ClosureRepository;
pub use journal::JournalRepository;
