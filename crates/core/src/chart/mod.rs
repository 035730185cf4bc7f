//! Hierarchical chart of accounts.
//!
//! Accounts are identified by digit codes whose length encodes the
//! hierarchy level (1/2/4/6/8/10 digits for levels 1-6). Parent
//! relationships are derived from code prefixes and parent balances
//! are always computed, never stored.

pub mod account;
pub mod code;
pub mod registry;

pub use account::{Account, AccountType, Nature, ThirdParty, ThirdPartyKind};
pub use code::AccountCode;
pub use registry::{AccountRegistry, CreateAccountInput};
