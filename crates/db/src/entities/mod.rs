//! `SeaORM` entity definitions for the ledger schema.

pub mod accounts;
pub mod ledger_entries;
pub mod period_closures;
pub mod sea_orm_active_enums;
pub mod transactions;
