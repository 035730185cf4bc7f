//! Initial database migration.
//!
//! Creates the enums, tables and indexes for the ledger schema.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ENUMS_SQL).await?;
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(LEDGER_ENTRIES_SQL).await?;
        db.execute_unprepared(PERIOD_CLOSURES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
-- Account classification
CREATE TYPE account_type AS ENUM (
    'asset',
    'liability',
    'equity',
    'income',
    'expense',
    'order_debit',
    'order_credit'
);

-- Natural balance side
CREATE TYPE account_nature AS ENUM (
    'debit',
    'credit'
);

-- Transaction lifecycle
CREATE TYPE transaction_status AS ENUM (
    'draft',
    'posted',
    'cancelled'
);

-- Business document kinds
CREATE TYPE source_kind AS ENUM (
    'invoice',
    'payment',
    'expense',
    'closure'
);

-- Third-party kinds for sub-ledger tracking
CREATE TYPE third_party_kind AS ENUM (
    'apartment',
    'provider'
);

-- Closure period granularity
CREATE TYPE period_type AS ENUM (
    'monthly',
    'annual'
);

-- Closure lifecycle
CREATE TYPE closure_status AS ENUM (
    'draft',
    'completed',
    'reversed'
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    scope_id UUID NOT NULL,
    code VARCHAR(10) NOT NULL,
    name VARCHAR(255) NOT NULL,
    account_type account_type NOT NULL,
    nature account_nature NOT NULL,
    accepts_posting BOOLEAN NOT NULL DEFAULT TRUE,
    requires_third_party BOOLEAN NOT NULL DEFAULT FALSE,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_accounts_scope_code UNIQUE (scope_id, code),
    CONSTRAINT ck_accounts_code_shape CHECK (code ~ '^[0-9]+$')
);

CREATE INDEX idx_accounts_scope ON accounts (scope_id);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    scope_id UUID NOT NULL,
    transaction_date DATE NOT NULL,
    description TEXT NOT NULL,
    source_kind source_kind,
    source_id UUID,
    apartment_id UUID,
    status transaction_status NOT NULL DEFAULT 'draft',
    total_debit NUMERIC(18, 2) NOT NULL DEFAULT 0,
    total_credit NUMERIC(18, 2) NOT NULL DEFAULT 0,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    posted_at TIMESTAMPTZ,

    CONSTRAINT ck_transactions_posted_balanced CHECK (
        status <> 'posted' OR total_debit = total_credit
    )
);

CREATE INDEX idx_transactions_scope_date ON transactions (scope_id, transaction_date);
CREATE INDEX idx_transactions_scope_status ON transactions (scope_id, status);
";

const LEDGER_ENTRIES_SQL: &str = r"
CREATE TABLE ledger_entries (
    id UUID PRIMARY KEY,
    transaction_id UUID NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
    account_id UUID NOT NULL REFERENCES accounts(id),
    line_no INTEGER NOT NULL,
    description TEXT,
    debit NUMERIC(18, 2) NOT NULL DEFAULT 0,
    credit NUMERIC(18, 2) NOT NULL DEFAULT 0,
    third_party_kind third_party_kind,
    third_party_id UUID,
    cost_center_id UUID,

    CONSTRAINT uq_ledger_entries_line UNIQUE (transaction_id, line_no),
    CONSTRAINT ck_ledger_entries_one_sided CHECK (
        (debit > 0 AND credit = 0) OR (credit > 0 AND debit = 0)
    ),
    CONSTRAINT ck_ledger_entries_third_party CHECK (
        (third_party_kind IS NULL) = (third_party_id IS NULL)
    )
);

CREATE INDEX idx_ledger_entries_account ON ledger_entries (account_id);
CREATE INDEX idx_ledger_entries_transaction ON ledger_entries (transaction_id);
CREATE INDEX idx_ledger_entries_third_party
    ON ledger_entries (third_party_kind, third_party_id)
    WHERE third_party_id IS NOT NULL;
";

const PERIOD_CLOSURES_SQL: &str = r"
CREATE TABLE period_closures (
    id UUID PRIMARY KEY,
    scope_id UUID NOT NULL,
    fiscal_year INTEGER NOT NULL,
    period_type period_type NOT NULL,
    period_start DATE NOT NULL,
    period_end DATE NOT NULL,
    closure_date DATE NOT NULL,
    status closure_status NOT NULL DEFAULT 'draft',
    total_income NUMERIC(18, 2) NOT NULL DEFAULT 0,
    total_expenses NUMERIC(18, 2) NOT NULL DEFAULT 0,
    net_result NUMERIC(18, 2) NOT NULL DEFAULT 0,
    transaction_id UUID REFERENCES transactions(id),
    closed_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT ck_period_closures_window CHECK (period_start <= period_end)
);

-- Only one effective closure per period; reversed closures do not count.
CREATE UNIQUE INDEX uq_period_closures_completed
    ON period_closures (scope_id, fiscal_year, period_type, period_start)
    WHERE status = 'completed';

CREATE INDEX idx_period_closures_scope ON period_closures (scope_id, status);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS period_closures CASCADE;
DROP TABLE IF EXISTS ledger_entries CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;

DROP TYPE IF EXISTS closure_status;
DROP TYPE IF EXISTS period_type;
DROP TYPE IF EXISTS third_party_kind;
DROP TYPE IF EXISTS source_kind;
DROP TYPE IF EXISTS transaction_status;
DROP TYPE IF EXISTS account_nature;
DROP TYPE IF EXISTS account_type;
";
