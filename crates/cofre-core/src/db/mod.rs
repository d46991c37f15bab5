//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `users` - Registration and credential checks
//! - `banks` - Bank reference data
//! - `accounts` - Account CRUD (balances belong to the ledger)
//! - `cards` - Credit card CRUD
//! - `categories` - Category CRUD
//! - `ledger` - The transaction write path: cutover bucketing, installment
//!   expansion, apply/reverse of balance effects, transfers
//! - `invoices` - Invoice queries and full payment
//! - `bills` - Bills, scheduled payments, and the payment orchestrator
//! - `debts` - Debts and amortizing payments
//! - `investments` - Investment positions

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

mod accounts;
mod banks;
mod bills;
mod cards;
mod categories;
mod debts;
mod investments;
mod invoices;
mod ledger;
mod users;

pub use bills::NewBill;
pub use debts::{NewDebt, PayDebt};
pub use investments::NewInvestment;
pub use invoices::PayInvoice;
pub use ledger::{invoice_bucket, split_installments, Installment};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "COFRE_DB_KEY";

/// Policy knobs for the ledger engine.
#[derive(Debug, Clone, Copy)]
pub struct LedgerPolicy {
    /// When false (the default), any debit that would take an account
    /// balance below zero fails with `InsufficientFunds`. Applies to
    /// account expenses, transfer origins, and bill/debt/invoice payments.
    pub allow_negative_balance: bool,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            allow_negative_balance: false,
        }
    }
}

/// Row counts across the main tables
#[derive(Debug, Clone, Copy)]
pub struct DbStats {
    pub users: i64,
    pub accounts: i64,
    pub transactions: i64,
    pub bills: i64,
    pub debts: i64,
}

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the
/// same key, regardless of database path. This allows moving/renaming the
/// database freely.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Fixed application salt - changing this would invalidate all existing
    // encrypted databases
    const APP_SALT: &[u8; 16] = b"cofre-salt-v1-fx";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    // Extract the hash portion for use as SQLCipher key (hex encoded)
    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
    policy: LedgerPolicy,
}

impl Database {
    /// Create a new database connection pool with encryption
    ///
    /// Requires `COFRE_DB_KEY` to be set; the database is encrypted with
    /// SQLCipher using a key derived from the passphrase via Argon2.
    /// Use `new_unencrypted()` for development/testing without encryption.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool
    ///
    /// WARNING: Only use for development or testing. For production, use
    /// `new()` with `COFRE_DB_KEY` set.
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Create a new database with an explicit encryption key
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        // Every pooled connection needs the key (when encrypted) and
        // foreign_keys, which is per-connection in SQLite
        let pool = if let Some(pass) = passphrase {
            let key = derive_key(pass)?;
            let init = format!(
                "PRAGMA key = 'x\"{}\"'; PRAGMA foreign_keys = ON;",
                key
            );

            let manager = manager.with_init(move |conn| {
                conn.execute_batch(&init)?;
                Ok(())
            });

            Pool::builder().max_size(10).build(manager)?
        } else {
            let manager = manager.with_init(|conn| {
                conn.execute_batch("PRAGMA foreign_keys = ON;")?;
                Ok(())
            });

            Pool::builder().max_size(10).build(manager)?
        };

        let db = Self {
            pool,
            db_path: path.to_string(),
            policy: LedgerPolicy::default(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Replace the ledger policy (builder-style)
    pub fn with_policy(mut self, policy: LedgerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Current ledger policy
    pub fn policy(&self) -> LedgerPolicy {
        self.policy
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create an in-memory database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because SQLCipher
    /// has issues with in-memory databases in the connection pool.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!(
            "{}/cofre_test_{}_{}.db",
            std::env::temp_dir().display(),
            std::process::id(),
            id
        );

        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Row counts for the status command
    pub fn stats(&self) -> Result<DbStats> {
        let conn = self.conn()?;
        let count = |table: &str| -> Result<i64> {
            let sql = format!("SELECT COUNT(*) FROM {}", table);
            Ok(conn.query_row(&sql, [], |row| row.get(0))?)
        };

        Ok(DbStats {
            users: count("users")?,
            accounts: count("accounts")?,
            transactions: count("transactions")?,
            bills: count("bills")?,
            debts: count("debts")?,
        })
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL mode: better concurrency, readers don't block writers
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Users
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Banks (per-user reference data)
            CREATE TABLE IF NOT EXISTS banks (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                name TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_banks_user ON banks(user_id);

            -- Accounts. balance_cents is a derived running total owned by
            -- the ledger engine; nothing else writes it after creation.
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                bank_id INTEGER NOT NULL REFERENCES banks(id),
                name TEXT NOT NULL,
                account_type TEXT NOT NULL,
                balance_cents INTEGER NOT NULL DEFAULT 0,
                active BOOLEAN NOT NULL DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_accounts_user ON accounts(user_id);

            -- Credit cards
            CREATE TABLE IF NOT EXISTS cards (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                name TEXT NOT NULL,
                limit_cents INTEGER NOT NULL,
                closing_day INTEGER NOT NULL CHECK (closing_day BETWEEN 1 AND 31),
                due_day INTEGER NOT NULL CHECK (due_day BETWEEN 1 AND 31),
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_cards_user ON cards(user_id);

            -- Invoices: lazily created monthly aggregates per card.
            -- The UNIQUE key is what the atomic upsert relies on.
            CREATE TABLE IF NOT EXISTS invoices (
                id INTEGER PRIMARY KEY,
                card_id INTEGER NOT NULL REFERENCES cards(id),
                month INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
                year INTEGER NOT NULL,
                total_amount_cents INTEGER NOT NULL DEFAULT 0,
                is_paid BOOLEAN NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(card_id, month, year)
            );

            CREATE INDEX IF NOT EXISTS idx_invoices_card ON invoices(card_id);

            -- Categories
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                description TEXT NOT NULL,
                category_type TEXT NOT NULL,
                active BOOLEAN NOT NULL DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_categories_user ON categories(user_id);

            -- Transactions. Non-transfer rows carry exactly one of
            -- account_id / card_id; card rows also carry invoice_id.
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                tx_type TEXT NOT NULL,
                value_cents INTEGER NOT NULL CHECK (value_cents > 0),
                date DATE NOT NULL,
                description TEXT NOT NULL,
                category_id INTEGER REFERENCES categories(id),
                account_id INTEGER REFERENCES accounts(id),
                card_id INTEGER REFERENCES cards(id),
                invoice_id INTEGER REFERENCES invoices(id),
                target_account_id INTEGER REFERENCES accounts(id),
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_user ON transactions(user_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
            CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_invoice ON transactions(invoice_id);

            -- Bills (scheduled obligations)
            CREATE TABLE IF NOT EXISTS bills (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                description TEXT NOT NULL,
                amount_cents INTEGER NOT NULL CHECK (amount_cents > 0),
                due_day INTEGER NOT NULL CHECK (due_day BETWEEN 1 AND 31),
                recurrence TEXT NOT NULL DEFAULT 'NONE',
                category_id INTEGER NOT NULL REFERENCES categories(id),
                account_id INTEGER REFERENCES accounts(id),
                card_id INTEGER REFERENCES cards(id),
                active BOOLEAN NOT NULL DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_bills_user ON bills(user_id);

            -- Bill payments (scheduled instances)
            CREATE TABLE IF NOT EXISTS bill_payments (
                id INTEGER PRIMARY KEY,
                bill_id INTEGER NOT NULL REFERENCES bills(id) ON DELETE CASCADE,
                due_date DATE NOT NULL,
                amount_cents INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'PENDING',
                payment_date DATE,
                transaction_id INTEGER REFERENCES transactions(id),
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_bill_payments_bill ON bill_payments(bill_id);
            CREATE INDEX IF NOT EXISTS idx_bill_payments_status ON bill_payments(status);

            -- Debts
            CREATE TABLE IF NOT EXISTS debts (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                description TEXT NOT NULL,
                creditor TEXT,
                debt_type TEXT NOT NULL,
                initial_amount_cents INTEGER NOT NULL,
                outstanding_cents INTEGER NOT NULL CHECK (outstanding_cents >= 0),
                interest_rate REAL,
                minimum_payment_cents INTEGER,
                payment_due_day INTEGER,
                bank_id INTEGER REFERENCES banks(id),
                start_date DATE NOT NULL,
                estimated_end_date DATE,
                status TEXT NOT NULL DEFAULT 'ACTIVE',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_debts_user ON debts(user_id);
            CREATE INDEX IF NOT EXISTS idx_debts_status ON debts(status);

            -- Debt payments
            CREATE TABLE IF NOT EXISTS debt_payments (
                id INTEGER PRIMARY KEY,
                debt_id INTEGER NOT NULL REFERENCES debts(id),
                transaction_id INTEGER NOT NULL REFERENCES transactions(id),
                amount_cents INTEGER NOT NULL,
                payment_date DATE NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_debt_payments_debt ON debt_payments(debt_id);

            -- Investments
            CREATE TABLE IF NOT EXISTS investments (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                investment_type TEXT NOT NULL,
                description TEXT NOT NULL,
                quantity REAL NOT NULL,
                acquisition_value_cents INTEGER NOT NULL,
                acquisition_date DATE NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_investments_user ON investments(user_id);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
