//! Account operations
//!
//! Creation accepts an opening balance; after that, `balance_cents` is
//! mutated only by the ledger engine.

use rusqlite::{params, OptionalExtension};
use rust_decimal::Decimal;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Account, AccountType};
use crate::money;

pub(super) fn row_to_account(row: &rusqlite::Row) -> rusqlite::Result<Account> {
    let type_str: String = row.get(4)?;
    let balance_cents: i64 = row.get(5)?;
    let created_at_str: String = row.get(7)?;

    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        bank_id: row.get(2)?,
        name: row.get(3)?,
        account_type: type_str.parse().unwrap_or(AccountType::Checking),
        balance: money::from_cents(balance_cents),
        active: row.get(6)?,
        created_at: parse_datetime(&created_at_str),
    })
}

const ACCOUNT_COLS: &str =
    "id, user_id, bank_id, name, account_type, balance_cents, active, created_at";

impl Database {
    pub fn create_account(
        &self,
        user_id: i64,
        bank_id: i64,
        name: &str,
        account_type: AccountType,
        opening_balance: Decimal,
    ) -> Result<Account> {
        if name.trim().is_empty() {
            return Err(Error::Validation("Account name is required".to_string()));
        }
        let balance_cents = money::to_cents(opening_balance)?;

        self.get_bank(user_id, bank_id)?
            .ok_or_else(|| Error::NotFound(format!("Bank {} not found", bank_id)))?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO accounts (user_id, bank_id, name, account_type, balance_cents) VALUES (?, ?, ?, ?, ?)",
            params![user_id, bank_id, name, account_type.as_str(), balance_cents],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_account(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Account {} not found after insert", id)))
    }

    pub fn list_accounts(&self, user_id: i64) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM accounts WHERE user_id = ? ORDER BY name",
            ACCOUNT_COLS
        ))?;

        let accounts = stmt
            .query_map(params![user_id], row_to_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    pub fn get_account(&self, user_id: i64, id: i64) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                &format!(
                    "SELECT {} FROM accounts WHERE id = ? AND user_id = ?",
                    ACCOUNT_COLS
                ),
                params![id, user_id],
                row_to_account,
            )
            .optional()?;
        Ok(account)
    }

    /// Update an account's name, bank, and type. The balance is not
    /// updatable through this path.
    pub fn update_account(
        &self,
        user_id: i64,
        id: i64,
        bank_id: i64,
        name: &str,
        account_type: AccountType,
    ) -> Result<Account> {
        if name.trim().is_empty() {
            return Err(Error::Validation("Account name is required".to_string()));
        }
        self.get_bank(user_id, bank_id)?
            .ok_or_else(|| Error::NotFound(format!("Bank {} not found", bank_id)))?;

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE accounts SET name = ?, bank_id = ?, account_type = ? WHERE id = ? AND user_id = ?",
            params![name, bank_id, account_type.as_str(), id, user_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Account {} not found", id)));
        }
        drop(conn);

        self.get_account(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Account {} not found", id)))
    }

    /// Toggle an account between active and inactive
    pub fn toggle_account_status(&self, user_id: i64, id: i64) -> Result<Account> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE accounts SET active = NOT active WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Account {} not found", id)));
        }
        drop(conn);

        self.get_account(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Account {} not found", id)))
    }

    /// Delete an account. Refused while transactions or cards reference it.
    pub fn delete_account(&self, user_id: i64, id: i64) -> Result<()> {
        let conn = self.conn()?;

        self.get_account(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Account {} not found", id)))?;

        let tx_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE account_id = ? OR target_account_id = ?",
            params![id, id],
            |row| row.get(0),
        )?;
        let card_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM cards WHERE account_id = ?",
            params![id],
            |row| row.get(0),
        )?;
        if tx_count > 0 || card_count > 0 {
            return Err(Error::Conflict(format!(
                "Account {} still has {} transaction(s) and {} card(s)",
                id, tx_count, card_count
            )));
        }

        conn.execute(
            "DELETE FROM accounts WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(())
    }
}
