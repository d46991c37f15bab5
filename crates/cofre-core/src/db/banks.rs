//! Bank reference data

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Bank;

fn row_to_bank(row: &rusqlite::Row) -> rusqlite::Result<Bank> {
    let created_at_str: String = row.get(3)?;
    Ok(Bank {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    pub fn create_bank(&self, user_id: i64, name: &str) -> Result<Bank> {
        if name.trim().is_empty() {
            return Err(Error::Validation("Bank name is required".to_string()));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO banks (user_id, name) VALUES (?, ?)",
            params![user_id, name],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_bank(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Bank {} not found after insert", id)))
    }

    pub fn list_banks(&self, user_id: i64) -> Result<Vec<Bank>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, created_at FROM banks WHERE user_id = ? ORDER BY name",
        )?;

        let banks = stmt
            .query_map(params![user_id], row_to_bank)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(banks)
    }

    pub fn get_bank(&self, user_id: i64, id: i64) -> Result<Option<Bank>> {
        let conn = self.conn()?;
        let bank = conn
            .query_row(
                "SELECT id, user_id, name, created_at FROM banks WHERE id = ? AND user_id = ?",
                params![id, user_id],
                row_to_bank,
            )
            .optional()?;
        Ok(bank)
    }

    pub fn update_bank(&self, user_id: i64, id: i64, name: &str) -> Result<Bank> {
        if name.trim().is_empty() {
            return Err(Error::Validation("Bank name is required".to_string()));
        }

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE banks SET name = ? WHERE id = ? AND user_id = ?",
            params![name, id, user_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Bank {} not found", id)));
        }
        drop(conn);

        self.get_bank(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Bank {} not found", id)))
    }

    pub fn delete_bank(&self, user_id: i64, id: i64) -> Result<()> {
        let conn = self.conn()?;

        let in_use: i64 = conn.query_row(
            "SELECT COUNT(*) FROM accounts WHERE bank_id = ?",
            params![id],
            |row| row.get(0),
        )?;
        if in_use > 0 {
            return Err(Error::Conflict(format!(
                "Bank {} is referenced by {} account(s)",
                id, in_use
            )));
        }

        let deleted = conn.execute(
            "DELETE FROM banks WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Bank {} not found", id)));
        }
        Ok(())
    }
}
