//! Credit card operations

use rusqlite::{params, OptionalExtension};
use rust_decimal::Decimal;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Card;
use crate::money;

fn row_to_card(row: &rusqlite::Row) -> rusqlite::Result<Card> {
    let limit_cents: i64 = row.get(4)?;
    let created_at_str: String = row.get(7)?;

    Ok(Card {
        id: row.get(0)?,
        user_id: row.get(1)?,
        account_id: row.get(2)?,
        name: row.get(3)?,
        limit: money::from_cents(limit_cents),
        closing_day: row.get(5)?,
        due_day: row.get(6)?,
        created_at: parse_datetime(&created_at_str),
    })
}

const CARD_COLS: &str = "id, user_id, account_id, name, limit_cents, closing_day, due_day, created_at";

fn check_day(label: &str, day: u32) -> Result<()> {
    if !(1..=31).contains(&day) {
        return Err(Error::Validation(format!(
            "{} must be between 1 and 31, got {}",
            label, day
        )));
    }
    Ok(())
}

impl Database {
    pub fn create_card(
        &self,
        user_id: i64,
        account_id: i64,
        name: &str,
        limit: Decimal,
        closing_day: u32,
        due_day: u32,
    ) -> Result<Card> {
        if name.trim().is_empty() {
            return Err(Error::Validation("Card name is required".to_string()));
        }
        check_day("Closing day", closing_day)?;
        check_day("Due day", due_day)?;
        let limit_cents = money::to_positive_cents(limit)?;

        self.get_account(user_id, account_id)?
            .ok_or_else(|| Error::NotFound(format!("Account {} not found", account_id)))?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO cards (user_id, account_id, name, limit_cents, closing_day, due_day) VALUES (?, ?, ?, ?, ?, ?)",
            params![user_id, account_id, name, limit_cents, closing_day, due_day],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_card(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Card {} not found after insert", id)))
    }

    pub fn list_cards(&self, user_id: i64) -> Result<Vec<Card>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM cards WHERE user_id = ? ORDER BY name",
            CARD_COLS
        ))?;

        let cards = stmt
            .query_map(params![user_id], row_to_card)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(cards)
    }

    pub fn get_card(&self, user_id: i64, id: i64) -> Result<Option<Card>> {
        let conn = self.conn()?;
        let card = conn
            .query_row(
                &format!("SELECT {} FROM cards WHERE id = ? AND user_id = ?", CARD_COLS),
                params![id, user_id],
                row_to_card,
            )
            .optional()?;
        Ok(card)
    }

    /// Update a card. Changing closing_day affects only future bucketing;
    /// existing transactions keep their invoice.
    pub fn update_card(
        &self,
        user_id: i64,
        id: i64,
        account_id: i64,
        name: &str,
        limit: Decimal,
        closing_day: u32,
        due_day: u32,
    ) -> Result<Card> {
        if name.trim().is_empty() {
            return Err(Error::Validation("Card name is required".to_string()));
        }
        check_day("Closing day", closing_day)?;
        check_day("Due day", due_day)?;
        let limit_cents = money::to_positive_cents(limit)?;

        self.get_account(user_id, account_id)?
            .ok_or_else(|| Error::NotFound(format!("Account {} not found", account_id)))?;

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE cards SET account_id = ?, name = ?, limit_cents = ?, closing_day = ?, due_day = ? WHERE id = ? AND user_id = ?",
            params![account_id, name, limit_cents, closing_day, due_day, id, user_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Card {} not found", id)));
        }
        drop(conn);

        self.get_card(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Card {} not found", id)))
    }

    /// Delete a card. Refused while invoices or transactions reference it.
    pub fn delete_card(&self, user_id: i64, id: i64) -> Result<()> {
        let conn = self.conn()?;

        self.get_card(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Card {} not found", id)))?;

        let tx_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE card_id = ?",
            params![id],
            |row| row.get(0),
        )?;
        let invoice_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM invoices WHERE card_id = ?",
            params![id],
            |row| row.get(0),
        )?;
        if tx_count > 0 || invoice_count > 0 {
            return Err(Error::Conflict(format!(
                "Card {} still has {} transaction(s) and {} invoice(s)",
                id, tx_count, invoice_count
            )));
        }

        conn.execute(
            "DELETE FROM cards WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(())
    }
}
