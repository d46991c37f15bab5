//! Investment positions (plain reference data)

use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Investment;
use crate::money;

fn row_to_investment(row: &rusqlite::Row) -> rusqlite::Result<Investment> {
    let value_cents: i64 = row.get(5)?;
    let date_str: String = row.get(6)?;
    let created_at_str: String = row.get(7)?;

    Ok(Investment {
        id: row.get(0)?,
        user_id: row.get(1)?,
        investment_type: row.get(2)?,
        description: row.get(3)?,
        quantity: row.get(4)?,
        acquisition_value: money::from_cents(value_cents),
        acquisition_date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| Utc::now().date_naive()),
        created_at: parse_datetime(&created_at_str),
    })
}

const INVESTMENT_COLS: &str = "id, user_id, investment_type, description, quantity, \
     acquisition_value_cents, acquisition_date, created_at";

/// An investment to be recorded
#[derive(Debug, Clone, Deserialize)]
pub struct NewInvestment {
    pub investment_type: String,
    pub description: String,
    pub quantity: f64,
    pub acquisition_value: Decimal,
    pub acquisition_date: NaiveDate,
}

impl Database {
    pub fn create_investment(&self, user_id: i64, new: &NewInvestment) -> Result<Investment> {
        if new.description.trim().is_empty() {
            return Err(Error::Validation(
                "Investment description is required".to_string(),
            ));
        }
        if new.quantity <= 0.0 {
            return Err(Error::Validation(format!(
                "Quantity must be positive, got {}",
                new.quantity
            )));
        }
        let value_cents = money::to_positive_cents(new.acquisition_value)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO investments (user_id, investment_type, description, quantity, acquisition_value_cents, acquisition_date)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                user_id,
                new.investment_type,
                new.description,
                new.quantity,
                value_cents,
                new.acquisition_date.to_string(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_investment(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Investment {} not found after insert", id)))
    }

    pub fn list_investments(&self, user_id: i64) -> Result<Vec<Investment>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM investments WHERE user_id = ? ORDER BY acquisition_date DESC",
            INVESTMENT_COLS
        ))?;

        let investments = stmt
            .query_map(params![user_id], row_to_investment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(investments)
    }

    pub fn get_investment(&self, user_id: i64, id: i64) -> Result<Option<Investment>> {
        let conn = self.conn()?;
        let investment = conn
            .query_row(
                &format!(
                    "SELECT {} FROM investments WHERE id = ? AND user_id = ?",
                    INVESTMENT_COLS
                ),
                params![id, user_id],
                row_to_investment,
            )
            .optional()?;
        Ok(investment)
    }

    pub fn update_investment(
        &self,
        user_id: i64,
        id: i64,
        new: &NewInvestment,
    ) -> Result<Investment> {
        if new.description.trim().is_empty() {
            return Err(Error::Validation(
                "Investment description is required".to_string(),
            ));
        }
        let value_cents = money::to_positive_cents(new.acquisition_value)?;

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE investments SET investment_type = ?, description = ?, quantity = ?,
             acquisition_value_cents = ?, acquisition_date = ? WHERE id = ? AND user_id = ?",
            params![
                new.investment_type,
                new.description,
                new.quantity,
                value_cents,
                new.acquisition_date.to_string(),
                id,
                user_id,
            ],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Investment {} not found", id)));
        }
        drop(conn);

        self.get_investment(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Investment {} not found", id)))
    }

    pub fn delete_investment(&self, user_id: i64, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM investments WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Investment {} not found", id)));
        }
        Ok(())
    }
}
