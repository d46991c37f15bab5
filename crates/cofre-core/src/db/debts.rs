//! Debts and amortizing payments

use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::ledger::{apply_account_delta, insert_row};
use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{CategoryType, Debt, DebtPayment, DebtStatus, TxType};
use crate::money;

fn row_to_debt(row: &rusqlite::Row) -> rusqlite::Result<Debt> {
    let initial_cents: i64 = row.get(4)?;
    let outstanding_cents: i64 = row.get(5)?;
    let minimum_cents: Option<i64> = row.get(7)?;
    let start_date_str: String = row.get(10)?;
    let end_date_str: Option<String> = row.get(11)?;
    let status_str: String = row.get(12)?;
    let created_at_str: String = row.get(13)?;

    Ok(Debt {
        id: row.get(0)?,
        user_id: row.get(1)?,
        description: row.get(2)?,
        creditor: row.get(3)?,
        debt_type: row.get(14)?,
        initial_amount: money::from_cents(initial_cents),
        outstanding_balance: money::from_cents(outstanding_cents),
        interest_rate: row.get(6)?,
        minimum_payment: minimum_cents.map(money::from_cents),
        payment_due_day: row.get(8)?,
        bank_id: row.get(9)?,
        start_date: NaiveDate::parse_from_str(&start_date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| Utc::now().date_naive()),
        estimated_end_date: end_date_str
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        status: status_str.parse().unwrap_or(DebtStatus::Active),
        created_at: parse_datetime(&created_at_str),
    })
}

const DEBT_COLS: &str = "id, user_id, description, creditor, initial_amount_cents, \
     outstanding_cents, interest_rate, minimum_payment_cents, payment_due_day, bank_id, \
     start_date, estimated_end_date, status, created_at, debt_type";

fn row_to_debt_payment(row: &rusqlite::Row) -> rusqlite::Result<DebtPayment> {
    let amount_cents: i64 = row.get(3)?;
    let date_str: String = row.get(4)?;
    let created_at_str: String = row.get(5)?;

    Ok(DebtPayment {
        id: row.get(0)?,
        debt_id: row.get(1)?,
        transaction_id: row.get(2)?,
        amount: money::from_cents(amount_cents),
        payment_date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| Utc::now().date_naive()),
        created_at: parse_datetime(&created_at_str),
    })
}

const DEBT_PAYMENT_COLS: &str =
    "id, debt_id, transaction_id, amount_cents, payment_date, created_at";

/// A debt to be created
#[derive(Debug, Clone, Deserialize)]
pub struct NewDebt {
    pub description: String,
    #[serde(default)]
    pub creditor: Option<String>,
    pub debt_type: String,
    pub initial_amount: Decimal,
    #[serde(default)]
    pub interest_rate: Option<f64>,
    #[serde(default)]
    pub minimum_payment: Option<Decimal>,
    #[serde(default)]
    pub payment_due_day: Option<u32>,
    #[serde(default)]
    pub bank_id: Option<i64>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub estimated_end_date: Option<NaiveDate>,
}

/// Payment details for paying down a debt
#[derive(Debug, Clone, Deserialize)]
pub struct PayDebt {
    pub amount: Decimal,
    pub date: NaiveDate,
    pub category_id: i64,
    pub account_id: i64,
}

impl Database {
    /// Create a debt. The outstanding balance starts at the initial amount.
    pub fn create_debt(&self, user_id: i64, new: &NewDebt) -> Result<Debt> {
        if new.description.trim().is_empty() {
            return Err(Error::Validation("Debt description is required".to_string()));
        }
        let initial_cents = money::to_positive_cents(new.initial_amount)?;
        let minimum_cents = new.minimum_payment.map(money::to_positive_cents).transpose()?;

        if let Some(bank_id) = new.bank_id {
            self.get_bank(user_id, bank_id)?
                .ok_or_else(|| Error::NotFound(format!("Bank {} not found", bank_id)))?;
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO debts (user_id, description, creditor, debt_type, initial_amount_cents,
             outstanding_cents, interest_rate, minimum_payment_cents, payment_due_day, bank_id,
             start_date, estimated_end_date)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                user_id,
                new.description,
                new.creditor,
                new.debt_type,
                initial_cents,
                initial_cents,
                new.interest_rate,
                minimum_cents,
                new.payment_due_day,
                new.bank_id,
                new.start_date.to_string(),
                new.estimated_end_date.map(|d| d.to_string()),
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_debt(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Debt {} not found after insert", id)))
    }

    pub fn list_debts(&self, user_id: i64) -> Result<Vec<Debt>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM debts WHERE user_id = ? ORDER BY created_at DESC",
            DEBT_COLS
        ))?;

        let debts = stmt
            .query_map(params![user_id], row_to_debt)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(debts)
    }

    pub fn get_debt(&self, user_id: i64, id: i64) -> Result<Option<Debt>> {
        let conn = self.conn()?;
        let debt = conn
            .query_row(
                &format!("SELECT {} FROM debts WHERE id = ? AND user_id = ?", DEBT_COLS),
                params![id, user_id],
                row_to_debt,
            )
            .optional()?;
        Ok(debt)
    }

    /// Update a debt's descriptive fields. The outstanding balance is only
    /// ever moved by payments.
    pub fn update_debt(&self, user_id: i64, id: i64, new: &NewDebt) -> Result<Debt> {
        if new.description.trim().is_empty() {
            return Err(Error::Validation("Debt description is required".to_string()));
        }
        let minimum_cents = new.minimum_payment.map(money::to_positive_cents).transpose()?;

        if let Some(bank_id) = new.bank_id {
            self.get_bank(user_id, bank_id)?
                .ok_or_else(|| Error::NotFound(format!("Bank {} not found", bank_id)))?;
        }

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE debts SET description = ?, creditor = ?, debt_type = ?, interest_rate = ?,
             minimum_payment_cents = ?, payment_due_day = ?, bank_id = ?, start_date = ?,
             estimated_end_date = ? WHERE id = ? AND user_id = ?",
            params![
                new.description,
                new.creditor,
                new.debt_type,
                new.interest_rate,
                minimum_cents,
                new.payment_due_day,
                new.bank_id,
                new.start_date.to_string(),
                new.estimated_end_date.map(|d| d.to_string()),
                id,
                user_id,
            ],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Debt {} not found", id)));
        }
        drop(conn);

        self.get_debt(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Debt {} not found", id)))
    }

    /// Soft-delete a debt: ACTIVE -> CANCELLED. Terminal states refuse.
    pub fn cancel_debt(&self, user_id: i64, id: i64) -> Result<Debt> {
        let debt = self
            .get_debt(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Debt {} not found", id)))?;
        if debt.status != DebtStatus::Active {
            return Err(Error::Conflict(format!(
                "Debt {} is {} and cannot be cancelled",
                id,
                debt.status.as_str()
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            "UPDATE debts SET status = 'CANCELLED' WHERE id = ? AND user_id = ? AND status = 'ACTIVE'",
            params![id, user_id],
        )?;
        drop(conn);

        self.get_debt(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Debt {} not found", id)))
    }

    /// Payment history for a debt, newest first
    pub fn list_debt_payments(&self, user_id: i64, debt_id: i64) -> Result<Vec<DebtPayment>> {
        self.get_debt(user_id, debt_id)?
            .ok_or_else(|| Error::NotFound(format!("Debt {} not found", debt_id)))?;

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM debt_payments WHERE debt_id = ? ORDER BY payment_date DESC, id DESC",
            DEBT_PAYMENT_COLS
        ))?;

        let payments = stmt
            .query_map(params![debt_id], row_to_debt_payment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(payments)
    }

    /// Pay down a debt: debit the account, record the expense, decrement
    /// the outstanding balance, and flip to PAID_OFF at zero. The payment
    /// may never exceed what is outstanding.
    pub fn pay_debt(&self, user_id: i64, debt_id: i64, pay: &PayDebt) -> Result<DebtPayment> {
        let allow_negative = self.policy().allow_negative_balance;
        let amount_cents = money::to_positive_cents(pay.amount)?;

        let category = self
            .get_category(user_id, pay.category_id)?
            .ok_or_else(|| Error::NotFound(format!("Category {} not found", pay.category_id)))?;
        if category.category_type != CategoryType::Expense {
            return Err(Error::Validation(format!(
                "Category {} is not an expense category",
                pay.category_id
            )));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let debt: Debt = tx
            .query_row(
                &format!("SELECT {} FROM debts WHERE id = ? AND user_id = ?", DEBT_COLS),
                params![debt_id, user_id],
                row_to_debt,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Debt {} not found", debt_id)))?;

        if debt.status != DebtStatus::Active {
            return Err(Error::Conflict(format!(
                "Debt {} is {} and cannot receive payments",
                debt_id,
                debt.status.as_str()
            )));
        }
        let outstanding_cents = money::to_cents(debt.outstanding_balance)?;
        if amount_cents > outstanding_cents {
            return Err(Error::InsufficientFunds(format!(
                "Payment {} exceeds outstanding balance {}",
                pay.amount, debt.outstanding_balance
            )));
        }

        apply_account_delta(&tx, user_id, pay.account_id, -amount_cents, allow_negative)?;

        let description = format!("Debt payment: {}", debt.description);
        let transaction_id = insert_row(
            &tx,
            user_id,
            TxType::Expense,
            amount_cents,
            pay.date,
            &description,
            Some(pay.category_id),
            Some(pay.account_id),
            None,
            None,
            None,
        )?;

        // Guarded decrement; a concurrent payment that would overdraw the
        // debt touches zero rows and fails
        let updated = tx.execute(
            "UPDATE debts SET outstanding_cents = outstanding_cents - ?1
             WHERE id = ?2 AND outstanding_cents >= ?1",
            params![amount_cents, debt_id],
        )?;
        if updated == 0 {
            return Err(Error::InsufficientFunds(format!(
                "Payment {} exceeds outstanding balance",
                pay.amount
            )));
        }
        tx.execute(
            "UPDATE debts SET status = 'PAID_OFF' WHERE id = ? AND outstanding_cents = 0",
            params![debt_id],
        )?;

        tx.execute(
            "INSERT INTO debt_payments (debt_id, transaction_id, amount_cents, payment_date)
             VALUES (?, ?, ?, ?)",
            params![debt_id, transaction_id, amount_cents, pay.date.to_string()],
        )?;
        let payment_id = tx.last_insert_rowid();

        let payment: DebtPayment = tx.query_row(
            &format!("SELECT {} FROM debt_payments WHERE id = ?", DEBT_PAYMENT_COLS),
            params![payment_id],
            row_to_debt_payment,
        )?;

        tx.commit()?;
        Ok(payment)
    }
}
