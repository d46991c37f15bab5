//! Bills, scheduled payments, and the bill payment orchestrator

use chrono::{Datelike, Months, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::ledger::{
    apply_account_delta, apply_invoice_delta, card_closing_day, insert_row,
};
use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Bill, BillPayment, PaymentStatus, Recurrence, Target, TxType};
use crate::money;

fn row_to_bill(row: &rusqlite::Row) -> rusqlite::Result<Bill> {
    let amount_cents: i64 = row.get(3)?;
    let recurrence_str: String = row.get(5)?;
    let created_at_str: String = row.get(10)?;

    Ok(Bill {
        id: row.get(0)?,
        user_id: row.get(1)?,
        description: row.get(2)?,
        amount: money::from_cents(amount_cents),
        due_day: row.get(4)?,
        recurrence: recurrence_str.parse().unwrap_or(Recurrence::None),
        category_id: row.get(6)?,
        account_id: row.get(7)?,
        card_id: row.get(8)?,
        active: row.get(9)?,
        created_at: parse_datetime(&created_at_str),
    })
}

fn row_to_payment(row: &rusqlite::Row) -> rusqlite::Result<BillPayment> {
    let due_date_str: String = row.get(2)?;
    let amount_cents: i64 = row.get(3)?;
    let status_str: String = row.get(4)?;
    let payment_date_str: Option<String> = row.get(5)?;
    let created_at_str: String = row.get(7)?;

    Ok(BillPayment {
        id: row.get(0)?,
        bill_id: row.get(1)?,
        due_date: NaiveDate::parse_from_str(&due_date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| Utc::now().date_naive()),
        amount: money::from_cents(amount_cents),
        status: status_str.parse().unwrap_or(PaymentStatus::Pending),
        payment_date: payment_date_str
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        transaction_id: row.get(6)?,
        created_at: parse_datetime(&created_at_str),
    })
}

const BILL_COLS: &str = "id, user_id, description, amount_cents, due_day, recurrence, \
     category_id, account_id, card_id, active, created_at";
const PAYMENT_COLS: &str =
    "id, bill_id, due_date, amount_cents, status, payment_date, transaction_id, created_at";

/// A bill to be created
#[derive(Debug, Clone, Deserialize)]
pub struct NewBill {
    pub description: String,
    pub amount: Decimal,
    pub due_day: u32,
    #[serde(default = "default_recurrence")]
    pub recurrence: Recurrence,
    pub category_id: i64,
    #[serde(default)]
    pub account_id: Option<i64>,
    #[serde(default)]
    pub card_id: Option<i64>,
}

fn default_recurrence() -> Recurrence {
    Recurrence::None
}

/// The next calendar date with the given day-of-month, counting from
/// `from` inclusive. The day is clamped to the month's length.
fn next_due_date(from: NaiveDate, due_day: u32) -> NaiveDate {
    let clamp = |year: i32, month: u32| -> NaiveDate {
        let mut day = due_day;
        loop {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return date;
            }
            day -= 1;
        }
    };

    let this_month = clamp(from.year(), from.month());
    if this_month >= from {
        this_month
    } else {
        let (y, m) = if from.month() == 12 {
            (from.year() + 1, 1)
        } else {
            (from.year(), from.month() + 1)
        };
        clamp(y, m)
    }
}

impl Database {
    /// Create a bill and its first PENDING payment, due on the next
    /// occurrence of `due_day`. One-off bills get the payment too so they
    /// can actually be paid.
    pub fn create_bill(&self, user_id: i64, new: &NewBill) -> Result<Bill> {
        if new.description.trim().is_empty() {
            return Err(Error::Validation("Bill description is required".to_string()));
        }
        if !(1..=31).contains(&new.due_day) {
            return Err(Error::Validation(format!(
                "Due day must be between 1 and 31, got {}",
                new.due_day
            )));
        }
        let amount_cents = money::to_positive_cents(new.amount)?;

        let target =
            Target::from_fields(new.account_id, new.card_id).map_err(Error::Validation)?;
        match target {
            Target::Account(id) => {
                self.get_account(user_id, id)?
                    .ok_or_else(|| Error::NotFound(format!("Account {} not found", id)))?;
            }
            Target::Card(id) => {
                self.get_card(user_id, id)?
                    .ok_or_else(|| Error::NotFound(format!("Card {} not found", id)))?;
            }
        }
        self.get_category(user_id, new.category_id)?
            .ok_or_else(|| Error::NotFound(format!("Category {} not found", new.category_id)))?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO bills (user_id, description, amount_cents, due_day, recurrence, category_id, account_id, card_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                user_id,
                new.description,
                amount_cents,
                new.due_day,
                new.recurrence.as_str(),
                new.category_id,
                new.account_id,
                new.card_id,
            ],
        )?;
        let bill_id = tx.last_insert_rowid();

        let due_date = next_due_date(Utc::now().date_naive(), new.due_day);
        tx.execute(
            "INSERT INTO bill_payments (bill_id, due_date, amount_cents) VALUES (?, ?, ?)",
            params![bill_id, due_date.to_string(), amount_cents],
        )?;

        tx.commit()?;

        self.get_bill(user_id, bill_id)?
            .ok_or_else(|| Error::NotFound(format!("Bill {} not found after insert", bill_id)))
    }

    pub fn list_bills(&self, user_id: i64) -> Result<Vec<Bill>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM bills WHERE user_id = ? ORDER BY description",
            BILL_COLS
        ))?;

        let bills = stmt
            .query_map(params![user_id], row_to_bill)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(bills)
    }

    pub fn get_bill(&self, user_id: i64, id: i64) -> Result<Option<Bill>> {
        let conn = self.conn()?;
        let bill = conn
            .query_row(
                &format!("SELECT {} FROM bills WHERE id = ? AND user_id = ?", BILL_COLS),
                params![id, user_id],
                row_to_bill,
            )
            .optional()?;
        Ok(bill)
    }

    /// Update a bill's descriptive fields. Existing PENDING payments keep
    /// their scheduled amount; only future spawns pick up the new one.
    pub fn update_bill(&self, user_id: i64, id: i64, new: &NewBill) -> Result<Bill> {
        if new.description.trim().is_empty() {
            return Err(Error::Validation("Bill description is required".to_string()));
        }
        if !(1..=31).contains(&new.due_day) {
            return Err(Error::Validation(format!(
                "Due day must be between 1 and 31, got {}",
                new.due_day
            )));
        }
        let amount_cents = money::to_positive_cents(new.amount)?;
        Target::from_fields(new.account_id, new.card_id).map_err(Error::Validation)?;
        self.get_category(user_id, new.category_id)?
            .ok_or_else(|| Error::NotFound(format!("Category {} not found", new.category_id)))?;

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE bills SET description = ?, amount_cents = ?, due_day = ?, recurrence = ?,
             category_id = ?, account_id = ?, card_id = ? WHERE id = ? AND user_id = ?",
            params![
                new.description,
                amount_cents,
                new.due_day,
                new.recurrence.as_str(),
                new.category_id,
                new.account_id,
                new.card_id,
                id,
                user_id,
            ],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Bill {} not found", id)));
        }
        drop(conn);

        self.get_bill(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Bill {} not found", id)))
    }

    /// Toggle a bill between active and inactive
    pub fn toggle_bill_status(&self, user_id: i64, id: i64) -> Result<Bill> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE bills SET active = NOT active WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Bill {} not found", id)));
        }
        drop(conn);

        self.get_bill(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Bill {} not found", id)))
    }

    /// Delete a bill and its payment schedule. Transactions created by past
    /// payments stay in the ledger.
    pub fn delete_bill(&self, user_id: i64, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM bills WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Bill {} not found", id)));
        }
        Ok(())
    }

    /// Pending payments across all of the user's active bills, soonest first
    pub fn list_pending_payments(&self, user_id: i64) -> Result<Vec<BillPayment>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM bill_payments
             WHERE status = 'PENDING'
               AND bill_id IN (SELECT id FROM bills WHERE user_id = ? AND active = 1)
             ORDER BY due_date",
            PAYMENT_COLS
        );
        let mut stmt = conn.prepare(&sql)?;

        let payments = stmt
            .query_map(params![user_id], row_to_payment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(payments)
    }

    /// Payment history for one bill, newest first
    pub fn list_bill_payments(&self, user_id: i64, bill_id: i64) -> Result<Vec<BillPayment>> {
        self.get_bill(user_id, bill_id)?
            .ok_or_else(|| Error::NotFound(format!("Bill {} not found", bill_id)))?;

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM bill_payments WHERE bill_id = ? ORDER BY due_date DESC",
            PAYMENT_COLS
        ))?;

        let payments = stmt
            .query_map(params![bill_id], row_to_payment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(payments)
    }

    /// Mark a PENDING payment as PAID: create the expense through the
    /// ledger (account debit or card invoice charge), stamp the payment,
    /// and for recurring bills spawn the next PENDING instance. One unit.
    pub fn pay_bill_payment(
        &self,
        user_id: i64,
        payment_id: i64,
        payment_date: Option<NaiveDate>,
    ) -> Result<BillPayment> {
        let allow_negative = self.policy().allow_negative_balance;
        let payment_date = payment_date.unwrap_or_else(|| Utc::now().date_naive());

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let payment: BillPayment = tx
            .query_row(
                &format!(
                    "SELECT {} FROM bill_payments
                     WHERE id = ? AND bill_id IN (SELECT id FROM bills WHERE user_id = ?)",
                    PAYMENT_COLS
                ),
                params![payment_id, user_id],
                row_to_payment,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Bill payment {} not found", payment_id)))?;

        if payment.status == PaymentStatus::Paid {
            return Err(Error::Conflict(format!(
                "Bill payment {} is already paid",
                payment_id
            )));
        }

        let bill: Bill = tx.query_row(
            &format!("SELECT {} FROM bills WHERE id = ?", BILL_COLS),
            params![payment.bill_id],
            row_to_bill,
        )?;

        let amount_cents = money::to_cents(payment.amount)?;
        let target =
            Target::from_fields(bill.account_id, bill.card_id).map_err(Error::Validation)?;

        let transaction_id = match target {
            Target::Account(account_id) => {
                apply_account_delta(&tx, user_id, account_id, -amount_cents, allow_negative)?;
                insert_row(
                    &tx,
                    user_id,
                    TxType::Expense,
                    amount_cents,
                    payment_date,
                    &bill.description,
                    Some(bill.category_id),
                    Some(account_id),
                    None,
                    None,
                    None,
                )?
            }
            Target::Card(card_id) => {
                let closing_day = card_closing_day(&tx, user_id, card_id)?;
                let invoice_id =
                    apply_invoice_delta(&tx, card_id, payment_date, closing_day, amount_cents)?;
                insert_row(
                    &tx,
                    user_id,
                    TxType::Expense,
                    amount_cents,
                    payment_date,
                    &bill.description,
                    Some(bill.category_id),
                    None,
                    Some(card_id),
                    Some(invoice_id),
                    None,
                )?
            }
        };

        // Guard on status so a concurrent payer loses
        let updated = tx.execute(
            "UPDATE bill_payments SET status = 'PAID', payment_date = ?, transaction_id = ?
             WHERE id = ? AND status = 'PENDING'",
            params![payment_date.to_string(), transaction_id, payment_id],
        )?;
        if updated == 0 {
            return Err(Error::Conflict(format!(
                "Bill payment {} is already paid",
                payment_id
            )));
        }

        // Recurring bills spawn the next instance at the bill's current
        // amount
        let months_ahead = match bill.recurrence {
            Recurrence::None => None,
            Recurrence::Monthly => Some(1),
            Recurrence::Yearly => Some(12),
        };
        if let Some(months) = months_ahead {
            let next_due = payment
                .due_date
                .checked_add_months(Months::new(months))
                .ok_or_else(|| {
                    Error::Validation("Next due date out of range".to_string())
                })?;
            let bill_amount_cents = money::to_cents(bill.amount)?;
            tx.execute(
                "INSERT INTO bill_payments (bill_id, due_date, amount_cents) VALUES (?, ?, ?)",
                params![bill.id, next_due.to_string(), bill_amount_cents],
            )?;
        }

        let paid: BillPayment = tx.query_row(
            &format!("SELECT {} FROM bill_payments WHERE id = ?", PAYMENT_COLS),
            params![payment_id],
            row_to_payment,
        )?;

        tx.commit()?;
        Ok(paid)
    }
}
