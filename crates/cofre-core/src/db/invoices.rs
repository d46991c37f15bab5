//! Invoice queries and full payment

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use serde::Deserialize;

use super::ledger::{apply_account_delta, fetch_transaction, insert_row, row_to_transaction, TX_COLS};
use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{CategoryType, Invoice, Transaction, TxType};
use crate::money;

fn row_to_invoice(row: &rusqlite::Row) -> rusqlite::Result<Invoice> {
    let total_cents: i64 = row.get(4)?;
    let created_at_str: String = row.get(6)?;

    Ok(Invoice {
        id: row.get(0)?,
        card_id: row.get(1)?,
        month: row.get(2)?,
        year: row.get(3)?,
        total_amount: money::from_cents(total_cents),
        is_paid: row.get(5)?,
        created_at: parse_datetime(&created_at_str),
    })
}

const INVOICE_COLS: &str =
    "i.id, i.card_id, i.month, i.year, i.total_amount_cents, i.is_paid, i.created_at";

/// Payment details for settling an invoice in full
#[derive(Debug, Clone, Deserialize)]
pub struct PayInvoice {
    pub account_id: i64,
    pub payment_date: NaiveDate,
    pub category_id: i64,
}

impl Database {
    /// List invoices for the user's cards, optionally filtered by card
    pub fn list_invoices(&self, user_id: i64, card_id: Option<i64>) -> Result<Vec<Invoice>> {
        if let Some(card_id) = card_id {
            self.get_card(user_id, card_id)?
                .ok_or_else(|| Error::NotFound(format!("Card {} not found", card_id)))?;
        }

        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM invoices i
             JOIN cards c ON c.id = i.card_id
             WHERE c.user_id = ?1 AND (?2 IS NULL OR i.card_id = ?2)
             ORDER BY i.year DESC, i.month DESC",
            INVOICE_COLS
        );
        let mut stmt = conn.prepare(&sql)?;

        let invoices = stmt
            .query_map(params![user_id, card_id], row_to_invoice)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(invoices)
    }

    pub fn get_invoice(&self, user_id: i64, id: i64) -> Result<Option<Invoice>> {
        let conn = self.conn()?;
        let invoice = conn
            .query_row(
                &format!(
                    "SELECT {} FROM invoices i
                     JOIN cards c ON c.id = i.card_id
                     WHERE i.id = ? AND c.user_id = ?",
                    INVOICE_COLS
                ),
                params![id, user_id],
                row_to_invoice,
            )
            .optional()?;
        Ok(invoice)
    }

    /// The card charges that make up an invoice, oldest first
    pub fn list_invoice_transactions(&self, user_id: i64, invoice_id: i64) -> Result<Vec<Transaction>> {
        self.get_invoice(user_id, invoice_id)?
            .ok_or_else(|| Error::NotFound(format!("Invoice {} not found", invoice_id)))?;

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE invoice_id = ? AND user_id = ? ORDER BY date, id",
            TX_COLS
        ))?;

        let transactions = stmt
            .query_map(params![invoice_id, user_id], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Settle an invoice in full: debit the paying account for the invoice
    /// total, record the expense, and mark the invoice paid. One unit; a
    /// failed debit leaves the invoice unpaid.
    pub fn pay_invoice(&self, user_id: i64, invoice_id: i64, pay: &PayInvoice) -> Result<Transaction> {
        let allow_negative = self.policy().allow_negative_balance;

        let category = self
            .get_category(user_id, pay.category_id)?
            .ok_or_else(|| Error::NotFound(format!("Category {} not found", pay.category_id)))?;
        if category.category_type != CategoryType::Expense {
            return Err(Error::Validation(format!(
                "Category {} is not an expense category",
                pay.category_id
            )));
        }

        let invoice = self
            .get_invoice(user_id, invoice_id)?
            .ok_or_else(|| Error::NotFound(format!("Invoice {} not found", invoice_id)))?;
        if invoice.is_paid {
            return Err(Error::Conflict(format!(
                "Invoice {} is already paid",
                invoice_id
            )));
        }
        let total_cents = money::to_cents(invoice.total_amount)?;
        if total_cents <= 0 {
            return Err(Error::Validation(format!(
                "Invoice {} has no balance to pay",
                invoice_id
            )));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        apply_account_delta(&tx, user_id, pay.account_id, -total_cents, allow_negative)?;

        let description = format!("Invoice payment {:02}/{}", invoice.month, invoice.year);
        let tx_id = insert_row(
            &tx,
            user_id,
            TxType::Expense,
            total_cents,
            pay.payment_date,
            &description,
            Some(pay.category_id),
            Some(pay.account_id),
            None,
            None,
            None,
        )?;

        // Guard on is_paid again inside the transaction so two concurrent
        // payments can't both go through
        let updated = tx.execute(
            "UPDATE invoices SET is_paid = 1 WHERE id = ? AND is_paid = 0",
            params![invoice_id],
        )?;
        if updated == 0 {
            return Err(Error::Conflict(format!(
                "Invoice {} is already paid",
                invoice_id
            )));
        }

        let transaction = fetch_transaction(&tx, user_id, tx_id)?;
        tx.commit()?;
        Ok(transaction)
    }
}
