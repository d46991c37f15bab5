//! CSV export of the transaction ledger

use chrono::NaiveDate;
use rusqlite::params;
use serde::Serialize;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::money;

/// Options for transaction export
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Start date filter (inclusive)
    pub from: Option<NaiveDate>,
    /// End date filter (inclusive)
    pub to: Option<NaiveDate>,
}

/// One CSV row: a transaction joined with its display names
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub value: String,
    pub description: String,
    pub category: Option<String>,
    pub account: Option<String>,
    pub card: Option<String>,
}

impl Database {
    /// Export a user's transactions with resolved names
    pub fn export_transactions(
        &self,
        user_id: i64,
        opts: &ExportOptions,
    ) -> Result<Vec<TransactionRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT t.id, t.date, t.tx_type, t.value_cents, t.description,
                    c.description, a.name, cd.name
             FROM transactions t
             LEFT JOIN categories c ON c.id = t.category_id
             LEFT JOIN accounts a ON a.id = t.account_id
             LEFT JOIN cards cd ON cd.id = t.card_id
             WHERE t.user_id = ?1
               AND (?2 IS NULL OR t.date >= ?2)
               AND (?3 IS NULL OR t.date <= ?3)
             ORDER BY t.date, t.id",
        )?;

        let rows = stmt
            .query_map(
                params![
                    user_id,
                    opts.from.map(|d| d.to_string()),
                    opts.to.map(|d| d.to_string()),
                ],
                |row| {
                    let value_cents: i64 = row.get(3)?;
                    Ok(TransactionRow {
                        id: row.get(0)?,
                        date: row.get(1)?,
                        tx_type: row.get(2)?,
                        value: money::from_cents(value_cents).to_string(),
                        description: row.get(4)?,
                        category: row.get(5)?,
                        account: row.get(6)?,
                        card: row.get(7)?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Export a user's transactions as a CSV document
    pub fn export_transactions_csv(&self, user_id: i64, opts: &ExportOptions) -> Result<String> {
        let rows = self.export_transactions(user_id, opts)?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer.serialize(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Validation(format!("CSV buffer error: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| Error::Validation(format!("CSV is not UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountType, NewTransaction, TxType};
    use rust_decimal::Decimal;

    fn setup() -> (Database, i64, i64) {
        let db = Database::in_memory().unwrap();
        let user = db.create_user("Ana", "ana@example.com", "password123").unwrap();
        let bank = db.create_bank(user.id, "Banco Azul").unwrap();
        let account = db
            .create_account(
                user.id,
                bank.id,
                "Main",
                AccountType::Checking,
                Decimal::from(1000),
            )
            .unwrap();
        (db, user.id, account.id)
    }

    #[test]
    fn test_export_csv_has_header_and_rows() {
        let (db, user_id, account_id) = setup();

        db.create_transaction(
            user_id,
            &NewTransaction {
                tx_type: TxType::Income,
                value: Decimal::new(15050, 2),
                date: chrono::NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
                description: Some("Salary, June".to_string()),
                category_id: None,
                account_id: Some(account_id),
                card_id: None,
                target_account_id: None,
                installments: 1,
            },
        )
        .unwrap();

        let csv = db
            .export_transactions_csv(user_id, &ExportOptions::default())
            .unwrap();
        assert!(csv.starts_with("id,date,type,value,description,category,account,card"));
        assert!(csv.contains("2025-06-15"));
        assert!(csv.contains("150.50"));
        // Field with a comma gets quoted
        assert!(csv.contains("\"Salary, June\""));
    }

    #[test]
    fn test_export_date_filter() {
        let (db, user_id, account_id) = setup();

        for day in [5, 15, 25] {
            db.create_transaction(
                user_id,
                &NewTransaction {
                    tx_type: TxType::Income,
                    value: Decimal::from(10),
                    date: chrono::NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
                    description: Some(format!("day {}", day)),
                    category_id: None,
                    account_id: Some(account_id),
                    card_id: None,
                    target_account_id: None,
                    installments: 1,
                },
            )
            .unwrap();
        }

        let rows = db
            .export_transactions(
                user_id,
                &ExportOptions {
                    from: chrono::NaiveDate::from_ymd_opt(2025, 6, 10),
                    to: chrono::NaiveDate::from_ymd_opt(2025, 6, 20),
                },
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "day 15");
    }
}
