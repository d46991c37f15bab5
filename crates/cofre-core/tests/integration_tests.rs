//! Integration tests for cofre-core
//!
//! These tests exercise full workflows through the public API: a month of
//! activity across accounts, cards, invoices, bills, and debts.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use cofre_core::{
    db::Database,
    models::{AccountType, CategoryType, NewTransaction, Recurrence, TxType},
    ExportOptions, NewBill, NewDebt, PayDebt, PayInvoice,
};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn income(value: &str, date_: NaiveDate, category_id: i64, account_id: i64) -> NewTransaction {
    NewTransaction {
        tx_type: TxType::Income,
        value: dec(value),
        date: date_,
        description: None,
        category_id: Some(category_id),
        account_id: Some(account_id),
        card_id: None,
        target_account_id: None,
        installments: 1,
    }
}

#[test]
fn test_full_month_workflow() {
    let db = Database::in_memory().expect("Failed to create test database");

    let user = db.create_user("Ana", "ana@example.com", "password123").unwrap();
    let bank = db.create_bank(user.id, "Banco Azul").unwrap();
    let account = db
        .create_account(user.id, bank.id, "Main", AccountType::Checking, Decimal::ZERO)
        .unwrap();
    let card = db
        .create_card(user.id, account.id, "Visa", dec("5000"), 15, 22)
        .unwrap();
    let salary = db.create_category(user.id, "Salary", CategoryType::Income).unwrap();
    let groceries = db
        .create_category(user.id, "Groceries", CategoryType::Expense)
        .unwrap();

    // Salary lands on the 1st
    db.create_transaction(user.id, &income("3000.00", date(2025, 6, 1), salary.id, account.id))
        .unwrap();

    // Card groceries on the 10th go to the June invoice
    db.create_transaction(
        user.id,
        &NewTransaction {
            tx_type: TxType::Expense,
            value: dec("250.00"),
            date: date(2025, 6, 10),
            description: Some("Groceries".to_string()),
            category_id: Some(groceries.id),
            account_id: None,
            card_id: Some(card.id),
            target_account_id: None,
            installments: 1,
        },
    )
    .unwrap();

    let invoices = db.list_invoices(user.id, Some(card.id)).unwrap();
    assert_eq!(invoices.len(), 1);
    assert_eq!((invoices[0].month, invoices[0].year), (6, 2025));
    assert_eq!(invoices[0].total_amount, dec("250.00"));

    // The card charge does not touch the account until the invoice is paid
    let acct = db.get_account(user.id, account.id).unwrap().unwrap();
    assert_eq!(acct.balance, dec("3000.00"));

    db.pay_invoice(
        user.id,
        invoices[0].id,
        &PayInvoice {
            account_id: account.id,
            payment_date: date(2025, 6, 22),
            category_id: groceries.id,
        },
    )
    .unwrap();

    let acct = db.get_account(user.id, account.id).unwrap().unwrap();
    assert_eq!(acct.balance, dec("2750.00"));

    // A monthly rent bill gets paid and respawns
    let bill = db
        .create_bill(
            user.id,
            &NewBill {
                description: "Rent".to_string(),
                amount: dec("800.00"),
                due_day: 5,
                recurrence: Recurrence::Monthly,
                category_id: groceries.id,
                account_id: Some(account.id),
                card_id: None,
            },
        )
        .unwrap();
    let pending = db.list_pending_payments(user.id).unwrap();
    assert_eq!(pending.len(), 1);

    db.pay_bill_payment(user.id, pending[0].id, Some(date(2025, 6, 5))).unwrap();
    let acct = db.get_account(user.id, account.id).unwrap().unwrap();
    assert_eq!(acct.balance, dec("1950.00"));
    assert_eq!(db.list_bill_payments(user.id, bill.id).unwrap().len(), 2);

    // A debt payment reduces the outstanding balance
    let debt = db
        .create_debt(
            user.id,
            &NewDebt {
                description: "Car loan".to_string(),
                creditor: None,
                debt_type: "loan".to_string(),
                initial_amount: dec("600.00"),
                interest_rate: None,
                minimum_payment: None,
                payment_due_day: None,
                bank_id: None,
                start_date: date(2025, 1, 1),
                estimated_end_date: None,
            },
        )
        .unwrap();
    db.pay_debt(
        user.id,
        debt.id,
        &PayDebt {
            amount: dec("150.00"),
            date: date(2025, 6, 12),
            category_id: groceries.id,
            account_id: account.id,
        },
    )
    .unwrap();

    let debt = db.get_debt(user.id, debt.id).unwrap().unwrap();
    assert_eq!(debt.outstanding_balance, dec("450.00"));
    let acct = db.get_account(user.id, account.id).unwrap().unwrap();
    assert_eq!(acct.balance, dec("1800.00"));

    // Everything shows up in the export
    let rows = db
        .export_transactions(user.id, &ExportOptions::default())
        .unwrap();
    assert_eq!(rows.len(), 5);

    let csv = db
        .export_transactions_csv(user.id, &ExportOptions::default())
        .unwrap();
    assert!(csv.contains("Rent"));
    assert!(csv.contains("Car loan"));
    assert!(csv.contains("Invoice payment 06/2025"));
}

#[test]
fn test_installment_purchase_workflow() {
    let db = Database::in_memory().expect("Failed to create test database");

    let user = db.create_user("Bia", "bia@example.com", "password123").unwrap();
    let bank = db.create_bank(user.id, "Banco Verde").unwrap();
    let account = db
        .create_account(user.id, bank.id, "Main", AccountType::Checking, dec("2000"))
        .unwrap();
    let card = db
        .create_card(user.id, account.id, "Master", dec("3000"), 20, 28)
        .unwrap();
    let shopping = db
        .create_category(user.id, "Shopping", CategoryType::Expense)
        .unwrap();

    let slices = db
        .create_transaction(
            user.id,
            &NewTransaction {
                tx_type: TxType::Expense,
                value: dec("1000.00"),
                date: date(2025, 3, 5),
                description: Some("Phone".to_string()),
                category_id: Some(shopping.id),
                account_id: None,
                card_id: Some(card.id),
                target_account_id: None,
                installments: 4,
            },
        )
        .unwrap();
    assert_eq!(slices.len(), 4);

    let total: Decimal = slices.iter().map(|s| s.value).sum();
    assert_eq!(total, dec("1000.00"));

    // One invoice per month, March through June
    let invoices = db.list_invoices(user.id, Some(card.id)).unwrap();
    assert_eq!(invoices.len(), 4);
    let mut buckets: Vec<(u32, i32)> = invoices.iter().map(|i| (i.month, i.year)).collect();
    buckets.sort();
    assert_eq!(buckets, vec![(3, 2025), (4, 2025), (5, 2025), (6, 2025)]);

    // Deleting one slice pulls it off its invoice
    db.delete_transaction(user.id, slices[0].id).unwrap();
    let invoices = db.list_invoices(user.id, Some(card.id)).unwrap();
    let march_total = invoices
        .iter()
        .find(|i| (i.month, i.year) == (3, 2025))
        .unwrap()
        .total_amount;
    assert_eq!(march_total, dec("0.00"));
}
