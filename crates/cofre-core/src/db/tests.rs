//! Database integration tests

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

use super::Database;
use crate::db::{LedgerPolicy, NewBill, NewDebt, PayDebt, PayInvoice};
use crate::error::Error;
use crate::models::{
    AccountType, CategoryType, DebtStatus, NewTransaction, PaymentStatus, Recurrence, TxType,
    UpdateTransaction,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

struct Fixture {
    db: Database,
    user_id: i64,
    account_id: i64,
    card_id: i64,
    expense_cat: i64,
    income_cat: i64,
}

/// A user with one account holding 1000.00 and a card closing on the 15th
fn setup() -> Fixture {
    let db = Database::in_memory().unwrap();
    let user = db.create_user("Ana", "ana@example.com", "password123").unwrap();
    let bank = db.create_bank(user.id, "Banco Azul").unwrap();
    let account = db
        .create_account(user.id, bank.id, "Main", AccountType::Checking, dec("1000.00"))
        .unwrap();
    let card = db
        .create_card(user.id, account.id, "Visa", dec("5000.00"), 15, 22)
        .unwrap();
    let expense_cat = db
        .create_category(user.id, "Groceries", CategoryType::Expense)
        .unwrap()
        .id;
    let income_cat = db
        .create_category(user.id, "Salary", CategoryType::Income)
        .unwrap()
        .id;

    Fixture {
        db,
        user_id: user.id,
        account_id: account.id,
        card_id: card.id,
        expense_cat,
        income_cat,
    }
}

fn balance(f: &Fixture) -> Decimal {
    f.db.get_account(f.user_id, f.account_id)
        .unwrap()
        .unwrap()
        .balance
}

fn income(f: &Fixture, value: &str, date: NaiveDate) -> NewTransaction {
    NewTransaction {
        tx_type: TxType::Income,
        value: dec(value),
        date,
        description: Some("income".to_string()),
        category_id: Some(f.income_cat),
        account_id: Some(f.account_id),
        card_id: None,
        target_account_id: None,
        installments: 1,
    }
}

fn account_expense(f: &Fixture, value: &str, date: NaiveDate) -> NewTransaction {
    NewTransaction {
        tx_type: TxType::Expense,
        value: dec(value),
        date,
        description: Some("expense".to_string()),
        category_id: Some(f.expense_cat),
        account_id: Some(f.account_id),
        card_id: None,
        target_account_id: None,
        installments: 1,
    }
}

fn card_expense(f: &Fixture, value: &str, date: NaiveDate, installments: u32) -> NewTransaction {
    NewTransaction {
        tx_type: TxType::Expense,
        value: dec(value),
        date,
        description: Some("card expense".to_string()),
        category_id: Some(f.expense_cat),
        account_id: None,
        card_id: Some(f.card_id),
        target_account_id: None,
        installments,
    }
}

// --- users ---

#[test]
fn test_duplicate_email_conflicts() {
    let f = setup();
    let err = f
        .db
        .create_user("Other", "ana@example.com", "password123")
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[test]
fn test_verify_credentials() {
    let f = setup();
    let user = f.db.verify_credentials("ana@example.com", "password123").unwrap();
    assert_eq!(user.email, "ana@example.com");

    assert!(f.db.verify_credentials("ana@example.com", "wrong-pass").is_err());
    assert!(f.db.verify_credentials("nobody@example.com", "password123").is_err());
}

// --- ledger: income / expense / round trip ---

#[test]
fn test_income_credits_account() {
    let f = setup();
    f.db.create_transaction(f.user_id, &income(&f, "150.00", d(2025, 6, 1)))
        .unwrap();
    assert_eq!(balance(&f), dec("1150.00"));
}

#[test]
fn test_expense_debits_account() {
    let f = setup();
    f.db.create_transaction(f.user_id, &account_expense(&f, "200.00", d(2025, 6, 1)))
        .unwrap();
    assert_eq!(balance(&f), dec("800.00"));
}

#[test]
fn test_create_delete_round_trip_restores_balance() {
    let f = setup();
    let created = f
        .db
        .create_transaction(f.user_id, &account_expense(&f, "123.45", d(2025, 6, 1)))
        .unwrap();
    assert_eq!(balance(&f), dec("876.55"));

    f.db.delete_transaction(f.user_id, created[0].id).unwrap();
    assert_eq!(balance(&f), dec("1000.00"));
}

#[test]
fn test_expense_insufficient_funds_rejected() {
    let f = setup();
    let err = f
        .db
        .create_transaction(f.user_id, &account_expense(&f, "1000.01", d(2025, 6, 1)))
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds(_)));
    assert_eq!(balance(&f), dec("1000.00"));
    assert!(f.db.list_transactions(f.user_id).unwrap().is_empty());
}

#[test]
fn test_negative_balance_allowed_by_policy() {
    let mut f = setup();
    f.db = f.db.clone().with_policy(LedgerPolicy {
        allow_negative_balance: true,
    });

    f.db.create_transaction(f.user_id, &account_expense(&f, "1500.00", d(2025, 6, 1)))
        .unwrap();
    assert_eq!(balance(&f), dec("-500.00"));
}

#[test]
fn test_target_validation() {
    let f = setup();

    let mut both = account_expense(&f, "10.00", d(2025, 6, 1));
    both.card_id = Some(f.card_id);
    assert!(matches!(
        f.db.create_transaction(f.user_id, &both).unwrap_err(),
        Error::Validation(_)
    ));

    let mut neither = account_expense(&f, "10.00", d(2025, 6, 1));
    neither.account_id = None;
    assert!(matches!(
        f.db.create_transaction(f.user_id, &neither).unwrap_err(),
        Error::Validation(_)
    ));

    let mut installments_off_card = account_expense(&f, "10.00", d(2025, 6, 1));
    installments_off_card.installments = 3;
    assert!(matches!(
        f.db.create_transaction(f.user_id, &installments_off_card)
            .unwrap_err(),
        Error::Validation(_)
    ));
}

#[test]
fn test_zero_installments_rejected_everywhere() {
    let f = setup();

    let mut zero_account = account_expense(&f, "10.00", d(2025, 6, 1));
    zero_account.installments = 0;
    assert!(matches!(
        f.db.create_transaction(f.user_id, &zero_account).unwrap_err(),
        Error::Validation(_)
    ));

    let mut zero_income = income(&f, "10.00", d(2025, 6, 1));
    zero_income.installments = 0;
    assert!(matches!(
        f.db.create_transaction(f.user_id, &zero_income).unwrap_err(),
        Error::Validation(_)
    ));

    assert!(matches!(
        f.db.create_transaction(f.user_id, &card_expense(&f, "10.00", d(2025, 6, 1), 0))
            .unwrap_err(),
        Error::Validation(_)
    ));
    assert_eq!(balance(&f), dec("1000.00"));
    assert!(f.db.list_transactions(f.user_id).unwrap().is_empty());
}

// --- ledger: card expenses and invoices ---

#[test]
fn test_card_expense_buckets_by_closing_day() {
    let f = setup();

    // Card closes on the 15th: charge on the 15th stays in June
    let on_close = f
        .db
        .create_transaction(f.user_id, &card_expense(&f, "50.00", d(2025, 6, 15), 1))
        .unwrap();
    let invoice = f
        .db
        .get_invoice(f.user_id, on_close[0].invoice_id.unwrap())
        .unwrap()
        .unwrap();
    assert_eq!((invoice.month, invoice.year), (6, 2025));

    // Charge on the 16th rolls into July
    let after_close = f
        .db
        .create_transaction(f.user_id, &card_expense(&f, "30.00", d(2025, 6, 16), 1))
        .unwrap();
    let invoice = f
        .db
        .get_invoice(f.user_id, after_close[0].invoice_id.unwrap())
        .unwrap()
        .unwrap();
    assert_eq!((invoice.month, invoice.year), (7, 2025));

    // Account balance untouched by card charges
    assert_eq!(balance(&f), dec("1000.00"));
}

#[test]
fn test_invoice_accumulates_charges() {
    let f = setup();

    let first = f
        .db
        .create_transaction(f.user_id, &card_expense(&f, "50.00", d(2025, 6, 1), 1))
        .unwrap();
    let second = f
        .db
        .create_transaction(f.user_id, &card_expense(&f, "25.50", d(2025, 6, 10), 1))
        .unwrap();

    assert_eq!(first[0].invoice_id, second[0].invoice_id);
    let invoice = f
        .db
        .get_invoice(f.user_id, first[0].invoice_id.unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(invoice.total_amount, dec("75.50"));
}

#[test]
fn test_installments_sum_and_buckets() {
    let f = setup();

    // 100.00 over 3 installments starting June 1: 33.34 + 33.33 + 33.33
    let slices = f
        .db
        .create_transaction(f.user_id, &card_expense(&f, "100.00", d(2025, 6, 1), 3))
        .unwrap();
    assert_eq!(slices.len(), 3);
    assert_eq!(slices[0].value, dec("33.34"));
    assert_eq!(slices[1].value, dec("33.33"));
    assert_eq!(slices[2].value, dec("33.33"));
    let total: Decimal = slices.iter().map(|s| s.value).sum();
    assert_eq!(total, dec("100.00"));

    // One invoice per month: June, July, August
    let months: Vec<(u32, i32)> = slices
        .iter()
        .map(|s| {
            let inv = f
                .db
                .get_invoice(f.user_id, s.invoice_id.unwrap())
                .unwrap()
                .unwrap();
            (inv.month, inv.year)
        })
        .collect();
    assert_eq!(months, vec![(6, 2025), (7, 2025), (8, 2025)]);
}

#[test]
fn test_delete_card_charge_decrements_invoice() {
    let f = setup();

    let created = f
        .db
        .create_transaction(f.user_id, &card_expense(&f, "80.00", d(2025, 6, 1), 1))
        .unwrap();
    let invoice_id = created[0].invoice_id.unwrap();

    f.db.delete_transaction(f.user_id, created[0].id).unwrap();

    let invoice = f.db.get_invoice(f.user_id, invoice_id).unwrap().unwrap();
    assert_eq!(invoice.total_amount, dec("0.00"));
}

#[test]
fn test_update_moves_expense_account_to_card() {
    let f = setup();

    let created = f
        .db
        .create_transaction(f.user_id, &account_expense(&f, "60.00", d(2025, 6, 1)))
        .unwrap();
    assert_eq!(balance(&f), dec("940.00"));

    let updated = f
        .db
        .update_transaction(
            f.user_id,
            created[0].id,
            &UpdateTransaction {
                tx_type: TxType::Expense,
                value: dec("60.00"),
                date: d(2025, 6, 1),
                description: "now on card".to_string(),
                category_id: f.expense_cat,
                account_id: None,
                card_id: Some(f.card_id),
            },
        )
        .unwrap();

    // Account refunded, invoice charged
    assert_eq!(balance(&f), dec("1000.00"));
    let invoice = f
        .db
        .get_invoice(f.user_id, updated.invoice_id.unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(invoice.total_amount, dec("60.00"));
}

#[test]
fn test_update_value_adjusts_balance_exactly() {
    let f = setup();

    let created = f
        .db
        .create_transaction(f.user_id, &account_expense(&f, "100.00", d(2025, 6, 1)))
        .unwrap();

    f.db.update_transaction(
        f.user_id,
        created[0].id,
        &UpdateTransaction {
            tx_type: TxType::Expense,
            value: dec("40.00"),
            date: d(2025, 6, 1),
            description: "smaller".to_string(),
            category_id: f.expense_cat,
            account_id: Some(f.account_id),
            card_id: None,
        },
    )
    .unwrap();

    assert_eq!(balance(&f), dec("960.00"));
}

// --- transfers ---

fn second_account(f: &Fixture) -> i64 {
    let bank = f.db.create_bank(f.user_id, "Banco Verde").unwrap();
    f.db.create_account(f.user_id, bank.id, "Savings", AccountType::Savings, dec("0.00"))
        .unwrap()
        .id
}

#[test]
fn test_transfer_moves_funds_and_records_row() {
    let f = setup();
    let dest = second_account(&f);

    let created = f
        .db
        .create_transaction(
            f.user_id,
            &NewTransaction {
                tx_type: TxType::Transfer,
                value: dec("300.00"),
                date: d(2025, 6, 1),
                description: Some("to savings".to_string()),
                category_id: None,
                account_id: Some(f.account_id),
                card_id: None,
                target_account_id: Some(dest),
                installments: 1,
            },
        )
        .unwrap();

    assert_eq!(created.len(), 1);
    assert_eq!(created[0].tx_type, TxType::Transfer);
    assert_eq!(created[0].target_account_id, Some(dest));

    assert_eq!(balance(&f), dec("700.00"));
    let dest_balance = f.db.get_account(f.user_id, dest).unwrap().unwrap().balance;
    assert_eq!(dest_balance, dec("300.00"));
}

#[test]
fn test_transfer_insufficient_funds_changes_nothing() {
    let f = setup();
    let dest = second_account(&f);

    let err = f
        .db
        .create_transaction(
            f.user_id,
            &NewTransaction {
                tx_type: TxType::Transfer,
                value: dec("1000.01"),
                date: d(2025, 6, 1),
                description: None,
                category_id: None,
                account_id: Some(f.account_id),
                card_id: None,
                target_account_id: Some(dest),
                installments: 1,
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds(_)));

    assert_eq!(balance(&f), dec("1000.00"));
    let dest_balance = f.db.get_account(f.user_id, dest).unwrap().unwrap().balance;
    assert_eq!(dest_balance, dec("0.00"));
    assert!(f.db.list_transactions(f.user_id).unwrap().is_empty());
}

#[test]
fn test_transfer_to_same_account_rejected() {
    let f = setup();
    let err = f
        .db
        .create_transaction(
            f.user_id,
            &NewTransaction {
                tx_type: TxType::Transfer,
                value: dec("10.00"),
                date: d(2025, 6, 1),
                description: None,
                category_id: None,
                account_id: Some(f.account_id),
                card_id: None,
                target_account_id: Some(f.account_id),
                installments: 1,
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn test_transfer_rows_not_updatable() {
    let f = setup();
    let dest = second_account(&f);

    let created = f
        .db
        .create_transaction(
            f.user_id,
            &NewTransaction {
                tx_type: TxType::Transfer,
                value: dec("100.00"),
                date: d(2025, 6, 1),
                description: None,
                category_id: None,
                account_id: Some(f.account_id),
                card_id: None,
                target_account_id: Some(dest),
                installments: 1,
            },
        )
        .unwrap();

    let err = f
        .db
        .update_transaction(
            f.user_id,
            created[0].id,
            &UpdateTransaction {
                tx_type: TxType::Expense,
                value: dec("100.00"),
                date: d(2025, 6, 1),
                description: "converted".to_string(),
                category_id: f.expense_cat,
                account_id: Some(f.account_id),
                card_id: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // Deleting the transfer restores both balances
    f.db.delete_transaction(f.user_id, created[0].id).unwrap();
    assert_eq!(balance(&f), dec("1000.00"));
    let dest_balance = f.db.get_account(f.user_id, dest).unwrap().unwrap().balance;
    assert_eq!(dest_balance, dec("0.00"));
}

// --- ownership ---

#[test]
fn test_other_users_data_invisible() {
    let f = setup();
    let other = f
        .db
        .create_user("Bob", "bob@example.com", "password123")
        .unwrap();

    assert!(f.db.get_account(other.id, f.account_id).unwrap().is_none());

    let created = f
        .db
        .create_transaction(f.user_id, &account_expense(&f, "10.00", d(2025, 6, 1)))
        .unwrap();
    let err = f.db.delete_transaction(other.id, created[0].id).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    // Still there for the owner
    assert!(f
        .db
        .get_transaction(f.user_id, created[0].id)
        .unwrap()
        .is_some());
}

// --- bills ---

fn monthly_bill(f: &Fixture) -> NewBill {
    NewBill {
        description: "Rent".to_string(),
        amount: dec("800.00"),
        due_day: 5,
        recurrence: Recurrence::Monthly,
        category_id: f.expense_cat,
        account_id: Some(f.account_id),
        card_id: None,
    }
}

#[test]
fn test_bill_creation_spawns_first_payment() {
    let f = setup();
    let bill = f.db.create_bill(f.user_id, &monthly_bill(&f)).unwrap();

    let pending = f.db.list_pending_payments(f.user_id).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].bill_id, bill.id);
    assert_eq!(pending[0].amount, dec("800.00"));
    assert_eq!(pending[0].status, PaymentStatus::Pending);
}

#[test]
fn test_one_off_bill_still_payable() {
    let f = setup();
    let mut one_off = monthly_bill(&f);
    one_off.recurrence = Recurrence::None;
    one_off.amount = dec("120.00");
    f.db.create_bill(f.user_id, &one_off).unwrap();

    let pending = f.db.list_pending_payments(f.user_id).unwrap();
    assert_eq!(pending.len(), 1);

    f.db.pay_bill_payment(f.user_id, pending[0].id, Some(d(2025, 6, 5)))
        .unwrap();
    assert_eq!(balance(&f), dec("880.00"));

    // NONE recurrence spawns nothing further
    assert!(f.db.list_pending_payments(f.user_id).unwrap().is_empty());
}

#[test]
fn test_pay_bill_spawns_next_monthly_payment() {
    let f = setup();
    f.db.create_bill(f.user_id, &monthly_bill(&f)).unwrap();

    let pending = f.db.list_pending_payments(f.user_id).unwrap();
    let first_due = pending[0].due_date;

    let paid = f
        .db
        .pay_bill_payment(f.user_id, pending[0].id, Some(first_due))
        .unwrap();
    assert_eq!(paid.status, PaymentStatus::Paid);
    assert_eq!(paid.payment_date, Some(first_due));
    assert!(paid.transaction_id.is_some());
    assert_eq!(balance(&f), dec("200.00"));

    let next = f.db.list_pending_payments(f.user_id).unwrap();
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].due_date, first_due.checked_add_months(chrono::Months::new(1)).unwrap());
}

#[test]
fn test_pay_bill_spawns_next_yearly_payment() {
    let f = setup();
    let mut yearly = monthly_bill(&f);
    yearly.description = "Insurance".to_string();
    yearly.amount = dec("300.00");
    yearly.recurrence = Recurrence::Yearly;
    f.db.create_bill(f.user_id, &yearly).unwrap();

    let pending = f.db.list_pending_payments(f.user_id).unwrap();
    let first_due = pending[0].due_date;

    f.db.pay_bill_payment(f.user_id, pending[0].id, Some(first_due))
        .unwrap();
    assert_eq!(balance(&f), dec("700.00"));

    let next = f.db.list_pending_payments(f.user_id).unwrap();
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].amount, dec("300.00"));
    assert_eq!(
        next[0].due_date,
        first_due.checked_add_months(chrono::Months::new(12)).unwrap()
    );
}

#[test]
fn test_pay_bill_twice_conflicts() {
    let f = setup();
    f.db.create_bill(f.user_id, &monthly_bill(&f)).unwrap();
    let pending = f.db.list_pending_payments(f.user_id).unwrap();

    f.db.pay_bill_payment(f.user_id, pending[0].id, None).unwrap();
    let err = f
        .db
        .pay_bill_payment(f.user_id, pending[0].id, None)
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(balance(&f), dec("200.00"));
}

#[test]
fn test_card_bill_charges_invoice() {
    let f = setup();
    let mut bill = monthly_bill(&f);
    bill.account_id = None;
    bill.card_id = Some(f.card_id);
    bill.amount = dec("99.90");
    f.db.create_bill(f.user_id, &bill).unwrap();

    let pending = f.db.list_pending_payments(f.user_id).unwrap();
    f.db.pay_bill_payment(f.user_id, pending[0].id, Some(d(2025, 6, 10)))
        .unwrap();

    // Account untouched; invoice carries the charge
    assert_eq!(balance(&f), dec("1000.00"));
    let invoices = f.db.list_invoices(f.user_id, Some(f.card_id)).unwrap();
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].total_amount, dec("99.90"));
}

// --- debts ---

fn car_loan() -> NewDebt {
    NewDebt {
        description: "Car loan".to_string(),
        creditor: Some("Financeira".to_string()),
        debt_type: "LOAN".to_string(),
        initial_amount: dec("600.00"),
        interest_rate: Some(1.5),
        minimum_payment: Some(dec("50.00")),
        payment_due_day: Some(10),
        bank_id: None,
        start_date: d(2025, 1, 10),
        estimated_end_date: None,
    }
}

#[test]
fn test_pay_debt_reduces_outstanding() {
    let f = setup();
    let debt = f.db.create_debt(f.user_id, &car_loan()).unwrap();
    assert_eq!(debt.outstanding_balance, dec("600.00"));

    let payment = f
        .db
        .pay_debt(
            f.user_id,
            debt.id,
            &PayDebt {
                amount: dec("250.00"),
                date: d(2025, 6, 10),
                category_id: f.expense_cat,
                account_id: f.account_id,
            },
        )
        .unwrap();
    assert_eq!(payment.amount, dec("250.00"));

    let debt = f.db.get_debt(f.user_id, debt.id).unwrap().unwrap();
    assert_eq!(debt.outstanding_balance, dec("350.00"));
    assert_eq!(debt.status, DebtStatus::Active);
    assert_eq!(balance(&f), dec("750.00"));
}

#[test]
fn test_overpaying_debt_rejected() {
    let f = setup();
    let debt = f.db.create_debt(f.user_id, &car_loan()).unwrap();

    let err = f
        .db
        .pay_debt(
            f.user_id,
            debt.id,
            &PayDebt {
                amount: dec("600.01"),
                date: d(2025, 6, 10),
                category_id: f.expense_cat,
                account_id: f.account_id,
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds(_)));
    assert_eq!(balance(&f), dec("1000.00"));
}

#[test]
fn test_debt_paid_off_at_zero_and_terminal() {
    let f = setup();
    let debt = f.db.create_debt(f.user_id, &car_loan()).unwrap();

    f.db.pay_debt(
        f.user_id,
        debt.id,
        &PayDebt {
            amount: dec("600.00"),
            date: d(2025, 6, 10),
            category_id: f.expense_cat,
            account_id: f.account_id,
        },
    )
    .unwrap();

    let debt = f.db.get_debt(f.user_id, debt.id).unwrap().unwrap();
    assert_eq!(debt.status, DebtStatus::PaidOff);
    assert_eq!(debt.outstanding_balance, dec("0.00"));

    let err = f
        .db
        .pay_debt(
            f.user_id,
            debt.id,
            &PayDebt {
                amount: dec("1.00"),
                date: d(2025, 6, 11),
                category_id: f.expense_cat,
                account_id: f.account_id,
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    // Terminal states can't be cancelled either
    assert!(matches!(
        f.db.cancel_debt(f.user_id, debt.id).unwrap_err(),
        Error::Conflict(_)
    ));
}

#[test]
fn test_cancel_debt() {
    let f = setup();
    let debt = f.db.create_debt(f.user_id, &car_loan()).unwrap();

    let cancelled = f.db.cancel_debt(f.user_id, debt.id).unwrap();
    assert_eq!(cancelled.status, DebtStatus::Cancelled);

    let payments = f.db.list_debt_payments(f.user_id, debt.id).unwrap();
    assert!(payments.is_empty());
}

#[test]
fn test_pay_debt_requires_expense_category() {
    let f = setup();
    let debt = f.db.create_debt(f.user_id, &car_loan()).unwrap();

    let err = f
        .db
        .pay_debt(
            f.user_id,
            debt.id,
            &PayDebt {
                amount: dec("50.00"),
                date: d(2025, 6, 10),
                category_id: f.income_cat,
                account_id: f.account_id,
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

// --- invoices ---

#[test]
fn test_pay_invoice_full_total() {
    let f = setup();

    f.db.create_transaction(f.user_id, &card_expense(&f, "50.00", d(2025, 6, 1), 1))
        .unwrap();
    let created = f
        .db
        .create_transaction(f.user_id, &card_expense(&f, "150.00", d(2025, 6, 10), 1))
        .unwrap();
    let invoice_id = created[0].invoice_id.unwrap();

    let payment = f
        .db
        .pay_invoice(
            f.user_id,
            invoice_id,
            &PayInvoice {
                account_id: f.account_id,
                payment_date: d(2025, 6, 22),
                category_id: f.expense_cat,
            },
        )
        .unwrap();
    assert_eq!(payment.value, dec("200.00"));
    assert_eq!(balance(&f), dec("800.00"));

    let invoice = f.db.get_invoice(f.user_id, invoice_id).unwrap().unwrap();
    assert!(invoice.is_paid);

    // Second payment conflicts
    let err = f
        .db
        .pay_invoice(
            f.user_id,
            invoice_id,
            &PayInvoice {
                account_id: f.account_id,
                payment_date: d(2025, 6, 23),
                category_id: f.expense_cat,
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[test]
fn test_invoice_transactions_listing() {
    let f = setup();

    let created = f
        .db
        .create_transaction(f.user_id, &card_expense(&f, "100.00", d(2025, 6, 1), 2))
        .unwrap();
    let first_invoice = created[0].invoice_id.unwrap();

    let txs = f.db.list_invoice_transactions(f.user_id, first_invoice).unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].value, dec("50.00"));
}

// --- encryption key derivation ---

#[test]
fn test_key_derivation_is_deterministic() {
    let key1 = super::derive_key("my-secret").unwrap();
    let key2 = super::derive_key("my-secret").unwrap();
    assert_eq!(key1, key2);

    // Different passphrase = different key
    let key3 = super::derive_key("other-secret").unwrap();
    assert_ne!(key1, key3);

    // SQLCipher expects a lowercase hex string
    assert!(key1.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}
