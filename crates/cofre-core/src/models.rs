//! Domain models for Cofre

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A registered user. The password hash never leaves the core layer.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A bank (reference data used by accounts and debts)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bank {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Account types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Checking,
    Savings,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Savings => "savings",
        }
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "checking" => Ok(Self::Checking),
            "savings" => Ok(Self::Savings),
            _ => Err(format!("Unknown account type: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A money account. `balance` is a derived running total, mutated only by
/// the ledger engine after creation.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub bank_id: i64,
    pub name: String,
    pub account_type: AccountType,
    pub balance: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A credit card. `closing_day` and `due_day` drive invoice bucketing.
#[derive(Debug, Clone, Serialize)]
pub struct Card {
    pub id: i64,
    pub user_id: i64,
    pub account_id: i64,
    pub name: String,
    pub limit: Decimal,
    pub closing_day: u32,
    pub due_day: u32,
    pub created_at: DateTime<Utc>,
}

/// Monthly aggregate of a card's charges, keyed by (card, month, year).
/// `total_amount` is strictly the sum of the linked transactions' values.
#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    pub id: i64,
    pub card_id: i64,
    pub month: u32,
    pub year: i32,
    pub total_amount: Decimal,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
}

/// Transaction types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TxType {
    Income,
    Expense,
    Transfer,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
            Self::Transfer => "TRANSFER",
        }
    }
}

impl std::str::FromStr for TxType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "INCOME" => Ok(Self::Income),
            "EXPENSE" => Ok(Self::Expense),
            "TRANSFER" => Ok(Self::Transfer),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single ledger target of a non-transfer transaction.
///
/// The storage schema keeps two nullable columns; this sum type enforces
/// the exactly-one-branch rule at the domain layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Account(i64),
    Card(i64),
}

impl Target {
    /// Build a target from the two nullable request fields.
    pub fn from_fields(
        account_id: Option<i64>,
        card_id: Option<i64>,
    ) -> std::result::Result<Self, String> {
        match (account_id, card_id) {
            (Some(a), None) => Ok(Self::Account(a)),
            (None, Some(c)) => Ok(Self::Card(c)),
            (Some(_), Some(_)) => {
                Err("A transaction cannot target both an account and a card".to_string())
            }
            (None, None) => Err("A transaction must target an account or a card".to_string()),
        }
    }
}

/// A ledger transaction
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub tx_type: TxType,
    pub value: Decimal,
    pub date: NaiveDate,
    pub description: String,
    pub category_id: Option<i64>,
    pub account_id: Option<i64>,
    pub card_id: Option<i64>,
    pub invoice_id: Option<i64>,
    /// Destination account for TRANSFER rows
    pub target_account_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Intent to create a transaction, as submitted by the caller
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub value: Decimal,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub account_id: Option<i64>,
    #[serde(default)]
    pub card_id: Option<i64>,
    #[serde(default)]
    pub target_account_id: Option<i64>,
    /// Number of monthly installments for card expenses (default 1)
    #[serde(default = "default_installments")]
    pub installments: u32,
}

fn default_installments() -> u32 {
    1
}

/// Replacement fields for an existing INCOME/EXPENSE transaction
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTransaction {
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub value: Decimal,
    pub date: NaiveDate,
    pub description: String,
    pub category_id: i64,
    #[serde(default)]
    pub account_id: Option<i64>,
    #[serde(default)]
    pub card_id: Option<i64>,
}

/// Category types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CategoryType {
    Income,
    Expense,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
        }
    }
}

impl std::str::FromStr for CategoryType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "INCOME" => Ok(Self::Income),
            "EXPENSE" => Ok(Self::Expense),
            _ => Err(format!("Unknown category type: {}", s)),
        }
    }
}

impl std::fmt::Display for CategoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction category
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub description: String,
    pub category_type: CategoryType,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Bill recurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recurrence {
    None,
    Monthly,
    Yearly,
}

impl Recurrence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }
}

impl std::str::FromStr for Recurrence {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NONE" => Ok(Self::None),
            "MONTHLY" => Ok(Self::Monthly),
            "YEARLY" => Ok(Self::Yearly),
            _ => Err(format!("Unknown recurrence: {}", s)),
        }
    }
}

impl std::fmt::Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recurring or one-off obligation that generates payment instances
#[derive(Debug, Clone, Serialize)]
pub struct Bill {
    pub id: i64,
    pub user_id: i64,
    pub description: String,
    pub amount: Decimal,
    pub due_day: u32,
    pub recurrence: Recurrence,
    pub category_id: i64,
    pub account_id: Option<i64>,
    pub card_id: Option<i64>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Bill payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            _ => Err(format!("Unknown payment status: {}", s)),
        }
    }
}

/// A scheduled instance of a bill
#[derive(Debug, Clone, Serialize)]
pub struct BillPayment {
    pub id: i64,
    pub bill_id: i64,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub payment_date: Option<NaiveDate>,
    /// Transaction created when this payment was made
    pub transaction_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Debt lifecycle states. PAID_OFF and CANCELLED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DebtStatus {
    Active,
    PaidOff,
    Cancelled,
}

impl DebtStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::PaidOff => "PAID_OFF",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::str::FromStr for DebtStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "PAID_OFF" => Ok(Self::PaidOff),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown debt status: {}", s)),
        }
    }
}

/// A long-lived liability paid down incrementally
#[derive(Debug, Clone, Serialize)]
pub struct Debt {
    pub id: i64,
    pub user_id: i64,
    pub description: String,
    pub creditor: Option<String>,
    pub debt_type: String,
    pub initial_amount: Decimal,
    pub outstanding_balance: Decimal,
    pub interest_rate: Option<f64>,
    pub minimum_payment: Option<Decimal>,
    pub payment_due_day: Option<u32>,
    pub bank_id: Option<i64>,
    pub start_date: NaiveDate,
    pub estimated_end_date: Option<NaiveDate>,
    pub status: DebtStatus,
    pub created_at: DateTime<Utc>,
}

/// A recorded payment against a debt
#[derive(Debug, Clone, Serialize)]
pub struct DebtPayment {
    pub id: i64,
    pub debt_id: i64,
    pub transaction_id: i64,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// A tracked investment position (plain reference data)
#[derive(Debug, Clone, Serialize)]
pub struct Investment {
    pub id: i64,
    pub user_id: i64,
    pub investment_type: String,
    pub description: String,
    pub quantity: f64,
    pub acquisition_value: Decimal,
    pub acquisition_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}
