//! Cofre Core Library
//!
//! Shared functionality for the Cofre personal finance API:
//! - Database access and migrations (SQLite, optionally SQLCipher-encrypted)
//! - The ledger mutation engine: balances, invoices, installments, transfers
//! - Bill scheduling and debt amortization
//! - CSV export
//! - Thin client for the external AI chat webhook

pub mod chat;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod money;

pub use chat::ChatClient;
pub use db::{
    invoice_bucket, split_installments, Database, Installment, LedgerPolicy, NewBill, NewDebt,
    NewInvestment, PayDebt, PayInvoice,
};
pub use error::{Error, Result};
pub use export::ExportOptions;
