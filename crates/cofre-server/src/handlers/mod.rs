//! HTTP request handlers, one module per domain

mod accounts;
mod auth;
mod banks;
mod bills;
mod cards;
mod categories;
mod chat;
mod debts;
mod export;
mod investments;
mod invoices;
mod transactions;

pub use accounts::*;
pub use auth::*;
pub use banks::*;
pub use bills::*;
pub use cards::*;
pub use categories::*;
pub use chat::*;
pub use debts::*;
pub use export::*;
pub use investments::*;
pub use invoices::*;
pub use transactions::*;
