//! Invoice handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, AuthUser};
use cofre_core::models::{Invoice, Transaction};
use cofre_core::PayInvoice;

#[derive(Debug, Deserialize)]
pub struct InvoiceFilter {
    #[serde(default)]
    pub card_id: Option<i64>,
}

/// An invoice together with the charges that make it up
#[derive(Debug, Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub transactions: Vec<Transaction>,
}

/// GET /api/invoices?card_id=N
pub async fn list_invoices(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(filter): Query<InvoiceFilter>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    Ok(Json(state.db.list_invoices(auth.user_id, filter.card_id)?))
}

/// GET /api/invoices/:id - The invoice plus its charges
pub async fn get_invoice(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<InvoiceDetail>, AppError> {
    let invoice = state
        .db
        .get_invoice(auth.user_id, id)?
        .ok_or_else(|| AppError::not_found(&format!("Invoice {} not found", id)))?;
    let transactions = state.db.list_invoice_transactions(auth.user_id, id)?;
    Ok(Json(InvoiceDetail {
        invoice,
        transactions,
    }))
}

/// POST /api/invoices/:id/pay - Settle the invoice in full
pub async fn pay_invoice(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<PayInvoice>,
) -> Result<Json<Transaction>, AppError> {
    Ok(Json(state.db.pay_invoice(auth.user_id, id, &req)?))
}
