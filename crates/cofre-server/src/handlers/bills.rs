//! Bill and bill payment handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{AppError, AppState, AuthUser, SuccessResponse};
use cofre_core::models::{Bill, BillPayment};
use cofre_core::NewBill;

/// Optional body for paying a scheduled bill payment
#[derive(Debug, Default, Deserialize)]
pub struct PayBillRequest {
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
}

/// GET /api/bills
pub async fn list_bills(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Bill>>, AppError> {
    Ok(Json(state.db.list_bills(auth.user_id)?))
}

/// POST /api/bills
pub async fn create_bill(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<NewBill>,
) -> Result<(StatusCode, Json<Bill>), AppError> {
    let bill = state.db.create_bill(auth.user_id, &req)?;
    Ok((StatusCode::CREATED, Json(bill)))
}

/// GET /api/bills/pending - Pending payments across active bills
pub async fn list_pending_payments(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<BillPayment>>, AppError> {
    Ok(Json(state.db.list_pending_payments(auth.user_id)?))
}

/// GET /api/bills/:id
pub async fn get_bill(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Bill>, AppError> {
    let bill = state
        .db
        .get_bill(auth.user_id, id)?
        .ok_or_else(|| AppError::not_found(&format!("Bill {} not found", id)))?;
    Ok(Json(bill))
}

/// PUT /api/bills/:id
pub async fn update_bill(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<NewBill>,
) -> Result<Json<Bill>, AppError> {
    Ok(Json(state.db.update_bill(auth.user_id, id, &req)?))
}

/// POST /api/bills/:id/status - Toggle active/inactive
pub async fn toggle_bill_status(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Bill>, AppError> {
    Ok(Json(state.db.toggle_bill_status(auth.user_id, id)?))
}

/// DELETE /api/bills/:id - Remove the bill and its schedule
pub async fn delete_bill(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_bill(auth.user_id, id)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/bills/:id/payments - Payment history for one bill
pub async fn list_bill_payments(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<BillPayment>>, AppError> {
    Ok(Json(state.db.list_bill_payments(auth.user_id, id)?))
}

/// POST /api/bills/payments/:id/pay - Settle a scheduled payment
pub async fn pay_bill(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    body: Option<Json<PayBillRequest>>,
) -> Result<Json<BillPayment>, AppError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    Ok(Json(
        state
            .db
            .pay_bill_payment(auth.user_id, id, req.payment_date)?,
    ))
}
