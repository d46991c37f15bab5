//! Debt handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::{AppError, AppState, AuthUser};
use cofre_core::models::{Debt, DebtPayment};
use cofre_core::{NewDebt, PayDebt};

/// GET /api/debts
pub async fn list_debts(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Debt>>, AppError> {
    Ok(Json(state.db.list_debts(auth.user_id)?))
}

/// POST /api/debts
pub async fn create_debt(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<NewDebt>,
) -> Result<(StatusCode, Json<Debt>), AppError> {
    let debt = state.db.create_debt(auth.user_id, &req)?;
    Ok((StatusCode::CREATED, Json(debt)))
}

/// GET /api/debts/:id
pub async fn get_debt(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Debt>, AppError> {
    let debt = state
        .db
        .get_debt(auth.user_id, id)?
        .ok_or_else(|| AppError::not_found(&format!("Debt {} not found", id)))?;
    Ok(Json(debt))
}

/// PUT /api/debts/:id
pub async fn update_debt(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<NewDebt>,
) -> Result<Json<Debt>, AppError> {
    Ok(Json(state.db.update_debt(auth.user_id, id, &req)?))
}

/// DELETE /api/debts/:id - Soft delete: ACTIVE becomes CANCELLED
pub async fn cancel_debt(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Debt>, AppError> {
    Ok(Json(state.db.cancel_debt(auth.user_id, id)?))
}

/// POST /api/debts/:id/pay - Pay down the outstanding balance
pub async fn pay_debt(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<PayDebt>,
) -> Result<Json<DebtPayment>, AppError> {
    Ok(Json(state.db.pay_debt(auth.user_id, id, &req)?))
}

/// GET /api/debts/:id/payments
pub async fn list_debt_payments(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<DebtPayment>>, AppError> {
    Ok(Json(state.db.list_debt_payments(auth.user_id, id)?))
}
