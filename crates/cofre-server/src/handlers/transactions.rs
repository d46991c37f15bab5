//! Transaction handlers
//!
//! Creation returns a Vec because a card expense in installments produces
//! one transaction per slice.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::{AppError, AppState, AuthUser, SuccessResponse};
use cofre_core::models::{NewTransaction, Transaction, UpdateTransaction};

/// GET /api/transactions - The caller's ledger, newest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    Ok(Json(state.db.list_transactions(auth.user_id)?))
}

/// POST /api/transactions
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<NewTransaction>,
) -> Result<(StatusCode, Json<Vec<Transaction>>), AppError> {
    let created = state.db.create_transaction(auth.user_id, &req)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/transactions/:id
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = state
        .db
        .get_transaction(auth.user_id, id)?
        .ok_or_else(|| AppError::not_found(&format!("Transaction {} not found", id)))?;
    Ok(Json(transaction))
}

/// PUT /api/transactions/:id
pub async fn update_transaction(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTransaction>,
) -> Result<Json<Transaction>, AppError> {
    Ok(Json(state.db.update_transaction(auth.user_id, id, &req)?))
}

/// DELETE /api/transactions/:id - Remove the row and undo its effects
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_transaction(auth.user_id, id)?;
    Ok(Json(SuccessResponse { success: true }))
}
