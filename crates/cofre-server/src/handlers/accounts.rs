//! Account management handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{AppError, AppState, AuthUser, SuccessResponse};
use cofre_core::models::{Account, AccountType};

/// Request body for creating or updating an account
#[derive(Debug, Deserialize)]
pub struct AccountRequest {
    pub name: String,
    pub bank_id: i64,
    pub account_type: AccountType,
    /// Opening balance; ignored on update
    #[serde(default)]
    pub balance: Option<Decimal>,
}

/// GET /api/accounts - List the caller's accounts
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Account>>, AppError> {
    Ok(Json(state.db.list_accounts(auth.user_id)?))
}

/// POST /api/accounts - Create an account
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<AccountRequest>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    let account = state.db.create_account(
        auth.user_id,
        req.bank_id,
        &req.name,
        req.account_type,
        req.balance.unwrap_or_default(),
    )?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET /api/accounts/:id
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Account>, AppError> {
    let account = state
        .db
        .get_account(auth.user_id, id)?
        .ok_or_else(|| AppError::not_found(&format!("Account {} not found", id)))?;
    Ok(Json(account))
}

/// PUT /api/accounts/:id
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<AccountRequest>,
) -> Result<Json<Account>, AppError> {
    let account = state
        .db
        .update_account(auth.user_id, id, req.bank_id, &req.name, req.account_type)?;
    Ok(Json(account))
}

/// POST /api/accounts/:id/status - Toggle active/inactive
pub async fn toggle_account_status(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Account>, AppError> {
    Ok(Json(state.db.toggle_account_status(auth.user_id, id)?))
}

/// DELETE /api/accounts/:id
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_account(auth.user_id, id)?;
    Ok(Json(SuccessResponse { success: true }))
}
