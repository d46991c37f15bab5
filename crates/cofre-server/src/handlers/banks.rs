//! Bank handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::{AppError, AppState, AuthUser, SuccessResponse};
use cofre_core::models::Bank;

#[derive(Debug, Deserialize)]
pub struct BankRequest {
    pub name: String,
}

/// GET /api/banks
pub async fn list_banks(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Bank>>, AppError> {
    Ok(Json(state.db.list_banks(auth.user_id)?))
}

/// POST /api/banks
pub async fn create_bank(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<BankRequest>,
) -> Result<(StatusCode, Json<Bank>), AppError> {
    let bank = state.db.create_bank(auth.user_id, &req.name)?;
    Ok((StatusCode::CREATED, Json(bank)))
}

/// GET /api/banks/:id
pub async fn get_bank(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Bank>, AppError> {
    let bank = state
        .db
        .get_bank(auth.user_id, id)?
        .ok_or_else(|| AppError::not_found(&format!("Bank {} not found", id)))?;
    Ok(Json(bank))
}

/// PUT /api/banks/:id
pub async fn update_bank(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<BankRequest>,
) -> Result<Json<Bank>, AppError> {
    Ok(Json(state.db.update_bank(auth.user_id, id, &req.name)?))
}

/// DELETE /api/banks/:id
pub async fn delete_bank(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_bank(auth.user_id, id)?;
    Ok(Json(SuccessResponse { success: true }))
}
