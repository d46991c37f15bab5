//! Investment handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::{AppError, AppState, AuthUser, SuccessResponse};
use cofre_core::models::Investment;
use cofre_core::NewInvestment;

/// GET /api/investments
pub async fn list_investments(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Investment>>, AppError> {
    Ok(Json(state.db.list_investments(auth.user_id)?))
}

/// POST /api/investments
pub async fn create_investment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<NewInvestment>,
) -> Result<(StatusCode, Json<Investment>), AppError> {
    let investment = state.db.create_investment(auth.user_id, &req)?;
    Ok((StatusCode::CREATED, Json(investment)))
}

/// GET /api/investments/:id
pub async fn get_investment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Investment>, AppError> {
    let investment = state
        .db
        .get_investment(auth.user_id, id)?
        .ok_or_else(|| AppError::not_found(&format!("Investment {} not found", id)))?;
    Ok(Json(investment))
}

/// PUT /api/investments/:id
pub async fn update_investment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<NewInvestment>,
) -> Result<Json<Investment>, AppError> {
    Ok(Json(state.db.update_investment(auth.user_id, id, &req)?))
}

/// DELETE /api/investments/:id
pub async fn delete_investment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_investment(auth.user_id, id)?;
    Ok(Json(SuccessResponse { success: true }))
}
