//! Credit card handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{AppError, AppState, AuthUser, SuccessResponse};
use cofre_core::models::Card;

#[derive(Debug, Deserialize)]
pub struct CardRequest {
    pub name: String,
    pub account_id: i64,
    pub limit: Decimal,
    pub closing_day: u32,
    pub due_day: u32,
}

/// GET /api/cards
pub async fn list_cards(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Card>>, AppError> {
    Ok(Json(state.db.list_cards(auth.user_id)?))
}

/// POST /api/cards
pub async fn create_card(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CardRequest>,
) -> Result<(StatusCode, Json<Card>), AppError> {
    let card = state.db.create_card(
        auth.user_id,
        req.account_id,
        &req.name,
        req.limit,
        req.closing_day,
        req.due_day,
    )?;
    Ok((StatusCode::CREATED, Json(card)))
}

/// GET /api/cards/:id
pub async fn get_card(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Card>, AppError> {
    let card = state
        .db
        .get_card(auth.user_id, id)?
        .ok_or_else(|| AppError::not_found(&format!("Card {} not found", id)))?;
    Ok(Json(card))
}

/// PUT /api/cards/:id
pub async fn update_card(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<CardRequest>,
) -> Result<Json<Card>, AppError> {
    let card = state.db.update_card(
        auth.user_id,
        id,
        req.account_id,
        &req.name,
        req.limit,
        req.closing_day,
        req.due_day,
    )?;
    Ok(Json(card))
}

/// DELETE /api/cards/:id
pub async fn delete_card(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_card(auth.user_id, id)?;
    Ok(Json(SuccessResponse { success: true }))
}
