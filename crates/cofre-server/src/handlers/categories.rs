//! Category handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::{AppError, AppState, AuthUser, SuccessResponse};
use cofre_core::models::{Category, CategoryType};

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub description: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
}

/// GET /api/categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.db.list_categories(auth.user_id)?))
}

/// POST /api/categories
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let category = state
        .db
        .create_category(auth.user_id, &req.description, req.category_type)?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /api/categories/:id
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, AppError> {
    let category = state
        .db
        .get_category(auth.user_id, id)?
        .ok_or_else(|| AppError::not_found(&format!("Category {} not found", id)))?;
    Ok(Json(category))
}

/// PUT /api/categories/:id
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<Category>, AppError> {
    Ok(Json(state.db.update_category(
        auth.user_id,
        id,
        &req.description,
        req.category_type,
    )?))
}

/// POST /api/categories/:id/status - Toggle active/inactive
pub async fn toggle_category_status(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, AppError> {
    Ok(Json(state.db.toggle_category_status(auth.user_id, id)?))
}

/// DELETE /api/categories/:id
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_category(auth.user_id, id)?;
    Ok(Json(SuccessResponse { success: true }))
}
