//! CSV export endpoint

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Extension,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{AppError, AppState, AuthUser};
use cofre_core::ExportOptions;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

/// GET /api/export/transactions?from=YYYY-MM-DD&to=YYYY-MM-DD
pub async fn export_transactions(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let opts = ExportOptions {
        from: query.from,
        to: query.to,
    };
    let csv = state.db.export_transactions_csv(auth.user_id, &opts)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.csv\"",
            ),
        ],
        csv,
    ))
}
