//! AI chat passthrough

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, AuthUser};
use cofre_core::Error;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(rename = "conversationId", alias = "conversation_id")]
    pub conversation_id: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub output: String,
}

/// POST /api/chat - Forward a question to the configured assistant webhook
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.question.trim().is_empty() {
        return Err(AppError::bad_request("Question is required"));
    }

    let client = state.chat.as_ref().ok_or_else(|| {
        AppError::from(Error::External("Chat webhook is not configured".to_string()))
    })?;

    let output = client
        .ask(auth.user_id, &req.conversation_id, &req.question)
        .await?;
    Ok(Json(ChatResponse { output }))
}
