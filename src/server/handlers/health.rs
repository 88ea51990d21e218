use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// Reports liveness and how many documents the vector store holds.
/// Never triggers corpus construction.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "documentsLoaded": state.rag.document_count()
    }))
}
