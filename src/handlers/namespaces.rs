use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::namespace_service::{ExcludeChildrenResult, NamespaceChange, NamespaceMember};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExcludeChildrenRequest {
    pub bit_indexes: Vec<i64>,
}

/// GET /api/namespaces/:bit_index/ingredients - every ingredient, flagged
pub async fn ingredients(State(state): State<AppState>, Path(bit_index): Path<i64>) -> ApiResult<Vec<NamespaceMember>> {
    Ok(ApiResponse::success(state.namespaces.ingredients_for_namespace(bit_index).await?))
}

/// POST /api/namespaces/:bit_index/ingredients/:id
pub async fn add(State(state): State<AppState>, Path((bit_index, id)): Path<(i64, i32)>) -> ApiResult<NamespaceChange> {
    Ok(ApiResponse::success(state.namespaces.add_ingredient(id, bit_index).await?))
}

/// DELETE /api/namespaces/:bit_index/ingredients/:id
pub async fn remove(State(state): State<AppState>, Path((bit_index, id)): Path<(i64, i32)>) -> ApiResult<NamespaceChange> {
    Ok(ApiResponse::success(state.namespaces.remove_ingredient(id, bit_index).await?))
}

/// POST /api/ingredients/:id/exclude-children
///
/// Partial failures still answer 200; the body lists them.
pub async fn exclude_children(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<ExcludeChildrenRequest>,
) -> ApiResult<ExcludeChildrenResult> {
    Ok(ApiResponse::success(state.namespaces.exclude_children(id, &request.bit_indexes).await?))
}
