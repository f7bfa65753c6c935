use axum::extract::State;
use axum::Json;

use crate::database::models::Category;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::category_service::ReorderRequest;
use crate::state::AppState;

/// GET /api/categories
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    Ok(ApiResponse::success(state.categories.list().await?))
}

/// POST /api/categories/reorder
///
/// Accepts `{dragged_id, target_id}` or a raw gesture `{events: [...]}`.
pub async fn reorder(State(state): State<AppState>, Json(request): Json<ReorderRequest>) -> ApiResult<Vec<Category>> {
    Ok(ApiResponse::success(state.categories.reorder(request).await?))
}
