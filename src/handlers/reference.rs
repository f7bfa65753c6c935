use axum::extract::{Path, State};
use axum::Json;

use super::parse_table;
use crate::database::models::{ReferenceItem, ReferenceItemPatch};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::reference_service::CreateReferenceItem;
use crate::state::AppState;

/// GET /api/reference/:table - items ordered by position
pub async fn list(State(state): State<AppState>, Path(table): Path<String>) -> ApiResult<Vec<ReferenceItem>> {
    let table = parse_table(&table)?;
    Ok(ApiResponse::success(state.references.list(table).await?))
}

/// POST /api/reference/:table - create an item, allocating a bit when none is given
pub async fn create(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Json(input): Json<CreateReferenceItem>,
) -> ApiResult<ReferenceItem> {
    let table = parse_table(&table)?;
    Ok(ApiResponse::created(state.references.create(table, input).await?))
}

/// PATCH /api/reference/:table/:id - display fields only
pub async fn update(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, i32)>,
    Json(patch): Json<ReferenceItemPatch>,
) -> ApiResult<ReferenceItem> {
    let table = parse_table(&table)?;
    Ok(ApiResponse::success(state.references.update(table, id, patch).await?))
}

/// DELETE /api/reference/:table/:id
pub async fn delete(State(state): State<AppState>, Path((table, id)): Path<(String, i32)>) -> ApiResult<()> {
    let table = parse_table(&table)?;
    state.references.delete(table, id).await?;
    Ok(ApiResponse::<()>::no_content())
}
