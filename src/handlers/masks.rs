// handlers/masks.rs - translate between id selections and mask integers

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::parse_table;
use crate::mask::check_mask;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::reference_service::DecodedMask;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EncodeRequest {
    pub reference_table: String,
    #[serde(default)]
    pub selected_ids: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct Encoded {
    pub mask: i32,
}

#[derive(Debug, Deserialize)]
pub struct DecodeQuery {
    pub reference_table: String,
    /// Absent means an unset mask.
    pub mask: Option<i64>,
}

/// POST /api/masks/encode
pub async fn encode(State(state): State<AppState>, Json(request): Json<EncodeRequest>) -> ApiResult<Encoded> {
    let table = parse_table(&request.reference_table)?;
    let selected = request.selected_ids.into_iter().collect();
    let mask = state.references.encode(table, &selected).await?;
    Ok(ApiResponse::success(Encoded { mask }))
}

/// GET /api/masks/decode?reference_table=diets&mask=5
pub async fn decode(State(state): State<AppState>, Query(query): Query<DecodeQuery>) -> ApiResult<DecodedMask> {
    let table = parse_table(&query.reference_table)?;
    let mask = query.mask.map(check_mask).transpose()?;
    Ok(ApiResponse::success(state.references.decode(table, mask).await?))
}
