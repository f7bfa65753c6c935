use axum::extract::State;
use axum::Json;

use crate::database::models::PromoCode;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::promo_service::GeneratePromoRequest;
use crate::state::AppState;

/// GET /api/promos - newest first
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<PromoCode>> {
    Ok(ApiResponse::success(state.promos.list().await?))
}

/// POST /api/promos
pub async fn generate(State(state): State<AppState>, Json(request): Json<GeneratePromoRequest>) -> ApiResult<PromoCode> {
    Ok(ApiResponse::created(state.promos.generate(request).await?))
}
