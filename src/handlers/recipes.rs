// handlers/recipes.rs - listing, detail, mask rewrites and attribute stats

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::{parse_ids, parse_table};
use crate::database::models::Recipe;
use crate::mask::{CoverageReport, FilteredPage};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::recipe_service::{RecipeDetail, RecipeListParams, UpdateMasksRequest};
use crate::state::AppState;

/// `?diets=1,3&equipment=2&seasons=2,3&allergy_free=1&category_id=2&incomplete_translations=true&page=1&page_size=20`
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub diets: Option<String>,
    pub equipment: Option<String>,
    pub seasons: Option<String>,
    pub allergy_free: Option<String>,
    pub category_id: Option<i32>,
    pub incomplete_translations: Option<bool>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

/// GET /api/recipes
pub async fn list(State(state): State<AppState>, Query(query): Query<RecipeListQuery>) -> ApiResult<FilteredPage<Recipe>> {
    let params = RecipeListParams {
        diets: parse_ids("diets", query.diets.as_deref())?,
        equipment: parse_ids("equipment", query.equipment.as_deref())?,
        seasons: parse_ids("seasons", query.seasons.as_deref())?,
        allergy_free: parse_ids("allergy_free", query.allergy_free.as_deref())?,
        category_id: query.category_id,
        incomplete_translations: query.incomplete_translations,
        page: query.page,
        page_size: query.page_size,
    };
    Ok(ApiResponse::success(state.recipes.list(params).await?))
}

/// GET /api/recipes/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<RecipeDetail> {
    Ok(ApiResponse::success(state.recipes.get(id).await?))
}

/// PUT /api/recipes/:id/masks - replaces all four masks
pub async fn update_masks(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateMasksRequest>,
) -> ApiResult<Recipe> {
    Ok(ApiResponse::success(state.recipes.update_masks(id, request).await?))
}

/// GET /api/recipes/stats/:table
pub async fn stats(State(state): State<AppState>, Path(table): Path<String>) -> ApiResult<CoverageReport> {
    let table = parse_table(&table)?;
    Ok(ApiResponse::success(state.recipes.coverage(table).await?))
}
