use async_trait::async_trait;
use serde_json::{json, Map, Value};
use thiserror::Error;

use super::manager::DatabaseError;
use super::models::{
    Category, Ingredient, MaskColumn, NewPromoCode, NewReferenceItem, PromoCode, Recipe, RecipeMasks, ReferenceItem,
    ReferenceItemPatch, ReferenceTable,
};
use crate::mask::{matches_all, matches_any, matches_none};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Injected or transient write failure on a single row.
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            other => StoreError::Database(DatabaseError::Sqlx(other)),
        }
    }
}

#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Items ordered by position, then bit index.
    async fn list_items(&self, table: ReferenceTable) -> Result<Vec<ReferenceItem>, StoreError>;

    /// Fails with `Conflict` if the bit index is already taken.
    async fn insert_item(&self, table: ReferenceTable, item: NewReferenceItem) -> Result<ReferenceItem, StoreError>;

    async fn update_item(&self, table: ReferenceTable, id: i32, patch: &ReferenceItemPatch) -> Result<ReferenceItem, StoreError>;

    async fn delete_item(&self, table: ReferenceTable, id: i32) -> Result<(), StoreError>;
}

#[async_trait]
pub trait IngredientStore: Send + Sync {
    async fn list_ingredients(&self) -> Result<Vec<Ingredient>, StoreError>;

    async fn get_ingredient(&self, id: i32) -> Result<Ingredient, StoreError>;

    /// Atomically applies `mask = (mask | set) & !clear` and returns the new mask.
    async fn update_namespace_bits(&self, id: i32, set: i32, clear: i32) -> Result<i32, StoreError>;

    /// Every ingredient below `parent_id` in the hierarchy, at any depth.
    async fn descendants(&self, parent_id: i32) -> Result<Vec<i32>, StoreError>;
}

#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// One page of matching recipes plus the total match count.
    async fn find_recipes(&self, query: &RecipeQuery, limit: usize, offset: usize) -> Result<(Vec<Recipe>, usize), StoreError>;

    async fn get_recipe(&self, id: i32) -> Result<Recipe, StoreError>;

    async fn update_masks(&self, id: i32, masks: &RecipeMasks) -> Result<Recipe, StoreError>;

    /// The raw value of one mask column for every recipe.
    async fn masks(&self, column: MaskColumn) -> Result<Vec<Option<i32>>, StoreError>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;

    /// Writes all positions in one transaction.
    async fn set_positions(&self, positions: &[(i32, i32)]) -> Result<(), StoreError>;
}

#[async_trait]
pub trait PromoStore: Send + Sync {
    async fn list_promos(&self) -> Result<Vec<PromoCode>, StoreError>;

    /// Fails with `Conflict` when the code already exists.
    async fn insert_promo(&self, promo: NewPromoCode) -> Result<PromoCode, StoreError>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Mask predicates for a recipe listing. Dimensions combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeQuery {
    /// Every bit of the mask must be present in the column.
    pub require_all: Vec<(MaskColumn, i32)>,
    /// At least one bit of the mask must be present in the column.
    pub require_any: Vec<(MaskColumn, i32)>,
    /// No bit of the mask may be present in the column.
    pub exclude: Vec<(MaskColumn, i32)>,
    pub category_id: Option<i32>,
}

impl RecipeQuery {
    pub fn matches(&self, recipe: &Recipe) -> bool {
        self.require_all.iter().all(|(column, bits)| matches_all(recipe.mask(*column), *bits))
            && self.require_any.iter().all(|(column, bits)| matches_any(recipe.mask(*column), *bits))
            && self.exclude.iter().all(|(column, bits)| matches_none(recipe.mask(*column), *bits))
            && self.category_id.map_or(true, |id| recipe.category_id == Some(id))
    }

    /// The same predicate as `matches`, in the filter DSL.
    pub fn to_where(&self) -> Value {
        let mut clauses = Vec::new();
        for (column, bits) in self.require_all.iter().filter(|(_, bits)| *bits != 0) {
            clauses.push(json!({ (column.column_name()): { "$bits_all": bits } }));
        }
        for (column, bits) in self.require_any.iter().filter(|(_, bits)| *bits != 0) {
            clauses.push(json!({ (column.column_name()): { "$bits_any": bits } }));
        }
        for (column, bits) in self.exclude.iter().filter(|(_, bits)| *bits != 0) {
            clauses.push(json!({ (column.column_name()): { "$bits_none": bits } }));
        }
        if let Some(id) = self.category_id {
            clauses.push(json!({ "category_id": id }));
        }
        match clauses.len() {
            0 => Value::Object(Map::new()),
            _ => json!({ "$and": clauses }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter_where::FilterWhere;

    #[test]
    fn empty_query_renders_empty_where() {
        let query = RecipeQuery::default();
        assert_eq!(query.to_where(), json!({}));
        assert_eq!(FilterWhere::generate(&query.to_where()).unwrap().0, "1=1");
    }

    #[test]
    fn query_renders_conjunction() {
        let query = RecipeQuery {
            require_all: vec![(MaskColumn::Diet, 5), (MaskColumn::Equipment, 0)],
            require_any: vec![(MaskColumn::Seasonality, 6)],
            exclude: vec![(MaskColumn::Allergy, 2)],
            category_id: Some(7),
        };
        let (sql, params) = FilterWhere::generate(&query.to_where()).unwrap();
        assert_eq!(
            sql,
            "(((COALESCE(\"diet_mask\", 0) & $1::integer) = $1::integer) AND \
             ((COALESCE(\"seasonality_mask\", 0) & $2::integer) <> 0) AND \
             ((COALESCE(\"allergy_mask\", 0) & $3::integer) = 0) AND \
             (\"category_id\" = $4))"
        );
        assert_eq!(params, vec![json!(5), json!(6), json!(2), json!(7)]);
    }
}
