use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::debug;

use super::manager::DatabaseManager;
use super::models::{
    Category, Ingredient, MaskColumn, NewPromoCode, NewReferenceItem, PromoCode, Recipe, RecipeMasks, ReferenceItem,
    ReferenceItemPatch, ReferenceTable,
};
use super::repository::Repository;
use super::store::{
    CategoryStore, HealthCheck, IngredientStore, PromoStore, RecipeQuery, RecipeStore, ReferenceStore, StoreError,
};
use crate::filter::FilterData;

const REFERENCE_COLUMNS: &str = "id, bit_index, name, emoji, position";

/// PostgreSQL-backed stores. The pool is injected once at startup.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn repo<T>(&self, table: &str) -> Repository<T>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        Repository::new(table, self.pool.clone())
    }

    fn ordered(order: &str) -> FilterData {
        FilterData { order: Some(Value::from(order)), ..Default::default() }
    }
}

#[async_trait]
impl ReferenceStore for PgStore {
    async fn list_items(&self, table: ReferenceTable) -> Result<Vec<ReferenceItem>, StoreError> {
        Ok(self.repo::<ReferenceItem>(table.table_name()).select_any(Self::ordered("position, bit_index")).await?)
    }

    async fn insert_item(&self, table: ReferenceTable, item: NewReferenceItem) -> Result<ReferenceItem, StoreError> {
        let sql = format!(
            "INSERT INTO {} (bit_index, name, emoji, position) VALUES ($1, $2, $3, $4) RETURNING {}",
            DatabaseManager::quote_identifier(table.table_name()),
            REFERENCE_COLUMNS
        );
        let created = sqlx::query_as::<_, ReferenceItem>(&sql)
            .bind(item.bit_index.get())
            .bind(&item.name)
            .bind(&item.emoji)
            .bind(item.position)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn update_item(&self, table: ReferenceTable, id: i32, patch: &ReferenceItemPatch) -> Result<ReferenceItem, StoreError> {
        let sql = format!(
            "UPDATE {} SET \
                name = COALESCE($2, name), \
                emoji = CASE WHEN $3::text IS NULL THEN emoji ELSE NULLIF($3::text, '') END, \
                position = COALESCE($4, position) \
             WHERE id = $1 RETURNING {}",
            DatabaseManager::quote_identifier(table.table_name()),
            REFERENCE_COLUMNS
        );
        sqlx::query_as::<_, ReferenceItem>(&sql)
            .bind(id)
            .bind(&patch.name)
            .bind(&patch.emoji)
            .bind(patch.position)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{} item {}", table, id)))
    }

    async fn delete_item(&self, table: ReferenceTable, id: i32) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", DatabaseManager::quote_identifier(table.table_name()));
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("{} item {}", table, id)));
        }
        Ok(())
    }
}

#[async_trait]
impl IngredientStore for PgStore {
    async fn list_ingredients(&self) -> Result<Vec<Ingredient>, StoreError> {
        Ok(self.repo::<Ingredient>("ingredients").select_any(Self::ordered("name, id")).await?)
    }

    async fn get_ingredient(&self, id: i32) -> Result<Ingredient, StoreError> {
        self.repo::<Ingredient>("ingredients")
            .select_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("ingredient {}", id)))
    }

    async fn update_namespace_bits(&self, id: i32, set: i32, clear: i32) -> Result<i32, StoreError> {
        // Single statement, so concurrent toggles on one row cannot lose updates.
        let mask = sqlx::query_scalar::<_, Option<i32>>(
            "UPDATE ingredients SET namespace_mask = (COALESCE(namespace_mask, 0) | $2) & ~$3 \
             WHERE id = $1 RETURNING namespace_mask",
        )
        .bind(id)
        .bind(set)
        .bind(clear)
        .fetch_optional(&self.pool)
        .await?
        .flatten();

        match mask {
            Some(mask) => Ok(mask),
            None => Err(StoreError::NotFound(format!("ingredient {}", id))),
        }
    }

    async fn descendants(&self, parent_id: i32) -> Result<Vec<i32>, StoreError> {
        let ids = sqlx::query_scalar::<_, i32>(
            "WITH RECURSIVE tree AS ( \
                SELECT id FROM ingredients WHERE parent_id = $1 \
                UNION \
                SELECT i.id FROM ingredients i JOIN tree t ON i.parent_id = t.id \
             ) SELECT id FROM tree ORDER BY id",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

#[async_trait]
impl RecipeStore for PgStore {
    async fn find_recipes(&self, query: &RecipeQuery, limit: usize, offset: usize) -> Result<(Vec<Recipe>, usize), StoreError> {
        let where_clause = query.to_where();
        debug!(%where_clause, limit, offset, "finding recipes");

        let repo = self.repo::<Recipe>("recipes");
        let page = repo
            .select_any(FilterData {
                where_clause: Some(where_clause.clone()),
                order: Some(json!("id")),
                limit: Some(i32::try_from(limit).unwrap_or(i32::MAX)),
                offset: Some(i32::try_from(offset).unwrap_or(i32::MAX)),
                ..Default::default()
            })
            .await?;
        let total = repo
            .count(FilterData { where_clause: Some(where_clause), ..Default::default() })
            .await?;
        Ok((page, total.max(0) as usize))
    }

    async fn get_recipe(&self, id: i32) -> Result<Recipe, StoreError> {
        self.repo::<Recipe>("recipes")
            .select_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("recipe {}", id)))
    }

    async fn update_masks(&self, id: i32, masks: &RecipeMasks) -> Result<Recipe, StoreError> {
        sqlx::query_as::<_, Recipe>(
            "UPDATE recipes SET allergy_mask = $2, diet_mask = $3, equipment_mask = $4, seasonality_mask = $5, \
             updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(masks.allergy_mask)
        .bind(masks.diet_mask)
        .bind(masks.equipment_mask)
        .bind(masks.seasonality_mask)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("recipe {}", id)))
    }

    async fn masks(&self, column: MaskColumn) -> Result<Vec<Option<i32>>, StoreError> {
        let sql = format!("SELECT {} FROM recipes", DatabaseManager::quote_identifier(column.column_name()));
        Ok(sqlx::query_scalar::<_, Option<i32>>(&sql).fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl CategoryStore for PgStore {
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.repo::<Category>("categories").select_any(Self::ordered("position, id")).await?)
    }

    async fn set_positions(&self, positions: &[(i32, i32)]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for (id, position) in positions {
            let result = sqlx::query("UPDATE categories SET position = $2 WHERE id = $1")
                .bind(id)
                .bind(position)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!("category {}", id)));
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl PromoStore for PgStore {
    async fn list_promos(&self) -> Result<Vec<PromoCode>, StoreError> {
        Ok(self.repo::<PromoCode>("promo_codes").select_any(Self::ordered("created_at desc, id desc")).await?)
    }

    async fn insert_promo(&self, promo: NewPromoCode) -> Result<PromoCode, StoreError> {
        let created = sqlx::query_as::<_, PromoCode>(
            "INSERT INTO promo_codes (code, discount_percent, max_uses) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&promo.code)
        .bind(promo.discount_percent)
        .bind(promo.max_uses)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }
}

#[async_trait]
impl HealthCheck for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(DatabaseManager::health_check(&self.pool).await?)
    }
}
