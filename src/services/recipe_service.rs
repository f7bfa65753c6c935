use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::ServiceError;
use crate::config::ListingConfig;
use crate::database::models::{MaskColumn, Recipe, RecipeMasks, ReferenceItem, ReferenceTable};
use crate::database::store::{IngredientStore, RecipeQuery, RecipeStore, ReferenceStore};
use crate::mask::{self, CoverageReport, FilteredPage};

/// Listing criteria. Id sets are reference-item ids, not bit positions.
#[derive(Debug, Clone, Default)]
pub struct RecipeListParams {
    /// Recipe must carry every one of these diets.
    pub diets: HashSet<i32>,
    /// Recipe must need every one of these pieces of equipment.
    pub equipment: HashSet<i32>,
    /// Recipe must be in season in at least one of these seasons.
    pub seasons: HashSet<i32>,
    /// Recipe must carry none of these allergens.
    pub allergy_free: HashSet<i32>,
    pub category_id: Option<i32>,
    /// `Some(true)` keeps only recipes missing a required translation.
    pub incomplete_translations: Option<bool>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

/// One mask in a rewrite: a raw value or the selected reference-item ids.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MaskInput {
    Mask(i64),
    Ids(Vec<i32>),
}

/// Wholesale rewrite of a recipe's masks. Missing or null fields store NULL.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMasksRequest {
    pub allergy_mask: Option<MaskInput>,
    pub diet_mask: Option<MaskInput>,
    pub equipment_mask: Option<MaskInput>,
    pub seasonality_mask: Option<MaskInput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    /// Decoded attributes keyed by reference table name.
    pub attributes: BTreeMap<&'static str, Vec<ReferenceItem>>,
    pub attribute_count: u32,
    pub complete_translations: bool,
}

#[derive(Clone)]
pub struct RecipeService {
    recipes: Arc<dyn RecipeStore>,
    references: Arc<dyn ReferenceStore>,
    ingredients: Arc<dyn IngredientStore>,
    listing: ListingConfig,
}

impl RecipeService {
    pub fn new(
        recipes: Arc<dyn RecipeStore>,
        references: Arc<dyn ReferenceStore>,
        ingredients: Arc<dyn IngredientStore>,
        listing: ListingConfig,
    ) -> Self {
        Self { recipes, references, ingredients, listing }
    }

    pub async fn list(&self, params: RecipeListParams) -> Result<FilteredPage<Recipe>, ServiceError> {
        let page = params.page.unwrap_or(1).max(1);
        let page_size = params
            .page_size
            .unwrap_or(self.listing.default_page_size)
            .clamp(1, self.listing.max_page_size.max(1));

        let offset = (page - 1)
            .checked_mul(page_size)
            .filter(|offset| *offset <= i32::MAX as usize)
            .ok_or_else(|| ServiceError::validation("page", format!("page {} is out of range", page)))?;

        let query = self.build_query(&params).await?;

        let Some(want_incomplete) = params.incomplete_translations else {
            // Every predicate is in the query, so the store paginates.
            let (items, total) = self.recipes.find_recipes(&query, page_size, offset).await?;
            return Ok(FilteredPage { items, total, page, page_size, truncated: false });
        };

        // Translation completeness is checked here, over a bounded superset.
        let cap = self.listing.superset_cap;
        let (candidates, _) = self.recipes.find_recipes(&query, cap, 0).await?;
        let locales = &self.listing.required_locales;
        let result = mask::paginate_filtered(candidates, cap, page, page_size, |recipe: &Recipe| {
            recipe.has_complete_translations(locales) != want_incomplete
        });
        if result.truncated {
            debug!(cap, "recipe superset hit the cap; totals may undercount");
        }
        Ok(result)
    }

    async fn build_query(&self, params: &RecipeListParams) -> Result<RecipeQuery, ServiceError> {
        let mut query = RecipeQuery { category_id: params.category_id, ..Default::default() };
        for (column, ids) in [(MaskColumn::Diet, &params.diets), (MaskColumn::Equipment, &params.equipment)] {
            if !ids.is_empty() {
                let items = self.references.list_items(column.reference_table()).await?;
                query.require_all.push((column, mask::encode(ids, &items)));
            }
        }
        if !params.seasons.is_empty() {
            let items = self.references.list_items(ReferenceTable::Seasons).await?;
            query.require_any.push((MaskColumn::Seasonality, mask::encode(&params.seasons, &items)));
        }
        if !params.allergy_free.is_empty() {
            let items = self.references.list_items(ReferenceTable::Allergies).await?;
            query.exclude.push((MaskColumn::Allergy, mask::encode(&params.allergy_free, &items)));
        }
        Ok(query)
    }

    pub async fn get(&self, id: i32) -> Result<RecipeDetail, ServiceError> {
        let recipe = self.recipes.get_recipe(id).await?;

        let mut attributes = BTreeMap::new();
        let mut attribute_count = 0;
        for column in MaskColumn::ALL {
            let table = column.reference_table();
            let items = self.references.list_items(table).await?;
            let decoded: Vec<ReferenceItem> = mask::decode(recipe.mask(column), &items)?.into_iter().cloned().collect();
            attribute_count += mask::count_set_bits(recipe.mask(column))?;
            attributes.insert(table.table_name(), decoded);
        }

        let complete_translations = recipe.has_complete_translations(&self.listing.required_locales);
        Ok(RecipeDetail { recipe, attributes, attribute_count, complete_translations })
    }

    pub async fn update_masks(&self, id: i32, request: UpdateMasksRequest) -> Result<Recipe, ServiceError> {
        let masks = RecipeMasks {
            allergy_mask: self.resolve(MaskColumn::Allergy, request.allergy_mask).await?,
            diet_mask: self.resolve(MaskColumn::Diet, request.diet_mask).await?,
            equipment_mask: self.resolve(MaskColumn::Equipment, request.equipment_mask).await?,
            seasonality_mask: self.resolve(MaskColumn::Seasonality, request.seasonality_mask).await?,
        };
        let recipe = self.recipes.update_masks(id, &masks).await?;
        info!(
            recipe_id = id,
            allergy_mask = ?masks.allergy_mask,
            diet_mask = ?masks.diet_mask,
            equipment_mask = ?masks.equipment_mask,
            seasonality_mask = ?masks.seasonality_mask,
            "recipe masks rewritten"
        );
        Ok(recipe)
    }

    async fn resolve(&self, column: MaskColumn, input: Option<MaskInput>) -> Result<Option<i32>, ServiceError> {
        match input {
            None => Ok(None),
            Some(MaskInput::Mask(raw)) => Ok(Some(mask::check_mask(raw)?)),
            Some(MaskInput::Ids(ids)) => {
                let items = self.references.list_items(column.reference_table()).await?;
                Ok(Some(mask::encode(&ids.into_iter().collect(), &items)))
            }
        }
    }

    /// How often each item of `table` is used. Search namespaces are counted
    /// over ingredients, every other table over recipes.
    pub async fn coverage(&self, table: ReferenceTable) -> Result<CoverageReport, ServiceError> {
        let items = self.references.list_items(table).await?;
        let masks = match MaskColumn::for_table(table) {
            Some(column) => self.recipes.masks(column).await?,
            None => self.ingredients.list_ingredients().await?.into_iter().map(|i| i.namespace_mask).collect(),
        };
        Ok(mask::coverage(&masks, &items)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::database::store::StoreError;
    use crate::mask::MaskError;

    fn listing() -> ListingConfig {
        ListingConfig {
            default_page_size: 20,
            max_page_size: 50,
            superset_cap: 100,
            required_locales: vec!["en".to_string(), "fr".to_string()],
        }
    }

    fn service_with(store: Arc<MemoryStore>, listing: ListingConfig) -> RecipeService {
        RecipeService::new(store.clone(), store.clone(), store, listing)
    }

    fn service() -> RecipeService {
        service_with(Arc::new(MemoryStore::seeded()), listing())
    }

    fn ids(page: &FilteredPage<Recipe>) -> Vec<i32> {
        page.items.iter().map(|r| r.id).collect()
    }

    fn set(v: &[i32]) -> HashSet<i32> {
        v.iter().copied().collect()
    }

    #[tokio::test]
    async fn diets_combine_with_and() {
        let service = service();
        let vegan = service.list(RecipeListParams { diets: set(&[1]), ..Default::default() }).await.unwrap();
        assert_eq!(ids(&vegan), vec![1, 3, 5]);

        let vegan_gf = service.list(RecipeListParams { diets: set(&[1, 3]), ..Default::default() }).await.unwrap();
        assert_eq!(ids(&vegan_gf), vec![1, 5]);
        assert_eq!(vegan_gf.total, 2);
    }

    #[tokio::test]
    async fn dimensions_combine_with_and() {
        let params = RecipeListParams { diets: set(&[1]), equipment: set(&[3]), ..Default::default() };
        let page = service().list(params).await.unwrap();
        assert_eq!(ids(&page), vec![1, 3]);
    }

    #[tokio::test]
    async fn allergy_free_excludes_any_listed_allergen() {
        let params = RecipeListParams { allergy_free: set(&[1, 3]), ..Default::default() };
        let page = service().list(params).await.unwrap();
        // Beef stew has never had allergies set, so it carries none.
        assert_eq!(ids(&page), vec![1, 3, 5, 6]);
    }

    #[tokio::test]
    async fn seasons_combine_with_or() {
        let service = service();
        let summer_or_autumn = service.list(RecipeListParams { seasons: set(&[2, 3]), ..Default::default() }).await.unwrap();
        assert_eq!(ids(&summer_or_autumn), vec![1, 2, 5, 6]);

        let winter_vegan = RecipeListParams { seasons: set(&[4]), diets: set(&[1]), ..Default::default() };
        assert_eq!(ids(&service.list(winter_vegan).await.unwrap()), vec![1]);

        let spring = service.list(RecipeListParams { seasons: set(&[1]), ..Default::default() }).await.unwrap();
        assert!(spring.items.is_empty());
    }

    #[tokio::test]
    async fn huge_page_numbers_are_rejected() {
        let service = service();
        for incomplete_translations in [None, Some(true)] {
            let params = RecipeListParams {
                page: Some(usize::MAX),
                page_size: Some(50),
                incomplete_translations,
                ..Default::default()
            };
            let err = service.list(params).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation { field: "page", .. }), "{:?}", err);
        }

        // The last addressable page is still served, just empty.
        let last = i32::MAX as usize / 50 + 1;
        let page = service.list(RecipeListParams { page: Some(last), page_size: Some(50), ..Default::default() }).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 6);
    }

    #[tokio::test]
    async fn pushed_down_listing_paginates_in_the_store() {
        let params = RecipeListParams { page: Some(2), page_size: Some(4), ..Default::default() };
        let page = service().list(params).await.unwrap();
        assert_eq!(ids(&page), vec![5, 6]);
        assert_eq!(page.total, 6);
        assert!(!page.truncated);
    }

    #[tokio::test]
    async fn incomplete_translation_filter_recounts_and_reslices() {
        let service = service();
        let first = service
            .list(RecipeListParams { incomplete_translations: Some(true), page_size: Some(2), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(ids(&first), vec![2, 4]);
        assert_eq!(first.total, 3);

        let second = service
            .list(RecipeListParams {
                incomplete_translations: Some(true),
                page: Some(2),
                page_size: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ids(&second), vec![5]);
        assert_eq!(second.total, 3);

        let complete = service
            .list(RecipeListParams { incomplete_translations: Some(false), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(ids(&complete), vec![1, 3, 6]);
    }

    #[tokio::test]
    async fn superset_cap_marks_truncation() {
        let capped = ListingConfig { superset_cap: 3, ..listing() };
        let service = service_with(Arc::new(MemoryStore::seeded()), capped);
        let page = service
            .list(RecipeListParams { incomplete_translations: Some(true), ..Default::default() })
            .await
            .unwrap();
        assert!(page.truncated);
        assert_eq!(ids(&page), vec![2]);
    }

    #[tokio::test]
    async fn page_size_is_clamped() {
        let page = service().list(RecipeListParams { page_size: Some(500), ..Default::default() }).await.unwrap();
        assert_eq!(page.page_size, 50);
    }

    #[tokio::test]
    async fn detail_decodes_every_mask() {
        let detail = service().get(4).await.unwrap();
        let allergies: Vec<_> = detail.attributes["allergies"].iter().map(|i| i.name.as_str()).collect();
        assert_eq!(allergies, vec!["Gluten", "Peanuts", "Eggs"]);
        assert!(detail.attributes["seasons"].is_empty());
        assert_eq!(detail.attribute_count, 3 + 1 + 1);
        assert!(!detail.complete_translations);
    }

    #[tokio::test]
    async fn mask_rewrite_accepts_ids_and_raw_values() {
        let service = service();
        let request: UpdateMasksRequest = serde_json::from_value(serde_json::json!({
            "diet_mask": [1, 2],
            "allergy_mask": 0,
            "seasonality_mask": null
        }))
        .unwrap();
        let recipe = service.update_masks(6, request).await.unwrap();
        assert_eq!(recipe.diet_mask, Some(0b011));
        assert_eq!(recipe.allergy_mask, Some(0));
        assert_eq!(recipe.seasonality_mask, None);
        assert_eq!(recipe.equipment_mask, None);
    }

    #[tokio::test]
    async fn mask_rewrite_rejects_negative_masks() {
        let request = UpdateMasksRequest { diet_mask: Some(MaskInput::Mask(-1)), ..Default::default() };
        let err = service().update_masks(1, request).await.unwrap_err();
        assert!(matches!(err, ServiceError::Mask(MaskError::MalformedMask(-1))));

        let missing = service().update_masks(99, UpdateMasksRequest::default()).await.unwrap_err();
        assert!(matches!(missing, ServiceError::Store(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn coverage_counts_recipes_and_ingredients() {
        let service = service();
        let diets = service.coverage(ReferenceTable::Diets).await.unwrap();
        assert_eq!(diets.subjects, 6);
        assert_eq!(diets.unset, 1);
        let vegan = &diets.items[0];
        assert_eq!((vegan.id, vegan.count), (1, 3));
        assert_eq!(vegan.percentage, 50.0);

        let namespaces = service.coverage(ReferenceTable::SearchNamespaces).await.unwrap();
        assert_eq!(namespaces.subjects, 6);
        assert_eq!(namespaces.items[0].count, 4);
    }
}
