use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::RwLock;

use super::models::{
    Category, Ingredient, MaskColumn, NewPromoCode, NewReferenceItem, PromoCode, Recipe, RecipeMasks, ReferenceItem,
    ReferenceItemPatch, ReferenceTable,
};
use super::store::{
    CategoryStore, HealthCheck, IngredientStore, PromoStore, RecipeQuery, RecipeStore, ReferenceStore, StoreError,
};
use crate::mask::BitIndex;

/// Process-local stores for development and tests. Every write happens under
/// one lock, which gives the same atomicity as the single-statement SQL updates.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    reference: HashMap<ReferenceTable, Vec<ReferenceItem>>,
    ingredients: BTreeMap<i32, Ingredient>,
    recipes: BTreeMap<i32, Recipe>,
    categories: BTreeMap<i32, Category>,
    promos: Vec<PromoCode>,
    /// Ingredients whose writes fail, for exercising partial batch failures.
    failing_ingredients: HashSet<i32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small catalogue of reference items, ingredients, recipes and categories.
    pub fn seeded() -> Self {
        let mut state = MemoryState::default();

        let tables: [(ReferenceTable, &[(&str, &str)]); 5] = [
            (ReferenceTable::Diets, &[("Vegan", "🌱"), ("Vegetarian", "🥕"), ("Gluten-Free", "🌾")]),
            (ReferenceTable::Allergies, &[("Gluten", "🍞"), ("Peanuts", "🥜"), ("Lactose", "🥛"), ("Eggs", "🥚")]),
            (ReferenceTable::KitchenEquipment, &[("Oven", "🔥"), ("Blender", "🌀"), ("Slow cooker", "🍲")]),
            (ReferenceTable::Seasons, &[("Spring", "🌷"), ("Summer", "☀️"), ("Autumn", "🍂"), ("Winter", "❄️")]),
            (ReferenceTable::SearchNamespaces, &[("Pantry", "🥫"), ("Fresh produce", "🧺"), ("Baby food", "🍼")]),
        ];
        for (table, names) in tables {
            let items = names
                .iter()
                .zip(BitIndex::all())
                .enumerate()
                .map(|(i, ((name, emoji), bit_index))| ReferenceItem {
                    id: i as i32 + 1,
                    bit_index,
                    name: name.to_string(),
                    emoji: Some(emoji.to_string()),
                    position: i as i32,
                })
                .collect();
            state.reference.insert(table, items);
        }

        let ingredients = [
            (1, "Tomato", None, Some(0b011)),
            (2, "Cherry tomato", Some(1), Some(0b011)),
            (3, "Roma tomato", Some(1), Some(0b001)),
            (4, "Sun-dried tomato", Some(3), Some(0b001)),
            (5, "Basil", None, Some(0b010)),
            (6, "Carrot", None, None),
        ];
        for (id, name, parent_id, namespace_mask) in ingredients {
            state.ingredients.insert(id, Ingredient { id, name: name.to_string(), parent_id, namespace_mask });
        }

        for (id, name) in [(1, "Soups"), (2, "Mains"), (3, "Desserts"), (4, "Snacks")] {
            state.categories.insert(id, Category { id, name: name.to_string(), position: id - 1 });
        }

        // (id, title, translations, category, allergy, diet, equipment, seasonality)
        let recipes: [(i32, &str, &[(&str, &str)], i32, Option<i32>, Option<i32>, Option<i32>, Option<i32>); 6] = [
            (1, "Lentil soup", &[("en", "Lentil soup"), ("fr", "Soupe de lentilles")], 1, Some(0), Some(0b111), Some(0b100), Some(0b1100)),
            (2, "Mushroom risotto", &[("en", "Mushroom risotto")], 2, Some(0b100), Some(0b110), Some(0), Some(0b0100)),
            (3, "Chickpea curry", &[("en", "Chickpea curry"), ("fr", "Curry de pois chiches")], 2, Some(0), Some(0b011), Some(0b101), None),
            (4, "Peanut cookies", &[("en", "Peanut cookies"), ("fr", " ")], 3, Some(0b1011), Some(0b010), Some(0b001), None),
            (5, "Gazpacho", &[("fr", "Gaspacho")], 1, Some(0), Some(0b111), Some(0b010), Some(0b0010)),
            (6, "Beef stew", &[("en", "Beef stew"), ("fr", "Ragoût de bœuf")], 2, None, None, Some(0b101), Some(0b1100)),
        ];
        let now = Utc::now();
        for (id, title, translations, category_id, allergy_mask, diet_mask, equipment_mask, seasonality_mask) in recipes {
            state.recipes.insert(
                id,
                Recipe {
                    id,
                    title: title.to_string(),
                    title_translations: Json(translations.iter().map(|(l, t)| (l.to_string(), t.to_string())).collect()),
                    category_id: Some(category_id),
                    allergy_mask,
                    diet_mask,
                    equipment_mask,
                    seasonality_mask,
                    created_at: now,
                    updated_at: now,
                },
            );
        }

        Self { state: RwLock::new(state) }
    }

    /// Make every subsequent write to this ingredient fail.
    pub async fn fail_writes_for(&self, ingredient_id: i32) {
        self.state.write().await.failing_ingredients.insert(ingredient_id);
    }
}

#[async_trait]
impl ReferenceStore for MemoryStore {
    async fn list_items(&self, table: ReferenceTable) -> Result<Vec<ReferenceItem>, StoreError> {
        let state = self.state.read().await;
        let mut items = state.reference.get(&table).cloned().unwrap_or_default();
        items.sort_by_key(|item| (item.position, item.bit_index));
        Ok(items)
    }

    async fn insert_item(&self, table: ReferenceTable, item: NewReferenceItem) -> Result<ReferenceItem, StoreError> {
        let mut state = self.state.write().await;
        let items = state.reference.entry(table).or_default();
        if items.iter().any(|existing| existing.bit_index == item.bit_index) {
            return Err(StoreError::Conflict(format!("bit_index {} is already used in {}", item.bit_index, table)));
        }
        let created = ReferenceItem {
            id: items.iter().map(|i| i.id).max().unwrap_or(0) + 1,
            bit_index: item.bit_index,
            name: item.name,
            emoji: item.emoji,
            position: item.position,
        };
        items.push(created.clone());
        Ok(created)
    }

    async fn update_item(&self, table: ReferenceTable, id: i32, patch: &ReferenceItemPatch) -> Result<ReferenceItem, StoreError> {
        let mut state = self.state.write().await;
        let item = state
            .reference
            .get_mut(&table)
            .and_then(|items| items.iter_mut().find(|i| i.id == id))
            .ok_or_else(|| StoreError::NotFound(format!("{} item {}", table, id)))?;
        patch.apply(item);
        Ok(item.clone())
    }

    async fn delete_item(&self, table: ReferenceTable, id: i32) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let items = state.reference.entry(table).or_default();
        let before = items.len();
        items.retain(|i| i.id != id);
        if items.len() == before {
            return Err(StoreError::NotFound(format!("{} item {}", table, id)));
        }
        Ok(())
    }
}

#[async_trait]
impl IngredientStore for MemoryStore {
    async fn list_ingredients(&self) -> Result<Vec<Ingredient>, StoreError> {
        let mut ingredients: Vec<Ingredient> = self.state.read().await.ingredients.values().cloned().collect();
        ingredients.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(ingredients)
    }

    async fn get_ingredient(&self, id: i32) -> Result<Ingredient, StoreError> {
        self.state
            .read()
            .await
            .ingredients
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("ingredient {}", id)))
    }

    async fn update_namespace_bits(&self, id: i32, set: i32, clear: i32) -> Result<i32, StoreError> {
        let mut state = self.state.write().await;
        if state.failing_ingredients.contains(&id) {
            return Err(StoreError::WriteFailed(format!("ingredient {}", id)));
        }
        let ingredient = state
            .ingredients
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("ingredient {}", id)))?;
        let mask = (ingredient.namespace_mask.unwrap_or(0) | set) & !clear;
        ingredient.namespace_mask = Some(mask);
        Ok(mask)
    }

    async fn descendants(&self, parent_id: i32) -> Result<Vec<i32>, StoreError> {
        let state = self.state.read().await;
        let mut found = BTreeSet::new();
        let mut queue = VecDeque::from([parent_id]);
        while let Some(current) = queue.pop_front() {
            for child in state.ingredients.values().filter(|i| i.parent_id == Some(current)) {
                if found.insert(child.id) {
                    queue.push_back(child.id);
                }
            }
        }
        Ok(found.into_iter().collect())
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn find_recipes(&self, query: &RecipeQuery, limit: usize, offset: usize) -> Result<(Vec<Recipe>, usize), StoreError> {
        let state = self.state.read().await;
        let matching: Vec<&Recipe> = state.recipes.values().filter(|r| query.matches(r)).collect();
        let total = matching.len();
        let page = matching.into_iter().skip(offset).take(limit).cloned().collect();
        Ok((page, total))
    }

    async fn get_recipe(&self, id: i32) -> Result<Recipe, StoreError> {
        self.state
            .read()
            .await
            .recipes
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("recipe {}", id)))
    }

    async fn update_masks(&self, id: i32, masks: &RecipeMasks) -> Result<Recipe, StoreError> {
        let mut state = self.state.write().await;
        let recipe = state
            .recipes
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("recipe {}", id)))?;
        recipe.apply_masks(masks);
        recipe.updated_at = Utc::now();
        Ok(recipe.clone())
    }

    async fn masks(&self, column: MaskColumn) -> Result<Vec<Option<i32>>, StoreError> {
        Ok(self.state.read().await.recipes.values().map(|r| r.mask(column)).collect())
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let mut categories: Vec<Category> = self.state.read().await.categories.values().cloned().collect();
        categories.sort_by_key(|c| (c.position, c.id));
        Ok(categories)
    }

    async fn set_positions(&self, positions: &[(i32, i32)]) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if let Some((missing, _)) = positions.iter().find(|(id, _)| !state.categories.contains_key(id)) {
            return Err(StoreError::NotFound(format!("category {}", missing)));
        }
        for (id, position) in positions {
            if let Some(category) = state.categories.get_mut(id) {
                category.position = *position;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PromoStore for MemoryStore {
    async fn list_promos(&self) -> Result<Vec<PromoCode>, StoreError> {
        let mut promos = self.state.read().await.promos.clone();
        promos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(promos)
    }

    async fn insert_promo(&self, promo: NewPromoCode) -> Result<PromoCode, StoreError> {
        let mut state = self.state.write().await;
        if state.promos.iter().any(|p| p.code == promo.code) {
            return Err(StoreError::Conflict(format!("promo code {} already exists", promo.code)));
        }
        let created = PromoCode {
            id: state.promos.iter().map(|p| p.id).max().unwrap_or(0) + 1,
            code: promo.code,
            discount_percent: promo.discount_percent,
            max_uses: promo.max_uses,
            created_at: Utc::now(),
        };
        state.promos.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[tokio::test]
    async fn descendants_walk_the_whole_subtree() {
        let store = MemoryStore::seeded();
        assert_eq!(store.descendants(1).await.unwrap(), vec![2, 3, 4]);
        assert_eq!(store.descendants(3).await.unwrap(), vec![4]);
        assert!(store.descendants(6).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_bit_index_conflicts() {
        let store = MemoryStore::seeded();
        let err = store
            .insert_item(
                ReferenceTable::Diets,
                NewReferenceItem { bit_index: BitIndex::new(1).unwrap(), name: "Paleo".into(), emoji: None, position: 9 },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn namespace_update_sets_and_clears() {
        let store = MemoryStore::seeded();
        assert_eq!(store.update_namespace_bits(6, 0b100, 0).await.unwrap(), 0b100);
        assert_eq!(store.update_namespace_bits(6, 0, 0b100).await.unwrap(), 0);
        assert!(matches!(store.update_namespace_bits(99, 1, 0).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn promos_are_stored_as_given() {
        let store = MemoryStore::new();
        let promo = |discount: Decimal| NewPromoCode { code: "SPRING-ABCD".into(), discount_percent: discount, max_uses: Some(3) };

        let created = store.insert_promo(promo(Decimal::new(-5, 0))).await.unwrap();
        assert_eq!(created.discount_percent, Decimal::new(-5, 0));
        assert_eq!(created.id, 1);

        let err = store.insert_promo(promo(Decimal::TEN)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
