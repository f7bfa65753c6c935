use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::store::{CategoryStore, HealthCheck, IngredientStore, PromoStore, RecipeStore, ReferenceStore};
use crate::services::{CategoryService, NamespaceService, PromoService, RecipeService, ReferenceService};

/// Everything a handler needs, built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub references: ReferenceService,
    pub namespaces: NamespaceService,
    pub recipes: RecipeService,
    pub categories: CategoryService,
    pub promos: PromoService,
    pub health: Arc<dyn HealthCheck>,
}

impl AppState {
    /// Wire every service to one backend that implements all the stores.
    pub fn from_store<S>(store: Arc<S>, config: &AppConfig) -> Self
    where
        S: ReferenceStore + IngredientStore + RecipeStore + CategoryStore + PromoStore + HealthCheck + 'static,
    {
        let references: Arc<dyn ReferenceStore> = store.clone();
        let ingredients: Arc<dyn IngredientStore> = store.clone();

        Self {
            references: ReferenceService::new(references.clone()),
            namespaces: NamespaceService::new(ingredients.clone()),
            recipes: RecipeService::new(store.clone(), references, ingredients, config.listing.clone()),
            categories: CategoryService::new(store.clone()),
            promos: PromoService::new(store.clone(), config.promo.clone()),
            health: store,
        }
    }
}
