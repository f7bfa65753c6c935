use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use super::ServiceError;
use crate::database::store::IngredientStore;
use crate::mask::{self, BitIndex};

/// How many children of a bulk exclusion are written at once.
const EXCLUDE_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Serialize)]
pub struct NamespaceChange {
    pub ingredient_id: i32,
    pub bit_index: BitIndex,
    pub namespace_mask: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamespaceMember {
    pub id: i32,
    pub name: String,
    pub parent_id: Option<i32>,
    pub namespace_mask: Option<i32>,
    pub in_namespace: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChildFailure {
    pub ingredient_id: i32,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExcludeChildrenResult {
    pub parent_id: i32,
    pub excluded_count: usize,
    pub excluded_ids: Vec<i32>,
    pub failures: Vec<ChildFailure>,
}

/// Membership of ingredients in search namespaces, one bit per namespace.
#[derive(Clone)]
pub struct NamespaceService {
    store: Arc<dyn IngredientStore>,
}

impl NamespaceService {
    pub fn new(store: Arc<dyn IngredientStore>) -> Self {
        Self { store }
    }

    pub async fn add_ingredient(&self, ingredient_id: i32, bit_index: i64) -> Result<NamespaceChange, ServiceError> {
        let bit_index = BitIndex::new(bit_index)?;
        let namespace_mask = self.store.update_namespace_bits(ingredient_id, bit_index.bit(), 0).await?;
        info!(ingredient_id, %bit_index, namespace_mask, "ingredient added to namespace");
        Ok(NamespaceChange { ingredient_id, bit_index, namespace_mask })
    }

    pub async fn remove_ingredient(&self, ingredient_id: i32, bit_index: i64) -> Result<NamespaceChange, ServiceError> {
        let bit_index = BitIndex::new(bit_index)?;
        let namespace_mask = self.store.update_namespace_bits(ingredient_id, 0, bit_index.bit()).await?;
        info!(ingredient_id, %bit_index, namespace_mask, "ingredient removed from namespace");
        Ok(NamespaceChange { ingredient_id, bit_index, namespace_mask })
    }

    /// Clear the given bits from every descendant of `parent_id`.
    ///
    /// Each child is written independently; failures are reported alongside
    /// the successes rather than aborting the batch.
    pub async fn exclude_children(&self, parent_id: i32, bit_indexes: &[i64]) -> Result<ExcludeChildrenResult, ServiceError> {
        let indexes = bit_indexes.iter().map(|raw| BitIndex::new(*raw)).collect::<Result<Vec<_>, _>>()?;
        let clear = mask::bits_of(indexes);

        // Resolving the parent first turns an unknown id into NotFound.
        self.store.get_ingredient(parent_id).await?;
        let children = self.store.descendants(parent_id).await?;

        let outcomes: Vec<(i32, Result<i32, _>)> = stream::iter(children)
            .map(|child| async move { (child, self.store.update_namespace_bits(child, 0, clear).await) })
            .buffer_unordered(EXCLUDE_CONCURRENCY)
            .collect()
            .await;

        let mut excluded_ids = Vec::new();
        let mut failures = Vec::new();
        for (ingredient_id, outcome) in outcomes {
            match outcome {
                Ok(_) => excluded_ids.push(ingredient_id),
                Err(e) => {
                    warn!(parent_id, ingredient_id, error = %e, "failed to exclude child from namespaces");
                    failures.push(ChildFailure { ingredient_id, error: e.to_string() });
                }
            }
        }
        excluded_ids.sort_unstable();
        failures.sort_by_key(|f| f.ingredient_id);

        info!(parent_id, clear, excluded = excluded_ids.len(), failed = failures.len(), "children excluded from namespaces");
        Ok(ExcludeChildrenResult { parent_id, excluded_count: excluded_ids.len(), excluded_ids, failures })
    }

    pub async fn ingredients_for_namespace(&self, bit_index: i64) -> Result<Vec<NamespaceMember>, ServiceError> {
        let bit_index = BitIndex::new(bit_index)?;
        let ingredients = self.store.list_ingredients().await?;
        Ok(ingredients
            .into_iter()
            .map(|i| NamespaceMember {
                in_namespace: i.namespace_mask.map_or(false, |m| m & bit_index.bit() != 0),
                id: i.id,
                name: i.name,
                parent_id: i.parent_id,
                namespace_mask: i.namespace_mask,
            })
            .collect())
    }
}
