use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::ServiceError;
use crate::database::models::{NewReferenceItem, ReferenceItem, ReferenceItemPatch, ReferenceTable};
use crate::database::store::ReferenceStore;
use crate::mask::{self, BitIndex};

/// Body of a create request. `bit_index` is allocated when omitted.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReferenceItem {
    pub name: String,
    pub bit_index: Option<i64>,
    pub emoji: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecodedMask {
    pub mask: Option<i32>,
    pub items: Vec<ReferenceItem>,
    pub count: usize,
}

/// Administration of the bit registries and mask translation against them.
#[derive(Clone)]
pub struct ReferenceService {
    store: Arc<dyn ReferenceStore>,
}

impl ReferenceService {
    pub fn new(store: Arc<dyn ReferenceStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, table: ReferenceTable) -> Result<Vec<ReferenceItem>, ServiceError> {
        Ok(self.store.list_items(table).await?)
    }

    pub async fn create(&self, table: ReferenceTable, input: CreateReferenceItem) -> Result<ReferenceItem, ServiceError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("name", "must not be blank"));
        }

        let existing = self.store.list_items(table).await?;
        let bit_index = match input.bit_index {
            Some(raw) => BitIndex::new(raw)?,
            None => mask::lowest_free_bit(&existing).ok_or(ServiceError::TableFull(table))?,
        };

        let item = NewReferenceItem {
            bit_index,
            name: name.to_string(),
            emoji: input.emoji.filter(|e| !e.is_empty()),
            position: input.position.unwrap_or(existing.len() as i32),
        };
        // The store enforces uniqueness of bit_index as well.
        let created = self.store.insert_item(table, item).await?;
        info!(%table, id = created.id, bit_index = %created.bit_index, "reference item created");
        Ok(created)
    }

    pub async fn update(&self, table: ReferenceTable, id: i32, patch: ReferenceItemPatch) -> Result<ReferenceItem, ServiceError> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ServiceError::validation("name", "must not be blank"));
        }
        let updated = self.store.update_item(table, id, &patch).await?;
        info!(%table, id, "reference item updated");
        Ok(updated)
    }

    /// Masks referencing the item keep their bit; it simply stops decoding.
    pub async fn delete(&self, table: ReferenceTable, id: i32) -> Result<(), ServiceError> {
        self.store.delete_item(table, id).await?;
        warn!(%table, id, "reference item deleted; existing masks keep its bit");
        Ok(())
    }

    pub async fn encode(&self, table: ReferenceTable, selected_ids: &HashSet<i32>) -> Result<i32, ServiceError> {
        let items = self.store.list_items(table).await?;
        Ok(mask::encode(selected_ids, &items))
    }

    pub async fn decode(&self, table: ReferenceTable, value: Option<i32>) -> Result<DecodedMask, ServiceError> {
        let items = self.store.list_items(table).await?;
        let decoded: Vec<ReferenceItem> = mask::decode(value, &items)?.into_iter().cloned().collect();
        Ok(DecodedMask { mask: value, count: decoded.len(), items: decoded })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::database::store::StoreError;
    use crate::mask::{MaskError, MAX_BIT_INDEX};

    fn service() -> ReferenceService {
        ReferenceService::new(Arc::new(MemoryStore::seeded()))
    }

    fn named(name: &str, bit_index: Option<i64>) -> CreateReferenceItem {
        CreateReferenceItem { name: name.to_string(), bit_index, emoji: None, position: None }
    }

    #[tokio::test]
    async fn create_allocates_lowest_free_bit() {
        let service = service();
        let created = service.create(ReferenceTable::Diets, named("Paleo", None)).await.unwrap();
        assert_eq!(created.bit_index.get(), 3);
        assert_eq!(created.position, 3);
    }

    #[tokio::test]
    async fn create_rejects_out_of_range_bit() {
        let err = service().create(ReferenceTable::Diets, named("Keto", Some(31))).await.unwrap_err();
        assert!(matches!(err, ServiceError::Mask(MaskError::BitIndexOutOfRange(31))));
    }

    #[tokio::test]
    async fn create_rejects_duplicate_bit() {
        let err = service().create(ReferenceTable::Diets, named("Keto", Some(0))).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn full_table_is_a_range_error() {
        let service = ReferenceService::new(Arc::new(MemoryStore::new()));
        for i in 0..=MAX_BIT_INDEX {
            service.create(ReferenceTable::Seasons, named(&format!("s{}", i), None)).await.unwrap();
        }
        let err = service.create(ReferenceTable::Seasons, named("one too many", None)).await.unwrap_err();
        assert!(matches!(err, ServiceError::TableFull(ReferenceTable::Seasons)));
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let err = service().create(ReferenceTable::Diets, named("  ", None)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "name", .. }));
    }

    #[tokio::test]
    async fn encode_and_decode_against_the_table() {
        let service = service();
        let mask = service.encode(ReferenceTable::Diets, &[1, 3, 42].into_iter().collect()).await.unwrap();
        assert_eq!(mask, 5);

        let decoded = service.decode(ReferenceTable::Diets, Some(mask)).await.unwrap();
        let names: Vec<_> = decoded.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Vegan", "Gluten-Free"]);
        assert_eq!(decoded.count, 2);

        assert_eq!(service.decode(ReferenceTable::Diets, None).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn deleted_items_stop_decoding() {
        let service = service();
        service.delete(ReferenceTable::Diets, 2).await.unwrap();
        let decoded = service.decode(ReferenceTable::Diets, Some(0b111)).await.unwrap();
        assert_eq!(decoded.count, 2);
    }
}
