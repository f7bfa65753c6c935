use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};

use super::reference_item::ReferenceTable;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: i32,
    pub title: String,
    /// locale -> translated title
    pub title_translations: Json<BTreeMap<String, String>>,
    pub category_id: Option<i32>,
    pub allergy_mask: Option<i32>,
    pub diet_mask: Option<i32>,
    pub equipment_mask: Option<i32>,
    pub seasonality_mask: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    pub fn mask(&self, column: MaskColumn) -> Option<i32> {
        match column {
            MaskColumn::Allergy => self.allergy_mask,
            MaskColumn::Diet => self.diet_mask,
            MaskColumn::Equipment => self.equipment_mask,
            MaskColumn::Seasonality => self.seasonality_mask,
        }
    }

    /// Every required locale has a non-blank translation.
    pub fn has_complete_translations(&self, required_locales: &[String]) -> bool {
        required_locales
            .iter()
            .all(|locale| self.title_translations.get(locale).is_some_and(|t| !t.trim().is_empty()))
    }

    pub fn apply_masks(&mut self, masks: &RecipeMasks) {
        self.allergy_mask = masks.allergy_mask;
        self.diet_mask = masks.diet_mask;
        self.equipment_mask = masks.equipment_mask;
        self.seasonality_mask = masks.seasonality_mask;
    }
}

/// The mask-valued columns on a recipe, each keyed to its own reference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaskColumn {
    Allergy,
    Diet,
    Equipment,
    Seasonality,
}

impl MaskColumn {
    pub const ALL: [MaskColumn; 4] = [MaskColumn::Allergy, MaskColumn::Diet, MaskColumn::Equipment, MaskColumn::Seasonality];

    pub fn column_name(self) -> &'static str {
        match self {
            MaskColumn::Allergy => "allergy_mask",
            MaskColumn::Diet => "diet_mask",
            MaskColumn::Equipment => "equipment_mask",
            MaskColumn::Seasonality => "seasonality_mask",
        }
    }

    pub fn reference_table(self) -> ReferenceTable {
        match self {
            MaskColumn::Allergy => ReferenceTable::Allergies,
            MaskColumn::Diet => ReferenceTable::Diets,
            MaskColumn::Equipment => ReferenceTable::KitchenEquipment,
            MaskColumn::Seasonality => ReferenceTable::Seasons,
        }
    }

    pub fn for_table(table: ReferenceTable) -> Option<MaskColumn> {
        Self::ALL.into_iter().find(|c| c.reference_table() == table)
    }
}

/// Full replacement of a recipe's masks. `None` stores NULL ("never set"),
/// `Some(0)` stores an explicitly empty set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeMasks {
    pub allergy_mask: Option<i32>,
    pub diet_mask: Option<i32>,
    pub equipment_mask: Option<i32>,
    pub seasonality_mask: Option<i32>,
}
