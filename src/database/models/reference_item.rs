use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::mask::{BitIndex, BitIndexed};

/// The administered lists that masks are built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceTable {
    Allergies,
    Diets,
    KitchenEquipment,
    Seasons,
    SearchNamespaces,
}

impl ReferenceTable {
    pub const ALL: [ReferenceTable; 5] = [
        ReferenceTable::Allergies,
        ReferenceTable::Diets,
        ReferenceTable::KitchenEquipment,
        ReferenceTable::Seasons,
        ReferenceTable::SearchNamespaces,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            ReferenceTable::Allergies => "allergies",
            ReferenceTable::Diets => "diets",
            ReferenceTable::KitchenEquipment => "kitchen_equipment",
            ReferenceTable::Seasons => "seasons",
            ReferenceTable::SearchNamespaces => "search_namespaces",
        }
    }
}

impl FromStr for ReferenceTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.table_name() == s)
            .ok_or_else(|| format!("unknown reference table: {}", s))
    }
}

impl std::fmt::Display for ReferenceTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ReferenceItem {
    pub id: i32,
    #[sqlx(try_from = "i32")]
    pub bit_index: BitIndex,
    pub name: String,
    pub emoji: Option<String>,
    pub position: i32,
}

impl BitIndexed for ReferenceItem {
    fn id(&self) -> i32 {
        self.id
    }

    fn bit_index(&self) -> BitIndex {
        self.bit_index
    }
}

/// A validated item ready to insert.
#[derive(Debug, Clone)]
pub struct NewReferenceItem {
    pub bit_index: BitIndex,
    pub name: String,
    pub emoji: Option<String>,
    pub position: i32,
}

/// Display fields an administrator may change. The bit position is not one of them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceItemPatch {
    pub name: Option<String>,
    /// An empty string clears the emoji.
    pub emoji: Option<String>,
    pub position: Option<i32>,
}

impl ReferenceItemPatch {
    pub fn apply(&self, item: &mut ReferenceItem) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(emoji) = &self.emoji {
            item.emoji = Some(emoji.clone()).filter(|e| !e.is_empty());
        }
        if let Some(position) = self.position {
            item.position = position;
        }
    }
}
