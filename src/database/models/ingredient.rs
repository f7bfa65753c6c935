use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: i32,
    pub name: String,
    /// Parent in the ingredient hierarchy ("tomato" -> "cherry tomato").
    pub parent_id: Option<i32>,
    pub namespace_mask: Option<i32>,
}
