pub mod category;
pub mod ingredient;
pub mod promo_code;
pub mod recipe;
pub mod reference_item;

pub use category::Category;
pub use ingredient::Ingredient;
pub use promo_code::{NewPromoCode, PromoCode};
pub use recipe::{MaskColumn, Recipe, RecipeMasks};
pub use reference_item::{NewReferenceItem, ReferenceItem, ReferenceItemPatch, ReferenceTable};
