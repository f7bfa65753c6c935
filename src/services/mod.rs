pub mod category_service;
pub mod namespace_service;
pub mod promo_service;
pub mod recipe_service;
pub mod reference_service;

use thiserror::Error;

use crate::database::models::ReferenceTable;
use crate::database::store::StoreError;
use crate::mask::MaskError;

pub use category_service::CategoryService;
pub use namespace_service::NamespaceService;
pub use promo_service::PromoService;
pub use recipe_service::RecipeService;
pub use reference_service::ReferenceService;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Mask(#[from] MaskError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("{0} has no free bit index left")]
    TableFull(ReferenceTable),

    #[error("no unique code found after {0} attempts")]
    Exhausted(u32),
}

impl ServiceError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Validation { field, message: message.into() }
    }
}
