use std::sync::Arc;

use rand::distributions::Uniform;
use rand::Rng;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use super::ServiceError;
use crate::config::PromoConfig;
use crate::database::models::{NewPromoCode, PromoCode};
use crate::database::store::{PromoStore, StoreError};

/// No 0/O or 1/I.
const ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const MAX_PREFIX_LEN: usize = 12;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratePromoRequest {
    pub prefix: Option<String>,
    pub discount_percent: Decimal,
    pub max_uses: Option<i32>,
}

/// A random code body of `length` symbols.
pub fn random_code(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(Uniform::from(0..ALPHABET.len()))
        .take(length)
        .map(|i| ALPHABET[i] as char)
        .collect()
}

#[derive(Clone)]
pub struct PromoService {
    store: Arc<dyn PromoStore>,
    config: PromoConfig,
}

impl PromoService {
    pub fn new(store: Arc<dyn PromoStore>, config: PromoConfig) -> Self {
        Self { store, config }
    }

    pub async fn list(&self) -> Result<Vec<PromoCode>, ServiceError> {
        Ok(self.store.list_promos().await?)
    }

    pub async fn generate(&self, request: GeneratePromoRequest) -> Result<PromoCode, ServiceError> {
        let length = self.config.code_length;
        self.generate_with(request, || random_code(length)).await
    }

    /// Insert a fresh code, drawing a new candidate from `next_code` on every
    /// collision until the configured attempts run out.
    pub async fn generate_with<F>(&self, request: GeneratePromoRequest, mut next_code: F) -> Result<PromoCode, ServiceError>
    where
        F: FnMut() -> String + Send,
    {
        let prefix = validate(&request)?;

        for attempt in 1..=self.config.max_attempts {
            let body = next_code();
            let code = match &prefix {
                Some(prefix) => format!("{}-{}", prefix, body),
                None => body,
            };
            let candidate = NewPromoCode {
                code: code.clone(),
                discount_percent: request.discount_percent,
                max_uses: request.max_uses,
            };
            match self.store.insert_promo(candidate).await {
                Ok(created) => {
                    info!(code = %created.code, attempt, "promo code generated");
                    return Ok(created);
                }
                Err(StoreError::Conflict(_)) => {
                    warn!(%code, attempt, "promo code collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ServiceError::Exhausted(self.config.max_attempts))
    }
}

fn validate(request: &GeneratePromoRequest) -> Result<Option<String>, ServiceError> {
    if request.discount_percent <= Decimal::ZERO || request.discount_percent > Decimal::ONE_HUNDRED {
        return Err(ServiceError::validation("discount_percent", "must be greater than 0 and at most 100"));
    }
    if request.max_uses.is_some_and(|uses| uses < 1) {
        return Err(ServiceError::validation("max_uses", "must be at least 1"));
    }

    let Some(prefix) = request.prefix.as_deref().map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    if prefix.len() > MAX_PREFIX_LEN || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ServiceError::validation(
            "prefix",
            format!("must be at most {} letters or digits", MAX_PREFIX_LEN),
        ));
    }
    Ok(Some(prefix.to_ascii_uppercase()))
}
