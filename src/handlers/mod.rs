// handlers/mod.rs - HTTP handlers, one module per resource
//
// Handlers only translate between HTTP and the services: extract, call, wrap
// the result in the success envelope. Errors convert into ApiError via `?`.

pub mod categories;
pub mod masks;
pub mod namespaces;
pub mod promos;
pub mod recipes;
pub mod reference;
pub mod root;

use std::collections::HashSet;

use crate::database::models::ReferenceTable;
use crate::error::ApiError;

/// Resolve a `:table` path segment.
pub(crate) fn parse_table(raw: &str) -> Result<ReferenceTable, ApiError> {
    raw.parse::<ReferenceTable>().map_err(ApiError::not_found)
}

/// Parse a comma-separated id list such as `?diets=1,3`.
pub(crate) fn parse_ids(field: &str, raw: Option<&str>) -> Result<HashSet<i32>, ApiError> {
    let Some(raw) = raw else {
        return Ok(HashSet::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i32>().map_err(|_| ApiError::field_error(field, format!("'{}' is not a valid id", s))))
        .collect()
}
