use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterOrderInfo, SortDirection};

/// Parses order specs in any of these shapes:
/// `"position asc, id"`, `["-created_at", "id"]`, `{ "position": "asc" }`.
pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        match order {
            Value::Null => Ok(vec![]),
            Value::String(s) => Self::parse_order_string(s),
            Value::Array(arr) => {
                let mut out = Vec::new();
                for v in arr {
                    let s = v
                        .as_str()
                        .ok_or_else(|| FilterError::InvalidOperatorData("order entries must be strings".to_string()))?;
                    out.extend(Self::parse_order_string(s)?);
                }
                Ok(out)
            }
            Value::Object(obj) => obj
                .iter()
                .map(|(column, dir)| {
                    Ok(FilterOrderInfo { column: column.clone(), sort: Self::direction(dir.as_str().unwrap_or("asc"))? })
                })
                .collect(),
            _ => Err(FilterError::InvalidOperatorData("unsupported order format".to_string())),
        }
    }

    fn parse_order_string(s: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let mut it = part.split_whitespace();
            let Some(col) = it.next() else { continue };
            let (column, sort) = match col.strip_prefix('-') {
                Some(stripped) => (stripped, SortDirection::Desc),
                None => (col, Self::direction(it.next().unwrap_or("asc"))?),
            };
            out.push(FilterOrderInfo { column: column.to_string(), sort });
        }
        Ok(out)
    }

    fn direction(dir: &str) -> Result<SortDirection, FilterError> {
        if dir.eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Asc)
        } else if dir.eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Desc)
        } else {
            Err(FilterError::InvalidOperatorData(format!("unknown sort direction: {}", dir)))
        }
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> Result<String, FilterError> {
        if infos.is_empty() { return Ok(String::new()); }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_all_shapes() {
        let from_str = FilterOrder::validate_and_parse(&json!("position asc, id desc")).unwrap();
        assert_eq!(FilterOrder::generate(&from_str).unwrap(), "ORDER BY \"position\" ASC, \"id\" DESC");

        let from_arr = FilterOrder::validate_and_parse(&json!(["-created_at", "id"])).unwrap();
        assert_eq!(FilterOrder::generate(&from_arr).unwrap(), "ORDER BY \"created_at\" DESC, \"id\" ASC");

        let from_obj = FilterOrder::validate_and_parse(&json!({ "bit_index": "desc" })).unwrap();
        assert_eq!(from_obj[0].sort, SortDirection::Desc);
    }

    #[test]
    fn unknown_direction_is_an_error() {
        assert!(FilterOrder::validate_and_parse(&json!("position sideways")).is_err());
    }
}
