use serde_json::Value;

use super::error::FilterError;
use super::filter::Filter;
use super::types::{FilterOp, FilterWhereInfo};
use crate::mask::check_mask;

/// Renders a JSON where-clause into a parameterized SQL predicate.
///
/// ```json
/// { "$and": [{ "diet_mask": { "$bits_all": 5 } }, { "allergy_mask": { "$bits_none": 2 } }, { "category_id": 3 }] }
/// ```
pub struct FilterWhere {
    param_values: Vec<Value>,
}

impl FilterWhere {
    pub fn new() -> Self {
        Self { param_values: vec![] }
    }

    pub fn generate(where_data: &Value) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new();
        let sql = filter_where.render(where_data)?;
        Ok((sql, filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn render(&mut self, where_data: &Value) -> Result<String, FilterError> {
        let conditions = match where_data {
            Value::Null => vec![],
            Value::Object(obj) => {
                let mut conditions = vec![];
                for (key, value) in obj {
                    if key.starts_with('$') {
                        conditions.push(self.logical(key, value)?);
                    } else {
                        conditions.extend(Self::field_conditions(key, value)?);
                    }
                }
                conditions
            }
            _ => return Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        };

        let mut sql = vec![];
        for condition in &conditions {
            sql.push(self.build_sql_condition(condition)?);
        }
        Ok(if sql.is_empty() { "1=1".to_string() } else { sql.join(" AND ") })
    }

    fn logical(&mut self, op: &str, value: &Value) -> Result<FilterWhereInfo, FilterError> {
        if op != "$and" {
            return Err(FilterError::UnsupportedOperator(op.to_string()));
        }
        let clauses = value
            .as_array()
            .ok_or_else(|| FilterError::InvalidOperatorData("$and requires array".to_string()))?;
        if clauses.is_empty() {
            return Err(FilterError::InvalidOperatorData("$and requires at least one clause".to_string()));
        }
        let mut parts = Vec::with_capacity(clauses.len());
        for clause in clauses {
            parts.push(format!("({})", self.render(clause)?));
        }
        Ok(FilterWhereInfo { column: format!("({})", parts.join(" AND ")), operator: FilterOp::Raw, data: Value::Null })
    }

    fn field_conditions(field: &str, value: &Value) -> Result<Vec<FilterWhereInfo>, FilterError> {
        Filter::validate_column(field)?;
        match value {
            Value::Object(obj) => obj
                .iter()
                .map(|(op_key, op_val)| {
                    Ok(FilterWhereInfo {
                        column: field.to_string(),
                        operator: Self::map_operator(op_key)?,
                        data: op_val.clone(),
                    })
                })
                .collect(),
            // Implicit equality: { field: value }
            _ => Ok(vec![FilterWhereInfo { column: field.to_string(), operator: FilterOp::Eq, data: value.clone() }]),
        }
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$bits_all" => FilterOp::BitsAll,
            "$bits_any" => FilterOp::BitsAny,
            "$bits_none" => FilterOp::BitsNone,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let col = format!("\"{}\"", condition.column);
        let data = condition.data.clone();
        Ok(match condition.operator {
            FilterOp::Eq if data.is_null() => format!("{} IS NULL", col),
            FilterOp::Eq => format!("{} = {}", col, self.param(data)),
            FilterOp::BitsAll => {
                let bits = Self::mask_operand(&data)?;
                if bits == 0 {
                    return Ok("1=1".to_string());
                }
                let p = self.param(Value::from(bits));
                format!("(COALESCE({}, 0) & {p}::integer) = {p}::integer", col)
            }
            FilterOp::BitsAny => {
                let bits = Self::mask_operand(&data)?;
                if bits == 0 {
                    return Ok("1=1".to_string());
                }
                format!("(COALESCE({}, 0) & {}::integer) <> 0", col, self.param(Value::from(bits)))
            }
            FilterOp::BitsNone => {
                let bits = Self::mask_operand(&data)?;
                if bits == 0 {
                    return Ok("1=1".to_string());
                }
                format!("(COALESCE({}, 0) & {}::integer) = 0", col, self.param(Value::from(bits)))
            }
            FilterOp::Raw => condition.column.clone(),
        })
    }

    fn mask_operand(data: &Value) -> Result<i32, FilterError> {
        let raw = data
            .as_i64()
            .ok_or_else(|| FilterError::InvalidOperatorData("bit operators require an integer mask".to_string()))?;
        Ok(check_mask(raw)?)
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        format!("${}", self.param_values.len())
    }
}

impl Default for FilterWhere {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_where_is_tautology() {
        let (sql, params) = FilterWhere::generate(&json!({})).unwrap();
        assert_eq!(sql, "1=1");
        assert!(params.is_empty());
    }

    #[test]
    fn bit_operators_push_down() {
        let (sql, params) = FilterWhere::generate(&json!({
            "diet_mask": { "$bits_all": 5 },
            "allergy_mask": { "$bits_none": 2 }
        }))
        .unwrap();
        assert_eq!(
            sql,
            "(COALESCE(\"allergy_mask\", 0) & $1::integer) = 0 AND (COALESCE(\"diet_mask\", 0) & $2::integer) = $2::integer"
        );
        assert_eq!(params, vec![json!(2), json!(5)]);
    }

    #[test]
    fn zero_mask_matches_everything() {
        let (sql, params) = FilterWhere::generate(&json!({ "diet_mask": { "$bits_all": 0 } })).unwrap();
        assert_eq!(sql, "1=1");
        assert!(params.is_empty());
    }

    #[test]
    fn negative_mask_is_rejected() {
        let err = FilterWhere::generate(&json!({ "diet_mask": { "$bits_any": -3 } })).unwrap_err();
        assert!(matches!(err, FilterError::Mask(_)));
    }

    #[test]
    fn nested_and_numbers_params_in_order() {
        let (sql, params) = FilterWhere::generate(&json!({
            "$and": [{ "category_id": 1 }, { "$and": [{ "seasonality_mask": { "$bits_any": 6 } }, { "category_id": null }] }]
        }))
        .unwrap();
        assert_eq!(
            sql,
            "((\"category_id\" = $1) AND ((((COALESCE(\"seasonality_mask\", 0) & $2::integer) <> 0) AND (\"category_id\" IS NULL))))"
        );
        assert_eq!(params, vec![json!(1), json!(6)]);
    }

    #[test]
    fn rejects_unknown_operator_and_bad_column() {
        assert!(FilterWhere::generate(&json!({ "name": { "$like": "x%" } })).is_err());
        assert!(FilterWhere::generate(&json!({ "$or": [{ "id": 1 }] })).is_err());
        assert!(FilterWhere::generate(&json!({ "$and": [] })).is_err());
        assert!(FilterWhere::generate(&json!({ "name;drop": 1 })).is_err());
    }
}
