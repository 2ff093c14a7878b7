//! Value normalizer: turns a raw cell into the ordered strings the diff engine compares

use crate::model::{CellValue, FieldDescriptor};
use serde_json::Value;

/// Normalize a raw cell value of `field` into display strings.
///
/// Order follows the cell's own order and duplicates are kept. Scalars are
/// treated as option ids and resolved to option names when the field has a
/// matching option; otherwise the scalar text is used unchanged.
pub fn normalize(field: &FieldDescriptor, raw: &Value) -> Vec<String> {
    normalize_cell(field, &CellValue::from_json(raw))
}

pub fn normalize_cell(field: &FieldDescriptor, cell: &CellValue) -> Vec<String> {
    match cell {
        CellValue::Absent => Vec::new(),
        CellValue::List(items) => items.iter().map(|item| element_string(field, item)).collect(),
        other => vec![element_string(field, other)],
    }
}

fn element_string(field: &FieldDescriptor, cell: &CellValue) -> String {
    match cell {
        CellValue::Scalar(value) => resolve_option_name(field, value),
        // Lists only appear nested through the object rule; Absent never reaches here
        other => other.object_display().unwrap_or_default().to_string(),
    }
}

fn resolve_option_name(field: &FieldDescriptor, value: &str) -> String {
    field
        .option_by_id(value)
        .map(|opt| opt.name.clone())
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldType;
    use serde_json::json;

    fn status_field() -> FieldDescriptor {
        FieldDescriptor::new("fld_status", "Status", FieldType::MultiSelect)
            .with_options([("opt_a", "A"), ("opt_b", "B"), ("opt_c", "C")])
    }

    #[test]
    fn test_absent_values_normalize_to_empty() {
        let field = status_field();
        assert!(normalize(&field, &json!(null)).is_empty());
        assert!(normalize(&field, &json!("")).is_empty());
        assert!(normalize(&field, &json!([])).is_empty());
    }

    #[test]
    fn test_option_ids_resolve_to_names() {
        let field = status_field();
        assert_eq!(normalize(&field, &json!(["opt_b", "opt_a"])), vec!["B", "A"]);
        assert_eq!(normalize(&field, &json!("opt_c")), vec!["C"]);
    }

    #[test]
    fn test_unknown_scalars_pass_through() {
        let field = status_field();
        assert_eq!(normalize(&field, &json!(["opt_a", "legacy"])), vec!["A", "legacy"]);
        assert_eq!(normalize(&field, &json!(7)), vec!["7"]);
    }

    #[test]
    fn test_object_cells_use_display_text() {
        let field = status_field();
        let cell = json!([
            {"id": "opt_a", "text": "A"},
            {"type": "text", "text": "free text"},
            {"name": "Named"},
        ]);
        assert_eq!(normalize(&field, &cell), vec!["A", "free text", "Named"]);

        let single = json!({"id": "opt_b", "text": "B"});
        assert_eq!(normalize(&field, &single), vec!["B"]);
    }

    #[test]
    fn test_duplicates_and_order_are_preserved() {
        let field = FieldDescriptor::new("fld_text", "Notes", FieldType::Text);
        assert_eq!(normalize(&field, &json!(["z", "a", "z"])), vec!["z", "a", "z"]);
    }

    #[test]
    fn test_object_ids_are_not_resolved() {
        // Objects carry their own display text; only bare scalars go through the option list
        let field = status_field();
        assert_eq!(
            normalize(&field, &json!([{"id": "opt_a"}])),
            vec![r#"{"id":"opt_a"}"#]
        );
    }

    #[test]
    fn test_object_rendering_keeps_key_order_and_integral_numbers() {
        let field = FieldDescriptor::new("fld_text", "Notes", FieldType::Text);
        assert_eq!(
            normalize(&field, &json!([{"b": 1, "a": 2.0}])),
            vec![r#"{"b":1,"a":2}"#]
        );
        assert_eq!(
            normalize(&field, &json!([{"n": [1.5, 3.0]}])),
            vec![r#"{"n":[1.5,3]}"#]
        );
    }

    #[test]
    fn test_reordered_object_keys_are_different_values() {
        let field = FieldDescriptor::new("fld_text", "Notes", FieldType::Text);
        let baseline = normalize(&field, &json!([{"b": 1, "a": 2}]));
        let comparison = normalize(&field, &json!([{"a": 2, "b": 1}]));
        let result = crate::diff::diff(&baseline, &comparison);
        assert_eq!(result.added, vec![r#"{"a":2,"b":1}"#]);
        assert_eq!(result.removed, vec![r#"{"b":1,"a":2}"#]);
    }
}
