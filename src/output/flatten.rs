//! Record flattening for tabular output

use crate::types::{JsonValue, Record};

/// Map a record to ordered `column -> text` pairs.
///
/// Nested objects become dotted keys. Arrays of scalars are joined with
/// `", "`, any other array is rendered as compact JSON. Null is empty text.
/// A record that is not an object becomes a single `value` column.
pub fn flatten_record(record: &Record) -> Vec<(String, String)> {
    let mut columns = Vec::new();
    match record {
        JsonValue::Object(map) => {
            for (key, value) in map {
                flatten_into(key.clone(), value, &mut columns);
            }
        }
        other => columns.push(("value".to_string(), cell_text(other))),
    }
    columns
}

fn flatten_into(prefix: String, value: &JsonValue, columns: &mut Vec<(String, String)>) {
    match value {
        JsonValue::Object(map) => {
            for (key, nested) in map {
                flatten_into(format!("{prefix}.{key}"), nested, columns);
            }
        }
        other => columns.push((prefix, cell_text(other))),
    }
}

fn cell_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Array(items) if items.iter().all(is_scalar) => items
            .iter()
            .map(cell_text)
            .collect::<Vec<_>>()
            .join(", "),
        JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
    }
}

fn is_scalar(value: &JsonValue) -> bool {
    !matches!(value, JsonValue::Array(_) | JsonValue::Object(_))
}
