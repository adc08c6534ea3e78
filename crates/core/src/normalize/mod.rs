//! Turns a raw market-data JSON response into a [`NormalizedTable`].
//!
//! The payload is located by walking [`EndpointShape::container_path`], read
//! according to its [`Orientation`], then column names are renamed and cells are
//! optionally coerced to numbers. Nothing is retained between calls.

pub mod error;
pub mod shape;
pub mod table;

pub use error::NormalizationError;
pub use shape::{ColumnRename, EndpointShape, Orientation, SINGLE_RECORD_KEY};
pub use table::{Cell, NormalizedTable, Row};

use serde_json::{Map, Value};
use std::collections::HashMap;

pub fn normalize(
    raw: &Value,
    shape: &EndpointShape,
) -> Result<NormalizedTable, NormalizationError> {
    let payload = locate(raw, shape.container_path)?;
    let records = match shape.orientation {
        Orientation::TimeSeries => time_series_records(payload, shape.container_path)?,
        Orientation::SingleRecord => {
            let record = payload
                .as_object()
                .ok_or_else(|| NormalizationError::missing_container(shape.container_path))?;
            vec![(SINGLE_RECORD_KEY.to_string(), record)]
        }
        Orientation::RecordList { key_field } => {
            record_list_records(payload, key_field, shape.container_path)?
        }
    };

    let skip = match shape.orientation {
        Orientation::RecordList { key_field } => Some(key_field),
        _ => None,
    };

    let mut columns: Vec<String> = Vec::new();
    // output name -> source name that produced it
    let mut renamed: HashMap<String, &str> = HashMap::new();
    let mut by_source: HashMap<&str, usize> = HashMap::new();

    for &(_, record) in &records {
        for field in record.keys() {
            let field = field.as_str();
            if Some(field) == skip || by_source.contains_key(field) {
                continue;
            }
            let name = shape.rename.apply(field);
            if let Some(first) = renamed.get(&name) {
                return Err(NormalizationError::ColumnCollision {
                    first: first.to_string(),
                    second: field.to_string(),
                    renamed: name,
                });
            }
            let idx = columns.len();
            renamed.insert(name.clone(), field);
            by_source.insert(field, idx);
            columns.push(name);
        }
    }

    let rows = records
        .into_iter()
        .map(|(key, record)| {
            let mut cells = vec![Cell::Missing; columns.len()];
            for (field, value) in record {
                if let Some(&idx) = by_source.get(field.as_str()) {
                    cells[idx] = if shape.numeric_coercion {
                        coerce_number(value)
                    } else {
                        raw_cell(value)
                    };
                }
            }
            Row { key, cells }
        })
        .collect();

    Ok(NormalizedTable::new(columns, rows))
}

fn locate<'a>(raw: &'a Value, path: &[&str]) -> Result<&'a Value, NormalizationError> {
    let mut cur = raw;
    for (depth, segment) in path.iter().enumerate() {
        cur = cur
            .as_object()
            .and_then(|obj| obj.get(*segment))
            .ok_or_else(|| NormalizationError::missing_container(&path[..=depth]))?;
    }
    Ok(cur)
}

fn time_series_records<'a>(
    payload: &'a Value,
    path: &[&str],
) -> Result<Vec<(String, &'a Map<String, Value>)>, NormalizationError> {
    let series = payload
        .as_object()
        .ok_or_else(|| NormalizationError::missing_container(path))?;

    series
        .iter()
        .map(|(key, value)| {
            let record = value.as_object().ok_or_else(|| {
                let mut at = path.to_vec();
                at.push(key.as_str());
                NormalizationError::missing_container(&at)
            })?;
            Ok((key.clone(), record))
        })
        .collect()
}

fn record_list_records<'a>(
    payload: &'a Value,
    key_field: &str,
    path: &[&str],
) -> Result<Vec<(String, &'a Map<String, Value>)>, NormalizationError> {
    let list = payload
        .as_array()
        .ok_or_else(|| NormalizationError::missing_container(path))?;

    list.iter()
        .enumerate()
        .map(|(index, item)| {
            let missing = || NormalizationError::MissingRowKey {
                index,
                key_field: key_field.to_string(),
            };
            let record = item.as_object().ok_or_else(missing)?;
            let key = match record.get(key_field) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => return Err(missing()),
            };
            Ok((key, record))
        })
        .collect()
}

/// Parses a cell as a decimal number. Anything unparseable becomes [`Cell::Missing`].
pub fn coerce_number(value: &Value) -> Cell {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .map_or(Cell::Missing, Cell::Number)
}

fn raw_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Missing,
        Value::String(s) => Cell::Text(s.clone()),
        Value::Number(n) => n
            .as_f64()
            .map_or_else(|| Cell::Text(n.to_string()), Cell::Number),
        other => Cell::Text(other.to_string()),
    }
}
