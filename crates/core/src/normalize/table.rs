use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    /// Value could not be read as a number (or was null). Serializes as `null`.
    Missing,
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Missing => f.write_str("NaN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub key: String,
    pub cells: Vec<Cell>,
}

/// Rows in source order; every row has exactly one cell per column.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NormalizedTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl NormalizedTable {
    pub(crate) fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        debug_assert!(rows.iter().all(|r| r.cells.len() == columns.len()));
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row_key: &str, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows
            .iter()
            .find(|r| r.key == row_key)
            .map(|r| &r.cells[idx])
    }

    /// Numeric view of one column; `None` entries are missing or non-numeric cells.
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r.cells[idx].as_f64()).collect())
    }

    pub fn head(&self, n: usize) -> NormalizedTable {
        NormalizedTable {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Swaps rows and columns: one row per column, keyed by the column name.
    pub fn transpose(&self) -> NormalizedTable {
        let columns = self.rows.iter().map(|r| r.key.clone()).collect();
        let rows = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| Row {
                key: name.clone(),
                cells: self.rows.iter().map(|r| r.cells[idx].clone()).collect(),
            })
            .collect();
        NormalizedTable { columns, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NormalizedTable {
        NormalizedTable::new(
            vec!["open".to_string(), "close".to_string()],
            vec![
                Row {
                    key: "2024-01-02".to_string(),
                    cells: vec![Cell::Number(10.0), Cell::Number(11.5)],
                },
                Row {
                    key: "2024-01-01".to_string(),
                    cells: vec![Cell::Missing, Cell::Number(9.0)],
                },
            ],
        )
    }

    #[test]
    fn column_returns_numeric_view_in_row_order() {
        let t = sample();
        assert_eq!(t.column("open"), Some(vec![Some(10.0), None]));
        assert_eq!(t.column("volume"), None);
    }

    #[test]
    fn head_keeps_first_rows() {
        let t = sample().head(1);
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows()[0].key, "2024-01-02");
        assert_eq!(sample().head(50).len(), 2);
    }

    #[test]
    fn transpose_swaps_axes() {
        let t = sample().transpose();
        assert_eq!(t.columns(), ["2024-01-02", "2024-01-01"]);
        assert_eq!(t.rows()[0].key, "open");
        assert_eq!(t.cell("open", "2024-01-01"), Some(&Cell::Missing));
        assert_eq!(t.cell("close", "2024-01-02"), Some(&Cell::Number(11.5)));
    }

    #[test]
    fn cells_serialize_as_plain_json() {
        let v = serde_json::to_value(&sample()).unwrap();
        assert_eq!(v["rows"][1]["cells"][0], serde_json::Value::Null);
        assert_eq!(v["rows"][0]["cells"][1], serde_json::json!(11.5));
        assert_eq!(Cell::Missing.to_string(), "NaN");
        assert_eq!(Cell::Number(150.0).to_string(), "150");
    }
}
