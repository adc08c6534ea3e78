use serde::Serialize;

/// Row key given to the single synthesized row of a flat record.
pub const SINGLE_RECORD_KEY: &str = "value";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Orientation {
    /// Mapping of row key (usually a date) to a field map.
    TimeSeries,
    /// One flat field map.
    SingleRecord,
    /// Array of flat field maps; the row key is read from `key_field`.
    RecordList { key_field: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRename {
    Keep,
    /// Drops leading `"<token>. "` prefixes: `"4. close"` becomes `"close"`.
    StripPrefix,
}

impl ColumnRename {
    pub fn apply(self, name: &str) -> String {
        match self {
            ColumnRename::Keep => name.to_string(),
            ColumnRename::StripPrefix => strip_prefix(name).to_string(),
        }
    }
}

// Strips repeatedly so the result never carries a prefix and re-applying is a no-op.
fn strip_prefix(mut name: &str) -> &str {
    while let Some((head, rest)) = name.split_once(". ") {
        let is_token = !head.is_empty() && head.chars().all(|c| c.is_ascii_alphanumeric());
        if !is_token || rest.is_empty() {
            break;
        }
        name = rest;
    }
    name
}

/// How to find and reshape the payload of one API response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EndpointShape {
    pub container_path: &'static [&'static str],
    pub orientation: Orientation,
    pub rename: ColumnRename,
    pub numeric_coercion: bool,
}

impl EndpointShape {
    pub const fn time_series(container_path: &'static [&'static str]) -> Self {
        Self {
            container_path,
            orientation: Orientation::TimeSeries,
            rename: ColumnRename::Keep,
            numeric_coercion: false,
        }
    }

    pub const fn single_record(container_path: &'static [&'static str]) -> Self {
        Self {
            container_path,
            orientation: Orientation::SingleRecord,
            rename: ColumnRename::Keep,
            numeric_coercion: false,
        }
    }

    pub const fn record_list(
        container_path: &'static [&'static str],
        key_field: &'static str,
    ) -> Self {
        Self {
            container_path,
            orientation: Orientation::RecordList { key_field },
            rename: ColumnRename::Keep,
            numeric_coercion: false,
        }
    }

    pub const fn strip_prefixes(mut self) -> Self {
        self.rename = ColumnRename::StripPrefix;
        self
    }

    pub const fn coerce_numbers(mut self) -> Self {
        self.numeric_coercion = true;
        self
    }
}
