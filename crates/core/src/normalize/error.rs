use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    /// The described container is absent or not of the expected kind. Usually an
    /// unknown symbol, a malformed query, or an API error payload instead of data.
    #[error("response has no data container at `{path}`")]
    MissingContainer { path: String },

    /// Two source columns rename to the same output name. A shape misconfiguration.
    #[error("columns `{first}` and `{second}` both rename to `{renamed}`")]
    ColumnCollision {
        first: String,
        second: String,
        renamed: String,
    },

    #[error("record {index} has no `{key_field}` row key")]
    MissingRowKey { index: usize, key_field: String },
}

impl NormalizationError {
    pub(crate) fn missing_container(path: &[&str]) -> Self {
        let path = if path.is_empty() {
            "<root>".to_string()
        } else {
            path.join(" / ")
        };
        NormalizationError::MissingContainer { path }
    }
}
