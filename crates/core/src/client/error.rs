use thiserror::Error;

/// Failure to obtain a JSON body from the API. Distinct from a body that
/// parsed but did not have the expected shape.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Built through [`TransportError::request`], which drops the URL (and
    /// with it the `apikey` query value) from the reqwest error.
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response is not valid JSON: {source}")]
    Body {
        #[source]
        source: serde_json::Error,
        text: String,
    },
}

impl TransportError {
    pub fn request(err: reqwest::Error) -> Self {
        TransportError::Request(err.without_url())
    }
}
