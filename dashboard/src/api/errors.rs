use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned status {status}")]
    Status {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },

    #[error("{endpoint} reported failure: {message}")]
    Unsuccessful { endpoint: String, message: String },

    #[error("{endpoint} response has no `{field}`")]
    MissingField {
        endpoint: String,
        field: &'static str,
    },

    #[error("invalid response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}
