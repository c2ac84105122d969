use thiserror::Error;

/// Why a location produced no reading this cycle. Never fatal to the cycle.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Malformed payload from {url}")]
    MalformedPayload {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Provider reported an error for {area}: {message}")]
    Upstream { area: String, message: String },

    #[error("Payload for {area} is missing required field '{field}'")]
    MissingField { area: String, field: &'static str },

    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),
}
