use thiserror::Error;

/// Failures of the weather client. Classification only; user-facing text lives in
/// [`crate::presentation`].
#[derive(Debug, Error)]
pub enum WeatherError {
    /// URL or query construction failed before any network I/O.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connectivity, timeout, TLS, or a non-success status other than 401.
    #[error("transport failure: {0}")]
    TransportFailure(#[source] reqwest::Error),

    /// HTTP 401 from the provider.
    #[error("provider rejected the API key")]
    InvalidCredentials,

    #[error("provider returned an empty body")]
    EmptyResponse,

    /// The body did not match the expected schema. `raw_body` is kept for
    /// diagnostics only.
    #[error("failed to decode provider response: {source}")]
    DecodeFailure {
        raw_body: String,
        #[source]
        source: serde_json::Error,
    },
}

impl WeatherError {
    /// Whether repeating the same call on user action can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WeatherError::TransportFailure(_) | WeatherError::EmptyResponse)
    }
}

/// Location failures surfaced in strict mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location access restricted")]
    PermissionRestricted,

    #[error("location permission not determined")]
    PermissionUndetermined,

    #[error("location unavailable: {0}")]
    Unknown(String),
}
