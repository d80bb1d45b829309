use thiserror::Error;

/// Request-level failures. Individual provider failures never end up here;
/// they are recorded as `AdapterResult::Failure` entries instead.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Malformed input, rejected before any outbound call.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// No enabled reputation service has a key, so there is nothing to fan out to.
    #[error("no enabled reputation service has an API key configured")]
    NoProviders,

    /// Not a single provider task ran to completion.
    #[error("scan could not run: {0}")]
    Unavailable(String),
}

impl ScanError {
    /// Machine-readable error kind for API clients.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::InvalidUrl(_) => "invalid_url",
            ScanError::NoProviders => "unconfigured_service",
            ScanError::Unavailable(_) => "upstream_unavailable",
        }
    }
}
