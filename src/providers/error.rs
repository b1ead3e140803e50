use thiserror::Error;

/// Non-success HTTP response from a model API
#[derive(Debug, Error)]
#[error("{provider} API request failed\n\nStatus: {status}\nBody: {body}")]
pub struct ApiError {
    pub provider: String,
    pub status: u16,
    pub body: String,
}

impl ApiError {
    pub fn new(provider: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            status,
            body: body.into(),
        }
    }

    /// Rate limiting and server-side failures
    pub fn is_transient(&self) -> bool {
        self.status == 408 || self.status == 429 || self.status >= 500
    }
}
