//! API client configuration.
//!
//! Resolved once at startup and passed into the client, so no request
//! handler ever reads process-wide environment state. The intent mirrors the
//! rest of the workspace: construction validates, use is infallible.

/// Errors from configuration construction.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("base URL cannot be empty")]
    EmptyBaseUrl,
    #[error("base URL must start with http:// or https://: {0}")]
    InvalidScheme(String),
}

/// Client configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    base_url: String,
}

impl ApiConfig {
    /// Creates a new `ApiConfig`.
    ///
    /// The base URL is trimmed and any trailing slash removed, so endpoint
    /// paths can always be joined with a single `/`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` when the URL is empty or does not carry an
    /// HTTP scheme.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ConfigError> {
        let trimmed = base_url.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(ConfigError::InvalidScheme(trimmed.to_owned()));
        }

        Ok(Self {
            base_url: trimmed.trim_end_matches('/').to_owned(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
