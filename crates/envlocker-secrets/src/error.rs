use thiserror::Error;

/// Errors raised at the secrets backend boundary
#[derive(Debug, Error)]
pub enum SecretError {
    /// Item (or the vault holding it) does not exist
    #[error("Item not found: {0}")]
    NotFound(String),

    /// Backend could not be reached or reported a failure
    #[error("{backend} error: {message}")]
    BackendError { backend: String, message: String },

    /// Backend requires a sign-in before it can be used
    #[error("Not authenticated with {backend}: {message}")]
    NotAuthenticated { backend: String, message: String },

    /// Backend answered with something we could not decode
    #[error("Malformed response from {backend}: {source}")]
    MalformedResponse {
        backend: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SecretError {
    /// Create a backend error
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendError {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a not-authenticated error
    pub fn not_authenticated(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotAuthenticated {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed(backend: impl Into<String>, source: serde_json::Error) -> Self {
        Self::MalformedResponse {
            backend: backend.into(),
            source,
        }
    }
}
