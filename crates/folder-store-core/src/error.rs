/// Errors surfaced by folder stores, sessions and the HTTP endpoints around them.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No user is signed in on the session.
    #[error("User not authenticated")]
    AuthenticationMissing,

    /// The store rejected a read, write or delete.
    #[error("Store error: {0}")]
    Backend(String),

    /// A referenced folder does not exist.
    #[error("Folder not found: {0}")]
    NotFound(String),

    /// Non-success status from the creation or export endpoint.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Transport failure, or a failure assembling a downloaded file.
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stored value does not decode into the domain model.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl StoreError {
    /// Whether the error comes from a missing session rather than the backend.
    pub fn is_authentication(&self) -> bool {
        matches!(self, StoreError::AuthenticationMissing)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}
