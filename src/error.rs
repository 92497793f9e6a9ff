/// Error types shared by the API clients, the store and the services
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// MySQL connectivity or query failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Transport-level HTTP failure (connect, timeout, body read)
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the JSON we expected
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Upstream service answered with a non-success status
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Identity service rejected a write because of a uniqueness clash
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DashboardError {
    /// Map a non-success upstream status onto the matching variant.
    pub fn from_status(service: &'static str, status: u16, body: String) -> Self {
        match status {
            401 => DashboardError::Unauthorized,
            404 => DashboardError::NotFound(format!("{} resource", service)),
            409 => DashboardError::Conflict(body),
            _ => DashboardError::Status { service, status, body },
        }
    }

    /// Text suitable for a flash message. Validation and conflict messages
    /// are shown as-is.
    pub fn user_message(&self) -> String {
        match self {
            DashboardError::Conflict(m) | DashboardError::InvalidInput(m) => m.clone(),
            DashboardError::Unauthorized => "Your session has expired. Please sign in again.".into(),
            other => other.to_string(),
        }
    }
}
