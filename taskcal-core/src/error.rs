//! Error types for the taskcal ecosystem.

use thiserror::Error;

/// Errors that can occur in taskcal operations.
#[derive(Error, Debug)]
pub enum TaskcalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stored data is corrupt: {0}")]
    CorruptData(String),

    #[error("Local storage error: {0}")]
    Storage(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider '{0}' not found in PATH")]
    ProviderNotInstalled(String),

    #[error("Remote request timed out after {0}s")]
    Timeout(u64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for taskcal operations.
pub type TaskcalResult<T> = Result<T, TaskcalError>;

/// Failure class used by the sync orchestrator's retry tracking.
///
/// Timeouts count as network failures; everything that is neither an auth
/// rejection nor a transport problem backs off like a network failure but is
/// tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Auth,
    Network,
    Generic,
}

impl TaskcalError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            TaskcalError::Auth(_) => FailureKind::Auth,
            TaskcalError::Network(_) | TaskcalError::Timeout(_) => FailureKind::Network,
            _ => FailureKind::Generic,
        }
    }
}

impl FailureKind {
    /// Rebuild an error for callers that joined a shared in-flight operation
    /// and only have the failure class, not the original error.
    pub fn into_error(self, context: &str) -> TaskcalError {
        match self {
            FailureKind::Auth => TaskcalError::Auth(context.to_string()),
            FailureKind::Network => TaskcalError::Network(context.to_string()),
            FailureKind::Generic => TaskcalError::Provider(context.to_string()),
        }
    }
}
