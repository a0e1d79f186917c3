use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid input for {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("No calendar provider registered for {0}")]
    ProviderNotFound(String),

    #[error("Calendar account {0} not found")]
    AccountNotFound(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Account store error: {0}")]
    Store(String),

    #[error("Job queue error: {0}")]
    JobQueue(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid sync location: {0}")]
    InvalidLocation(String),

    #[error("Invalid sync action: {0}")]
    InvalidAction(String),

    #[error("Invalid conflict resolution strategy: {0}")]
    InvalidStrategy(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, SyncError>;
