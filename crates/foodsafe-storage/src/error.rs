/// Errors that can occur within the storage layer.
///
/// # Migration note
///
/// `ComplianceStore` currently returns `anyhow::Result` for backward
/// compatibility with the HTTP layer. This module defines the target error
/// type to be used as the codebase is progressively migrated away from
/// `anyhow`. New code should return `error::Result<T>` where possible.
///
/// # Examples
///
/// ```rust
/// use foodsafe_storage::error::StorageError;
///
/// let err = StorageError::NotFound {
///     entity: "recurrence_rule",
///     id: "rule-99".to_string(),
/// };
/// assert!(err.to_string().contains("recurrence_rule"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required record was not found in the database.
    #[error("Storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// An insert operation did not return the newly created row, which should
    /// be unreachable under normal conditions.
    #[error("Storage: insert of {entity} succeeded but the row could not be read back")]
    InsertReadback { entity: &'static str },

    /// An underlying database error.
    #[error("Storage: database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    /// JSON serialization or deserialization failure.
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic storage error for cases not covered by other variants.
    #[error("Storage: {0}")]
    Other(String),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
