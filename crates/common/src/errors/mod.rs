//! Error types for TradeForge services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - Error codes for machine-readable handling
//! - Operator repair hints for recognized migration failures

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    InvalidIdentifier,

    // Conflict errors (2xxx)
    DuplicatePartition,

    // Resource errors (3xxx)
    TenantNotFound,
    MigrationNotFound,

    // Migration errors (4xxx)
    MigrationApplyFailure,
    BaselineRequired,
    MigrationStuck,

    // Database errors (5xxx)
    DatabaseError,
    ConnectionUnavailable,

    // Internal errors (9xxx)
    ConfigurationError,
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::InvalidIdentifier => 1001,

            // Conflicts (2xxx)
            ErrorCode::DuplicatePartition => 2001,

            // Resources (3xxx)
            ErrorCode::TenantNotFound => 3001,
            ErrorCode::MigrationNotFound => 3002,

            // Migrations (4xxx)
            ErrorCode::MigrationApplyFailure => 4001,
            ErrorCode::BaselineRequired => 4002,
            ErrorCode::MigrationStuck => 4003,

            // Database (5xxx)
            ErrorCode::DatabaseError => 5001,
            ErrorCode::ConnectionUnavailable => 5002,

            // Internal (9xxx)
            ErrorCode::ConfigurationError => 9001,
            ErrorCode::InternalError => 9002,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Normalization produced an unusable partition identifier.
    /// Rejected at signup, before the value can reach any DDL statement.
    #[error("invalid partition identifier from {input:?}: {reason}")]
    InvalidIdentifier { input: String, reason: String },

    /// The normalized identifier already exists in the registry.
    /// Surfaced from the registry's uniqueness constraint, never from an
    /// application-level existence check.
    #[error("partition {partition} is already registered")]
    DuplicatePartition { partition: String },

    #[error("no tenant registered for partition {partition}")]
    TenantNotFound { partition: String },

    #[error("no migration named {name} in the manifest")]
    MigrationNotFound { name: String },

    /// The migration engine returned an unexpected error. `detail` carries
    /// the full engine diagnostic for the operator.
    #[error("migration apply failed on partition {partition}: {detail}")]
    MigrationApplyFailure { partition: String, detail: String },

    /// The partition has tables but no recorded migration history.
    /// Repair: mark-baseline, then apply-pending.
    #[error("partition {partition} needs a baseline at migration {version}")]
    BaselineRequired { partition: String, version: i64 },

    /// A specific migration is recorded as partially applied.
    /// Repair: mark-rolled-back, then apply-pending.
    #[error("migration {version} is stuck on partition {partition}")]
    MigrationStuck { partition: String, version: i64 },

    /// Base connection string missing or malformed at startup. Fatal.
    #[error("database connection unavailable: {message}")]
    ConnectionUnavailable { message: String },

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::InvalidIdentifier { .. } => ErrorCode::InvalidIdentifier,
            AppError::DuplicatePartition { .. } => ErrorCode::DuplicatePartition,
            AppError::TenantNotFound { .. } => ErrorCode::TenantNotFound,
            AppError::MigrationNotFound { .. } => ErrorCode::MigrationNotFound,
            AppError::MigrationApplyFailure { .. } => ErrorCode::MigrationApplyFailure,
            AppError::BaselineRequired { .. } => ErrorCode::BaselineRequired,
            AppError::MigrationStuck { .. } => ErrorCode::MigrationStuck,
            AppError::ConnectionUnavailable { .. } => ErrorCode::ConnectionUnavailable,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Operator repair command for recognized migration failure signatures.
    /// Repairs stay manual; this is a hint in diagnostics, never a trigger.
    pub fn repair_hint(&self) -> Option<&'static str> {
        match self {
            AppError::BaselineRequired { .. } => {
                Some("run `tradeforge-admin baseline <partition>` then `apply`")
            }
            AppError::MigrationStuck { .. } => {
                Some("run `tradeforge-admin rollback-mark <partition> <migration>` then `apply`")
            }
            _ => None,
        }
    }

    /// Whether the error indicates a conflict with existing state rather
    /// than a failure. Idempotent restore tooling treats these as benign.
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::DuplicatePartition { .. })
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Internal {
            message: format!("migration engine: {err}"),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal {
            message: format!("database driver: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::DuplicatePartition { partition: "acme".into() };
        assert_eq!(err.code(), ErrorCode::DuplicatePartition);
        assert_eq!(err.code().as_code(), 2001);
        assert!(err.is_conflict());
    }

    #[test]
    fn test_repair_hints() {
        let baseline = AppError::BaselineRequired { partition: "acme".into(), version: 20240501000001 };
        assert!(baseline.repair_hint().unwrap().contains("baseline"));

        let stuck = AppError::MigrationStuck { partition: "acme".into(), version: 20240501000002 };
        assert!(stuck.repair_hint().unwrap().contains("rollback-mark"));

        let other = AppError::Internal { message: "boom".into() };
        assert!(other.repair_hint().is_none());
    }

    #[test]
    fn test_invalid_identifier_display() {
        let err = AppError::InvalidIdentifier {
            input: "123 Shop".into(),
            reason: "must start with a letter".into(),
        };
        assert!(err.to_string().contains("123 Shop"));
        assert_eq!(err.code(), ErrorCode::InvalidIdentifier);
    }
}
