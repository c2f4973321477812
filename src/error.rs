//! Error types for the onboarding service.

use uuid::Uuid;

use crate::onboarding::steps::Step;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Onboarding error: {0}")]
    Onboarding(#[from] OnboardingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Stale write for {entity} {id}: expected version {expected}, found {actual}")]
    VersionConflict {
        entity: String,
        id: String,
        expected: i64,
        actual: i64,
    },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Onboarding domain errors.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("Invalid step number: {0}")]
    InvalidStep(i64),

    #[error("Unknown step: {0}")]
    UnknownStep(String),

    #[error("Payload for step {payload} submitted to step {target}")]
    StepMismatch { target: Step, payload: Step },

    #[error("Step {step} is locked until the onboarding meeting is completed")]
    StepLocked { step: Step },

    #[error("Onboarding record for user {user_id} changed since version {expected}")]
    StaleWrite { user_id: Uuid, expected: i64 },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl OnboardingError {
    /// Whether retrying the same write could succeed.
    ///
    /// Only storage hiccups qualify. A stale version or a bad payload will
    /// fail the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Database(DatabaseError::Pool(_)) | Self::Database(DatabaseError::Query(_))
        )
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_storage_failures_are_transient() {
        assert!(OnboardingError::Database(DatabaseError::Query("boom".into())).is_transient());
        assert!(OnboardingError::Database(DatabaseError::Pool("gone".into())).is_transient());
        assert!(!OnboardingError::InvalidStep(13).is_transient());
        assert!(
            !OnboardingError::StaleWrite {
                user_id: Uuid::new_v4(),
                expected: 1
            }
            .is_transient()
        );
        assert!(
            !OnboardingError::Database(DatabaseError::Serialization("bad".into())).is_transient()
        );
    }
}
