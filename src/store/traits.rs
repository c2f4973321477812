//! Unified `Database` trait — single async interface for onboarding persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::onboarding::gate::MeetingStatus;
use crate::onboarding::model::OnboardingRecord;

/// Backend-agnostic persistence for onboarding records and meeting status.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Onboarding ──────────────────────────────────────────────────

    /// Fetch a user's record. `None` means the user has not started onboarding.
    async fn get_onboarding(&self, user_id: Uuid)
    -> Result<Option<OnboardingRecord>, DatabaseError>;

    /// Insert a fresh record unless one already exists, and return whatever
    /// is stored afterwards.
    async fn insert_onboarding(
        &self,
        record: &OnboardingRecord,
    ) -> Result<OnboardingRecord, DatabaseError>;

    /// Overwrite a record, provided the stored version still equals
    /// `record.version`. Returns the stored record with its bumped version.
    ///
    /// Fails with `VersionConflict` on a stale version and `NotFound` if the
    /// user has no record.
    async fn update_onboarding(
        &self,
        record: &OnboardingRecord,
    ) -> Result<OnboardingRecord, DatabaseError>;

    // ── Meeting status ──────────────────────────────────────────────

    async fn get_meeting_status(&self, user_id: Uuid)
    -> Result<Option<MeetingStatus>, DatabaseError>;

    async fn set_meeting_status(
        &self,
        user_id: Uuid,
        status: &MeetingStatus,
    ) -> Result<(), DatabaseError>;
}
