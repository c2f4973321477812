//! OnboardingManager — coordinates onboarding records, step completion,
//! meeting-gated access and auto-save.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AutoSaveConfig;
use crate::error::{DatabaseError, OnboardingError};
use crate::store::Database;

use super::autosave::{AutoSave, SaveTarget};
use super::gate::{MeetingStatus, is_step_unlocked};
use super::model::{OnboardingRecord, StepPayload};
use super::progress::{next_step, previous_step};
use super::state::{StepOverview, step_overview};
use super::steps::{Step, step_name};

/// Progress summary returned by the REST endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSummary {
    pub user_id: Uuid,
    pub current_step: u8,
    pub current_step_name: &'static str,
    pub completed_steps: Vec<u8>,
    pub progress: u8,
    pub is_completed: bool,
    pub next_step: Option<u8>,
    pub previous_step: Option<u8>,
    pub version: i64,
}

impl ProgressSummary {
    pub fn from_record(record: &OnboardingRecord) -> Self {
        Self {
            user_id: record.user_id,
            current_step: record.current_step,
            current_step_name: step_name(i64::from(record.current_step)),
            completed_steps: record.completed_steps.clone(),
            progress: record.progress(),
            is_completed: record.is_completed,
            next_step: next_step(record.current_step),
            previous_step: previous_step(record.current_step),
            version: record.version,
        }
    }
}

/// Coordinates onboarding state for all users.
///
/// Built once at startup and shared by the routes; it holds no per-user
/// state of its own.
pub struct OnboardingManager {
    db: Arc<dyn Database>,
    autosave_config: AutoSaveConfig,
}

impl OnboardingManager {
    pub fn new(db: Arc<dyn Database>, autosave_config: AutoSaveConfig) -> Self {
        Self {
            db,
            autosave_config,
        }
    }

    /// Load a user's record, creating an empty one on first access.
    pub async fn fetch_or_create(&self, user_id: Uuid) -> Result<OnboardingRecord, OnboardingError> {
        if let Some(record) = self.db.get_onboarding(user_id).await? {
            return Ok(record);
        }
        info!(user_id = %user_id, "Starting onboarding for new user");
        Ok(self
            .db
            .insert_onboarding(&OnboardingRecord::new(user_id))
            .await?)
    }

    /// Meeting status for a user. Users with no status have not met yet.
    pub async fn meeting_status(&self, user_id: Uuid) -> Result<MeetingStatus, OnboardingError> {
        Ok(self
            .db
            .get_meeting_status(user_id)
            .await?
            .unwrap_or_default())
    }

    pub async fn set_meeting_status(
        &self,
        user_id: Uuid,
        status: MeetingStatus,
    ) -> Result<MeetingStatus, OnboardingError> {
        self.db.set_meeting_status(user_id, &status).await?;
        info!(
            user_id = %user_id,
            meeting_completed = status.meeting_completed,
            meeting_status = %status.meeting_status,
            "Meeting status updated"
        );
        Ok(status)
    }

    /// Store in-progress values for a step without completing it.
    pub async fn save_step_fields(
        &self,
        user_id: Uuid,
        payload: StepPayload,
        expected_version: i64,
    ) -> Result<OnboardingRecord, OnboardingError> {
        let step = payload.step();
        let record = self
            .apply(user_id, step, expected_version, |record| {
                record.set_step_fields(payload)
            })
            .await?;
        debug!(user_id = %user_id, step = %step, version = record.version, "Step fields saved");
        Ok(record)
    }

    /// Record final values for a step and mark it complete. Idempotent.
    pub async fn complete_step(
        &self,
        user_id: Uuid,
        payload: StepPayload,
        expected_version: i64,
    ) -> Result<OnboardingRecord, OnboardingError> {
        let step = payload.step();
        let mut newly_completed = false;
        let record = self
            .apply(user_id, step, expected_version, |record| {
                newly_completed = record.complete_step(payload);
            })
            .await?;

        info!(
            user_id = %user_id,
            step = %step,
            newly_completed,
            progress = record.progress(),
            "Onboarding step completed"
        );
        if record.is_completed && newly_completed {
            info!(user_id = %user_id, "Onboarding finished");
        }
        Ok(record)
    }

    pub async fn progress(&self, user_id: Uuid) -> Result<ProgressSummary, OnboardingError> {
        let record = self.fetch_or_create(user_id).await?;
        Ok(ProgressSummary::from_record(&record))
    }

    pub async fn step_overview(&self, user_id: Uuid) -> Result<Vec<StepOverview>, OnboardingError> {
        let record = self.fetch_or_create(user_id).await?;
        let meeting = self.meeting_status(user_id).await?;
        Ok(step_overview(&record, &meeting))
    }

    /// Start an auto-save controller for one step form of `record`.
    ///
    /// The controller is seeded with the step's stored values, so callers
    /// feed it edits only.
    pub fn autosave(
        self: &Arc<Self>,
        record: &OnboardingRecord,
        step: Step,
    ) -> AutoSave<StepPayload> {
        let saver = Arc::new(StepSaver::new(Arc::clone(self), record, step));
        let controller = AutoSave::spawn(saver, self.autosave_config.clone());
        controller.update(
            record
                .fields(step)
                .cloned()
                .unwrap_or_else(|| StepPayload::empty(step)),
        );
        controller
    }

    async fn apply(
        &self,
        user_id: Uuid,
        step: Step,
        expected_version: i64,
        mutate: impl FnOnce(&mut OnboardingRecord),
    ) -> Result<OnboardingRecord, OnboardingError> {
        let meeting = self.meeting_status(user_id).await?;
        if !is_step_unlocked(step, &meeting) {
            warn!(user_id = %user_id, step = %step, "Write to locked onboarding step rejected");
            return Err(OnboardingError::StepLocked { step });
        }

        let mut record = self.fetch_or_create(user_id).await?;
        if record.version != expected_version {
            return Err(OnboardingError::StaleWrite {
                user_id,
                expected: expected_version,
            });
        }

        mutate(&mut record);
        match self.db.update_onboarding(&record).await {
            Ok(saved) => Ok(saved),
            Err(DatabaseError::VersionConflict { expected, .. }) => {
                Err(OnboardingError::StaleWrite { user_id, expected })
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Auto-save target that writes one step's fields, tracking the record
/// version across saves.
pub struct StepSaver {
    manager: Arc<OnboardingManager>,
    user_id: Uuid,
    step: Step,
    version: AtomicI64,
    /// This step's fields as of the last successful save (or the seed).
    last_seen: Mutex<Option<StepPayload>>,
}

impl StepSaver {
    pub fn new(manager: Arc<OnboardingManager>, record: &OnboardingRecord, step: Step) -> Self {
        Self {
            manager,
            user_id: record.user_id,
            step,
            version: AtomicI64::new(record.version),
            last_seen: Mutex::new(record.fields(step).cloned()),
        }
    }

    /// Record version the next save will expect.
    pub fn version(&self) -> i64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Re-read the record after a stale write. Returns the current version
    /// when the conflicting write left this step's fields untouched.
    async fn rebase(&self) -> Result<Option<i64>, OnboardingError> {
        let current = self.manager.fetch_or_create(self.user_id).await?;
        let last_seen = self.last_seen.lock().await;
        if current.fields(self.step) == last_seen.as_ref() {
            Ok(Some(current.version))
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl SaveTarget<StepPayload> for StepSaver {
    async fn save(&self, data: &StepPayload) -> Result<(), OnboardingError> {
        if data.step() != self.step {
            return Err(OnboardingError::StepMismatch {
                target: self.step,
                payload: data.step(),
            });
        }
        let saved = match self
            .manager
            .save_step_fields(self.user_id, data.clone(), self.version())
            .await
        {
            Err(err @ OnboardingError::StaleWrite { .. }) => match self.rebase().await? {
                Some(version) => {
                    debug!(
                        user_id = %self.user_id,
                        step = %self.step,
                        version,
                        "Record changed on another step, retrying at current version"
                    );
                    self.manager
                        .save_step_fields(self.user_id, data.clone(), version)
                        .await?
                }
                None => return Err(err),
            },
            other => other?,
        };
        self.version.store(saved.version, Ordering::SeqCst);
        *self.last_seen.lock().await = Some(data.clone());
        Ok(())
    }
}
