//! Step lifecycle: derives where each step stands for a record.

use serde::{Deserialize, Serialize};

use super::gate::{MeetingStatus, is_step_unlocked};
use super::model::OnboardingRecord;
use super::steps::{Step, StepDefinition};

/// Lifecycle of a single step.
///
/// Derived from the record on every read. Completion is sticky: editing a
/// completed step's fields afterwards leaves it Completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl StepStatus {
    /// Status of `step` within `record`.
    pub fn of(record: &OnboardingRecord, step: Step) -> Self {
        if record.is_step_completed(step) {
            Self::Completed
        } else if record.fields(step).is_some() {
            Self::InProgress
        } else {
            Self::NotStarted
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// One row of the step list shown to the user.
#[derive(Debug, Clone, Serialize)]
pub struct StepOverview {
    #[serde(flatten)]
    pub definition: StepDefinition,
    pub status: StepStatus,
    pub unlocked: bool,
    pub current: bool,
}

/// Status and lock state for every step, in ordinal order.
pub fn step_overview(record: &OnboardingRecord, meeting: &MeetingStatus) -> Vec<StepOverview> {
    Step::ALL
        .into_iter()
        .map(|step| StepOverview {
            definition: step.definition(),
            status: StepStatus::of(record, step),
            unlocked: is_step_unlocked(step, meeting),
            current: record.current_step == step.ordinal(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::onboarding::model::StepPayload;

    #[test]
    fn status_follows_record() {
        let mut record = OnboardingRecord::new(Uuid::new_v4());
        assert_eq!(StepStatus::of(&record, Step::Goals), StepStatus::NotStarted);

        record.set_step_fields(StepPayload::empty(Step::Goals));
        assert_eq!(StepStatus::of(&record, Step::Goals), StepStatus::InProgress);

        record.complete_step(StepPayload::empty(Step::Goals));
        assert_eq!(StepStatus::of(&record, Step::Goals), StepStatus::Completed);
    }

    #[test]
    fn editing_completed_step_keeps_it_completed() {
        let mut record = OnboardingRecord::new(Uuid::new_v4());
        record.complete_step(StepPayload::empty(Step::Goals));
        record.set_step_fields(StepPayload::empty(Step::Goals));
        assert_eq!(StepStatus::of(&record, Step::Goals), StepStatus::Completed);
    }

    #[test]
    fn display_matches_serde() {
        for status in [StepStatus::NotStarted, StepStatus::InProgress, StepStatus::Completed] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(format!("\"{status}\""), json);
        }
    }

    #[test]
    fn overview_reports_locks_and_current() {
        let mut record = OnboardingRecord::new(Uuid::new_v4());
        record.complete_step(StepPayload::empty(Step::PersonalInfo));

        let rows = step_overview(&record, &MeetingStatus::default());
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0].status, StepStatus::Completed);
        assert!(rows[1].current);
        assert!(rows[6].unlocked);
        assert!(!rows[7].unlocked);
        assert!(!rows[11].unlocked);

        let done = MeetingStatus {
            meeting_completed: true,
            meeting_status: "completed".to_string(),
        };
        assert!(step_overview(&record, &done).iter().all(|r| r.unlocked));
    }
}
