//! Stage gate — decides whether post-meeting content is visible.

use serde::{Deserialize, Serialize};

use super::steps::Step;

/// Coarse grouping of steps around the onboarding meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    PreMeeting,
    PostMeeting,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreMeeting => write!(f, "pre-meeting"),
            Self::PostMeeting => write!(f, "post-meeting"),
        }
    }
}

/// External meeting-status signal. Only `meeting_completed` affects gating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingStatus {
    pub meeting_completed: bool,
    /// Free-form status from the scheduler, e.g. "scheduled" or "no_show".
    #[serde(default)]
    pub meeting_status: String,
}

impl Default for MeetingStatus {
    fn default() -> Self {
        Self {
            meeting_completed: false,
            meeting_status: "not_scheduled".to_string(),
        }
    }
}

pub fn is_unlocked(stage: Stage, meeting: &MeetingStatus) -> bool {
    match stage {
        Stage::PreMeeting => true,
        Stage::PostMeeting => meeting.meeting_completed,
    }
}

pub fn is_step_unlocked(step: Step, meeting: &MeetingStatus) -> bool {
    is_unlocked(step.stage(), meeting)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meeting(completed: bool, status: &str) -> MeetingStatus {
        MeetingStatus {
            meeting_completed: completed,
            meeting_status: status.to_string(),
        }
    }

    #[test]
    fn pre_meeting_always_unlocked() {
        for m in [
            meeting(false, "not_scheduled"),
            meeting(false, "scheduled"),
            meeting(true, "completed"),
            meeting(true, ""),
        ] {
            assert!(is_unlocked(Stage::PreMeeting, &m));
        }
    }

    #[test]
    fn post_meeting_follows_completion_flag() {
        assert!(!is_unlocked(Stage::PostMeeting, &meeting(false, "scheduled")));
        assert!(is_unlocked(Stage::PostMeeting, &meeting(true, "completed")));
        // The free-form status is informational only
        assert!(!is_unlocked(Stage::PostMeeting, &meeting(false, "completed")));
    }

    #[test]
    fn steps_inherit_stage_lock() {
        let pending = MeetingStatus::default();
        assert!(is_step_unlocked(Step::MeetingBooking, &pending));
        assert!(!is_step_unlocked(Step::ContractDetails, &pending));
        assert!(is_step_unlocked(Step::ContractDetails, &meeting(true, "completed")));
    }

    #[test]
    fn stage_serde_is_kebab_case() {
        assert_eq!(serde_json::to_string(&Stage::PreMeeting).unwrap(), "\"pre-meeting\"");
        let parsed: Stage = serde_json::from_str("\"post-meeting\"").unwrap();
        assert_eq!(parsed, Stage::PostMeeting);
        assert_eq!(Stage::PostMeeting.to_string(), "post-meeting");
    }

    #[test]
    fn meeting_status_wire_shape() {
        let parsed: MeetingStatus =
            serde_json::from_str(r#"{"meeting_completed": true}"#).unwrap();
        assert!(parsed.meeting_completed);
        assert!(parsed.meeting_status.is_empty());
    }
}
