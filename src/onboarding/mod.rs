//! Onboarding system — the twelve-step creator onboarding flow.
//!
//! A creator works through fixed steps, each a form whose values are
//! auto-saved as they type. Steps after the onboarding meeting stay locked
//! until the meeting is marked complete. Progress and completion are
//! derived from the set of completed steps.

pub mod autosave;
pub mod gate;
pub mod manager;
pub mod model;
pub mod progress;
pub mod routes;
pub mod state;
pub mod steps;

pub use autosave::{AutoSave, AutoSaveEvent, SaveOutcome, SaveStatus, SaveTarget};
pub use gate::{MeetingStatus, Stage, is_step_unlocked, is_unlocked};
pub use manager::{OnboardingManager, ProgressSummary, StepSaver};
pub use model::{OnboardingRecord, StepPayload};
pub use progress::{calculate_progress, is_onboarding_complete, next_step, previous_step};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use state::{StepOverview, StepStatus};
pub use steps::{Step, StepDefinition, step_name, step_ordinal, validate_step_number};
