//! Onboarding record and per-step payload models.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::progress::{calculate_progress, dedupe_steps, is_onboarding_complete, next_step};
use super::steps::{Step, TOTAL_STEPS};

/// A linked social media account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialAccount {
    /// Platform identifier, e.g. "instagram", "tiktok", "youtube".
    pub platform: String,
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalInfoFields {
    pub full_name: String,
    pub display_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialAccountsFields {
    pub accounts: Vec<SocialAccount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentNicheFields {
    pub primary_niche: String,
    pub secondary_niches: Vec<String>,
    pub content_formats: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudienceFields {
    pub primary_age_range: Option<String>,
    pub top_countries: Vec<String>,
    /// Average engagement rate as a percentage.
    pub engagement_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalsFields {
    pub monthly_income_goal: Option<u32>,
    pub goals: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityFields {
    pub hours_per_week: Option<u8>,
    pub timezone: Option<String>,
    pub preferred_days: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingBookingFields {
    pub preferred_slot: Option<DateTime<Utc>>,
    pub booking_reference: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractDetailsFields {
    pub legal_name: String,
    pub business_entity: Option<String>,
    pub tax_id: Option<String>,
    pub accepted_terms: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentSetupFields {
    /// e.g. "bank_transfer", "paypal".
    pub payout_method: Option<String>,
    pub account_holder: Option<String>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandGuidelinesFields {
    pub acknowledged: bool,
    pub excluded_brands: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPlanFields {
    pub posts_per_week: Option<u8>,
    pub themes: Vec<String>,
    pub first_post_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalReviewFields {
    pub confirmed: bool,
    pub comments: Option<String>,
}

/// Field values for one step, tagged by the step they belong to.
///
/// Wire form: `{"step": "payment_setup", "fields": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", content = "fields", rename_all = "snake_case")]
pub enum StepPayload {
    PersonalInfo(PersonalInfoFields),
    SocialAccounts(SocialAccountsFields),
    ContentNiche(ContentNicheFields),
    Audience(AudienceFields),
    Goals(GoalsFields),
    Availability(AvailabilityFields),
    MeetingBooking(MeetingBookingFields),
    ContractDetails(ContractDetailsFields),
    PaymentSetup(PaymentSetupFields),
    BrandGuidelines(BrandGuidelinesFields),
    ContentPlan(ContentPlanFields),
    FinalReview(FinalReviewFields),
}

impl StepPayload {
    pub fn step(&self) -> Step {
        match self {
            Self::PersonalInfo(_) => Step::PersonalInfo,
            Self::SocialAccounts(_) => Step::SocialAccounts,
            Self::ContentNiche(_) => Step::ContentNiche,
            Self::Audience(_) => Step::Audience,
            Self::Goals(_) => Step::Goals,
            Self::Availability(_) => Step::Availability,
            Self::MeetingBooking(_) => Step::MeetingBooking,
            Self::ContractDetails(_) => Step::ContractDetails,
            Self::PaymentSetup(_) => Step::PaymentSetup,
            Self::BrandGuidelines(_) => Step::BrandGuidelines,
            Self::ContentPlan(_) => Step::ContentPlan,
            Self::FinalReview(_) => Step::FinalReview,
        }
    }

    /// A payload with every field at its default, for a form with no saved data.
    pub fn empty(step: Step) -> Self {
        match step {
            Step::PersonalInfo => Self::PersonalInfo(Default::default()),
            Step::SocialAccounts => Self::SocialAccounts(Default::default()),
            Step::ContentNiche => Self::ContentNiche(Default::default()),
            Step::Audience => Self::Audience(Default::default()),
            Step::Goals => Self::Goals(Default::default()),
            Step::Availability => Self::Availability(Default::default()),
            Step::MeetingBooking => Self::MeetingBooking(Default::default()),
            Step::ContractDetails => Self::ContractDetails(Default::default()),
            Step::PaymentSetup => Self::PaymentSetup(Default::default()),
            Step::BrandGuidelines => Self::BrandGuidelines(Default::default()),
            Step::ContentPlan => Self::ContentPlan(Default::default()),
            Step::FinalReview => Self::FinalReview(Default::default()),
        }
    }
}

/// Per-user onboarding progress and collected step data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingRecord {
    pub user_id: Uuid,
    /// Step the user is working on, 1..=12.
    pub current_step: u8,
    /// Distinct completed ordinals, ascending.
    pub completed_steps: Vec<u8>,
    pub is_completed: bool,
    #[serde(default)]
    pub steps: BTreeMap<Step, StepPayload>,
    /// Write counter for optimistic concurrency. Bumped by the store on update.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl OnboardingRecord {
    /// Fresh record for a first-time user.
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            current_step: 1,
            completed_steps: Vec::new(),
            is_completed: false,
            steps: BTreeMap::new(),
            version: 1,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Restore the record invariants after loading data of unknown quality.
    pub fn normalize(&mut self) {
        self.completed_steps = dedupe_steps(&self.completed_steps);
        self.current_step = self.current_step.clamp(1, TOTAL_STEPS);
        self.is_completed = is_onboarding_complete(&self.completed_steps);
    }

    pub fn fields(&self, step: Step) -> Option<&StepPayload> {
        self.steps.get(&step)
    }

    pub fn is_step_completed(&self, step: Step) -> bool {
        self.completed_steps.contains(&step.ordinal())
    }

    /// Store in-progress field values without touching completion.
    pub fn set_step_fields(&mut self, payload: StepPayload) {
        self.steps.insert(payload.step(), payload);
        self.updated_at = Utc::now();
    }

    /// Record the final values for a step and mark it complete.
    ///
    /// Completing an already-completed step only replaces its fields.
    /// Returns `true` if the step was newly added to `completed_steps`.
    pub fn complete_step(&mut self, payload: StepPayload) -> bool {
        let ordinal = payload.step().ordinal();
        self.set_step_fields(payload);

        let newly_completed = !self.completed_steps.contains(&ordinal);
        if newly_completed {
            self.completed_steps.push(ordinal);
            self.completed_steps.sort_unstable();
        }

        let advanced = next_step(ordinal).unwrap_or(ordinal);
        self.current_step = self.current_step.max(advanced);

        let was_completed = self.is_completed;
        self.is_completed = is_onboarding_complete(&self.completed_steps);
        if self.is_completed && !was_completed {
            self.completed_at = Some(self.updated_at);
        }

        newly_completed
    }

    pub fn progress(&self) -> u8 {
        calculate_progress(&self.completed_steps)
    }
}
