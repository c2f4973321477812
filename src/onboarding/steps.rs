//! Step registry — the twelve fixed onboarding steps.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::gate::Stage;
use crate::error::OnboardingError;

/// Number of onboarding steps.
pub const TOTAL_STEPS: u8 = 12;

/// Returned by [`step_name`] for ordinals outside the registry.
pub const UNKNOWN_STEP_NAME: &str = "Unknown Step";

/// One of the fixed onboarding sections.
///
/// Steps 1–7 happen before the onboarding meeting, 8–12 after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    PersonalInfo,
    SocialAccounts,
    ContentNiche,
    Audience,
    Goals,
    Availability,
    MeetingBooking,
    ContractDetails,
    PaymentSetup,
    BrandGuidelines,
    ContentPlan,
    FinalReview,
}

/// Registry entry for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepDefinition {
    pub ordinal: u8,
    pub key: &'static str,
    pub name: &'static str,
    pub stage: Stage,
}

impl Step {
    /// All steps in ordinal order.
    pub const ALL: [Step; TOTAL_STEPS as usize] = [
        Step::PersonalInfo,
        Step::SocialAccounts,
        Step::ContentNiche,
        Step::Audience,
        Step::Goals,
        Step::Availability,
        Step::MeetingBooking,
        Step::ContractDetails,
        Step::PaymentSetup,
        Step::BrandGuidelines,
        Step::ContentPlan,
        Step::FinalReview,
    ];

    /// 1-based position of the step.
    pub fn ordinal(self) -> u8 {
        match self {
            Self::PersonalInfo => 1,
            Self::SocialAccounts => 2,
            Self::ContentNiche => 3,
            Self::Audience => 4,
            Self::Goals => 5,
            Self::Availability => 6,
            Self::MeetingBooking => 7,
            Self::ContractDetails => 8,
            Self::PaymentSetup => 9,
            Self::BrandGuidelines => 10,
            Self::ContentPlan => 11,
            Self::FinalReview => 12,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Step> {
        Self::ALL.get(usize::from(ordinal).checked_sub(1)?).copied()
    }

    /// Stable identifier, identical to the serde representation.
    pub fn key(self) -> &'static str {
        match self {
            Self::PersonalInfo => "personal_info",
            Self::SocialAccounts => "social_accounts",
            Self::ContentNiche => "content_niche",
            Self::Audience => "audience",
            Self::Goals => "goals",
            Self::Availability => "availability",
            Self::MeetingBooking => "meeting_booking",
            Self::ContractDetails => "contract_details",
            Self::PaymentSetup => "payment_setup",
            Self::BrandGuidelines => "brand_guidelines",
            Self::ContentPlan => "content_plan",
            Self::FinalReview => "final_review",
        }
    }

    /// Human-readable display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::PersonalInfo => "Personal Information",
            Self::SocialAccounts => "Social Media Accounts",
            Self::ContentNiche => "Content Niche",
            Self::Audience => "Audience Insights",
            Self::Goals => "Goals & Expectations",
            Self::Availability => "Availability",
            Self::MeetingBooking => "Onboarding Meeting",
            Self::ContractDetails => "Contract Details",
            Self::PaymentSetup => "Payment Setup",
            Self::BrandGuidelines => "Brand Guidelines",
            Self::ContentPlan => "Content Plan",
            Self::FinalReview => "Final Review",
        }
    }

    /// Which side of the onboarding meeting the step belongs to.
    pub fn stage(self) -> Stage {
        if self.ordinal() <= Self::MeetingBooking.ordinal() {
            Stage::PreMeeting
        } else {
            Stage::PostMeeting
        }
    }

    pub fn definition(self) -> StepDefinition {
        StepDefinition {
            ordinal: self.ordinal(),
            key: self.key(),
            name: self.name(),
            stage: self.stage(),
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Step {
    type Err = OnboardingError;

    /// Accepts either the step key (`"payment_setup"`) or its ordinal (`"9"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<i64>() {
            if !validate_step_number(n) {
                return Err(OnboardingError::InvalidStep(n));
            }
            return u8::try_from(n)
                .ok()
                .and_then(Step::from_ordinal)
                .ok_or(OnboardingError::InvalidStep(n));
        }
        Step::ALL
            .into_iter()
            .find(|step| step.key() == s)
            .ok_or_else(|| OnboardingError::UnknownStep(s.to_string()))
    }
}

/// The full registry in ordinal order.
pub fn step_definitions() -> Vec<StepDefinition> {
    Step::ALL.into_iter().map(Step::definition).collect()
}

/// Ordinal for a step key, or `None` if the key is not registered.
pub fn step_ordinal(key: &str) -> Option<u8> {
    Step::ALL
        .into_iter()
        .find(|step| step.key() == key)
        .map(Step::ordinal)
}

/// Display name for an ordinal. Out-of-range input yields [`UNKNOWN_STEP_NAME`].
pub fn step_name(ordinal: i64) -> &'static str {
    u8::try_from(ordinal)
        .ok()
        .and_then(Step::from_ordinal)
        .map(Step::name)
        .unwrap_or(UNKNOWN_STEP_NAME)
}

/// Check that `n` names a registered step. Callers must not proceed on `false`.
pub fn validate_step_number(n: i64) -> bool {
    if n < 1 || n > i64::from(TOTAL_STEPS) {
        tracing::warn!(step = n, "Invalid onboarding step number");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_contiguous() {
        for (i, step) in Step::ALL.into_iter().enumerate() {
            assert_eq!(usize::from(step.ordinal()), i + 1);
            assert_eq!(Step::from_ordinal(step.ordinal()), Some(step));
        }
        assert_eq!(Step::from_ordinal(0), None);
        assert_eq!(Step::from_ordinal(13), None);
    }

    #[test]
    fn key_lookup() {
        assert_eq!(step_ordinal("personal_info"), Some(1));
        assert_eq!(step_ordinal("contract_details"), Some(8));
        assert_eq!(step_ordinal("final_review"), Some(12));
        assert_eq!(step_ordinal("not_a_step"), None);
    }

    #[test]
    fn name_lookup_fails_softly() {
        assert_eq!(step_name(1), "Personal Information");
        assert_eq!(step_name(12), "Final Review");
        assert_eq!(step_name(0), UNKNOWN_STEP_NAME);
        assert_eq!(step_name(13), UNKNOWN_STEP_NAME);
        assert_eq!(step_name(-4), UNKNOWN_STEP_NAME);
        assert_eq!(step_name(i64::MAX), UNKNOWN_STEP_NAME);
    }

    #[test]
    fn validation_bounds() {
        for n in -3..=0 {
            assert!(!validate_step_number(n));
        }
        for n in 1..=12 {
            assert!(validate_step_number(n));
        }
        assert!(!validate_step_number(13));
        assert!(!validate_step_number(i64::MIN));
    }

    #[test]
    fn display_matches_serde() {
        for step in Step::ALL {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(format!("\"{step}\""), json);
        }
    }

    #[test]
    fn parse_accepts_key_or_ordinal() {
        assert_eq!("payment_setup".parse::<Step>().unwrap(), Step::PaymentSetup);
        assert_eq!("9".parse::<Step>().unwrap(), Step::PaymentSetup);
        assert!(matches!(
            "0".parse::<Step>(),
            Err(OnboardingError::InvalidStep(0))
        ));
        assert!(matches!(
            "bogus".parse::<Step>(),
            Err(OnboardingError::UnknownStep(_))
        ));
    }

    #[test]
    fn ordinal_parse_is_range_validated() {
        for raw in ["-1", "0", "13", "9223372036854775807"] {
            let n: i64 = raw.parse().unwrap();
            assert!(!validate_step_number(n));
            match raw.parse::<Step>() {
                Err(OnboardingError::InvalidStep(got)) => assert_eq!(got, n),
                other => panic!("{raw} parsed as {other:?}"),
            }
        }
        for n in 1..=12u8 {
            assert_eq!(n.to_string().parse::<Step>().unwrap().ordinal(), n);
        }
    }

    #[test]
    fn stages_split_at_meeting() {
        assert_eq!(Step::PersonalInfo.stage(), Stage::PreMeeting);
        assert_eq!(Step::MeetingBooking.stage(), Stage::PreMeeting);
        assert_eq!(Step::ContractDetails.stage(), Stage::PostMeeting);
        assert_eq!(Step::FinalReview.stage(), Stage::PostMeeting);
        assert_eq!(step_definitions().len(), usize::from(TOTAL_STEPS));
    }
}
