//! Creator onboarding — step tracking, auto-save and meeting-gated access.

pub mod config;
pub mod error;
pub mod onboarding;
pub mod server;
pub mod store;
