//! REST endpoints for onboarding records, step saves and meeting status.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::error::{DatabaseError, OnboardingError};

use super::gate::MeetingStatus;
use super::manager::OnboardingManager;
use super::model::StepPayload;
use super::steps::{Step, step_definitions};

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub manager: Arc<OnboardingManager>,
}

/// Body for step saves and completions.
#[derive(Debug, Deserialize)]
pub struct StepWrite {
    /// Record version the client last saw.
    pub version: i64,
    pub payload: StepPayload,
}

impl IntoResponse for OnboardingError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidStep(_) | Self::UnknownStep(_) | Self::StepMismatch { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::StepLocked { .. } => StatusCode::FORBIDDEN,
            Self::StaleWrite { .. } => StatusCode::CONFLICT,
            Self::Database(DatabaseError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Database(_) => {
                error!(error = %self, "Onboarding request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}

fn parse_step(raw: &str, payload: &StepPayload) -> Result<Step, OnboardingError> {
    let target: Step = raw.parse()?;
    if payload.step() != target {
        return Err(OnboardingError::StepMismatch {
            target,
            payload: payload.step(),
        });
    }
    Ok(target)
}

/// GET /api/onboarding/steps
async fn list_steps() -> impl IntoResponse {
    Json(step_definitions())
}

/// GET /api/onboarding/{user_id}
///
/// Returns the user's record, creating an empty one on first access.
async fn get_record(
    State(state): State<OnboardingRouteState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, OnboardingError> {
    Ok(Json(state.manager.fetch_or_create(user_id).await?))
}

/// GET /api/onboarding/{user_id}/progress
async fn get_progress(
    State(state): State<OnboardingRouteState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, OnboardingError> {
    Ok(Json(state.manager.progress(user_id).await?))
}

/// GET /api/onboarding/{user_id}/overview
async fn get_overview(
    State(state): State<OnboardingRouteState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, OnboardingError> {
    Ok(Json(state.manager.step_overview(user_id).await?))
}

/// PUT /api/onboarding/{user_id}/steps/{step}
///
/// Saves in-progress field values. Responds 409 if `version` is stale.
async fn save_step(
    State(state): State<OnboardingRouteState>,
    Path((user_id, step)): Path<(Uuid, String)>,
    Json(body): Json<StepWrite>,
) -> Result<impl IntoResponse, OnboardingError> {
    parse_step(&step, &body.payload)?;
    let record = state
        .manager
        .save_step_fields(user_id, body.payload, body.version)
        .await?;
    Ok(Json(record))
}

/// POST /api/onboarding/{user_id}/steps/{step}/complete
async fn complete_step(
    State(state): State<OnboardingRouteState>,
    Path((user_id, step)): Path<(Uuid, String)>,
    Json(body): Json<StepWrite>,
) -> Result<impl IntoResponse, OnboardingError> {
    parse_step(&step, &body.payload)?;
    let record = state
        .manager
        .complete_step(user_id, body.payload, body.version)
        .await?;
    Ok(Json(record))
}

/// GET /api/onboarding/{user_id}/meeting
async fn get_meeting(
    State(state): State<OnboardingRouteState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, OnboardingError> {
    Ok(Json(state.manager.meeting_status(user_id).await?))
}

/// PUT /api/onboarding/{user_id}/meeting
async fn put_meeting(
    State(state): State<OnboardingRouteState>,
    Path(user_id): Path<Uuid>,
    Json(status): Json<MeetingStatus>,
) -> Result<impl IntoResponse, OnboardingError> {
    Ok(Json(state.manager.set_meeting_status(user_id, status).await?))
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/api/onboarding/steps", get(list_steps))
        .route("/api/onboarding/{user_id}", get(get_record))
        .route("/api/onboarding/{user_id}/progress", get(get_progress))
        .route("/api/onboarding/{user_id}/overview", get(get_overview))
        .route("/api/onboarding/{user_id}/steps/{step}", put(save_step))
        .route(
            "/api/onboarding/{user_id}/steps/{step}/complete",
            post(complete_step),
        )
        .route(
            "/api/onboarding/{user_id}/meeting",
            get(get_meeting).put(put_meeting),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: OnboardingError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn errors_map_to_status_codes() {
        assert_eq!(status_of(OnboardingError::InvalidStep(13)), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(OnboardingError::StepLocked {
                step: Step::ContractDetails
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(OnboardingError::StaleWrite {
                user_id: Uuid::new_v4(),
                expected: 1
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(OnboardingError::Database(DatabaseError::NotFound {
                entity: "onboarding".to_string(),
                id: "x".to_string(),
            })),
            StatusCode::NOT_FOUND
        );
        // Undecodable stored data surfaces through the database layer
        assert_eq!(
            status_of(OnboardingError::Database(DatabaseError::Serialization(
                "bad steps json".to_string()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
