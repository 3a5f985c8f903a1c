//! Public forms, reached through the link shared with students
//!
//! - GET  /api/v1/forms/{form_id} - Title and fields
//! - POST /api/v1/forms/{form_id}/submit

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{FormSection, FormSubmission, SubmitFormInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{form_id}", get(get_form))
        .route("/{form_id}/submit", post(submit_form))
}

async fn get_form(
    State(state): State<AppState>,
    Path(form_id): Path<i64>,
) -> Result<Json<FormSection>, ApiError> {
    Ok(Json(state.form_service.public_form(form_id).await?))
}

async fn submit_form(
    State(state): State<AppState>,
    Path(form_id): Path<i64>,
    Json(input): Json<SubmitFormInput>,
) -> Result<(StatusCode, Json<FormSubmission>), ApiError> {
    let submission = state.form_service.submit(form_id, input.data).await?;
    tracing::debug!(form_id, submission_id = submission.id, "Form submitted");
    Ok((StatusCode::CREATED, Json(submission)))
}
