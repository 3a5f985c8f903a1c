//! FAQ API endpoints
//!
//! Everything under /api/v1/colleges/{id}/faq: metadata, items, the linked
//! question form, and review of pending submissions.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, Tenant};
use crate::models::{
    BulkCreateFaqItemsInput, CreateFaqItemInput, Faq, FaqItem, FormSection, GenerateFormInput,
    ProcessSubmissionInput, SubmissionCount, SubmissionDetail, SubmissionStatus, UpdateFaqInput,
    UpdateFaqItemInput,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_faq).put(update_faq))
        .route("/items", post(create_item))
        .route("/items/bulk", post(bulk_create_items))
        .route("/items/{item_id}", put(update_item).delete(delete_item))
        .route("/forms", get(list_forms))
        .route("/forms/generate", post(generate_form))
        .route("/forms/{form_id}/import", post(import_form))
        .route("/submissions", get(list_submissions))
        .route("/submissions/count", get(count_submissions))
        .route("/submissions/{submission_id}", post(process_submission))
}

#[derive(Debug, Serialize)]
pub struct ProcessSubmissionResponse {
    pub status: SubmissionStatus,
}

/// GET /api/v1/colleges/{id}/faq
async fn get_faq(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(college_id): Path<i64>,
) -> Result<Json<Faq>, ApiError> {
    let college_id = state.college_in(&tenant, college_id).await?;
    Ok(Json(state.faq_service.get(college_id).await?))
}

/// PUT /api/v1/colleges/{id}/faq
async fn update_faq(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(college_id): Path<i64>,
    Json(input): Json<UpdateFaqInput>,
) -> Result<Json<Faq>, ApiError> {
    let college_id = state.college_in(&tenant, college_id).await?;
    Ok(Json(state.faq_service.update(college_id, input).await?))
}

async fn create_item(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(college_id): Path<i64>,
    Json(input): Json<CreateFaqItemInput>,
) -> Result<(StatusCode, Json<FaqItem>), ApiError> {
    let college_id = state.college_in(&tenant, college_id).await?;
    let item = state.faq_service.create_item(college_id, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// POST /api/v1/colleges/{id}/faq/items/bulk - Import many items at once
async fn bulk_create_items(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(college_id): Path<i64>,
    Json(input): Json<BulkCreateFaqItemsInput>,
) -> Result<(StatusCode, Json<Vec<FaqItem>>), ApiError> {
    let college_id = state.college_in(&tenant, college_id).await?;
    let items = state.faq_service.bulk_create(college_id, input.items).await?;
    Ok((StatusCode::CREATED, Json(items)))
}

async fn update_item(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((college_id, item_id)): Path<(i64, i64)>,
    Json(input): Json<UpdateFaqItemInput>,
) -> Result<Json<FaqItem>, ApiError> {
    let college_id = state.college_in(&tenant, college_id).await?;
    Ok(Json(state.faq_service.update_item(college_id, item_id, input).await?))
}

async fn delete_item(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((college_id, item_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    let college_id = state.college_in(&tenant, college_id).await?;
    state.faq_service.delete_item(college_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_forms(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(college_id): Path<i64>,
) -> Result<Json<Vec<FormSection>>, ApiError> {
    let college_id = state.college_in(&tenant, college_id).await?;
    Ok(Json(state.form_service.list_forms(college_id).await?))
}

/// POST /api/v1/colleges/{id}/faq/forms/generate
async fn generate_form(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(college_id): Path<i64>,
    body: Bytes,
) -> Result<(StatusCode, Json<FormSection>), ApiError> {
    let college_id = state.college_in(&tenant, college_id).await?;
    // The body is optional
    let title = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<GenerateFormInput>(&body)
            .map_err(|e| ApiError::validation_error(format!("Invalid request body: {}", e)))?
            .title
    };
    let form = state.form_service.generate_form(college_id, title).await?;
    Ok((StatusCode::CREATED, Json(form)))
}

async fn import_form(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((college_id, form_id)): Path<(i64, i64)>,
) -> Result<Json<FormSection>, ApiError> {
    let college_id = state.college_in(&tenant, college_id).await?;
    Ok(Json(state.form_service.import_form(college_id, form_id).await?))
}

/// GET /api/v1/colleges/{id}/faq/submissions - Pending submissions only
async fn list_submissions(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(college_id): Path<i64>,
) -> Result<Json<Vec<SubmissionDetail>>, ApiError> {
    let college_id = state.college_in(&tenant, college_id).await?;
    Ok(Json(state.form_service.list_pending(college_id).await?))
}

async fn count_submissions(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(college_id): Path<i64>,
) -> Result<Json<SubmissionCount>, ApiError> {
    let college_id = state.college_in(&tenant, college_id).await?;
    let count = state.form_service.count_pending(college_id).await?;
    Ok(Json(SubmissionCount { count }))
}

/// POST /api/v1/colleges/{id}/faq/submissions/{sid} - Approve or reject
async fn process_submission(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((college_id, submission_id)): Path<(i64, i64)>,
    Json(input): Json<ProcessSubmissionInput>,
) -> Result<Json<ProcessSubmissionResponse>, ApiError> {
    let college_id = state.college_in(&tenant, college_id).await?;
    let status = state
        .form_service
        .process(college_id, submission_id, input)
        .await?;
    Ok(Json(ProcessSubmissionResponse { status }))
}
