//! University API endpoints
//!
//! - GET  /api/v1/uni - Tenant university with college summaries
//! - POST /api/v1/uni - Create a university tenant
//! - POST /api/v1/uni/edit - Staged edit (`request`, `verify`)
//! - POST /api/v1/uni/delete - Staged delete (`initiate`, `verify`, `confirm`)
//! - GET/POST /api/v1/uni/colleges - List/create colleges

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, Tenant};
use crate::models::{
    College, CollegeSummary, CreateCollegeInput, CreateUniversityInput, DeleteUniversityRequest,
    DeleteUniversityResponse, EditUniversityRequest, EditUniversityResponse, University,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_university).post(create_university))
        .route("/edit", post(edit_university))
        .route("/delete", post(delete_university))
        .route("/colleges", get(list_colleges).post(create_college))
}

/// GET /api/v1/uni
async fn get_university(
    State(state): State<AppState>,
    tenant: Tenant,
) -> Result<Json<University>, ApiError> {
    let university = state.university_service.get_by_slug(&tenant.0).await?;
    Ok(Json(university))
}

/// POST /api/v1/uni
async fn create_university(
    State(state): State<AppState>,
    Json(input): Json<CreateUniversityInput>,
) -> Result<(StatusCode, Json<University>), ApiError> {
    let university = state.university_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(university)))
}

/// POST /api/v1/uni/edit
async fn edit_university(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(request): Json<EditUniversityRequest>,
) -> Result<Json<EditUniversityResponse>, ApiError> {
    let response = state.university_service.edit(&tenant.0, request).await?;
    Ok(Json(response))
}

/// POST /api/v1/uni/delete
async fn delete_university(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(request): Json<DeleteUniversityRequest>,
) -> Result<Json<DeleteUniversityResponse>, ApiError> {
    let response = state.university_service.delete(&tenant.0, request).await?;
    Ok(Json(response))
}

async fn list_colleges(
    State(state): State<AppState>,
    tenant: Tenant,
) -> Result<Json<Vec<CollegeSummary>>, ApiError> {
    let colleges = state.university_service.list_colleges(&tenant.0).await?;
    Ok(Json(colleges))
}

async fn create_college(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(input): Json<CreateCollegeInput>,
) -> Result<(StatusCode, Json<College>), ApiError> {
    let college = state.university_service.create_college(&tenant.0, input).await?;
    Ok((StatusCode::CREATED, Json(college)))
}
