//! Program API endpoints
//!
//! - GET/POST /api/v1/colleges/{id}/programs
//! - PUT/DELETE /api/v1/colleges/{id}/programs/{pid}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, Tenant};
use crate::models::{CreateProgramInput, Program, UpdateProgramInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_programs).post(create_program))
        .route("/{program_id}", put(update_program).delete(delete_program))
}

async fn list_programs(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(college_id): Path<i64>,
) -> Result<Json<Vec<Program>>, ApiError> {
    let college_id = state.college_in(&tenant, college_id).await?;
    Ok(Json(state.program_service.list(college_id).await?))
}

async fn create_program(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(college_id): Path<i64>,
    Json(input): Json<CreateProgramInput>,
) -> Result<(StatusCode, Json<Program>), ApiError> {
    let college_id = state.college_in(&tenant, college_id).await?;
    let program = state.program_service.create(college_id, input).await?;
    Ok((StatusCode::CREATED, Json(program)))
}

async fn update_program(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((college_id, program_id)): Path<(i64, i64)>,
    Json(input): Json<UpdateProgramInput>,
) -> Result<Json<Program>, ApiError> {
    let college_id = state.college_in(&tenant, college_id).await?;
    Ok(Json(state.program_service.update(college_id, program_id, input).await?))
}

async fn delete_program(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((college_id, program_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    let college_id = state.college_in(&tenant, college_id).await?;
    state.program_service.delete(college_id, program_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
