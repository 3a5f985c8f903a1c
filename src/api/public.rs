//! Public read endpoints
//!
//! Rendered content for the public site; no tenant header or token needed.
//! - GET /api/v1/public/colleges/{id}
//! - GET /api/v1/public/colleges/{id}/faq
//! - GET /api/v1/public/colleges/{id}/programs/{slug}

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::services::{PublicCollege, PublicFaq, PublicProgram};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/colleges/{college_id}", get(get_college))
        .route("/colleges/{college_id}/faq", get(get_faq))
        .route("/colleges/{college_id}/programs/{slug}", get(get_program))
}

async fn get_college(
    State(state): State<AppState>,
    Path(college_id): Path<i64>,
) -> Result<Json<PublicCollege>, ApiError> {
    let college = state
        .university_service
        .public_college(college_id, &state.renderer)
        .await?;
    Ok(Json(college))
}

async fn get_faq(
    State(state): State<AppState>,
    Path(college_id): Path<i64>,
) -> Result<Json<PublicFaq>, ApiError> {
    Ok(Json(state.faq_service.public(college_id).await?))
}

async fn get_program(
    State(state): State<AppState>,
    Path((college_id, slug)): Path<(i64, String)>,
) -> Result<Json<PublicProgram>, ApiError> {
    Ok(Json(state.program_service.public(college_id, &slug).await?))
}
