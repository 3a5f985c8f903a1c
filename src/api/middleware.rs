//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error envelope and service error mapping
//! - Tenant extraction from the `X-University` header
//! - Admin bearer token check
//! - Cache headers for public responses

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::UploadConfig;
use crate::services::{
    FaqService, FaqServiceError, FormService, FormServiceError, MarkdownRenderer, ProgramService,
    ProgramServiceError, UniversityService, UniversityServiceError, VerificationError,
};

/// Header carrying the tenant (university slug)
pub const TENANT_HEADER: &str = "x-university";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub university_service: Arc<UniversityService>,
    pub faq_service: Arc<FaqService>,
    pub form_service: Arc<FormService>,
    pub program_service: Arc<ProgramService>,
    pub renderer: Arc<MarkdownRenderer>,
    pub upload_config: Arc<UploadConfig>,
    /// Bearer token required on admin routes, when set
    pub admin_token: Option<Arc<str>>,
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    fn internal(err: anyhow::Error) -> Self {
        tracing::error!("Request failed: {:#}", err);
        Self::internal_error("Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<VerificationError> for ApiError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::InternalError(e) => Self::internal(e),
            other => Self::validation_error(other.to_string()),
        }
    }
}

impl From<UniversityServiceError> for ApiError {
    fn from(err: UniversityServiceError) -> Self {
        match err {
            UniversityServiceError::NotFound(_) | UniversityServiceError::CollegeNotFound(_) => {
                Self::not_found(err.to_string())
            }
            UniversityServiceError::ValidationError(msg) => Self::validation_error(msg),
            UniversityServiceError::SlugExists(slug) => Self::with_details(
                "CONFLICT",
                "Slug already exists",
                serde_json::json!({ "slug": slug }),
            ),
            UniversityServiceError::Verification(e) => e.into(),
            UniversityServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<FaqServiceError> for ApiError {
    fn from(err: FaqServiceError) -> Self {
        match err {
            FaqServiceError::ItemNotFound(_) => Self::not_found(err.to_string()),
            FaqServiceError::ValidationError(msg) => Self::validation_error(msg),
            FaqServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<FormServiceError> for ApiError {
    fn from(err: FormServiceError) -> Self {
        match err {
            FormServiceError::FormNotFound(_) | FormServiceError::SubmissionNotFound(_) => {
                Self::not_found(err.to_string())
            }
            FormServiceError::ValidationError(msg) => Self::validation_error(msg),
            FormServiceError::AlreadyResolved => Self::conflict(err.to_string()),
            FormServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<ProgramServiceError> for ApiError {
    fn from(err: ProgramServiceError) -> Self {
        match err {
            ProgramServiceError::NotFound(_) => Self::not_found(err.to_string()),
            ProgramServiceError::SlugExists(_) => Self::conflict(err.to_string()),
            ProgramServiceError::ValidationError(msg) => Self::validation_error(msg),
            ProgramServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

/// Tenant slug taken from the `X-University` header
#[derive(Debug, Clone)]
pub struct Tenant(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Tenant {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(TENANT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Tenant(s.to_string()))
            .ok_or_else(|| ApiError::validation_error("Missing X-University header"))
    }
}

impl AppState {
    /// Resolve a college id inside the tenant
    pub async fn college_in(&self, tenant: &Tenant, college_id: i64) -> Result<i64, ApiError> {
        let college = self.university_service.college_in(&tenant.0, college_id).await?;
        Ok(college.id)
    }
}

/// Extract a bearer token from the Authorization header
fn extract_bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Admin authorization middleware; open when no token is configured
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.admin_token.as_deref() {
        match extract_bearer_token(&request) {
            None => return Err(ApiError::unauthorized("Missing authentication token")),
            Some(token) if token != expected => {
                tracing::warn!(path = %request.uri().path(), "Rejected admin token");
                return Err(ApiError::forbidden("Invalid admin token"));
            }
            Some(_) => {}
        }
    }
    Ok(next.run(request).await)
}

/// Build Cache-Control header for API responses
pub fn cache_control_api(max_age: u32, stale_while_revalidate: Option<u32>) -> String {
    match stale_while_revalidate {
        Some(swr) => format!("public, max-age={}, stale-while-revalidate={}", max_age, swr),
        None => format!("public, max-age={}", max_age),
    }
}

/// Middleware to add cache headers to successful public responses
pub async fn add_public_cache_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    if response.status().is_success() {
        if let Ok(value) = HeaderValue::from_str(&cache_control_api(60, Some(300))) {
            response.headers_mut().insert(header::CACHE_CONTROL, value);
        }
    }
    response
}
