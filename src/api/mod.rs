//! API layer - HTTP handlers and routing
//!
//! All routes live under `/api/v1`:
//! - Tenant administration (`/uni`, `/colleges/{id}/...`, `/upload`),
//!   behind the admin token when one is configured
//! - Public form submission (`/forms/{id}/submit`)
//! - Public rendered content (`/public/...`)

pub mod faq;
pub mod forms;
pub mod middleware;
pub mod programs;
pub mod public;
pub mod university;
pub mod upload;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cache::create_cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxCollegeRepository, SqlxFaqRepository, SqlxFormRepository, SqlxProgramRepository,
    SqlxUniversityRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    FaqService, FormService, MarkdownRenderer, ProgramService, UniversityService, VerificationService,
};

pub use middleware::{ApiError, AppState, Tenant, TENANT_HEADER};

/// Wire repositories, cache and services into the shared state
pub fn create_state(pool: DynDatabasePool, config: &Config) -> AppState {
    let cache = create_cache(&config.cache);
    let renderer = Arc::new(MarkdownRenderer::new());
    let faq_repo = SqlxFaqRepository::boxed(pool.clone());

    let university_service = UniversityService::new(
        SqlxUniversityRepository::boxed(pool.clone()),
        SqlxCollegeRepository::boxed(pool.clone()),
        Arc::new(VerificationService::new(&config.verification)),
        cache.clone(),
    );
    let faq_service = FaqService::new(faq_repo.clone(), renderer.clone(), cache.clone());
    let form_service = FormService::new(SqlxFormRepository::boxed(pool.clone()), faq_repo, cache.clone());
    let program_service = ProgramService::new(SqlxProgramRepository::boxed(pool), renderer.clone(), cache);

    AppState {
        university_service: Arc::new(university_service),
        faq_service: Arc::new(faq_service),
        form_service: Arc::new(form_service),
        program_service: Arc::new(program_service),
        renderer,
        upload_config: Arc::new(config.upload.clone()),
        admin_token: config
            .server
            .admin_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(Arc::from),
    }
}

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let admin_routes = Router::new()
        .nest("/uni", university::router())
        .nest("/colleges/{college_id}/faq", faq::router())
        .nest("/colleges/{college_id}/programs", programs::router())
        .nest("/upload", upload::router(state.upload_config.max_file_size))
        .route_layer(axum_middleware::from_fn_with_state(state, middleware::require_admin));

    let public_routes = Router::new()
        .nest("/public", public::router())
        .route_layer(axum_middleware::from_fn(middleware::add_public_cache_headers));

    Router::new()
        .nest("/forms", forms::router())
        .merge(public_routes)
        .merge(admin_routes)
}

fn cors_layer(cors_origin: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(TENANT_HEADER),
        ]);

    if cors_origin == "*" {
        return base.allow_origin(Any);
    }
    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => base.allow_origin(origin),
        Err(_) => {
            tracing::warn!("Invalid CORS origin {:?}, cross-origin requests disabled", cors_origin);
            base
        }
    }
}

/// Build the complete router with middleware; uploaded files are served
/// from `upload.path` under `upload.public_prefix`.
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let mut router = Router::new().nest("/api/v1", build_api_router(state.clone()));

    let prefix = state.upload_config.public_prefix.trim_matches('/');
    if prefix.is_empty() {
        tracing::warn!("upload.public_prefix is empty, uploaded files are not served");
    } else {
        router = router.nest_service(&format!("/{}", prefix), ServeDir::new(&state.upload_config.path));
    }

    router
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
