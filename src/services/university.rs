//! University service
//!
//! Tenant profile reads, the staged edit/delete flows, and college
//! management. Every mutation invalidates the cached profile.

use crate::cache::{keys, CacheLayer, MemoryCache};
use crate::db::repositories::{CollegeRepository, UniversityRepository};
use crate::models::{
    delete_confirmation_phrase, College, CollegeSummary, CollegeType, CreateCollegeInput,
    CreateUniversityInput, DeleteStep, DeleteUniversityRequest, DeleteUniversityResponse, EditStep,
    EditUniversityRequest, EditUniversityResponse, MemberRole, SectionType, University,
};
use crate::services::markdown::{compact_view, CompactView, MarkdownRenderer, RenderedMarkdown};
use crate::services::verification::{VerificationError, VerificationService, VerifiedAction};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum UniversityServiceError {
    #[error("University not found: {0}")]
    NotFound(String),

    #[error("College not found: {0}")]
    CollegeNotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Slug already exists: {0}")]
    SlugExists(String),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// College profile as shown on the public site
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicCollege {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub college_type: CollegeType,
    pub sections: Vec<PublicCollegeSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicCollegeSection {
    pub id: String,
    pub section_type: SectionType,
    pub title: String,
    pub summary: CompactView,
    pub content: RenderedMarkdown,
}

pub struct UniversityService {
    universities: Arc<dyn UniversityRepository>,
    colleges: Arc<dyn CollegeRepository>,
    verification: Arc<VerificationService>,
    cache: Arc<MemoryCache>,
}

impl UniversityService {
    pub fn new(
        universities: Arc<dyn UniversityRepository>,
        colleges: Arc<dyn CollegeRepository>,
        verification: Arc<VerificationService>,
        cache: Arc<MemoryCache>,
    ) -> Self {
        Self {
            universities,
            colleges,
            verification,
            cache,
        }
    }

    /// Get a university with its college summaries, through the cache
    pub async fn get_by_slug(&self, slug: &str) -> Result<University, UniversityServiceError> {
        let key = keys::university(slug);
        if let Ok(Some(cached)) = self.cache.get::<University>(&key).await {
            return Ok(cached);
        }

        let mut university = self.load(slug).await?;
        university.colleges = self
            .colleges
            .list_by_university(university.id)
            .await
            .context("Failed to list colleges")?;

        if let Err(e) = self.cache.set(&key, &university, self.cache.default_ttl()).await {
            tracing::warn!("Failed to cache university {}: {}", slug, e);
        }
        Ok(university)
    }

    /// Create a university tenant, optionally with an owner member
    pub async fn create(&self, input: CreateUniversityInput) -> Result<University, UniversityServiceError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(UniversityServiceError::ValidationError("University name cannot be empty".to_string()));
        }
        let slug = generate_slug(&input.slug);
        if slug.is_empty() {
            return Err(UniversityServiceError::ValidationError("University slug cannot be empty".to_string()));
        }
        if self
            .universities
            .exists_by_slug_excluding(&slug, None)
            .await
            .context("Failed to check slug")?
        {
            return Err(UniversityServiceError::SlugExists(slug));
        }

        let mut university = University::new(name.to_string(), slug);
        university.logo_url = input.logo_url;
        university.description = input.description;
        let created = self
            .universities
            .create(&university)
            .await
            .context("Failed to create university")?;

        if let Some(email) = input.owner_email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            self.universities
                .add_member(created.id, email, MemberRole::Owner)
                .await
                .context("Failed to add owner")?;
        }

        tracing::info!(university = %created.slug, "Created university");
        Ok(created)
    }

    /// Staged edit: `request` issues a code, `verify` checks it and applies the update
    pub async fn edit(
        &self,
        tenant: &str,
        request: EditUniversityRequest,
    ) -> Result<EditUniversityResponse, UniversityServiceError> {
        let current = self.load(tenant).await?;

        let name = request.name.trim();
        if name.is_empty() {
            return Err(UniversityServiceError::ValidationError("University name cannot be empty".to_string()));
        }
        let slug = generate_slug(&request.slug);
        if slug.is_empty() {
            return Err(UniversityServiceError::ValidationError("University slug cannot be empty".to_string()));
        }
        if slug != current.slug
            && self
                .universities
                .exists_by_slug_excluding(&slug, Some(current.id))
                .await
                .context("Failed to check slug")?
        {
            return Err(UniversityServiceError::SlugExists(slug));
        }

        match request.verification_step {
            EditStep::Request => {
                let code = self
                    .verification
                    .issue(current.id, &current.name, VerifiedAction::EditUniversity)
                    .await?;
                Ok(EditUniversityResponse {
                    verification_code: code,
                    university: None,
                    message: "Verification code sent".to_string(),
                })
            }
            EditStep::Verify => {
                let code = required_code(request.verification_code.as_deref())?;
                self.verification
                    .verify(current.id, VerifiedAction::EditUniversity, code)
                    .await?;

                let mut updated = current.clone();
                updated.name = name.to_string();
                updated.slug = slug;
                if request.logo_url.is_some() {
                    updated.logo_url = request.logo_url;
                }
                if request.description.is_some() {
                    updated.description = request.description;
                }
                if let Some(news_items) = request.news_items {
                    updated.news_items = news_items;
                }

                let saved = self
                    .universities
                    .update(&updated)
                    .await
                    .context("Failed to update university")?;
                self.invalidate(&current.slug).await;
                self.invalidate(&saved.slug).await;

                tracing::info!(university = %saved.slug, "University updated after verification");
                let university = self.get_by_slug(&saved.slug).await?;
                Ok(EditUniversityResponse {
                    verification_code: None,
                    university: Some(university),
                    message: "University updated".to_string(),
                })
            }
        }
    }

    /// Staged delete: `initiate` issues a code with impact stats, `verify`
    /// checks the code, `confirm` checks the typed phrase and deletes.
    pub async fn delete(
        &self,
        tenant: &str,
        request: DeleteUniversityRequest,
    ) -> Result<DeleteUniversityResponse, UniversityServiceError> {
        let current = self.load(tenant).await?;

        match request.verification_step {
            DeleteStep::Initiate => {
                let stats = self
                    .universities
                    .impact_stats(current.id)
                    .await
                    .context("Failed to compute impact stats")?
                    .ok_or_else(|| UniversityServiceError::NotFound(tenant.to_string()))?;
                let code = self
                    .verification
                    .issue(current.id, &current.name, VerifiedAction::DeleteUniversity)
                    .await?;
                Ok(DeleteUniversityResponse {
                    verification_code: code,
                    university: Some(stats),
                    message: "Verification code sent".to_string(),
                })
            }
            DeleteStep::Verify => {
                let code = required_code(request.verification_code.as_deref())?;
                self.verification
                    .verify(current.id, VerifiedAction::DeleteUniversity, code)
                    .await?;
                self.verification
                    .mark_verified(current.id, VerifiedAction::DeleteUniversity)
                    .await?;
                Ok(DeleteUniversityResponse {
                    message: "Verification successful".to_string(),
                    ..Default::default()
                })
            }
            DeleteStep::Confirm => {
                let expected = delete_confirmation_phrase(&current.name);
                if request.final_confirmation.as_deref() != Some(expected.as_str()) {
                    return Err(UniversityServiceError::ValidationError(format!(
                        "Type \"{}\" to confirm",
                        expected
                    )));
                }
                self.verification
                    .consume_verified(current.id, VerifiedAction::DeleteUniversity)
                    .await?;

                let college_ids: Vec<i64> = self
                    .colleges
                    .list_by_university(current.id)
                    .await
                    .context("Failed to list colleges")?
                    .iter()
                    .map(|c| c.id)
                    .collect();

                self.universities
                    .delete(current.id)
                    .await
                    .context("Failed to delete university")?;

                self.invalidate(&current.slug).await;
                for id in college_ids {
                    if let Err(e) = self.cache.delete_pattern(&keys::college_pattern(id)).await {
                        tracing::warn!("Failed to invalidate college {} cache: {}", id, e);
                    }
                }

                tracing::warn!(university = %current.slug, "University deleted");
                Ok(DeleteUniversityResponse {
                    message: "University deleted".to_string(),
                    ..Default::default()
                })
            }
        }
    }

    pub async fn list_colleges(&self, tenant: &str) -> Result<Vec<CollegeSummary>, UniversityServiceError> {
        let university = self.load(tenant).await?;
        self.colleges
            .list_by_university(university.id)
            .await
            .context("Failed to list colleges")
            .map_err(Into::into)
    }

    pub async fn create_college(
        &self,
        tenant: &str,
        input: CreateCollegeInput,
    ) -> Result<College, UniversityServiceError> {
        let university = self.load(tenant).await?;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(UniversityServiceError::ValidationError("College name cannot be empty".to_string()));
        }
        let slug = generate_slug(input.slug.as_deref().unwrap_or(name));
        if slug.is_empty() {
            return Err(UniversityServiceError::ValidationError("College slug cannot be empty".to_string()));
        }
        if self
            .colleges
            .exists_by_slug(university.id, &slug)
            .await
            .context("Failed to check college slug")?
        {
            return Err(UniversityServiceError::SlugExists(slug));
        }

        let mut college = College::new(university.id, name.to_string(), slug, input.college_type);
        college.sections = input.sections;
        let created = self
            .colleges
            .create(&college)
            .await
            .context("Failed to create college")?;
        self.invalidate(&university.slug).await;
        Ok(created)
    }

    /// Resolve a college id inside the tenant; colleges of other tenants are not found
    pub async fn college_in(&self, tenant: &str, college_id: i64) -> Result<College, UniversityServiceError> {
        let university = self.load(tenant).await?;
        match self
            .colleges
            .get_by_id(college_id)
            .await
            .context("Failed to get college")?
        {
            Some(college) if college.university_id == university.id => Ok(college),
            _ => Err(UniversityServiceError::CollegeNotFound(college_id)),
        }
    }

    /// College with its sections rendered in display order
    pub async fn public_college(
        &self,
        college_id: i64,
        renderer: &MarkdownRenderer,
    ) -> Result<PublicCollege, UniversityServiceError> {
        let college = self
            .colleges
            .get_by_id(college_id)
            .await
            .context("Failed to get college")?
            .ok_or(UniversityServiceError::CollegeNotFound(college_id))?;

        let sections = college
            .ordered_sections()
            .into_iter()
            .map(|s| PublicCollegeSection {
                id: s.id.clone(),
                section_type: s.section_type,
                title: s.title.clone(),
                summary: compact_view(&s.content),
                content: renderer.render_with_toc(&s.content, None),
            })
            .collect();

        Ok(PublicCollege {
            id: college.id,
            name: college.name,
            slug: college.slug,
            college_type: college.college_type,
            sections,
        })
    }

    async fn load(&self, slug: &str) -> Result<University, UniversityServiceError> {
        self.universities
            .get_by_slug(slug)
            .await
            .context("Failed to get university")?
            .ok_or_else(|| UniversityServiceError::NotFound(slug.to_string()))
    }

    async fn invalidate(&self, slug: &str) {
        if let Err(e) = self.cache.delete(&keys::university(slug)).await {
            tracing::warn!("Failed to invalidate university cache {}: {}", slug, e);
        }
    }
}

fn required_code(code: Option<&str>) -> Result<&str, UniversityServiceError> {
    code.map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| UniversityServiceError::ValidationError("Verification code is required".to_string()))
}

/// Generate a URL-friendly slug
pub fn generate_slug(name: &str) -> String {
    let slug: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();

    let mut result = String::with_capacity(slug.len());
    let mut prev_hyphen = true;
    for c in slug.chars() {
        if c == '-' {
            if !prev_hyphen {
                result.push(c);
            }
            prev_hyphen = true;
        } else {
            result.push(c);
            prev_hyphen = false;
        }
    }

    result.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerificationConfig;
    use crate::db::repositories::{SqlxCollegeRepository, SqlxUniversityRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::CollegeSection;

    async fn create_test_service() -> UniversityService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        UniversityService::new(
            SqlxUniversityRepository::boxed(pool.clone()),
            SqlxCollegeRepository::boxed(pool),
            Arc::new(VerificationService::new(&VerificationConfig::default())),
            Arc::new(MemoryCache::new()),
        )
    }

    async fn seed(service: &UniversityService) -> University {
        service
            .create(CreateUniversityInput {
                name: "North".to_string(),
                slug: "north".to_string(),
                owner_email: Some("owner@north.edu".to_string()),
                logo_url: None,
                description: None,
            })
            .await
            .unwrap()
    }

    fn edit_request(name: &str, step: EditStep, code: Option<String>) -> EditUniversityRequest {
        EditUniversityRequest {
            name: name.to_string(),
            slug: "north".to_string(),
            logo_url: None,
            description: Some("Updated".to_string()),
            news_items: None,
            verification_step: step,
            verification_code: code,
        }
    }

    fn delete_request(step: DeleteStep, code: Option<String>, phrase: Option<&str>) -> DeleteUniversityRequest {
        DeleteUniversityRequest {
            verification_step: step,
            verification_code: code,
            final_confirmation: phrase.map(str::to_string),
        }
    }

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("North State University"), "north-state-university");
        assert_eq!(generate_slug("  Arts & Design!  "), "arts-design");
        assert_eq!(generate_slug("---"), "");
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_slug() {
        let service = create_test_service().await;
        seed(&service).await;
        let err = service
            .create(CreateUniversityInput {
                name: "Other".to_string(),
                slug: "North".to_string(),
                owner_email: None,
                logo_url: None,
                description: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, UniversityServiceError::SlugExists(_)));
    }

    #[tokio::test]
    async fn test_edit_request_then_verify() {
        let service = create_test_service().await;
        seed(&service).await;

        let issued = service
            .edit("north", edit_request("North State", EditStep::Request, None))
            .await
            .unwrap();
        let code = issued.verification_code.unwrap();

        // Not applied until verified
        assert_eq!(service.get_by_slug("north").await.unwrap().name, "North");

        let done = service
            .edit("north", edit_request("North State", EditStep::Verify, Some(code)))
            .await
            .unwrap();
        assert_eq!(done.university.unwrap().name, "North State");
        assert_eq!(service.get_by_slug("north").await.unwrap().name, "North State");
    }

    #[tokio::test]
    async fn test_edit_verify_with_wrong_code() {
        let service = create_test_service().await;
        seed(&service).await;
        let code = service
            .edit("north", edit_request("North State", EditStep::Request, None))
            .await
            .unwrap()
            .verification_code
            .unwrap();
        let wrong = if code == "111111" { "222222" } else { "111111" };

        let err = service
            .edit("north", edit_request("North State", EditStep::Verify, Some(wrong.to_string())))
            .await
            .unwrap_err();
        assert!(matches!(err, UniversityServiceError::Verification(VerificationError::InvalidCode)));
        assert_eq!(service.get_by_slug("north").await.unwrap().name, "North");
    }

    #[tokio::test]
    async fn test_edit_rejects_empty_name() {
        let service = create_test_service().await;
        seed(&service).await;
        let err = service
            .edit("north", edit_request("   ", EditStep::Request, None))
            .await
            .unwrap_err();
        assert!(matches!(err, UniversityServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_delete_full_flow() {
        let service = create_test_service().await;
        let uni = seed(&service).await;
        service
            .create_college("north", CreateCollegeInput {
                name: "Arts".to_string(),
                slug: None,
                college_type: CollegeType::Arts,
                sections: vec![],
            })
            .await
            .unwrap();

        let initiated = service
            .delete("north", delete_request(DeleteStep::Initiate, None, None))
            .await
            .unwrap();
        let stats = initiated.university.unwrap();
        assert_eq!(stats.name, "North");
        assert_eq!(stats.colleges_count, 1);
        assert_eq!(stats.total_users, 1);

        let code = initiated.verification_code.unwrap();
        service
            .delete("north", delete_request(DeleteStep::Verify, Some(code), None))
            .await
            .unwrap();

        let err = service
            .delete("north", delete_request(DeleteStep::Confirm, None, Some("delete North")))
            .await
            .unwrap_err();
        assert!(matches!(err, UniversityServiceError::ValidationError(_)));

        service
            .delete("north", delete_request(DeleteStep::Confirm, None, Some(&delete_confirmation_phrase(&uni.name))))
            .await
            .unwrap();
        assert!(matches!(
            service.get_by_slug("north").await,
            Err(UniversityServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_confirm_requires_verify() {
        let service = create_test_service().await;
        seed(&service).await;
        service
            .delete("north", delete_request(DeleteStep::Initiate, None, None))
            .await
            .unwrap();

        let err = service
            .delete("north", delete_request(DeleteStep::Confirm, None, Some("DELETE North")))
            .await
            .unwrap_err();
        assert!(matches!(err, UniversityServiceError::Verification(VerificationError::NotVerified)));
        assert!(service.get_by_slug("north").await.is_ok());
    }

    #[tokio::test]
    async fn test_college_scoped_to_tenant() {
        let service = create_test_service().await;
        seed(&service).await;
        service
            .create(CreateUniversityInput {
                name: "South".to_string(),
                slug: "south".to_string(),
                owner_email: None,
                logo_url: None,
                description: None,
            })
            .await
            .unwrap();
        let college = service
            .create_college("north", CreateCollegeInput {
                name: "Medicine".to_string(),
                slug: None,
                college_type: CollegeType::Medical,
                sections: vec![],
            })
            .await
            .unwrap();

        assert!(service.college_in("north", college.id).await.is_ok());
        assert!(matches!(
            service.college_in("south", college.id).await,
            Err(UniversityServiceError::CollegeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_college_creation_invalidates_profile() {
        let service = create_test_service().await;
        seed(&service).await;
        assert!(service.get_by_slug("north").await.unwrap().colleges.is_empty());

        service
            .create_college("north", CreateCollegeInput {
                name: "Arts".to_string(),
                slug: None,
                college_type: CollegeType::Arts,
                sections: vec![],
            })
            .await
            .unwrap();
        assert_eq!(service.get_by_slug("north").await.unwrap().colleges.len(), 1);
    }

    #[tokio::test]
    async fn test_public_college_renders_sections_in_order() {
        let service = create_test_service().await;
        seed(&service).await;
        let section = |id: &str, title: &str, content: &str, order: i32| CollegeSection {
            id: id.to_string(),
            section_type: SectionType::Custom,
            title: title.to_string(),
            content: content.to_string(),
            order,
        };
        let college = service
            .create_college("north", CreateCollegeInput {
                name: "Arts".to_string(),
                slug: None,
                college_type: CollegeType::Arts,
                sections: vec![
                    section("b", "Clubs", "Weekly meetups.", 2),
                    section("a", "About", "# Welcome\n\nA college of *arts*.", 1),
                ],
            })
            .await
            .unwrap();

        let public = service
            .public_college(college.id, &MarkdownRenderer::new())
            .await
            .unwrap();
        assert_eq!(public.sections[0].id, "a");
        assert_eq!(public.sections[0].summary.title.as_deref(), Some("Welcome"));
        assert!(public.sections[0].content.html.contains(r#"<h1 id="welcome">"#));
        assert_eq!(public.sections[1].summary.title, None);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn slug_has_no_edge_or_double_hyphens(name in "[A-Za-z0-9 &_.-]{0,40}") {
                let slug = generate_slug(&name);
                prop_assert!(!slug.starts_with('-'));
                prop_assert!(!slug.ends_with('-'));
                prop_assert!(!slug.contains("--"));
                prop_assert_eq!(generate_slug(&slug), slug.clone());
            }
        }
    }
}
