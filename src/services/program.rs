//! Program service

use crate::cache::{keys, CacheLayer, MemoryCache};
use crate::db::repositories::ProgramRepository;
use crate::models::{CreateProgramInput, Program, ProgramLink, UpdateProgramInput};
use crate::services::markdown::{MarkdownRenderer, RenderedMarkdown};
use crate::services::university::generate_slug;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ProgramServiceError {
    #[error("Program not found: {0}")]
    NotFound(String),

    #[error("Program slug already exists: {0}")]
    SlugExists(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Program as shown on the public site
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProgram {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub sections: Vec<PublicProgramSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProgramSection {
    pub title: String,
    pub body: RenderedMarkdown,
    pub images: Vec<String>,
    pub links: Vec<ProgramLink>,
    pub videos: Vec<String>,
}

pub struct ProgramService {
    repo: Arc<dyn ProgramRepository>,
    renderer: Arc<MarkdownRenderer>,
    cache: Arc<MemoryCache>,
}

impl ProgramService {
    pub fn new(repo: Arc<dyn ProgramRepository>, renderer: Arc<MarkdownRenderer>, cache: Arc<MemoryCache>) -> Self {
        Self { repo, renderer, cache }
    }

    /// List programs of a college (cached)
    pub async fn list(&self, college_id: i64) -> Result<Vec<Program>, ProgramServiceError> {
        let key = keys::programs(college_id);
        if let Ok(Some(cached)) = self.cache.get::<Vec<Program>>(&key).await {
            return Ok(cached);
        }

        let programs = self
            .repo
            .list_by_college(college_id)
            .await
            .context("Failed to list programs")?;
        if let Err(e) = self.cache.set(&key, &programs, self.cache.default_ttl()).await {
            tracing::warn!("Failed to cache programs for college {}: {}", college_id, e);
        }
        Ok(programs)
    }

    pub async fn create(&self, college_id: i64, input: CreateProgramInput) -> Result<Program, ProgramServiceError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ProgramServiceError::ValidationError("Program name cannot be empty".to_string()));
        }
        let slug = self.resolve_slug(college_id, input.slug.as_deref(), &name, None).await?;

        let program = Program::new(college_id, name, slug, input.description);
        let created = self.repo.create(&program).await.context("Failed to create program")?;
        self.invalidate(college_id).await;
        Ok(created)
    }

    pub async fn update(
        &self,
        college_id: i64,
        program_id: i64,
        input: UpdateProgramInput,
    ) -> Result<Program, ProgramServiceError> {
        let mut program = self.program_in(college_id, program_id).await?;

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ProgramServiceError::ValidationError("Program name cannot be empty".to_string()));
            }
            program.name = name;
        }
        if let Some(slug) = input.slug {
            program.slug = self
                .resolve_slug(college_id, Some(&slug), &program.name, Some(program.id))
                .await?;
        }
        if let Some(description) = input.description {
            program.description = description;
        }

        let updated = self.repo.update(&program).await.context("Failed to update program")?;
        self.invalidate(college_id).await;
        Ok(updated)
    }

    pub async fn delete(&self, college_id: i64, program_id: i64) -> Result<(), ProgramServiceError> {
        self.program_in(college_id, program_id).await?;
        self.repo.delete(program_id).await.context("Failed to delete program")?;
        self.invalidate(college_id).await;
        Ok(())
    }

    /// Program by slug with every description block rendered
    pub async fn public(&self, college_id: i64, slug: &str) -> Result<PublicProgram, ProgramServiceError> {
        let program = self
            .repo
            .get_by_slug(college_id, slug)
            .await
            .context("Failed to get program")?
            .ok_or_else(|| ProgramServiceError::NotFound(slug.to_string()))?;

        let sections = program
            .description
            .into_iter()
            .map(|d| PublicProgramSection {
                body: self.renderer.render_with_toc(&d.body, None),
                title: d.title,
                images: d.images,
                links: d.links,
                videos: d.videos,
            })
            .collect();

        Ok(PublicProgram {
            id: program.id,
            name: program.name,
            slug: program.slug,
            sections,
        })
    }

    async fn resolve_slug(
        &self,
        college_id: i64,
        requested: Option<&str>,
        name: &str,
        exclude_id: Option<i64>,
    ) -> Result<String, ProgramServiceError> {
        let slug = match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => generate_slug(s),
            None => generate_slug(name),
        };
        if slug.is_empty() {
            return Err(ProgramServiceError::ValidationError("Program slug cannot be empty".to_string()));
        }

        let existing = self
            .repo
            .get_by_slug(college_id, &slug)
            .await
            .context("Failed to check program slug")?;
        match existing {
            Some(p) if Some(p.id) != exclude_id => Err(ProgramServiceError::SlugExists(slug)),
            _ => Ok(slug),
        }
    }

    async fn program_in(&self, college_id: i64, program_id: i64) -> Result<Program, ProgramServiceError> {
        match self.repo.get_by_id(program_id).await.context("Failed to get program")? {
            Some(p) if p.college_id == college_id => Ok(p),
            _ => Err(ProgramServiceError::NotFound(program_id.to_string())),
        }
    }

    async fn invalidate(&self, college_id: i64) {
        if let Err(e) = self.cache.delete(&keys::programs(college_id)).await {
            tracing::warn!("Failed to invalidate programs cache for college {}: {}", college_id, e);
        }
    }
}
