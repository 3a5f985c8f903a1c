//! FAQ service
//!
//! FAQ metadata and item management for a college, plus the rendered
//! public view. Every write drops the cached public FAQ.

use crate::cache::{keys, CacheLayer, MemoryCache};
use crate::db::repositories::FaqRepository;
use crate::models::{CreateFaqItemInput, Faq, FaqItem, FaqPair, UpdateFaqInput, UpdateFaqItemInput};
use crate::services::markdown::{MarkdownRenderer, RenderedMarkdown, TocEntry};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum FaqServiceError {
    #[error("FAQ item not found: {0}")]
    ItemNotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Public FAQ with answers rendered to HTML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicFaq {
    pub title: String,
    pub description: Option<String>,
    /// One entry per question, in display order
    pub toc: Vec<TocEntry>,
    pub items: Vec<PublicFaqItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicFaqItem {
    pub id: i64,
    /// Anchor id referenced from the TOC
    pub anchor: String,
    pub question: String,
    pub answer: RenderedMarkdown,
}

pub struct FaqService {
    repo: Arc<dyn FaqRepository>,
    renderer: Arc<MarkdownRenderer>,
    cache: Arc<MemoryCache>,
}

impl FaqService {
    pub fn new(repo: Arc<dyn FaqRepository>, renderer: Arc<MarkdownRenderer>, cache: Arc<MemoryCache>) -> Self {
        Self { repo, renderer, cache }
    }

    /// Get the FAQ of a college; an empty FAQ is created on first access
    pub async fn get(&self, college_id: i64) -> Result<Faq, FaqServiceError> {
        self.repo
            .get_or_create(college_id)
            .await
            .context("Failed to load FAQ")
            .map_err(Into::into)
    }

    pub async fn update(&self, college_id: i64, input: UpdateFaqInput) -> Result<Faq, FaqServiceError> {
        let faq = self.get(college_id).await?;

        let title = match input.title {
            Some(title) => {
                let title = title.trim().to_string();
                if title.is_empty() {
                    return Err(FaqServiceError::ValidationError("FAQ title cannot be empty".to_string()));
                }
                title
            }
            None => faq.title.clone(),
        };
        let description = match input.description {
            Some(d) if d.trim().is_empty() => None,
            Some(d) => Some(d),
            None => faq.description.clone(),
        };

        self.repo
            .update_meta(faq.id, &title, description.as_deref())
            .await
            .context("Failed to update FAQ")?;
        self.invalidate(college_id).await;
        self.get(college_id).await
    }

    pub async fn create_item(&self, college_id: i64, input: CreateFaqItemInput) -> Result<FaqItem, FaqServiceError> {
        let (question, answer) = validate_pair(&input.question, &input.answer)?;
        let faq = self.get(college_id).await?;
        let item = self
            .repo
            .add_item(faq.id, &question, &answer, input.order)
            .await
            .context("Failed to create FAQ item")?;
        self.invalidate(college_id).await;
        Ok(item)
    }

    /// Append many items at once, as produced by the importer
    pub async fn bulk_create(&self, college_id: i64, items: Vec<FaqPair>) -> Result<Vec<FaqItem>, FaqServiceError> {
        if items.is_empty() {
            return Err(FaqServiceError::ValidationError("No FAQ items to import".to_string()));
        }
        let pairs = items
            .iter()
            .enumerate()
            .map(|(i, pair)| {
                validate_pair(&pair.question, &pair.answer)
                    .map(|(question, answer)| FaqPair { question, answer })
                    .map_err(|_| FaqServiceError::ValidationError(format!("Row {} is missing a question or answer", i + 1)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let faq = self.get(college_id).await?;
        let created = self
            .repo
            .bulk_add_items(faq.id, &pairs)
            .await
            .context("Failed to import FAQ items")?;
        self.invalidate(college_id).await;

        tracing::info!(college_id, count = created.len(), "Imported FAQ items");
        Ok(created)
    }

    pub async fn update_item(
        &self,
        college_id: i64,
        item_id: i64,
        input: UpdateFaqItemInput,
    ) -> Result<FaqItem, FaqServiceError> {
        let mut item = self.item_in(college_id, item_id).await?;
        let question = input.question.unwrap_or_else(|| item.question.clone());
        let answer = input.answer.unwrap_or_else(|| item.answer.clone());
        let (question, answer) = validate_pair(&question, &answer)?;
        item.question = question;
        item.answer = answer;
        if let Some(order) = input.order {
            item.order = order;
        }

        let saved = self
            .repo
            .update_item(&item)
            .await
            .context("Failed to update FAQ item")?;
        self.invalidate(college_id).await;
        Ok(saved)
    }

    pub async fn delete_item(&self, college_id: i64, item_id: i64) -> Result<(), FaqServiceError> {
        self.item_in(college_id, item_id).await?;
        self.repo
            .delete_item(item_id)
            .await
            .context("Failed to delete FAQ item")?;
        self.invalidate(college_id).await;
        Ok(())
    }

    /// Public, rendered FAQ through the cache
    pub async fn public(&self, college_id: i64) -> Result<PublicFaq, FaqServiceError> {
        let key = keys::public_faq(college_id);
        if let Ok(Some(cached)) = self.cache.get::<PublicFaq>(&key).await {
            return Ok(cached);
        }

        let faq = self
            .repo
            .get_by_college(college_id)
            .await
            .context("Failed to load FAQ")?;
        let public = match faq {
            Some(faq) => self.render(faq),
            None => PublicFaq {
                title: "Frequently Asked Questions".to_string(),
                description: None,
                toc: Vec::new(),
                items: Vec::new(),
            },
        };

        if let Err(e) = self.cache.set(&key, &public, self.cache.default_ttl()).await {
            tracing::warn!("Failed to cache FAQ for college {}: {}", college_id, e);
        }
        Ok(public)
    }

    fn render(&self, faq: Faq) -> PublicFaq {
        let items: Vec<PublicFaqItem> = faq
            .items
            .into_iter()
            .map(|item| PublicFaqItem {
                anchor: format!("faq-{}", item.id),
                answer: self.renderer.render_with_toc(&item.answer, None),
                id: item.id,
                question: item.question,
            })
            .collect();
        let toc = items
            .iter()
            .map(|item| TocEntry {
                level: 2,
                text: item.question.clone(),
                id: item.anchor.clone(),
            })
            .collect();

        PublicFaq {
            title: faq.title,
            description: faq.description,
            toc,
            items,
        }
    }

    async fn item_in(&self, college_id: i64, item_id: i64) -> Result<FaqItem, FaqServiceError> {
        let faq = self.get(college_id).await?;
        match self.repo.get_item(item_id).await.context("Failed to get FAQ item")? {
            Some(item) if item.faq_id == faq.id => Ok(item),
            _ => Err(FaqServiceError::ItemNotFound(item_id)),
        }
    }

    pub(crate) async fn invalidate(&self, college_id: i64) {
        if let Err(e) = self.cache.delete(&keys::public_faq(college_id)).await {
            tracing::warn!("Failed to invalidate FAQ cache for college {}: {}", college_id, e);
        }
    }
}

fn validate_pair(question: &str, answer: &str) -> Result<(String, String), FaqServiceError> {
    let question = question.trim();
    let answer = answer.trim();
    if question.is_empty() {
        return Err(FaqServiceError::ValidationError("Question cannot be empty".to_string()));
    }
    if answer.is_empty() {
        return Err(FaqServiceError::ValidationError("Answer cannot be empty".to_string()));
    }
    Ok((question.to_string(), answer.to_string()))
}
