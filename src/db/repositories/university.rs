//! University repository
//!
//! Database operations for university tenants and their members.

use crate::db::DynDatabasePool;
use crate::models::{ImpactStats, MemberRole, University};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use super::{from_json_column, to_json_column};

/// University repository trait
#[async_trait]
pub trait UniversityRepository: Send + Sync {
    /// Create a new university
    async fn create(&self, university: &University) -> Result<University>;

    /// Get university by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<University>>;

    /// Get university by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<University>>;

    /// Update an existing university
    async fn update(&self, university: &University) -> Result<University>;

    /// Delete a university; colleges, programs, forms and FAQs cascade
    async fn delete(&self, id: i64) -> Result<()>;

    /// Check whether a slug is taken by another university
    async fn exists_by_slug_excluding(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Add a member to a university
    async fn add_member(&self, university_id: i64, email: &str, role: MemberRole) -> Result<()>;

    /// Counts of what deleting the university would destroy
    async fn impact_stats(&self, id: i64) -> Result<Option<ImpactStats>>;
}

/// SQLx-based university repository implementation
pub struct SqlxUniversityRepository {
    pool: DynDatabasePool,
}

impl SqlxUniversityRepository {
    /// Create a new SQLx university repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UniversityRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UniversityRepository for SqlxUniversityRepository {
    async fn create(&self, university: &University) -> Result<University> {
        create_university_sqlite(self.pool.sqlite(), university).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<University>> {
        get_university_by_id_sqlite(self.pool.sqlite(), id).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<University>> {
        get_university_by_slug_sqlite(self.pool.sqlite(), slug).await
    }

    async fn update(&self, university: &University) -> Result<University> {
        update_university_sqlite(self.pool.sqlite(), university).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM universities WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete university")?;
        Ok(())
    }

    async fn exists_by_slug_excluding(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM universities WHERE slug = ? AND id != ?")
            .bind(slug)
            .bind(exclude_id.unwrap_or(0))
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to check university slug")?;
        let count: i64 = row.get("cnt");
        Ok(count > 0)
    }

    async fn add_member(&self, university_id: i64, email: &str, role: MemberRole) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO university_members (university_id, email, role, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (university_id, email) DO UPDATE SET role = excluded.role
            "#,
        )
        .bind(university_id)
        .bind(email)
        .bind(role.to_string())
        .bind(Utc::now())
        .execute(self.pool.sqlite())
        .await
        .context("Failed to add university member")?;
        Ok(())
    }

    async fn impact_stats(&self, id: i64) -> Result<Option<ImpactStats>> {
        impact_stats_sqlite(self.pool.sqlite(), id).await
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

const UNIVERSITY_COLUMNS: &str =
    "id, name, slug, logo_url, description, news_items, social_media, content, created_at, updated_at";

async fn create_university_sqlite(pool: &SqlitePool, university: &University) -> Result<University> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO universities (name, slug, logo_url, description, news_items, social_media, content, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&university.name)
    .bind(&university.slug)
    .bind(&university.logo_url)
    .bind(&university.description)
    .bind(to_json_column(&university.news_items, "news_items")?)
    .bind(to_json_column(&university.social_media, "social_media")?)
    .bind(to_json_column(&university.content, "content")?)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create university")?;

    Ok(University {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        colleges: Vec::new(),
        ..university.clone()
    })
}

async fn get_university_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<University>> {
    let query = format!("SELECT {} FROM universities WHERE id = ?", UNIVERSITY_COLUMNS);
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get university by ID")?;

    row.as_ref().map(row_to_university_sqlite).transpose()
}

async fn get_university_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<University>> {
    let query = format!("SELECT {} FROM universities WHERE slug = ?", UNIVERSITY_COLUMNS);
    let row = sqlx::query(&query)
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get university by slug")?;

    row.as_ref().map(row_to_university_sqlite).transpose()
}

async fn update_university_sqlite(pool: &SqlitePool, university: &University) -> Result<University> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE universities
        SET name = ?, slug = ?, logo_url = ?, description = ?, news_items = ?,
            social_media = ?, content = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&university.name)
    .bind(&university.slug)
    .bind(&university.logo_url)
    .bind(&university.description)
    .bind(to_json_column(&university.news_items, "news_items")?)
    .bind(to_json_column(&university.social_media, "social_media")?)
    .bind(to_json_column(&university.content, "content")?)
    .bind(now)
    .bind(university.id)
    .execute(pool)
    .await
    .context("Failed to update university")?;

    Ok(University {
        updated_at: now,
        ..university.clone()
    })
}

async fn impact_stats_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<ImpactStats>> {
    let row = sqlx::query(
        r#"
        SELECT u.name,
            (SELECT COUNT(*) FROM colleges c WHERE c.university_id = u.id) AS colleges_count,
            (SELECT COUNT(*) FROM university_members m WHERE m.university_id = u.id) AS total_users,
            (SELECT COUNT(*) FROM form_sections f
                JOIN colleges c ON f.college_id = c.id
                WHERE c.university_id = u.id) AS total_forms
        FROM universities u
        WHERE u.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to compute university impact stats")?;

    Ok(row.map(|row| ImpactStats {
        name: row.get("name"),
        colleges_count: row.get("colleges_count"),
        total_users: row.get("total_users"),
        total_forms: row.get("total_forms"),
    }))
}

fn row_to_university_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<University> {
    let news_items: String = row.get("news_items");
    let social_media: String = row.get("social_media");
    let content: String = row.get("content");

    Ok(University {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        logo_url: row.get("logo_url"),
        description: row.get("description"),
        news_items: from_json_column(&news_items, "news_items")?,
        social_media: from_json_column(&social_media, "social_media")?,
        content: from_json_column(&content, "content")?,
        colleges: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
