//! College repository

use crate::db::DynDatabasePool;
use crate::models::{College, CollegeSummary, CollegeType};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

use super::{from_json_column, to_json_column};

/// College repository trait
#[async_trait]
pub trait CollegeRepository: Send + Sync {
    /// Create a new college
    async fn create(&self, college: &College) -> Result<College>;

    /// Get college by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<College>>;

    /// List colleges of a university, ordered by name
    async fn list_by_university(&self, university_id: i64) -> Result<Vec<CollegeSummary>>;

    /// Check whether a slug is already used inside a university
    async fn exists_by_slug(&self, university_id: i64, slug: &str) -> Result<bool>;
}

/// SQLx-based college repository implementation
pub struct SqlxCollegeRepository {
    pool: DynDatabasePool,
}

impl SqlxCollegeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CollegeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CollegeRepository for SqlxCollegeRepository {
    async fn create(&self, college: &College) -> Result<College> {
        create_college_sqlite(self.pool.sqlite(), college).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<College>> {
        let row = sqlx::query(
            r#"
            SELECT id, university_id, name, slug, college_type, sections, gallery_images,
                collage_leaders, created_at, updated_at
            FROM colleges
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get college by ID")?;

        row.as_ref().map(row_to_college_sqlite).transpose()
    }

    async fn list_by_university(&self, university_id: i64) -> Result<Vec<CollegeSummary>> {
        let rows = sqlx::query(
            "SELECT id, name, slug, college_type FROM colleges WHERE university_id = ? ORDER BY name",
        )
        .bind(university_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list colleges")?;

        let mut colleges = Vec::with_capacity(rows.len());
        for row in rows {
            let college_type: String = row.get("college_type");
            colleges.push(CollegeSummary {
                id: row.get("id"),
                name: row.get("name"),
                slug: row.get("slug"),
                college_type: CollegeType::from_str(&college_type)?,
            });
        }
        Ok(colleges)
    }

    async fn exists_by_slug(&self, university_id: i64, slug: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM colleges WHERE university_id = ? AND slug = ?")
            .bind(university_id)
            .bind(slug)
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to check college slug")?;
        let count: i64 = row.get("cnt");
        Ok(count > 0)
    }
}

async fn create_college_sqlite(pool: &SqlitePool, college: &College) -> Result<College> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO colleges (university_id, name, slug, college_type, sections, gallery_images,
            collage_leaders, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(college.university_id)
    .bind(&college.name)
    .bind(&college.slug)
    .bind(college.college_type.to_string())
    .bind(to_json_column(&college.sections, "sections")?)
    .bind(to_json_column(&college.gallery_images, "gallery_images")?)
    .bind(to_json_column(&college.collage_leaders, "collage_leaders")?)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create college")?;

    Ok(College {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..college.clone()
    })
}

fn row_to_college_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<College> {
    let college_type: String = row.get("college_type");
    let sections: String = row.get("sections");
    let gallery_images: String = row.get("gallery_images");
    let collage_leaders: String = row.get("collage_leaders");

    Ok(College {
        id: row.get("id"),
        university_id: row.get("university_id"),
        name: row.get("name"),
        slug: row.get("slug"),
        college_type: CollegeType::from_str(&college_type)?,
        sections: from_json_column(&sections, "sections")?,
        gallery_images: from_json_column(&gallery_images, "gallery_images")?,
        collage_leaders: from_json_column(&collage_leaders, "collage_leaders")?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
