//! Program repository

use crate::db::DynDatabasePool;
use crate::models::Program;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use super::{from_json_column, to_json_column};

#[async_trait]
pub trait ProgramRepository: Send + Sync {
    async fn create(&self, program: &Program) -> Result<Program>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Program>>;

    async fn get_by_slug(&self, college_id: i64, slug: &str) -> Result<Option<Program>>;

    /// List programs of a college, ordered by name
    async fn list_by_college(&self, college_id: i64) -> Result<Vec<Program>>;

    async fn update(&self, program: &Program) -> Result<Program>;

    async fn delete(&self, id: i64) -> Result<()>;
}

pub struct SqlxProgramRepository {
    pool: DynDatabasePool,
}

impl SqlxProgramRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ProgramRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ProgramRepository for SqlxProgramRepository {
    async fn create(&self, program: &Program) -> Result<Program> {
        create_program_sqlite(self.pool.sqlite(), program).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Program>> {
        let row = sqlx::query(
            "SELECT id, college_id, name, slug, description, created_at, updated_at FROM programs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get program by ID")?;

        row.as_ref().map(row_to_program_sqlite).transpose()
    }

    async fn get_by_slug(&self, college_id: i64, slug: &str) -> Result<Option<Program>> {
        let row = sqlx::query(
            r#"
            SELECT id, college_id, name, slug, description, created_at, updated_at
            FROM programs
            WHERE college_id = ? AND slug = ?
            "#,
        )
        .bind(college_id)
        .bind(slug)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get program by slug")?;

        row.as_ref().map(row_to_program_sqlite).transpose()
    }

    async fn list_by_college(&self, college_id: i64) -> Result<Vec<Program>> {
        let rows = sqlx::query(
            r#"
            SELECT id, college_id, name, slug, description, created_at, updated_at
            FROM programs
            WHERE college_id = ?
            ORDER BY name
            "#,
        )
        .bind(college_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list programs")?;

        rows.iter().map(row_to_program_sqlite).collect()
    }

    async fn update(&self, program: &Program) -> Result<Program> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE programs SET name = ?, slug = ?, description = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&program.name)
        .bind(&program.slug)
        .bind(to_json_column(&program.description, "description")?)
        .bind(now)
        .bind(program.id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update program")?;

        Ok(Program {
            updated_at: now,
            ..program.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM programs WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete program")?;
        Ok(())
    }
}

async fn create_program_sqlite(pool: &SqlitePool, program: &Program) -> Result<Program> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO programs (college_id, name, slug, description, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(program.college_id)
    .bind(&program.name)
    .bind(&program.slug)
    .bind(to_json_column(&program.description, "description")?)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create program")?;

    Ok(Program {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..program.clone()
    })
}

fn row_to_program_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Program> {
    let description: String = row.get("description");
    Ok(Program {
        id: row.get("id"),
        college_id: row.get("college_id"),
        name: row.get("name"),
        slug: row.get("slug"),
        description: from_json_column(&description, "description")?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::ProgramDescription;

    async fn setup() -> (SqlxProgramRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        let sqlite = pool.sqlite();
        let uni_id = sqlx::query("INSERT INTO universities (name, slug) VALUES ('North', 'north')")
            .execute(sqlite)
            .await
            .unwrap()
            .last_insert_rowid();
        let college_id = sqlx::query("INSERT INTO colleges (university_id, name, slug) VALUES (?, 'Arts', 'arts')")
            .bind(uni_id)
            .execute(sqlite)
            .await
            .unwrap()
            .last_insert_rowid();
        (SqlxProgramRepository::new(pool), college_id)
    }

    fn description() -> Vec<ProgramDescription> {
        vec![ProgramDescription {
            title: "Overview".into(),
            body: "# Painting\nFour years.".into(),
            images: vec![],
            links: vec![],
            videos: vec![],
        }]
    }

    #[tokio::test]
    async fn test_program_crud() {
        let (repo, college_id) = setup().await;
        let created = repo
            .create(&Program::new(college_id, "Painting".into(), "painting".into(), description()))
            .await
            .unwrap();

        let by_slug = repo.get_by_slug(college_id, "painting").await.unwrap().unwrap();
        assert_eq!(by_slug.id, created.id);
        assert_eq!(by_slug.description, description());

        let mut changed = by_slug.clone();
        changed.name = "Fine Painting".into();
        repo.update(&changed).await.unwrap();
        assert_eq!(repo.get_by_id(created.id).await.unwrap().unwrap().name, "Fine Painting");

        repo.delete(created.id).await.unwrap();
        assert!(repo.list_by_college(college_id).await.unwrap().is_empty());
    }
}
