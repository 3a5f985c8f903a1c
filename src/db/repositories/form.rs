//! Form repository
//!
//! Form sections, their submissions, and the review transitions.

use crate::db::DynDatabasePool;
use crate::models::{
    FaqPair, FormPurpose, FormSection, FormSubmission, SubmissionDetail, SubmissionStatus,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqliteConnection};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use super::faq::insert_items_tx;
use super::{from_json_column, to_json_column};

/// Form repository trait
#[async_trait]
pub trait FormRepository: Send + Sync {
    async fn create_form(&self, form: &FormSection) -> Result<FormSection>;

    async fn get_form(&self, form_id: i64) -> Result<Option<FormSection>>;

    /// List forms of a college, newest first
    async fn list_forms(&self, college_id: i64) -> Result<Vec<FormSection>>;

    /// Store a new pending submission
    async fn create_submission(&self, form_id: i64, data: &BTreeMap<String, String>) -> Result<FormSubmission>;

    /// Get a submission with its form title and fields
    async fn get_submission(&self, submission_id: i64) -> Result<Option<SubmissionDetail>>;

    /// List submissions of a form with the given status, oldest first
    async fn list_submissions(&self, form_id: i64, status: SubmissionStatus) -> Result<Vec<SubmissionDetail>>;

    async fn count_submissions(&self, form_id: i64, status: SubmissionStatus) -> Result<i64>;

    /// Mark a pending submission rejected. Returns false if it was already resolved.
    async fn reject_submission(&self, submission_id: i64) -> Result<bool>;

    /// Append FAQ items and mark a pending submission approved, atomically.
    /// Returns false, writing nothing, if it was already resolved.
    async fn approve_submission(&self, submission_id: i64, faq_id: i64, items: &[FaqPair]) -> Result<bool>;
}

/// SQLx-based form repository implementation
pub struct SqlxFormRepository {
    pool: DynDatabasePool,
}

impl SqlxFormRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FormRepository> {
        Arc::new(Self::new(pool))
    }
}

const SUBMISSION_DETAIL_QUERY: &str = r#"
    SELECT s.id, s.form_section_id, s.data, s.status, s.submitted_at, s.resolved_at,
        f.title AS form_title, f.fields AS form_fields
    FROM form_submissions s
    JOIN form_sections f ON s.form_section_id = f.id
"#;

#[async_trait]
impl FormRepository for SqlxFormRepository {
    async fn create_form(&self, form: &FormSection) -> Result<FormSection> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO form_sections (college_id, title, purpose, fields, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(form.college_id)
        .bind(&form.title)
        .bind(form.purpose.to_string())
        .bind(to_json_column(&form.fields, "fields")?)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create form")?;

        Ok(FormSection {
            id: result.last_insert_rowid(),
            created_at: now,
            ..form.clone()
        })
    }

    async fn get_form(&self, form_id: i64) -> Result<Option<FormSection>> {
        let row = sqlx::query(
            "SELECT id, college_id, title, purpose, fields, created_at FROM form_sections WHERE id = ?",
        )
        .bind(form_id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get form")?;

        row.as_ref().map(row_to_form_sqlite).transpose()
    }

    async fn list_forms(&self, college_id: i64) -> Result<Vec<FormSection>> {
        let rows = sqlx::query(
            r#"
            SELECT id, college_id, title, purpose, fields, created_at
            FROM form_sections
            WHERE college_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(college_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list forms")?;

        rows.iter().map(row_to_form_sqlite).collect()
    }

    async fn create_submission(&self, form_id: i64, data: &BTreeMap<String, String>) -> Result<FormSubmission> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO form_submissions (form_section_id, data, status, submitted_at) VALUES (?, ?, ?, ?)",
        )
        .bind(form_id)
        .bind(to_json_column(data, "data")?)
        .bind(SubmissionStatus::Pending.to_string())
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create submission")?;

        Ok(FormSubmission {
            id: result.last_insert_rowid(),
            form_section_id: form_id,
            data: data.clone(),
            status: SubmissionStatus::Pending,
            submitted_at: now,
            resolved_at: None,
        })
    }

    async fn get_submission(&self, submission_id: i64) -> Result<Option<SubmissionDetail>> {
        let query = format!("{} WHERE s.id = ?", SUBMISSION_DETAIL_QUERY);
        let row = sqlx::query(&query)
            .bind(submission_id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get submission")?;

        row.as_ref().map(row_to_submission_detail_sqlite).transpose()
    }

    async fn list_submissions(&self, form_id: i64, status: SubmissionStatus) -> Result<Vec<SubmissionDetail>> {
        let query = format!(
            "{} WHERE s.form_section_id = ? AND s.status = ? ORDER BY s.submitted_at, s.id",
            SUBMISSION_DETAIL_QUERY
        );
        let rows = sqlx::query(&query)
            .bind(form_id)
            .bind(status.to_string())
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list submissions")?;

        rows.iter().map(row_to_submission_detail_sqlite).collect()
    }

    async fn count_submissions(&self, form_id: i64, status: SubmissionStatus) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM form_submissions WHERE form_section_id = ? AND status = ?")
            .bind(form_id)
            .bind(status.to_string())
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count submissions")?;
        Ok(row.get("cnt"))
    }

    async fn reject_submission(&self, submission_id: i64) -> Result<bool> {
        let mut conn = self
            .pool
            .sqlite()
            .acquire()
            .await
            .context("Failed to acquire connection")?;
        resolve_pending(&mut conn, submission_id, SubmissionStatus::Rejected).await
    }

    async fn approve_submission(&self, submission_id: i64, faq_id: i64, items: &[FaqPair]) -> Result<bool> {
        let mut tx = self
            .pool
            .sqlite()
            .begin()
            .await
            .context("Failed to begin transaction")?;

        if !resolve_pending(&mut tx, submission_id, SubmissionStatus::Approved).await? {
            tx.rollback().await.context("Failed to roll back approval")?;
            return Ok(false);
        }
        insert_items_tx(&mut tx, faq_id, items).await?;
        tx.commit().await.context("Failed to commit approval")?;
        Ok(true)
    }
}

/// Move a submission out of PENDING; only the first resolver wins.
async fn resolve_pending(conn: &mut SqliteConnection, submission_id: i64, status: SubmissionStatus) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE form_submissions SET status = ?, resolved_at = ? WHERE id = ? AND status = 'PENDING'",
    )
    .bind(status.to_string())
    .bind(Utc::now())
    .bind(submission_id)
    .execute(&mut *conn)
    .await
    .context("Failed to resolve submission")?;

    Ok(result.rows_affected() == 1)
}

fn row_to_form_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<FormSection> {
    let purpose: String = row.get("purpose");
    let fields: String = row.get("fields");
    Ok(FormSection {
        id: row.get("id"),
        college_id: row.get("college_id"),
        title: row.get("title"),
        purpose: FormPurpose::from_str(&purpose)?,
        fields: from_json_column(&fields, "fields")?,
        created_at: row.get("created_at"),
    })
}

fn row_to_submission_detail_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<SubmissionDetail> {
    let data: String = row.get("data");
    let status: String = row.get("status");
    let fields: String = row.get("form_fields");
    Ok(SubmissionDetail {
        submission: FormSubmission {
            id: row.get("id"),
            form_section_id: row.get("form_section_id"),
            data: from_json_column(&data, "data")?,
            status: SubmissionStatus::from_str(&status)?,
            submitted_at: row.get("submitted_at"),
            resolved_at: row.get("resolved_at"),
        },
        form_title: row.get("form_title"),
        fields: from_json_column(&fields, "fields")?,
    })
}
