//! FAQ repository
//!
//! A college has at most one FAQ row; its items are kept in `item_order`.

use crate::db::DynDatabasePool;
use crate::models::{Faq, FaqItem, FaqPair};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::sync::Arc;

/// FAQ repository trait
#[async_trait]
pub trait FaqRepository: Send + Sync {
    /// Get the FAQ of a college, with items in order
    async fn get_by_college(&self, college_id: i64) -> Result<Option<Faq>>;

    /// Get the FAQ of a college, creating an empty one if missing
    async fn get_or_create(&self, college_id: i64) -> Result<Faq>;

    /// Update FAQ title and description
    async fn update_meta(&self, faq_id: i64, title: &str, description: Option<&str>) -> Result<()>;

    /// Link the "collect questions" form
    async fn set_form(&self, faq_id: i64, form_id: Option<i64>) -> Result<()>;

    /// Append an item; `order` defaults to after the last item
    async fn add_item(&self, faq_id: i64, question: &str, answer: &str, order: Option<i32>) -> Result<FaqItem>;

    /// Append many items in a single transaction, preserving input order
    async fn bulk_add_items(&self, faq_id: i64, items: &[FaqPair]) -> Result<Vec<FaqItem>>;

    async fn get_item(&self, item_id: i64) -> Result<Option<FaqItem>>;

    async fn update_item(&self, item: &FaqItem) -> Result<FaqItem>;

    async fn delete_item(&self, item_id: i64) -> Result<()>;
}

/// SQLx-based FAQ repository implementation
pub struct SqlxFaqRepository {
    pool: DynDatabasePool,
}

impl SqlxFaqRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FaqRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FaqRepository for SqlxFaqRepository {
    async fn get_by_college(&self, college_id: i64) -> Result<Option<Faq>> {
        get_faq_by_college_sqlite(self.pool.sqlite(), college_id).await
    }

    async fn get_or_create(&self, college_id: i64) -> Result<Faq> {
        let pool = self.pool.sqlite();
        sqlx::query("INSERT OR IGNORE INTO faqs (college_id, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(college_id)
            .bind(Utc::now())
            .bind(Utc::now())
            .execute(pool)
            .await
            .context("Failed to create FAQ")?;

        get_faq_by_college_sqlite(pool, college_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("FAQ missing after insert for college {}", college_id))
    }

    async fn update_meta(&self, faq_id: i64, title: &str, description: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE faqs SET title = ?, description = ?, updated_at = ? WHERE id = ?")
            .bind(title)
            .bind(description)
            .bind(Utc::now())
            .bind(faq_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update FAQ")?;
        Ok(())
    }

    async fn set_form(&self, faq_id: i64, form_id: Option<i64>) -> Result<()> {
        sqlx::query("UPDATE faqs SET form_id = ?, updated_at = ? WHERE id = ?")
            .bind(form_id)
            .bind(Utc::now())
            .bind(faq_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to link FAQ form")?;
        Ok(())
    }

    async fn add_item(&self, faq_id: i64, question: &str, answer: &str, order: Option<i32>) -> Result<FaqItem> {
        let mut conn = self
            .pool
            .sqlite()
            .acquire()
            .await
            .context("Failed to acquire connection")?;
        let order = match order {
            Some(order) => order,
            None => next_item_order(&mut conn, faq_id).await?,
        };
        insert_item(&mut conn, faq_id, question, answer, order).await
    }

    async fn bulk_add_items(&self, faq_id: i64, items: &[FaqPair]) -> Result<Vec<FaqItem>> {
        let mut tx = self
            .pool
            .sqlite()
            .begin()
            .await
            .context("Failed to begin transaction")?;
        let created = insert_items_tx(&mut tx, faq_id, items).await?;
        tx.commit().await.context("Failed to commit FAQ items")?;
        Ok(created)
    }

    async fn get_item(&self, item_id: i64) -> Result<Option<FaqItem>> {
        let row = sqlx::query(
            r#"
            SELECT id, faq_id, question, answer, item_order, created_at, updated_at
            FROM faq_items
            WHERE id = ?
            "#,
        )
        .bind(item_id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get FAQ item")?;

        Ok(row.as_ref().map(row_to_item_sqlite))
    }

    async fn update_item(&self, item: &FaqItem) -> Result<FaqItem> {
        let now = Utc::now();
        sqlx::query("UPDATE faq_items SET question = ?, answer = ?, item_order = ?, updated_at = ? WHERE id = ?")
            .bind(&item.question)
            .bind(&item.answer)
            .bind(item.order)
            .bind(now)
            .bind(item.id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update FAQ item")?;

        Ok(FaqItem {
            updated_at: now,
            ..item.clone()
        })
    }

    async fn delete_item(&self, item_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM faq_items WHERE id = ?")
            .bind(item_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete FAQ item")?;
        Ok(())
    }
}

/// Append items after the current last item, on an open connection or transaction.
pub(crate) async fn insert_items_tx(
    conn: &mut SqliteConnection,
    faq_id: i64,
    items: &[FaqPair],
) -> Result<Vec<FaqItem>> {
    let mut order = next_item_order(conn, faq_id).await?;
    let mut created = Vec::with_capacity(items.len());
    for pair in items {
        created.push(insert_item(conn, faq_id, &pair.question, &pair.answer, order).await?);
        order += 1;
    }
    Ok(created)
}

async fn next_item_order(conn: &mut SqliteConnection, faq_id: i64) -> Result<i32> {
    let row = sqlx::query("SELECT COALESCE(MAX(item_order) + 1, 0) AS next_order FROM faq_items WHERE faq_id = ?")
        .bind(faq_id)
        .fetch_one(&mut *conn)
        .await
        .context("Failed to compute next FAQ item order")?;
    let next: i64 = row.get("next_order");
    Ok(next as i32)
}

async fn insert_item(
    conn: &mut SqliteConnection,
    faq_id: i64,
    question: &str,
    answer: &str,
    order: i32,
) -> Result<FaqItem> {
    let mut item = FaqItem::new(faq_id, question.to_string(), answer.to_string(), order);
    let result = sqlx::query(
        r#"
        INSERT INTO faq_items (faq_id, question, answer, item_order, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(faq_id)
    .bind(&item.question)
    .bind(&item.answer)
    .bind(order)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(&mut *conn)
    .await
    .context("Failed to create FAQ item")?;

    item.id = result.last_insert_rowid();
    Ok(item)
}

async fn get_faq_by_college_sqlite(pool: &SqlitePool, college_id: i64) -> Result<Option<Faq>> {
    let row = sqlx::query("SELECT id, college_id, title, description, form_id FROM faqs WHERE college_id = ?")
        .bind(college_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get FAQ")?;

    let Some(row) = row else {
        return Ok(None);
    };
    let faq_id: i64 = row.get("id");

    let item_rows = sqlx::query(
        r#"
        SELECT id, faq_id, question, answer, item_order, created_at, updated_at
        FROM faq_items
        WHERE faq_id = ?
        ORDER BY item_order, id
        "#,
    )
    .bind(faq_id)
    .fetch_all(pool)
    .await
    .context("Failed to list FAQ items")?;

    Ok(Some(Faq {
        id: faq_id,
        college_id: row.get("college_id"),
        title: row.get("title"),
        description: row.get("description"),
        form_id: row.get("form_id"),
        items: item_rows.iter().map(row_to_item_sqlite).collect(),
    }))
}

fn row_to_item_sqlite(row: &sqlx::sqlite::SqliteRow) -> FaqItem {
    FaqItem {
        id: row.get("id"),
        faq_id: row.get("faq_id"),
        question: row.get("question"),
        answer: row.get("answer"),
        order: row.get("item_order"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
