//! FAQ model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// FAQ of a college, with its items in display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faq {
    pub id: i64,
    pub college_id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Linked "collect questions" form
    pub form_id: Option<i64>,
    #[serde(default)]
    pub items: Vec<FaqItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqItem {
    pub id: i64,
    pub faq_id: i64,
    pub question: String,
    /// Markdown answer
    pub answer: String,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FaqItem {
    pub fn new(faq_id: i64, question: String, answer: String, order: i32) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            faq_id,
            question,
            answer,
            order,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A question/answer pair, as produced by the importer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqPair {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFaqInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFaqItemInput {
    pub question: String,
    pub answer: String,
    /// Appended after the last item when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFaqItemInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkCreateFaqItemsInput {
    pub items: Vec<FaqPair>,
}
