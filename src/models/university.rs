//! University model and the staged edit/delete wire types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::CollegeType;

/// University (tenant) profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct University {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub logo_url: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub news_items: Vec<NewsItem>,
    /// Platform name to profile URL
    #[serde(default)]
    pub social_media: BTreeMap<String, String>,
    #[serde(default)]
    pub content: UniversityContent,
    #[serde(default)]
    pub colleges: Vec<CollegeSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl University {
    pub fn new(name: String, slug: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name,
            slug,
            logo_url: None,
            description: None,
            news_items: Vec::new(),
            social_media: BTreeMap::new(),
            content: UniversityContent::default(),
            colleges: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityContent {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(default)]
    pub admission_terms: Option<String>,
    #[serde(default)]
    pub objectives: Option<String>,
}

/// College entry embedded in the university response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollegeSummary {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub college_type: CollegeType,
}

/// Member role within a university
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Admin,
    Editor,
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owner => write!(f, "owner"),
            Self::Admin => write!(f, "admin"),
            Self::Editor => write!(f, "editor"),
        }
    }
}

/// Input for creating a university tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUniversityInput {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub owner_email: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Stage of the university edit flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditStep {
    Request,
    Verify,
}

/// Body of `POST /uni/edit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditUniversityRequest {
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news_items: Option<Vec<NewsItem>>,
    pub verification_step: EditStep,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditUniversityResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub university: Option<University>,
    #[serde(default)]
    pub message: String,
}

/// Stage of the university delete flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteStep {
    Initiate,
    Verify,
    Confirm,
}

/// Body of `POST /uni/delete`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUniversityRequest {
    pub verification_step: DeleteStep,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_confirmation: Option<String>,
}

/// Text the user must type to confirm deleting a university
pub fn delete_confirmation_phrase(university_name: &str) -> String {
    format!("DELETE {}", university_name)
}

/// What a delete would destroy, shown as a deterrent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactStats {
    pub name: String,
    pub colleges_count: i64,
    pub total_users: i64,
    pub total_forms: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUniversityResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub university: Option<ImpactStats>,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_request_wire_format() {
        let request = EditUniversityRequest {
            name: "North".to_string(),
            slug: "north".to_string(),
            logo_url: Some("https://cdn.example.edu/logo.png".to_string()),
            description: None,
            news_items: None,
            verification_step: EditStep::Request,
            verification_code: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["verificationStep"], "request");
        assert_eq!(json["logoUrl"], "https://cdn.example.edu/logo.png");
        assert!(json.get("verificationCode").is_none());
    }

    #[test]
    fn test_delete_confirmation_phrase() {
        assert_eq!(delete_confirmation_phrase("North State"), "DELETE North State");
    }

    #[test]
    fn test_delete_initiate_response_parses() {
        let body = r#"{
            "verificationCode": "123456",
            "university": {"name": "X", "collegesCount": 3, "totalUsers": 120, "totalForms": 8}
        }"#;
        let response: DeleteUniversityResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.verification_code.as_deref(), Some("123456"));
        let stats = response.university.unwrap();
        assert_eq!(stats.colleges_count, 3);
        assert_eq!(stats.total_users, 120);
        assert_eq!(stats.total_forms, 8);
    }
}
