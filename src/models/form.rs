//! Form sections and submissions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Text,
    Textarea,
    Email,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub id: String,
    pub label: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
}

/// What a form is used for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormPurpose {
    #[default]
    General,
    /// Collects questions from the public for the FAQ
    FaqQuestions,
}

impl std::fmt::Display for FormPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::General => write!(f, "GENERAL"),
            Self::FaqQuestions => write!(f, "FAQ_QUESTIONS"),
        }
    }
}

impl std::str::FromStr for FormPurpose {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GENERAL" => Ok(Self::General),
            "FAQ_QUESTIONS" => Ok(Self::FaqQuestions),
            _ => Err(anyhow::anyhow!("Invalid form purpose: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSection {
    pub id: i64,
    pub college_id: i64,
    pub title: String,
    pub purpose: FormPurpose,
    #[serde(default)]
    pub fields: Vec<FormField>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

impl std::str::FromStr for SubmissionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(anyhow::anyhow!("Invalid submission status: {}", s)),
        }
    }
}

/// An end-user submission of a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmission {
    pub id: i64,
    pub form_section_id: i64,
    /// Field id to submitted text
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl FormSubmission {
    pub fn is_resolved(&self) -> bool {
        self.status != SubmissionStatus::Pending
    }
}

/// A submission together with the form fields it answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDetail {
    #[serde(flatten)]
    pub submission: FormSubmission,
    pub form_title: String,
    #[serde(default)]
    pub fields: Vec<FormField>,
}

impl SubmissionDetail {
    /// Submitted entries in form-field order; unknown field ids follow.
    pub fn answers_in_order(&self) -> Vec<(&str, &str)> {
        let mut ordered: Vec<(&str, &str)> = self
            .fields
            .iter()
            .filter_map(|f| {
                self.submission
                    .data
                    .get(&f.id)
                    .map(|v| (f.label.as_str(), v.as_str()))
            })
            .collect();
        for (id, value) in &self.submission.data {
            if !self.fields.iter().any(|f| &f.id == id) {
                ordered.push((id.as_str(), value.as_str()));
            }
        }
        ordered
    }

    /// Field ids whose submitted text is a question to be answered
    pub fn question_field_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .fields
            .iter()
            .filter(|f| self.submission.data.get(&f.id).is_some_and(|v| !v.trim().is_empty()))
            .map(|f| f.id.clone())
            .collect();
        for (id, value) in &self.submission.data {
            if !value.trim().is_empty() && !self.fields.iter().any(|f| &f.id == id) {
                ids.push(id.clone());
            }
        }
        ids
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionAction {
    Approve,
    Reject,
}

/// Body of `POST /colleges/{id}/faq/submissions/{sid}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSubmissionInput {
    pub action: SubmissionAction,
    /// Field id to answer markdown, required for approval
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub answers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionCount {
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitFormInput {
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateFormInput {
    #[serde(default)]
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(data: &[(&str, &str)]) -> SubmissionDetail {
        SubmissionDetail {
            submission: FormSubmission {
                id: 1,
                form_section_id: 1,
                data: data.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                status: SubmissionStatus::Pending,
                submitted_at: Utc::now(),
                resolved_at: None,
            },
            form_title: "Ask us".to_string(),
            fields: vec![
                FormField { id: "q2".into(), label: "Second".into(), field_type: FieldType::Textarea, required: false },
                FormField { id: "q1".into(), label: "First".into(), field_type: FieldType::Textarea, required: true },
            ],
        }
    }

    #[test]
    fn test_answers_follow_field_order() {
        let d = detail(&[("q1", "How?"), ("q2", "Why?"), ("zz", "Extra")]);
        let answers = d.answers_in_order();
        assert_eq!(answers, vec![("Second", "Why?"), ("First", "How?"), ("zz", "Extra")]);
    }

    #[test]
    fn test_question_fields_skip_blank_entries() {
        let d = detail(&[("q1", "How?"), ("q2", "   ")]);
        assert_eq!(d.question_field_ids(), vec!["q1".to_string()]);
    }

    #[test]
    fn test_submission_detail_flattens() {
        let d = detail(&[("q1", "How?")]);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["formSectionId"], 1);
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["formTitle"], "Ask us");
    }
}
