//! Form service
//!
//! "Collect questions" forms attached to a college FAQ, public submissions,
//! and the review of pending submissions into FAQ items.

use crate::cache::{keys, CacheLayer, MemoryCache};
use crate::db::repositories::{FaqRepository, FormRepository};
use crate::models::{
    FaqPair, FieldType, FormField, FormPurpose, FormSection, FormSubmission, ProcessSubmissionInput,
    SubmissionAction, SubmissionDetail, SubmissionStatus,
};
use anyhow::Context;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;

const DEFAULT_FORM_TITLE: &str = "Ask a question";

#[derive(Debug, thiserror::Error)]
pub enum FormServiceError {
    #[error("Form not found: {0}")]
    FormNotFound(i64),

    #[error("Submission not found: {0}")]
    SubmissionNotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Submission already resolved")]
    AlreadyResolved,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct FormService {
    forms: Arc<dyn FormRepository>,
    faqs: Arc<dyn FaqRepository>,
    cache: Arc<MemoryCache>,
}

impl FormService {
    pub fn new(forms: Arc<dyn FormRepository>, faqs: Arc<dyn FaqRepository>, cache: Arc<MemoryCache>) -> Self {
        Self { forms, faqs, cache }
    }

    pub async fn list_forms(&self, college_id: i64) -> Result<Vec<FormSection>, FormServiceError> {
        self.forms
            .list_forms(college_id)
            .await
            .context("Failed to list forms")
            .map_err(Into::into)
    }

    /// Create a question-collecting form and link it to the college FAQ
    pub async fn generate_form(&self, college_id: i64, title: Option<String>) -> Result<FormSection, FormServiceError> {
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_FORM_TITLE.to_string());

        let form = FormSection {
            id: 0,
            college_id,
            title,
            purpose: FormPurpose::FaqQuestions,
            fields: vec![FormField {
                id: "question".to_string(),
                label: "Your question".to_string(),
                field_type: FieldType::Textarea,
                required: true,
            }],
            created_at: Utc::now(),
        };
        let form = self.forms.create_form(&form).await.context("Failed to create form")?;
        self.link(college_id, form.id).await?;

        tracing::info!(college_id, form_id = form.id, "Generated FAQ question form");
        Ok(form)
    }

    /// Link an existing form of the same college to its FAQ
    pub async fn import_form(&self, college_id: i64, form_id: i64) -> Result<FormSection, FormServiceError> {
        let form = self.form_in(college_id, form_id).await?;
        self.link(college_id, form.id).await?;
        Ok(form)
    }

    /// Form definition shown to the public through its shared link
    pub async fn public_form(&self, form_id: i64) -> Result<FormSection, FormServiceError> {
        self.forms
            .get_form(form_id)
            .await
            .context("Failed to get form")?
            .ok_or(FormServiceError::FormNotFound(form_id))
    }

    /// Store a public submission. Unknown fields are dropped.
    pub async fn submit(
        &self,
        form_id: i64,
        data: BTreeMap<String, String>,
    ) -> Result<FormSubmission, FormServiceError> {
        let form = self.public_form(form_id).await?;

        let mut accepted = BTreeMap::new();
        for field in &form.fields {
            let value = data.get(&field.id).map(|v| v.trim()).unwrap_or_default();
            if value.is_empty() {
                if field.required {
                    return Err(FormServiceError::ValidationError(format!("{} is required", field.label)));
                }
                continue;
            }
            accepted.insert(field.id.clone(), value.to_string());
        }
        if accepted.is_empty() {
            return Err(FormServiceError::ValidationError("Submission is empty".to_string()));
        }

        self.forms
            .create_submission(form.id, &accepted)
            .await
            .context("Failed to store submission")
            .map_err(Into::into)
    }

    /// Pending submissions across the college's question forms, oldest first
    pub async fn list_pending(&self, college_id: i64) -> Result<Vec<SubmissionDetail>, FormServiceError> {
        let mut pending = Vec::new();
        for form in self.question_forms(college_id).await? {
            let submissions = self
                .forms
                .list_submissions(form.id, SubmissionStatus::Pending)
                .await
                .context("Failed to list submissions")?;
            pending.extend(submissions);
        }
        pending.sort_by(|a, b| {
            a.submission
                .submitted_at
                .cmp(&b.submission.submitted_at)
                .then(a.submission.id.cmp(&b.submission.id))
        });
        Ok(pending)
    }

    pub async fn count_pending(&self, college_id: i64) -> Result<i64, FormServiceError> {
        let mut count = 0;
        for form in self.question_forms(college_id).await? {
            count += self
                .forms
                .count_submissions(form.id, SubmissionStatus::Pending)
                .await
                .context("Failed to count submissions")?;
        }
        Ok(count)
    }

    /// Approve or reject a pending submission
    pub async fn process(
        &self,
        college_id: i64,
        submission_id: i64,
        input: ProcessSubmissionInput,
    ) -> Result<SubmissionStatus, FormServiceError> {
        let detail = self
            .forms
            .get_submission(submission_id)
            .await
            .context("Failed to get submission")?
            .ok_or(FormServiceError::SubmissionNotFound(submission_id))?;
        self.form_in(college_id, detail.submission.form_section_id)
            .await
            .map_err(|_| FormServiceError::SubmissionNotFound(submission_id))?;
        if detail.submission.is_resolved() {
            return Err(FormServiceError::AlreadyResolved);
        }

        match input.action {
            SubmissionAction::Reject => {
                let resolved = self
                    .forms
                    .reject_submission(submission_id)
                    .await
                    .context("Failed to reject submission")?;
                if !resolved {
                    return Err(FormServiceError::AlreadyResolved);
                }
                tracing::info!(college_id, submission_id, "Rejected FAQ submission");
                Ok(SubmissionStatus::Rejected)
            }
            SubmissionAction::Approve => {
                let pairs = approval_pairs(&detail, &input.answers)?;
                let faq = self
                    .faqs
                    .get_or_create(college_id)
                    .await
                    .context("Failed to load FAQ")?;
                let resolved = self
                    .forms
                    .approve_submission(submission_id, faq.id, &pairs)
                    .await
                    .context("Failed to approve submission")?;
                if !resolved {
                    return Err(FormServiceError::AlreadyResolved);
                }

                if let Err(e) = self.cache.delete(&keys::public_faq(college_id)).await {
                    tracing::warn!("Failed to invalidate FAQ cache for college {}: {}", college_id, e);
                }
                tracing::info!(college_id, submission_id, items = pairs.len(), "Approved FAQ submission");
                Ok(SubmissionStatus::Approved)
            }
        }
    }

    async fn question_forms(&self, college_id: i64) -> Result<Vec<FormSection>, FormServiceError> {
        Ok(self
            .list_forms(college_id)
            .await?
            .into_iter()
            .filter(|f| f.purpose == FormPurpose::FaqQuestions)
            .collect())
    }

    async fn form_in(&self, college_id: i64, form_id: i64) -> Result<FormSection, FormServiceError> {
        match self.forms.get_form(form_id).await.context("Failed to get form")? {
            Some(form) if form.college_id == college_id => Ok(form),
            _ => Err(FormServiceError::FormNotFound(form_id)),
        }
    }

    async fn link(&self, college_id: i64, form_id: i64) -> Result<(), FormServiceError> {
        let faq = self
            .faqs
            .get_or_create(college_id)
            .await
            .context("Failed to load FAQ")?;
        self.faqs
            .set_form(faq.id, Some(form_id))
            .await
            .context("Failed to link form to FAQ")?;
        Ok(())
    }
}

/// One FAQ pair per answered question field; every question needs an answer.
fn approval_pairs(
    detail: &SubmissionDetail,
    answers: &BTreeMap<String, String>,
) -> Result<Vec<FaqPair>, FormServiceError> {
    let field_ids = detail.question_field_ids();
    if field_ids.is_empty() {
        return Err(FormServiceError::ValidationError("Submission has no questions".to_string()));
    }

    field_ids
        .iter()
        .map(|id| {
            let answer = answers.get(id).map(|a| a.trim()).unwrap_or_default();
            if answer.is_empty() {
                return Err(FormServiceError::ValidationError(
                    "Please provide answers for all questions".to_string(),
                ));
            }
            let question = detail.submission.data.get(id).map(|q| q.trim()).unwrap_or_default();
            Ok(FaqPair {
                question: question.to_string(),
                answer: answer.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxFaqRepository, SqlxFormRepository};
    use crate::db::{create_test_pool, migrations};

    struct Fixture {
        service: FormService,
        faqs: Arc<dyn FaqRepository>,
        college_id: i64,
        other_college_id: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        let sqlite = pool.sqlite();
        let uni_id = sqlx::query("INSERT INTO universities (name, slug) VALUES ('North', 'north')")
            .execute(sqlite)
            .await
            .unwrap()
            .last_insert_rowid();
        let mut college_ids = Vec::new();
        for slug in ["arts", "medicine"] {
            let id = sqlx::query("INSERT INTO colleges (university_id, name, slug) VALUES (?, ?, ?)")
                .bind(uni_id)
                .bind(slug)
                .bind(slug)
                .execute(sqlite)
                .await
                .unwrap()
                .last_insert_rowid();
            college_ids.push(id);
        }

        let faqs = SqlxFaqRepository::boxed(pool.clone());
        let service = FormService::new(SqlxFormRepository::boxed(pool), faqs.clone(), Arc::new(MemoryCache::new()));
        Fixture {
            service,
            faqs,
            college_id: college_ids[0],
            other_college_id: college_ids[1],
        }
    }

    fn question(text: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("question".to_string(), text.to_string())])
    }

    fn approve(answer: &str) -> ProcessSubmissionInput {
        ProcessSubmissionInput {
            action: SubmissionAction::Approve,
            answers: BTreeMap::from([("question".to_string(), answer.to_string())]),
        }
    }

    #[tokio::test]
    async fn test_generate_form_links_faq() {
        let fx = setup().await;
        let form = fx.service.generate_form(fx.college_id, None).await.unwrap();
        assert_eq!(form.purpose, FormPurpose::FaqQuestions);
        assert_eq!(form.title, DEFAULT_FORM_TITLE);

        let faq = fx.faqs.get_or_create(fx.college_id).await.unwrap();
        assert_eq!(faq.form_id, Some(form.id));
    }

    #[tokio::test]
    async fn test_import_form_from_other_college_rejected() {
        let fx = setup().await;
        let form = fx.service.generate_form(fx.other_college_id, None).await.unwrap();
        let err = fx.service.import_form(fx.college_id, form.id).await.unwrap_err();
        assert!(matches!(err, FormServiceError::FormNotFound(_)));
    }

    #[tokio::test]
    async fn test_submit_requires_fields_and_drops_unknown() {
        let fx = setup().await;
        let form = fx.service.generate_form(fx.college_id, None).await.unwrap();

        let err = fx.service.submit(form.id, BTreeMap::new()).await.unwrap_err();
        assert!(matches!(err, FormServiceError::ValidationError(_)));

        let mut data = question("Is there parking?");
        data.insert("spam".to_string(), "x".to_string());
        let submission = fx.service.submit(form.id, data).await.unwrap();
        assert_eq!(submission.data.len(), 1);
        assert_eq!(submission.status, SubmissionStatus::Pending);
    }

    #[tokio::test]
    async fn test_reject_decrements_count() {
        let fx = setup().await;
        let form = fx.service.generate_form(fx.college_id, None).await.unwrap();
        let s1 = fx.service.submit(form.id, question("One?")).await.unwrap();
        fx.service.submit(form.id, question("Two?")).await.unwrap();
        assert_eq!(fx.service.count_pending(fx.college_id).await.unwrap(), 2);

        let status = fx
            .service
            .process(fx.college_id, s1.id, ProcessSubmissionInput {
                action: SubmissionAction::Reject,
                answers: BTreeMap::new(),
            })
            .await
            .unwrap();
        assert_eq!(status, SubmissionStatus::Rejected);
        assert_eq!(fx.service.count_pending(fx.college_id).await.unwrap(), 1);

        let pending = fx.service.list_pending(fx.college_id).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending.iter().all(|p| p.submission.id != s1.id));
    }

    #[tokio::test]
    async fn test_approve_requires_answers() {
        let fx = setup().await;
        let form = fx.service.generate_form(fx.college_id, None).await.unwrap();
        let s = fx.service.submit(form.id, question("Fees?")).await.unwrap();

        let err = fx.service.process(fx.college_id, s.id, approve("   ")).await.unwrap_err();
        assert!(matches!(err, FormServiceError::ValidationError(_)));
        assert_eq!(fx.service.count_pending(fx.college_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_approve_creates_item_and_second_call_conflicts() {
        let fx = setup().await;
        let form = fx.service.generate_form(fx.college_id, None).await.unwrap();
        let s = fx.service.submit(form.id, question("Fees?")).await.unwrap();

        let status = fx.service.process(fx.college_id, s.id, approve("See the bursar.")).await.unwrap();
        assert_eq!(status, SubmissionStatus::Approved);

        let faq = fx.faqs.get_or_create(fx.college_id).await.unwrap();
        assert_eq!(faq.items.len(), 1);
        assert_eq!(faq.items[0].question, "Fees?");
        assert_eq!(faq.items[0].answer, "See the bursar.");

        let err = fx.service.process(fx.college_id, s.id, approve("Again")).await.unwrap_err();
        assert!(matches!(err, FormServiceError::AlreadyResolved));
        assert_eq!(fx.faqs.get_or_create(fx.college_id).await.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_process_other_college_submission_not_found() {
        let fx = setup().await;
        let form = fx.service.generate_form(fx.other_college_id, None).await.unwrap();
        let s = fx.service.submit(form.id, question("Where?")).await.unwrap();

        let err = fx.service.process(fx.college_id, s.id, approve("Here")).await.unwrap_err();
        assert!(matches!(err, FormServiceError::SubmissionNotFound(_)));
    }
}
