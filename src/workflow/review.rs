//! FAQ submission review
//!
//! Pending submissions and their count are kept subscribed while a review
//! is open, so every approve or reject refetches both; the count is also
//! polled so new questions show up without a reload.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

use super::WorkflowContext;
use crate::client::{actions, ClientError, PollHandle, QueryKey, Subscription};
use crate::models::{ProcessSubmissionInput, SubmissionAction, SubmissionCount, SubmissionDetail};

const PREVIEW_ENTRIES: usize = 2;

/// Collapsed card for one submission
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionPreview {
    pub id: i64,
    pub form_title: String,
    pub submitted_at: DateTime<Utc>,
    /// Label and text of the first entries
    pub entries: Vec<(String, String)>,
    /// Entries hidden behind "show more"
    pub hidden: usize,
}

impl SubmissionPreview {
    pub fn from_detail(detail: &SubmissionDetail) -> Self {
        let answers = detail.answers_in_order();
        Self {
            id: detail.submission.id,
            form_title: detail.form_title.clone(),
            submitted_at: detail.submission.submitted_at,
            hidden: answers.len().saturating_sub(PREVIEW_ENTRIES),
            entries: answers
                .into_iter()
                .take(PREVIEW_ENTRIES)
                .map(|(label, text)| (label.to_string(), text.to_string()))
                .collect(),
        }
    }
}

/// Answers being drafted for one submission
#[derive(Debug, Clone)]
struct ApprovalDraft {
    submission_id: i64,
    questions: Vec<String>,
    answers: BTreeMap<String, String>,
}

impl ApprovalDraft {
    fn is_complete(&self) -> bool {
        !self.questions.is_empty()
            && self
                .questions
                .iter()
                .all(|id| self.answers.get(id).is_some_and(|a| !a.trim().is_empty()))
    }
}

pub struct SubmissionReview {
    ctx: WorkflowContext,
    college_id: i64,
    draft: Option<ApprovalDraft>,
    _subscriptions: Vec<Subscription>,
    _poll: PollHandle,
}

impl SubmissionReview {
    /// Must be called inside a tokio runtime; polling starts immediately.
    pub fn open(ctx: WorkflowContext, college_id: i64, poll_interval: Duration) -> Self {
        let subscriptions = vec![
            ctx.cache.subscribe(QueryKey::FaqSubmissions(college_id)),
            ctx.cache.subscribe(QueryKey::FaqSubmissionCount(college_id)),
        ];
        let poll = ctx.cache.poll(QueryKey::FaqSubmissionCount(college_id), poll_interval);
        Self {
            ctx,
            college_id,
            draft: None,
            _subscriptions: subscriptions,
            _poll: poll,
        }
    }

    pub async fn pending(&self) -> Result<Vec<SubmissionDetail>, ClientError> {
        self.ctx.cache.query(QueryKey::FaqSubmissions(self.college_id)).await
    }

    pub async fn previews(&self) -> Result<Vec<SubmissionPreview>, ClientError> {
        Ok(self.pending().await?.iter().map(SubmissionPreview::from_detail).collect())
    }

    /// Badge count for the dashboard
    pub async fn pending_count(&self) -> Result<i64, ClientError> {
        let count: SubmissionCount = self
            .ctx
            .cache
            .query(QueryKey::FaqSubmissionCount(self.college_id))
            .await?;
        Ok(count.count)
    }

    /// Submission currently being answered
    pub fn approving(&self) -> Option<i64> {
        self.draft.as_ref().map(|d| d.submission_id)
    }

    /// Start answering `detail`; its question fields are fixed from here on
    pub fn begin_approve(&mut self, detail: &SubmissionDetail) {
        self.draft = Some(ApprovalDraft {
            submission_id: detail.submission.id,
            questions: detail.question_field_ids(),
            answers: BTreeMap::new(),
        });
    }

    /// Ignored when no approval is open
    pub fn set_answer(&mut self, field_id: impl Into<String>, answer: impl Into<String>) {
        if let Some(draft) = self.draft.as_mut() {
            draft.answers.insert(field_id.into(), answer.into());
        }
    }

    pub fn cancel_approve(&mut self) {
        self.draft = None;
    }

    pub async fn reject(&mut self, submission_id: i64) -> Result<(), ClientError> {
        let input = ProcessSubmissionInput {
            action: SubmissionAction::Reject,
            answers: BTreeMap::new(),
        };
        self.process(submission_id, &input).await?;

        if self.approving() == Some(submission_id) {
            self.cancel_approve();
        }
        futures::join!(
            self.ctx.cache.invalidate(QueryKey::FaqSubmissions(self.college_id)),
            self.ctx.cache.invalidate(QueryKey::FaqSubmissionCount(self.college_id))
        );
        self.ctx.notifications.success("Submission rejected");
        Ok(())
    }

    /// Approve with the drafted answers; every question needs one.
    ///
    /// Checked against the open draft only, so a blocked approve sends nothing.
    pub async fn approve(&mut self, submission_id: i64) -> Result<(), ClientError> {
        let draft = match &self.draft {
            Some(draft) if draft.submission_id == submission_id => draft.clone(),
            _ => {
                return Err(self.ctx.fail(ClientError::Validation(
                    "Open the submission before approving it".to_string(),
                )))
            }
        };
        if !draft.is_complete() {
            return Err(self.ctx.fail(ClientError::Validation(
                "Please provide answers for all questions".to_string(),
            )));
        }

        let input = ProcessSubmissionInput {
            action: SubmissionAction::Approve,
            answers: draft
                .questions
                .iter()
                .filter_map(|id| draft.answers.get(id).map(|a| (id.clone(), a.trim().to_string())))
                .collect(),
        };
        self.process(submission_id, &input).await?;

        self.cancel_approve();
        futures::join!(
            self.ctx.cache.invalidate(QueryKey::FaqSubmissions(self.college_id)),
            self.ctx.cache.invalidate(QueryKey::Faq(self.college_id)),
            self.ctx.cache.invalidate(QueryKey::FaqSubmissionCount(self.college_id))
        );
        self.ctx.notifications.success("Submission approved and added to the FAQ");
        Ok(())
    }

    async fn process(&self, submission_id: i64, input: &ProcessSubmissionInput) -> Result<(), ClientError> {
        let _token = self
            .ctx
            .report(self.ctx.guard.try_acquire(actions::faq_submission(submission_id)))?;
        self.ctx.report(
            self.ctx
                .api
                .process_submission(self.college_id, submission_id, input)
                .await,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AuthContext, NotificationLevel};
    use crate::models::Faq;
    use crate::workflow::test_support::context;

    const COLLEGE: i64 = 7;
    const LONG: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_previews_show_first_two_entries() {
        let (api, ctx) = context(AuthContext::default());
        api.add_submission(COLLEGE, 1, &[("a", "First?"), ("b", "Second?"), ("c", "Third?")]);
        let review = SubmissionReview::open(ctx, COLLEGE, LONG);

        let previews = review.previews().await.unwrap();
        assert_eq!(previews.len(), 1);
        assert_eq!(previews[0].entries.len(), 2);
        assert_eq!(previews[0].entries[0].1, "First?");
        assert_eq!(previews[0].hidden, 1);
        assert_eq!(review.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_approve_requires_every_answer() {
        let (api, ctx) = context(AuthContext::default());
        api.add_submission(COLLEGE, 1, &[("q1", "Where?"), ("q2", "When?")]);
        let mut review = SubmissionReview::open(ctx.clone(), COLLEGE, LONG);
        let detail = review.pending().await.unwrap().remove(0);

        review.begin_approve(&detail);
        review.set_answer("q1", "Here");
        review.set_answer("q2", "   ");
        let before = api.calls();
        let err = review.approve(1).await.unwrap_err();
        assert_eq!(err.user_message(), "Please provide answers for all questions");
        assert_eq!(api.calls(), before);
        assert_eq!(review.approving(), Some(1));
        assert_eq!(ctx.notifications.last().unwrap().level, NotificationLevel::Error);
    }

    #[tokio::test]
    async fn test_blocked_approve_on_fresh_review_sends_nothing() {
        let (api, ctx) = context(AuthContext::default());
        api.add_submission(COLLEGE, 1, &[("question", "Where?")]);
        let mut review = SubmissionReview::open(ctx, COLLEGE, LONG);

        review.set_answer("question", "   ");
        assert!(matches!(review.approve(1).await, Err(ClientError::Validation(_))));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_draft_belongs_to_one_submission() {
        let (api, ctx) = context(AuthContext::default());
        api.add_submission(COLLEGE, 1, &[("question", "Parking?")]);
        api.add_submission(COLLEGE, 2, &[("question", "Library?")]);
        let mut review = SubmissionReview::open(ctx, COLLEGE, LONG);
        let pending = review.pending().await.unwrap();

        review.begin_approve(&pending[0]);
        review.set_answer("question", "Lot B");
        let before = api.calls();
        assert!(matches!(review.approve(2).await, Err(ClientError::Validation(_))));
        assert_eq!(api.calls(), before);
        assert_eq!(review.approving(), Some(1));

        review.begin_approve(&pending[1]);
        review.set_answer("question", "Open daily");
        review.approve(2).await.unwrap();
        assert_eq!(api.faq_items(COLLEGE)[0].answer, "Open daily");
    }

    #[tokio::test]
    async fn test_approve_invalidates_submissions_faq_and_count() {
        let (api, ctx) = context(AuthContext::default());
        api.add_submission(COLLEGE, 1, &[("question", "Is there parking?")]);
        let _faq_view = ctx.cache.subscribe(QueryKey::Faq(COLLEGE));
        let mut review = SubmissionReview::open(ctx.clone(), COLLEGE, LONG);
        assert_eq!(review.pending_count().await.unwrap(), 1);
        let detail = review.pending().await.unwrap().remove(0);

        review.begin_approve(&detail);
        review.set_answer("question", "Yes, lot **B**.");
        review.approve(1).await.unwrap();

        assert_eq!(review.approving(), None);
        assert_eq!(api.call_count("process:7:1"), 1);
        assert_eq!(api.call_count("get_faq:7"), 1);
        assert_eq!(api.call_count("count_submissions:7"), 2);
        assert!(review.pending().await.unwrap().is_empty());
        assert_eq!(review.pending_count().await.unwrap(), 0);

        let faq: Faq = ctx.cache.peek(QueryKey::Faq(COLLEGE)).await.unwrap();
        assert_eq!(faq.items[0].question, "Is there parking?");
        assert_eq!(faq.items[0].answer, "Yes, lot **B**.");
    }

    #[tokio::test]
    async fn test_reject_twice_reports_conflict() {
        let (api, ctx) = context(AuthContext::default());
        api.add_submission(COLLEGE, 4, &[("question", "Spam")]);
        let mut review = SubmissionReview::open(ctx.clone(), COLLEGE, LONG);

        review.reject(4).await.unwrap();
        assert!(api.faq_items(COLLEGE).is_empty());

        let err = review.reject(4).await.unwrap_err();
        assert!(matches!(err, ClientError::Server { status: 409, .. }));
        assert_eq!(ctx.notifications.last().unwrap().message, "Submission already resolved");
    }

    #[tokio::test]
    async fn test_in_flight_submission_rejected() {
        let (api, ctx) = context(AuthContext::default());
        api.add_submission(COLLEGE, 2, &[("question", "Fees?")]);
        let _held = ctx.guard.try_acquire(actions::faq_submission(2)).unwrap();
        let mut review = SubmissionReview::open(ctx, COLLEGE, LONG);

        assert!(matches!(review.reject(2).await, Err(ClientError::InFlight(_))));
        assert_eq!(api.call_count("process:7:2"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_is_polled_while_open() {
        let (api, ctx) = context(AuthContext::default());
        let interval = crate::config::ClientConfig::default().poll_interval();
        let review = SubmissionReview::open(ctx, COLLEGE, interval);

        tokio::time::sleep(Duration::from_secs(65)).await;
        assert_eq!(api.call_count("count_submissions:7"), 2);

        drop(review);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(api.call_count("count_submissions:7"), 2);
    }
}
