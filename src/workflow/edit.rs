//! University edit flow: `form -> verify`

use super::WorkflowContext;
use crate::client::{actions, ClientError, QueryKey};
use crate::models::{EditStep, EditUniversityRequest, NewsItem, University};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStage {
    Form,
    Verify,
}

/// Edit payload; resubmitted unchanged together with the code
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditDraft {
    pub name: String,
    pub slug: String,
    pub logo_url: Option<String>,
    pub description: Option<String>,
    pub news_items: Option<Vec<NewsItem>>,
}

impl EditDraft {
    fn request(&self, step: EditStep, code: Option<String>) -> EditUniversityRequest {
        EditUniversityRequest {
            name: self.name.clone(),
            slug: self.slug.clone(),
            logo_url: self.logo_url.clone(),
            description: self.description.clone(),
            news_items: self.news_items.clone(),
            verification_step: step,
            verification_code: code,
        }
    }
}

pub struct EditUniversityFlow {
    ctx: WorkflowContext,
    stage: EditStage,
    draft: Option<EditDraft>,
    generated_code: Option<String>,
    entered_code: String,
}

impl EditUniversityFlow {
    pub fn start(ctx: WorkflowContext) -> Result<Self, ClientError> {
        ctx.require_university_manager()?;
        Ok(Self {
            ctx,
            stage: EditStage::Form,
            draft: None,
            generated_code: None,
            entered_code: String::new(),
        })
    }

    pub fn stage(&self) -> EditStage {
        self.stage
    }

    /// Code echoed back by the backend, when it exposes one
    pub fn generated_code(&self) -> Option<&str> {
        self.generated_code.as_deref()
    }

    pub fn set_code(&mut self, code: impl Into<String>) {
        self.entered_code = code.into();
    }

    /// Submit the form and request a verification code
    pub async fn submit_form(&mut self, draft: EditDraft) -> Result<(), ClientError> {
        if self.stage != EditStage::Form {
            return Err(self.ctx.fail(ClientError::Validation("A code was already requested".to_string())));
        }
        if draft.name.trim().is_empty() || draft.slug.trim().is_empty() {
            return Err(self.ctx.fail(ClientError::Validation("Name and slug are required".to_string())));
        }

        let _token = self.ctx.report(self.ctx.guard.try_acquire(actions::UNIVERSITY_EDIT))?;
        let response = self
            .ctx
            .report(self.ctx.api.edit_university(&draft.request(EditStep::Request, None)).await)?;

        self.generated_code = response.verification_code;
        self.draft = Some(draft);
        self.stage = EditStage::Verify;
        self.ctx.notifications.success("Verification code sent");
        Ok(())
    }

    /// Resubmit the draft with the entered code; the backend decides
    pub async fn submit_code(&mut self) -> Result<Option<University>, ClientError> {
        let draft = match (&self.stage, &self.draft) {
            (EditStage::Verify, Some(draft)) => draft.clone(),
            _ => return Err(self.ctx.fail(ClientError::Validation("Request a code first".to_string()))),
        };
        let code = self.entered_code.trim().to_string();
        if code.is_empty() {
            return Err(self
                .ctx
                .fail(ClientError::Validation("Please enter the verification code".to_string())));
        }

        let _token = self.ctx.report(self.ctx.guard.try_acquire(actions::UNIVERSITY_EDIT))?;
        let response = self
            .ctx
            .report(self.ctx.api.edit_university(&draft.request(EditStep::Verify, Some(code))).await)?;

        self.reset();
        self.ctx.cache.invalidate(QueryKey::University).await;
        self.ctx.notifications.success("University updated successfully");
        Ok(response.university)
    }

    /// Back to the form, discarding everything entered
    pub fn cancel(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.stage = EditStage::Form;
        self.draft = None;
        self.generated_code = None;
        self.entered_code.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FAKE_CODE;
    use crate::client::{AuthContext, NotificationLevel};
    use crate::workflow::test_support::context;

    fn draft(name: &str) -> EditDraft {
        EditDraft {
            name: name.to_string(),
            slug: "x".to_string(),
            ..EditDraft::default()
        }
    }

    #[tokio::test]
    async fn test_edit_end_to_end_invalidates_university_once() {
        let (api, ctx) = context(AuthContext::owner());
        let _view = ctx.cache.subscribe(QueryKey::University);
        let _: University = ctx.cache.query(QueryKey::University).await.unwrap();

        let mut flow = EditUniversityFlow::start(ctx.clone()).unwrap();
        flow.submit_form(draft("Renamed")).await.unwrap();
        assert_eq!(flow.stage(), EditStage::Verify);
        assert_eq!(flow.generated_code(), Some(FAKE_CODE));

        flow.set_code(FAKE_CODE);
        let updated = flow.submit_code().await.unwrap().unwrap();
        assert_eq!(updated.name, "Renamed");

        assert_eq!(flow.stage(), EditStage::Form);
        assert_eq!(flow.generated_code(), None);
        assert_eq!(api.call_count("get_university"), 2);
        let cached: University = ctx.cache.peek(QueryKey::University).await.unwrap();
        assert_eq!(cached.name, "Renamed");
    }

    #[tokio::test]
    async fn test_wrong_code_stays_on_verify() {
        let (_api, ctx) = context(AuthContext::owner());
        let mut flow = EditUniversityFlow::start(ctx.clone()).unwrap();
        flow.submit_form(draft("Renamed")).await.unwrap();

        flow.set_code("000000");
        let err = flow.submit_code().await.unwrap_err();
        assert_eq!(err.user_message(), "Invalid verification code");
        assert_eq!(flow.stage(), EditStage::Verify);

        let note = ctx.notifications.last().unwrap();
        assert_eq!(note.level, NotificationLevel::Error);
        assert_eq!(note.message, "Invalid verification code");
    }

    #[tokio::test]
    async fn test_request_failure_stays_on_form() {
        let (api, ctx) = context(AuthContext::owner());
        let mut flow = EditUniversityFlow::start(ctx.clone()).unwrap();
        api.fail_next(ClientError::Server {
            status: 500,
            message: String::new(),
        });

        assert!(flow.submit_form(draft("Renamed")).await.is_err());
        assert_eq!(flow.stage(), EditStage::Form);
        assert_eq!(ctx.notifications.last().unwrap().message, crate::client::FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn test_empty_name_never_calls_backend() {
        let (api, ctx) = context(AuthContext::owner());
        let mut flow = EditUniversityFlow::start(ctx).unwrap();
        assert!(matches!(
            flow.submit_form(draft("  ")).await,
            Err(ClientError::Validation(_))
        ));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_resets_without_calls() {
        let (api, ctx) = context(AuthContext::owner());
        let mut flow = EditUniversityFlow::start(ctx).unwrap();
        flow.submit_form(draft("Renamed")).await.unwrap();
        flow.set_code("123");
        let calls = api.calls().len();

        flow.cancel();
        assert_eq!(flow.stage(), EditStage::Form);
        assert_eq!(flow.generated_code(), None);
        assert_eq!(api.calls().len(), calls);
    }

    #[tokio::test]
    async fn test_requires_manage_capability() {
        let (_api, ctx) = context(AuthContext::default());
        assert!(matches!(
            EditUniversityFlow::start(ctx),
            Err(ClientError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_in_flight_edit_rejected() {
        let (api, ctx) = context(AuthContext::super_admin());
        let _held = ctx.guard.try_acquire(actions::UNIVERSITY_EDIT).unwrap();
        let mut flow = EditUniversityFlow::start(ctx).unwrap();

        assert!(matches!(
            flow.submit_form(draft("Renamed")).await,
            Err(ClientError::InFlight(_))
        ));
        assert!(api.calls().is_empty());
    }
}
