//! University delete flow: `initiate -> verify -> confirm`

use super::WorkflowContext;
use crate::client::{actions, ClientError, QueryKey};
use crate::models::{
    delete_confirmation_phrase, DeleteStep, DeleteUniversityRequest, DeleteUniversityResponse, ImpactStats,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStage {
    Initiate,
    Verify,
    Confirm,
}

pub struct DeleteUniversityFlow {
    ctx: WorkflowContext,
    stage: DeleteStage,
    stats: Option<ImpactStats>,
    generated_code: Option<String>,
    entered_code: String,
    confirmation: String,
}

impl DeleteUniversityFlow {
    pub fn start(ctx: WorkflowContext) -> Result<Self, ClientError> {
        ctx.require_university_manager()?;
        Ok(Self {
            ctx,
            stage: DeleteStage::Initiate,
            stats: None,
            generated_code: None,
            entered_code: String::new(),
            confirmation: String::new(),
        })
    }

    pub fn stage(&self) -> DeleteStage {
        self.stage
    }

    /// What will be removed along with the university
    pub fn impact(&self) -> Option<&ImpactStats> {
        self.stats.as_ref()
    }

    pub fn generated_code(&self) -> Option<&str> {
        self.generated_code.as_deref()
    }

    pub fn set_code(&mut self, code: impl Into<String>) {
        self.entered_code = code.into();
    }

    pub fn set_confirmation(&mut self, text: impl Into<String>) {
        self.confirmation = text.into();
    }

    /// Phrase the user must type, e.g. `DELETE North University`
    pub fn expected_phrase(&self) -> Option<String> {
        self.stats.as_ref().map(|s| delete_confirmation_phrase(&s.name))
    }

    pub fn can_confirm(&self) -> bool {
        self.stage == DeleteStage::Confirm
            && self.expected_phrase().is_some_and(|p| p == self.confirmation.trim())
    }

    pub async fn initiate(&mut self) -> Result<(), ClientError> {
        if self.stage != DeleteStage::Initiate {
            return Err(self.ctx.fail(ClientError::Validation("Deletion already initiated".to_string())));
        }

        let response = self.send(DeleteStep::Initiate, None, None).await?;
        self.stats = response.university;
        self.generated_code = response.verification_code;
        self.stage = DeleteStage::Verify;
        self.ctx.notifications.success("Verification code sent");
        Ok(())
    }

    pub async fn verify(&mut self) -> Result<(), ClientError> {
        if self.stage != DeleteStage::Verify {
            return Err(self.ctx.fail(ClientError::Validation("Request a code first".to_string())));
        }
        let code = self.entered_code.trim().to_string();
        if code.is_empty() {
            return Err(self
                .ctx
                .fail(ClientError::Validation("Please enter the verification code".to_string())));
        }

        self.send(DeleteStep::Verify, Some(code), None).await?;
        self.stage = DeleteStage::Confirm;
        Ok(())
    }

    /// Final, destructive step; the phrase is checked before any request
    pub async fn confirm(&mut self) -> Result<(), ClientError> {
        if self.stage != DeleteStage::Confirm {
            return Err(self.ctx.fail(ClientError::Validation("Verify the code first".to_string())));
        }
        if !self.can_confirm() {
            return Err(self.ctx.fail(ClientError::Validation(
                "Confirmation text does not match".to_string(),
            )));
        }

        let phrase = self.confirmation.trim().to_string();
        self.send(DeleteStep::Confirm, None, Some(phrase)).await?;

        self.reset();
        self.ctx.cache.invalidate(QueryKey::University).await;
        self.ctx.notifications.success("University deleted successfully");
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.reset();
    }

    async fn send(
        &self,
        step: DeleteStep,
        code: Option<String>,
        confirmation: Option<String>,
    ) -> Result<DeleteUniversityResponse, ClientError> {
        let _token = self.ctx.report(self.ctx.guard.try_acquire(actions::UNIVERSITY_DELETE))?;
        let request = DeleteUniversityRequest {
            verification_step: step,
            verification_code: code,
            final_confirmation: confirmation,
        };
        self.ctx.report(self.ctx.api.delete_university(&request).await)
    }

    fn reset(&mut self) {
        self.stage = DeleteStage::Initiate;
        self.stats = None;
        self.generated_code = None;
        self.entered_code.clear();
        self.confirmation.clear();
    }
}
