//! Admin workflows
//!
//! Client-side state machines over [`CmsApi`](crate::client::CmsApi):
//! - [`edit::EditUniversityFlow`]: `form -> verify`
//! - [`delete::DeleteUniversityFlow`]: `initiate -> verify -> confirm`
//! - [`review::SubmissionReview`]: approve or reject FAQ submissions
//! - [`import::FaqImport`]: CSV to bulk-created FAQ items
//!
//! A failed call never advances a stage. Every failure is reported as an
//! error notification and returned to the caller. Nothing is retried.

pub mod delete;
pub mod edit;
pub mod import;
pub mod review;

use std::sync::Arc;

use crate::client::{AuthContext, ClientError, CmsApi, InFlightGuard, Notifications, QueryCache};

pub use delete::{DeleteStage, DeleteUniversityFlow};
pub use edit::{EditDraft, EditStage, EditUniversityFlow};
pub use import::{is_allowed_mime, parse_faq_csv, preview, FaqImport, ImportError, ALLOWED_MIME_TYPES};
pub use review::{SubmissionPreview, SubmissionReview};

/// Collaborators shared by every workflow of one dashboard session
#[derive(Clone)]
pub struct WorkflowContext {
    pub api: Arc<dyn CmsApi>,
    pub cache: QueryCache,
    pub guard: InFlightGuard,
    pub notifications: Notifications,
    pub auth: AuthContext,
}

impl WorkflowContext {
    pub fn new(api: Arc<dyn CmsApi>, auth: AuthContext) -> Self {
        Self {
            cache: QueryCache::new(api.clone()),
            api,
            guard: InFlightGuard::new(),
            notifications: Notifications::new(),
            auth,
        }
    }

    fn require_university_manager(&self) -> Result<(), ClientError> {
        if self.auth.can_manage_university() {
            Ok(())
        } else {
            Err(self.fail(ClientError::Forbidden(
                "Only the university owner can do this".to_string(),
            )))
        }
    }

    /// Push an error notification and hand the error back
    fn fail(&self, err: ClientError) -> ClientError {
        self.notifications.error(err.user_message());
        err
    }

    fn report<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        result.map_err(|e| self.fail(e))
    }
}
