//! In-flight guard
//!
//! At most one outstanding call per action id. The token releases the
//! action when dropped, whether the call succeeded or failed.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::ClientError;

#[derive(Debug, Clone, Default)]
pub struct InFlightGuard {
    active: Arc<Mutex<HashSet<String>>>,
}

/// Held for the duration of one call
#[derive(Debug)]
pub struct InFlightToken {
    action: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `action`, or fail if a call for it is still outstanding
    pub fn try_acquire(&self, action: impl Into<String>) -> Result<InFlightToken, ClientError> {
        let action = action.into();
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(action.clone()) {
            tracing::debug!(action = %action, "Rejected duplicate submission");
            return Err(ClientError::InFlight(action));
        }
        Ok(InFlightToken {
            action,
            active: self.active.clone(),
        })
    }

    pub fn is_in_flight(&self, action: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(action)
    }
}

impl InFlightToken {
    pub fn action(&self) -> &str {
        &self.action
    }
}

impl Drop for InFlightToken {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.action);
    }
}

/// Action ids used by the workflows
pub mod actions {
    pub const UNIVERSITY_EDIT: &str = "university.edit";
    pub const UNIVERSITY_DELETE: &str = "university.delete";

    pub fn faq_submission(submission_id: i64) -> String {
        format!("faq.submission.{}", submission_id)
    }

    pub fn faq_import(college_id: i64) -> String {
        format!("faq.import.{}", college_id)
    }
}
