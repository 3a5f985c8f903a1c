//! Verification codes for sensitive university mutations
//!
//! A challenge is issued per (university, action) and stored with a TTL.
//! Codes are single-use. After `max_attempts` wrong codes the challenge is
//! dropped and a new code must be requested. The delete flow additionally
//! records that its challenge was verified, which the final confirm step
//! consumes.

use crate::cache::{CacheLayer, MemoryCache};
use crate::config::VerificationConfig;
use crate::services::email::{generate_verification_code, EmailService};
use anyhow::Context;
use std::time::Duration;

/// Sensitive action guarded by a verification code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifiedAction {
    EditUniversity,
    DeleteUniversity,
}

impl VerifiedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EditUniversity => "edit",
            Self::DeleteUniversity => "delete",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Verification code expired or not requested")]
    Expired,

    #[error("Verification step not completed")]
    NotVerified,

    #[error("Too many incorrect codes. Please request a new code")]
    TooManyAttempts,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct VerificationService {
    store: MemoryCache,
    ttl: Duration,
    expose_code: bool,
    max_attempts: u32,
    email: Option<EmailService>,
}

impl VerificationService {
    pub fn new(config: &VerificationConfig) -> Self {
        let ttl = Duration::from_secs(config.code_ttl_seconds.max(1));
        Self {
            store: MemoryCache::with_capacity_and_ttl(10_000, ttl),
            ttl,
            expose_code: config.expose_code,
            max_attempts: config.max_attempts.max(1),
            email: config.smtp.clone().map(EmailService::new),
        }
    }

    fn code_key(university_id: i64, action: VerifiedAction) -> String {
        format!("code:{}:{}", university_id, action.as_str())
    }

    fn verified_key(university_id: i64, action: VerifiedAction) -> String {
        format!("verified:{}:{}", university_id, action.as_str())
    }

    fn failures_key(university_id: i64, action: VerifiedAction) -> String {
        format!("failures:{}:{}", university_id, action.as_str())
    }

    /// Issue a fresh code, replacing any outstanding one.
    ///
    /// Returns the code when it may be shown to the caller.
    pub async fn issue(
        &self,
        university_id: i64,
        university_name: &str,
        action: VerifiedAction,
    ) -> Result<Option<String>, VerificationError> {
        let code = generate_verification_code();
        self.store
            .set(&Self::code_key(university_id, action), &code, self.ttl)
            .await
            .context("Failed to store verification code")?;
        self.store
            .delete(&Self::verified_key(university_id, action))
            .await
            .context("Failed to reset verification state")?;
        self.store
            .delete(&Self::failures_key(university_id, action))
            .await
            .context("Failed to reset failed attempts")?;

        if let Some(email) = &self.email {
            email
                .send_verification_code(university_name, action.as_str(), &code, self.ttl.as_secs().div_ceil(60))
                .await
                .context("Failed to email verification code")?;
        }

        tracing::info!(
            university_id,
            action = action.as_str(),
            "Issued verification code"
        );

        Ok(self.expose_code.then_some(code))
    }

    /// Check and consume a code
    pub async fn verify(
        &self,
        university_id: i64,
        action: VerifiedAction,
        submitted: &str,
    ) -> Result<(), VerificationError> {
        let key = Self::code_key(university_id, action);
        let stored: Option<String> = self
            .store
            .get(&key)
            .await
            .context("Failed to read verification code")?;

        match stored {
            None => Err(VerificationError::Expired),
            Some(code) if code != submitted.trim() => self.record_failure(university_id, action).await,
            Some(_) => {
                self.store
                    .delete(&Self::failures_key(university_id, action))
                    .await
                    .context("Failed to reset failed attempts")?;
                // A concurrent verify may have consumed it first.
                let taken: Option<String> = self
                    .store
                    .take(&key)
                    .await
                    .context("Failed to consume verification code")?;
                taken.map(|_| ()).ok_or(VerificationError::Expired)
            }
        }
    }

    /// Count a wrong code; the last allowed failure drops the challenge
    async fn record_failure(&self, university_id: i64, action: VerifiedAction) -> Result<(), VerificationError> {
        let key = Self::failures_key(university_id, action);
        let failures = self
            .store
            .get::<u32>(&key)
            .await
            .context("Failed to read failed attempts")?
            .unwrap_or(0)
            + 1;

        if failures >= self.max_attempts {
            self.store
                .delete(&Self::code_key(university_id, action))
                .await
                .context("Failed to drop verification code")?;
            self.store
                .delete(&key)
                .await
                .context("Failed to reset failed attempts")?;
            tracing::warn!(
                university_id,
                action = action.as_str(),
                failures,
                "Verification challenge dropped after repeated failures"
            );
            return Err(VerificationError::TooManyAttempts);
        }

        self.store
            .set(&key, &failures, self.ttl)
            .await
            .context("Failed to record failed attempt")?;
        tracing::warn!(university_id, action = action.as_str(), failures, "Rejected verification code");
        Err(VerificationError::InvalidCode)
    }

    /// Record that the challenge for `action` was passed
    pub async fn mark_verified(&self, university_id: i64, action: VerifiedAction) -> Result<(), VerificationError> {
        self.store
            .set(&Self::verified_key(university_id, action), &true, self.ttl)
            .await
            .context("Failed to record verification")?;
        Ok(())
    }

    /// Consume a previously recorded verification
    pub async fn consume_verified(&self, university_id: i64, action: VerifiedAction) -> Result<(), VerificationError> {
        let marked: Option<bool> = self
            .store
            .take(&Self::verified_key(university_id, action))
            .await
            .context("Failed to read verification state")?;
        match marked {
            Some(true) => Ok(()),
            _ => Err(VerificationError::NotVerified),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> VerificationService {
        VerificationService::new(&VerificationConfig::default())
    }

    #[tokio::test]
    async fn test_issue_then_verify() {
        let service = service();
        let code = service
            .issue(1, "North", VerifiedAction::EditUniversity)
            .await
            .unwrap()
            .unwrap();

        service.verify(1, VerifiedAction::EditUniversity, &code).await.unwrap();
    }

    #[tokio::test]
    async fn test_code_is_single_use() {
        let service = service();
        let code = service.issue(1, "North", VerifiedAction::EditUniversity).await.unwrap().unwrap();
        service.verify(1, VerifiedAction::EditUniversity, &code).await.unwrap();

        let err = service.verify(1, VerifiedAction::EditUniversity, &code).await.unwrap_err();
        assert!(matches!(err, VerificationError::Expired));
    }

    #[tokio::test]
    async fn test_wrong_code_keeps_challenge() {
        let service = service();
        let code = service.issue(1, "North", VerifiedAction::DeleteUniversity).await.unwrap().unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };

        let err = service.verify(1, VerifiedAction::DeleteUniversity, wrong).await.unwrap_err();
        assert!(matches!(err, VerificationError::InvalidCode));
        assert_eq!(err.to_string(), "Invalid verification code");

        service.verify(1, VerifiedAction::DeleteUniversity, &code).await.unwrap();
    }

    #[tokio::test]
    async fn test_repeated_wrong_codes_drop_challenge() {
        let service = VerificationService::new(&VerificationConfig {
            max_attempts: 3,
            ..VerificationConfig::default()
        });
        let code = service.issue(1, "North", VerifiedAction::DeleteUniversity).await.unwrap().unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };

        for _ in 0..2 {
            let err = service.verify(1, VerifiedAction::DeleteUniversity, wrong).await.unwrap_err();
            assert!(matches!(err, VerificationError::InvalidCode));
        }
        let err = service.verify(1, VerifiedAction::DeleteUniversity, wrong).await.unwrap_err();
        assert!(matches!(err, VerificationError::TooManyAttempts));

        // The correct code no longer works once the challenge is dropped
        let err = service.verify(1, VerifiedAction::DeleteUniversity, &code).await.unwrap_err();
        assert!(matches!(err, VerificationError::Expired));

        // A new code starts a fresh count
        let code = service.issue(1, "North", VerifiedAction::DeleteUniversity).await.unwrap().unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };
        for _ in 0..2 {
            let err = service.verify(1, VerifiedAction::DeleteUniversity, wrong).await.unwrap_err();
            assert!(matches!(err, VerificationError::InvalidCode));
        }
        service.verify(1, VerifiedAction::DeleteUniversity, &code).await.unwrap();
    }

    #[tokio::test]
    async fn test_codes_scoped_by_action_and_tenant() {
        let service = service();
        let code = service.issue(1, "North", VerifiedAction::EditUniversity).await.unwrap().unwrap();

        let err = service.verify(1, VerifiedAction::DeleteUniversity, &code).await.unwrap_err();
        assert!(matches!(err, VerificationError::Expired));
        let err = service.verify(2, VerifiedAction::EditUniversity, &code).await.unwrap_err();
        assert!(matches!(err, VerificationError::Expired));
    }

    #[tokio::test]
    async fn test_expired_code_rejected() {
        let service = VerificationService::new(&VerificationConfig {
            code_ttl_seconds: 1,
            ..VerificationConfig::default()
        });
        let code = service.issue(1, "North", VerifiedAction::EditUniversity).await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(1200)).await;
        let err = service.verify(1, VerifiedAction::EditUniversity, &code).await.unwrap_err();
        assert!(matches!(err, VerificationError::Expired));
        assert_eq!(err.to_string(), "Verification code expired or not requested");
    }

    #[tokio::test]
    async fn test_hidden_code_when_not_exposed() {
        let service = VerificationService::new(&VerificationConfig {
            expose_code: false,
            ..VerificationConfig::default()
        });
        assert!(service.issue(1, "North", VerifiedAction::EditUniversity).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_verified_mark_consumed_once() {
        let service = service();
        assert!(matches!(
            service.consume_verified(1, VerifiedAction::DeleteUniversity).await,
            Err(VerificationError::NotVerified)
        ));

        service.mark_verified(1, VerifiedAction::DeleteUniversity).await.unwrap();
        service.consume_verified(1, VerifiedAction::DeleteUniversity).await.unwrap();
        assert!(service.consume_verified(1, VerifiedAction::DeleteUniversity).await.is_err());
    }

    #[tokio::test]
    async fn test_reissue_clears_verified_mark() {
        let service = service();
        service.mark_verified(1, VerifiedAction::DeleteUniversity).await.unwrap();
        service.issue(1, "North", VerifiedAction::DeleteUniversity).await.unwrap();
        assert!(service.consume_verified(1, VerifiedAction::DeleteUniversity).await.is_err());
    }
}
