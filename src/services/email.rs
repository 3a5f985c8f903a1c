//! Email service for sending verification codes

use anyhow::{anyhow, Result};
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::SmtpConfig;

/// Email service for sending emails
pub struct EmailService {
    config: SmtpConfig,
}

impl EmailService {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Send a verification code for a sensitive university action
    pub async fn send_verification_code(
        &self,
        university_name: &str,
        action: &str,
        code: &str,
        valid_minutes: u64,
    ) -> Result<()> {
        let subject = format!("[{}] Verification code", university_name);
        let body = format!(
            "A request was made to {} the university \"{}\".\n\nYour verification code is: {}\n\nThe code is valid for {} minutes. If you did not request this, ignore this email.",
            action, university_name, code, valid_minutes
        );

        let email = Message::builder()
            .from(self.config.from.parse().map_err(|e| anyhow!("Invalid from address: {}", e))?)
            .to(self.config.to.parse().map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());

        let mailer: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)
                .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
                .credentials(creds)
                .port(self.config.port)
                .build();

        mailer
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        Ok(())
    }
}

/// Generate a random 6-digit verification code
pub fn generate_verification_code() -> String {
    let bytes = uuid::Uuid::new_v4().into_bytes();
    let seed = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    format!("{:06}", seed % 1_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_verification_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_invalid_from_address_is_reported() {
        let service = EmailService::new(SmtpConfig {
            host: "localhost".to_string(),
            port: 2525,
            username: String::new(),
            password: String::new(),
            from: "not an address".to_string(),
            to: "admin@north.edu".to_string(),
        });
        let err = service
            .send_verification_code("North", "delete", "123456", 10)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid from address"));
    }
}
