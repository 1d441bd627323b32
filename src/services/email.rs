//! Email service for sending verification codes

use anyhow::{anyhow, Result};
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::SmtpConfig;

/// Sends OTP emails over SMTP
pub struct EmailService {
    smtp: SmtpConfig,
}

impl EmailService {
    pub fn new(smtp: SmtpConfig) -> Self {
        Self { smtp }
    }

    pub fn is_configured(&self) -> bool {
        self.smtp.is_configured()
    }

    /// Send a verification code.
    ///
    /// Returns `Ok(false)` without sending when no SMTP host is configured.
    pub async fn send_verification_code(&self, to_email: &str, code: &str, valid_minutes: u64) -> Result<bool> {
        let Some(host) = self.smtp.host.as_deref().filter(|h| !h.trim().is_empty()) else {
            tracing::warn!("SMTP not configured, skipping verification email to {}", to_email);
            return Ok(false);
        };

        let email = build_verification_message(&self.smtp.from, to_email, code, valid_minutes)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            .port(self.smtp.port);
        if !self.smtp.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.smtp.username.clone(),
                self.smtp.password.clone(),
            ));
        }
        let mailer = builder.build();

        mailer
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        tracing::info!("Verification email sent to {}", to_email);
        Ok(true)
    }
}

fn build_verification_message(from: &str, to_email: &str, code: &str, valid_minutes: u64) -> Result<Message> {
    let body = format!(
        "Hello!\n\nYour verification code is: {}\n\nThe code is valid for {} minutes.\n\nIf you did not request it, ignore this email.",
        code, valid_minutes
    );

    Message::builder()
        .from(from.parse().map_err(|e| anyhow!("Invalid from address: {}", e))?)
        .to(to_email.parse().map_err(|e| anyhow!("Invalid to address: {}", e))?)
        .subject("Email verification code")
        .header(ContentType::TEXT_PLAIN)
        .body(body)
        .map_err(|e| anyhow!("Failed to build email: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_smtp_skips_sending() {
        let service = EmailService::new(SmtpConfig::default());

        assert!(!service.is_configured());
        let sent = service
            .send_verification_code("ali@example.com", "123456", 5)
            .await
            .unwrap();
        assert!(!sent);
    }

    #[test]
    fn test_build_message_rejects_bad_address() {
        assert!(build_verification_message("EduCenter <no-reply@localhost>", "not an email", "1", 5).is_err());
        assert!(build_verification_message("EduCenter <no-reply@localhost>", "ali@example.com", "1", 5).is_ok());
    }
}
