//! Email verification codes
//!
//! Codes are TOTP values (SHA-1, one step of skew) over a per-account secret
//! derived as HMAC-SHA256(server secret, lowercase email). Nothing is stored:
//! any code for the current or adjacent step verifies.

use anyhow::{anyhow, Context, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use totp_rs::{Algorithm, TOTP};

use crate::config::OtpConfig;

type HmacSha256 = Hmac<Sha256>;

pub struct OtpService {
    config: OtpConfig,
}

impl OtpService {
    pub fn new(config: OtpConfig) -> Self {
        Self { config }
    }

    /// How long a code stays valid, in whole minutes
    pub fn valid_minutes(&self) -> u64 {
        (self.config.step_seconds / 60).max(1)
    }

    /// Current code for an email address
    pub fn generate(&self, email: &str) -> Result<String> {
        self.totp(email)?
            .generate_current()
            .context("System clock is before the Unix epoch")
    }

    /// Whether `code` is valid for the email right now
    pub fn verify(&self, email: &str, code: &str) -> Result<bool> {
        let code = code.trim();
        if code.len() != self.config.digits || !code.chars().all(|c| c.is_ascii_digit()) {
            return Ok(false);
        }
        self.totp(email)?
            .check_current(code)
            .context("System clock is before the Unix epoch")
    }

    fn account_secret(&self, email: &str) -> Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(self.config.secret.as_bytes())
            .map_err(|e| anyhow!("Invalid OTP secret: {}", e))?;
        mac.update(email.trim().to_lowercase().as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn totp(&self, email: &str) -> Result<TOTP> {
        Ok(TOTP::new_unchecked(
            Algorithm::SHA1,
            self.config.digits,
            1,
            self.config.step_seconds,
            self.account_secret(email)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> OtpService {
        OtpService::new(OtpConfig::default())
    }

    #[test]
    fn test_generated_code_verifies() {
        let otp = service();
        let code = otp.generate("ali@example.com").unwrap();

        assert_eq!(code.len(), 6);
        assert!(otp.verify("ali@example.com", &code).unwrap());
        assert!(otp.verify("  ALI@example.com ", &code).unwrap());
    }

    #[test]
    fn test_code_is_bound_to_email() {
        let otp = service();
        let a = otp.totp("a@example.com").unwrap();
        let b = otp.totp("b@example.com").unwrap();

        // Same instant, different account secrets
        let at = 1_700_000_000;
        assert_ne!(a.generate(at), b.generate(at));
    }

    #[test]
    fn test_code_from_other_server_secret_rejected() {
        let other = OtpService::new(OtpConfig {
            secret: "other-secret".into(),
            ..OtpConfig::default()
        });
        let at = 1_700_000_000;
        let ours = service().totp("ali@example.com").unwrap().generate(at);
        let theirs = other.totp("ali@example.com").unwrap().generate(at);

        assert_ne!(ours, theirs);
    }

    #[test]
    fn test_adjacent_step_accepted_and_older_rejected() {
        let otp = service().totp("ali@example.com").unwrap();
        let at = 1_700_000_100;

        assert!(otp.check(&otp.generate(at - 300), at));
        assert!(!otp.check(&otp.generate(at - 900), at));
    }

    #[test]
    fn test_malformed_codes_rejected() {
        let otp = service();

        assert!(!otp.verify("ali@example.com", "12345").unwrap());
        assert!(!otp.verify("ali@example.com", "abcdef").unwrap());
        assert!(!otp.verify("ali@example.com", "").unwrap());
    }

    #[test]
    fn test_valid_minutes() {
        assert_eq!(service().valid_minutes(), 5);
    }
}
