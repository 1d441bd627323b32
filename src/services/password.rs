//! Password hashing
//!
//! Argon2id with the argon2 crate's default parameters and a random salt
//! per hash. Hashes are stored in PHC string format.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a password using Argon2id.
///
/// ```ignore
/// use educenter::services::password::hash_password;
///
/// let hash = hash_password("secret1")?;
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
        .context("Password hashing failed")?;

    Ok(password_hash.to_string())
}

/// Verify a password against a stored hash.
///
/// Returns `Ok(false)` on a mismatch and an error only when the stored hash
/// cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))
        .context("Failed to parse password hash")?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e))
            .context("Password verification error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_produces_argon2id_hash() {
        let password = "test_password_123";
        let hash = hash_password(password).expect("Failed to hash password");

        // Verify it's an Argon2id hash
        assert!(hash.starts_with("$argon2id$"), "Hash should use Argon2id");
    }

    #[test]
    fn test_hash_password_produces_different_hashes() {
        let password = "same_password";
        let hash1 = hash_password(password).expect("Failed to hash password");
        let hash2 = hash_password(password).expect("Failed to hash password");

        // Different salts should produce different hashes
        assert_ne!(hash1, hash2, "Same password should produce different hashes due to random salt");
    }

    #[test]
    fn test_verify_password_correct() {
        let password = "correct_password";
        let hash = hash_password(password).expect("Failed to hash password");

        let result = verify_password(password, &hash).expect("Verification should not error");
        assert!(result, "Correct password should verify successfully");
    }

    #[test]
    fn test_verify_password_incorrect() {
        let password = "correct_password";
        let wrong_password = "wrong_password";
        let hash = hash_password(password).expect("Failed to hash password");

        let result = verify_password(wrong_password, &hash).expect("Verification should not error");
        assert!(!result, "Wrong password should not verify");
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        let result = verify_password("password", "invalid_hash_format");
        assert!(result.is_err(), "Invalid hash format should return error");
    }

    #[test]
    fn test_hash_password_unicode() {
        let password = "parol-sirli-🔐";
        let hash = hash_password(password).expect("Failed to hash unicode password");

        let result = verify_password(password, &hash).expect("Verification should not error");
        assert!(result, "Unicode password should verify successfully");
    }

    #[test]
    fn test_hash_password_max_length() {
        let password = "a".repeat(55);
        let hash = hash_password(&password).expect("Failed to hash long password");

        let result = verify_password(&password, &hash).expect("Verification should not error");
        assert!(result, "Long password should verify successfully");
    }
}
