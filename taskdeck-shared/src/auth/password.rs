/// Password hashing for the credential store
///
/// Uses Argon2id with explicit cost parameters. Each call generates a fresh
/// random salt, so two credentials with the same plaintext never share a
/// stored hash. Verification is constant-time.
///
/// The stored value is a PHC string carrying algorithm, parameters, salt and
/// hash, e.g. `$argon2id$v=19$m=19456,t=2,p=1$...$...`.
///
/// # Example
///
/// ```
/// use taskdeck_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("password")?;
/// assert!(verify_password("password", &hash)?);
/// assert!(!verify_password("nope", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use rand::{distributions::Alphanumeric, Rng};

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid stored hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Length of administrator-generated initial passwords
pub const GENERATED_PASSWORD_LEN: usize = 20;

/// Hashes a plaintext password with a fresh random salt.
///
/// Cost parameters follow the OWASP baseline for Argon2id (19 MiB memory,
/// 2 iterations, single lane). Hashing is CPU-bound; callers on a request
/// worker should dispatch through `tokio::task::spawn_blocking`.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(19_456)
        .t_cost(2)
        .p_cost(1)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a plaintext password against a stored PHC hash.
///
/// Returns `Ok(false)` for a wrong password; errors only on a malformed
/// stored hash. Comparison is constant-time.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    // A PHC string can parse while carrying no hash output at all
    // (e.g. "$argon2id$broken"); treat that as malformed, not as a mismatch
    if parsed_hash.hash.is_none() {
        return Err(PasswordError::InvalidHash(
            "Hash output missing from stored value".to_string(),
        ));
    }

    // Parameters are embedded in the stored hash
    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!(
            "Verification failed: {}",
            e
        ))),
    }
}

/// Generates a random alphanumeric initial password.
///
/// Used when an administrator creates an account without supplying a
/// password; the generated value is returned to the administrator once and
/// never stored in plaintext.
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_roundtrip() {
        let hash = hash_password("secret-phrase").expect("hash should succeed");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secret-phrase", &hash).unwrap());
        assert!(!verify_password("secret-phrasE", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_same_plaintext_different_hashes() {
        // Fresh salt per credential record
        let h1 = hash_password("password").unwrap();
        let h2 = hash_password("password").unwrap();
        assert_ne!(h1, h2);
        assert!(verify_password("password", &h1).unwrap());
        assert!(verify_password("password", &h2).unwrap());
    }

    #[test]
    fn test_verify_malformed_hash_is_error() {
        assert!(verify_password("password", "not-a-phc-string").is_err());
        // Parses as PHC but has no hash output
        assert!(verify_password("password", "$argon2id$broken").is_err());
        assert!(verify_password("password", "$argon2id$v=19$m=19456,t=2,p=1").is_err());
    }

    #[test]
    fn test_unicode_passwords() {
        for pw in ["with spaces", "記号!@#", "ながいパスワードのテスト1234567890"] {
            let hash = hash_password(pw).unwrap();
            assert!(verify_password(pw, &hash).unwrap(), "password {:?}", pw);
        }
    }

    #[test]
    fn test_generated_password_shape() {
        let pw = generate_password();
        assert_eq!(pw.len(), GENERATED_PASSWORD_LEN);
        assert!(pw.chars().all(|c| c.is_ascii_alphanumeric()));

        // Two draws should differ with overwhelming probability
        assert_ne!(pw, generate_password());
    }
}
