//! Argon2id password hashing.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use blog_core::ports::{AuthError, PasswordService};

pub struct Argon2PasswordService {
    argon2: Argon2<'static>,
}

impl Argon2PasswordService {
    /// Default Argon2id parameters.
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Explicit memory (KiB) and iteration cost. Low values keep test suites
    /// fast; never use them for stored credentials.
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| AuthError::HashingError(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl Default for Argon2PasswordService {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordService for Argon2PasswordService {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::HashingError(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed =
            PasswordHash::new(hash).map_err(|e| AuthError::HashingError(e.to_string()))?;

        // Parameters come from the PHC string, so hashes made with other
        // costs still verify.
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_hash_and_verify() {
        let service = Argon2PasswordService::with_cost(1024, 1).unwrap();

        let hash = service.hash("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(service.verify("correct horse", &hash).unwrap());
        assert!(!service.verify("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_verify_across_costs() {
        let cheap = Argon2PasswordService::with_cost(1024, 1).unwrap();
        let hash = cheap.hash("pw-12345").unwrap();

        assert!(Argon2PasswordService::new().verify("pw-12345", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        let result = Argon2PasswordService::new().verify("pw", "plaintext");
        assert!(matches!(result, Err(AuthError::HashingError(_))));
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1024, 0)]
    fn test_rejects_invalid_cost(#[case] memory_kib: u32, #[case] iterations: u32) {
        assert!(matches!(
            Argon2PasswordService::with_cost(memory_kib, iterations),
            Err(AuthError::HashingError(_))
        ));
    }
}
