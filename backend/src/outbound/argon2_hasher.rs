//! Argon2id password hashing for the [`PasswordHasher`] port.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash as Phc, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::Argon2;

use crate::domain::PasswordHash;
use crate::domain::ports::{PasswordHashError, PasswordHasher};

/// Hashes with the crate's default Argon2id parameters, emitting PHC strings.
#[derive(Debug, Default, Clone)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &str) -> Result<PasswordHash, PasswordHashError> {
        let salt = SaltString::generate(&mut OsRng);
        let encoded = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| PasswordHashError::hash(err.to_string()))?;
        Ok(PasswordHash::new(encoded.to_string()))
    }

    fn verify(&self, password: &str, hash: &PasswordHash) -> Result<bool, PasswordHashError> {
        let parsed =
            Phc::new(hash.as_str()).map_err(|err| PasswordHashError::malformed(err.to_string()))?;
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(err) => Err(PasswordHashError::hash(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn verifies_only_the_original_password() {
        let hasher = Argon2PasswordHasher::default();
        let hash = hasher.hash("correct horse").expect("hash");
        assert!(hash.as_str().starts_with("$argon2id$"));
        assert_eq!(hasher.verify("correct horse", &hash), Ok(true));
        assert_eq!(hasher.verify("battery staple", &hash), Ok(false));
    }

    #[rstest]
    fn malformed_hashes_are_reported() {
        let hasher = Argon2PasswordHasher::default();
        let result = hasher.verify("pw", &PasswordHash::new("plaintext"));
        assert!(matches!(result, Err(PasswordHashError::Malformed { .. })));
    }
}
