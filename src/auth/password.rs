use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Argon2id password hashing producing PHC strings.
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    /// Hash of a random secret, verified against when no account matches.
    decoy: OnceLock<Option<String>>,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
            decoy: OnceLock::new(),
        }
    }

    pub fn hash(&self, raw: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(raw.as_bytes(), &salt)
            .map_err(|e| Error::Config(format!("failed to hash password: {e}")))?;
        Ok(hash.to_string())
    }

    /// A malformed stored hash never verifies.
    #[must_use]
    pub fn verify(&self, raw: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            tracing::warn!("Stored password hash is not a PHC string");
            return false;
        };
        self.argon2.verify_password(raw.as_bytes(), &parsed).is_ok()
    }

    /// Spends the same Argon2 work as [`verify`](Self::verify) for a login
    /// whose account does not exist. Always false.
    pub fn verify_missing(&self, raw: &str) -> bool {
        let decoy = self.decoy.get_or_init(|| {
            let secret = uuid::Uuid::new_v4().to_string();
            self.hash(&secret).ok()
        });
        if let Some(hash) = decoy {
            let _ = self.verify(raw, hash);
        }
        false
    }
}
