use argon2::{
    password_hash::{Encoding, SaltString},
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
};
use log::warn;
use rand::rngs::OsRng;

use crate::{CollabError, CollabResult};

/// Turns plain passwords into something safe to keep in the settings, and checks them later.
pub trait PasswordVault: Send + Sync {
    /// Hashes a plain password into a string that can be stored.
    fn hash(&self, password: &str) -> CollabResult<String>;

    /// Whether the plain password matches a stored hash.
    fn verify(&self, password: &str, stored: &str) -> bool;
}

/// Salted argon2id hashes in PHC string format.
pub struct Argon2Vault {
    argon: Argon2<'static>,
}

impl Argon2Vault {
    pub fn new() -> Self {
        Self {
            argon: Argon2::default(),
        }
    }

    /// Uses custom memory (in KiB) and iteration costs.
    pub fn with_cost(memory_kib: u32, iterations: u32) -> CollabResult<Self> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| CollabError::Hash(e.to_string()))?;

        Ok(Self {
            argon: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl PasswordVault for Argon2Vault {
    fn hash(&self, password: &str) -> CollabResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| CollabError::Hash(e.to_string()))?
            .to_string();

        Ok(hash)
    }

    fn verify(&self, password: &str, stored: &str) -> bool {
        let stored = match PasswordHash::parse(stored, Encoding::default()) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Stored password is not a valid hash: {}", e);
                return false;
            }
        };

        self.argon
            .verify_password(password.as_bytes(), &stored)
            .is_ok()
    }
}

impl Default for Argon2Vault {
    fn default() -> Self {
        Self::new()
    }
}
