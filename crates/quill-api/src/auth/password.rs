//! Password hashing and verification using Argon2id
//!
//! Digests are PHC strings that carry the algorithm, cost parameters and
//! salt. Verification reads the parameters back out of the digest, so a
//! change to the configured cost only affects digests created afterwards.

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use quill_core::AuthConfig;
use thiserror::Error;

/// Raw hash length in bytes
const DIGEST_LEN: usize = 32;

/// Plaintext behind the decoy digest
pub(crate) const DECOY_PASSWORD: &str = "quill-decoy";

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Invalid Argon2 parameters: {0}")]
    InvalidParams(String),

    #[error("Failed to hash password: {0}")]
    Hashing(String),

    #[error("Stored digest is not a PHC string")]
    MalformedDigest,

    #[error("Failed to verify password: {0}")]
    Verification(String),
}

/// Argon2id hasher with fixed cost parameters
///
/// Parameters are checked when the hasher is built, so a bad configuration
/// fails at startup instead of on the first registration.
///
/// The hasher also keeps a decoy digest made with the same cost, so a login
/// for an unknown username can spend as long verifying as a real one.
#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
    decoy: String,
}

impl Argon2Hasher {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, parallelism, Some(DIGEST_LEN))
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let decoy = hash_with(&argon2, DECOY_PASSWORD)?;

        Ok(Self { argon2, decoy })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, PasswordError> {
        Self::new(
            config.argon2_memory_kib,
            config.argon2_iterations,
            config.argon2_parallelism,
        )
    }

    pub fn params(&self) -> &Params {
        self.argon2.params()
    }

    /// Hash a plaintext password with a fresh random salt
    ///
    /// # Example
    ///
    /// ```no_run
    /// use quill_api::auth::password::{verify_password, Argon2Hasher};
    ///
    /// let hasher = Argon2Hasher::new(19456, 2, 1).unwrap();
    /// let digest = hasher.hash("hunter2").unwrap();
    /// assert!(digest.starts_with("$argon2id$"));
    /// assert!(verify_password("hunter2", &digest).unwrap());
    /// ```
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        hash_with(&self.argon2, password)
    }

    /// Digest to verify against when there is no stored one
    pub fn decoy_digest(&self) -> &str {
        &self.decoy
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|digest| digest.to_string())
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

impl std::fmt::Debug for Argon2Hasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params = self.params();
        f.debug_struct("Argon2Hasher")
            .field("m_cost", &params.m_cost())
            .field("t_cost", &params.t_cost())
            .field("p_cost", &params.p_cost())
            .finish()
    }
}

/// Check a plaintext password against a stored digest
///
/// A mismatch is `Ok(false)`; errors mean the digest itself is unusable.
pub fn verify_password(password: &str, digest: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(digest).map_err(|_| PasswordError::MalformedDigest)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Verification(e.to_string())),
    }
}
