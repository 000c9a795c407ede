//! JWT token encoding and decoding
//!
//! Implements the token codec with HMAC-SHA256 signing.
//! Tokens carry only the user identifier and have no expiration claim:
//! a token stays valid for as long as the signing secret does.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use quill_core::AuthConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Fixed signing algorithm
const ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT Claims structure
///
/// Embedded in every issued token and trusted only after the signature
/// check passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identifier of the user the token was issued to
    pub user_id: Uuid,
}

impl Claims {
    pub fn for_user(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Token could not be turned back into claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token was not signed with the expected algorithm")]
    InvalidAlgorithm,

    #[error("Invalid token format")]
    Malformed,
}

/// Token could not be produced
#[derive(Debug, Error)]
#[error("Failed to encode JWT: {0}")]
pub struct EncodeError(#[from] jsonwebtoken::errors::Error);

/// Signs and verifies tokens with a shared secret
///
/// Built once at startup from configuration and shared through the
/// application state.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Create a codec for the given HMAC secret
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        // Issued tokens carry no registered claims at all.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.jwt_secret.as_bytes())
    }

    /// Sign claims into a compact token string
    ///
    /// # Example
    ///
    /// ```
    /// use quill_api::auth::jwt::{Claims, TokenCodec};
    /// use uuid::Uuid;
    ///
    /// let codec = TokenCodec::new(b"doc-secret");
    /// let claims = Claims::for_user(Uuid::new_v4());
    /// let token = codec.encode(&claims).unwrap();
    /// assert_eq!(codec.decode(&token).unwrap(), claims);
    /// ```
    pub fn encode(&self, claims: &Claims) -> Result<String, EncodeError> {
        Ok(encode(&Header::new(ALGORITHM), claims, &self.encoding_key)?)
    }

    /// Verify a token and extract its claims
    pub fn decode(&self, token: &str) -> Result<Claims, DecodeError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => DecodeError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => DecodeError::InvalidAlgorithm,
                _ => DecodeError::Malformed,
            },
        )?;

        Ok(token_data.claims)
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &ALGORITHM)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_and_decode_token() {
        let codec = TokenCodec::new(b"test-secret");
        let user_id = Uuid::new_v4();

        let token = codec
            .encode(&Claims::for_user(user_id))
            .expect("Failed to encode token");
        let claims = codec.decode(&token).expect("Failed to decode token");

        assert_eq!(claims.user_id, user_id);
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let codec = TokenCodec::new(b"test-secret");
        let claims = Claims::for_user(Uuid::new_v4());

        assert_eq!(codec.encode(&claims).unwrap(), codec.encode(&claims).unwrap());
    }

    #[test]
    fn test_invalid_token() {
        let codec = TokenCodec::new(b"test-secret");
        assert_eq!(codec.decode("invalid.token.here"), Err(DecodeError::Malformed));
        assert_eq!(codec.decode("garbage"), Err(DecodeError::Malformed));
        assert_eq!(codec.decode(""), Err(DecodeError::Malformed));
    }

    #[test]
    fn test_wrong_secret() {
        let codec1 = TokenCodec::new(b"secret1");
        let codec2 = TokenCodec::new(b"secret2");

        let token = codec1.encode(&Claims::for_user(Uuid::new_v4())).unwrap();

        assert_eq!(codec2.decode(&token), Err(DecodeError::InvalidSignature));
    }

    #[test]
    fn test_tampered_payload() {
        let codec = TokenCodec::new(b"test-secret");
        let original = codec.encode(&Claims::for_user(Uuid::new_v4())).unwrap();
        let other = codec.encode(&Claims::for_user(Uuid::new_v4())).unwrap();

        // Header and signature from one token, payload from another
        let parts: Vec<&str> = original.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert_eq!(codec.decode(&forged), Err(DecodeError::InvalidSignature));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let codec = TokenCodec::new(b"test-secret");
        let claims = Claims::for_user(Uuid::new_v4());

        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert_eq!(codec.decode(&token), Err(DecodeError::InvalidAlgorithm));
    }

    #[test]
    fn test_missing_user_id_rejected() {
        #[derive(Serialize)]
        struct Other {
            sub: String,
        }

        let token = encode(
            &Header::new(Algorithm::HS256),
            &Other {
                sub: "someone".to_string(),
            },
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let codec = TokenCodec::new(b"test-secret");
        assert_eq!(codec.decode(&token), Err(DecodeError::Malformed));
    }

    #[test]
    fn test_debug_hides_keys() {
        let codec = TokenCodec::new(b"super-secret-value");
        let printed = format!("{codec:?}");
        assert!(!printed.contains("super-secret-value"));
    }

    proptest! {
        #[test]
        fn prop_round_trip(raw in any::<u128>(), secret in "[a-zA-Z0-9]{1,64}") {
            let codec = TokenCodec::new(secret.as_bytes());
            let claims = Claims::for_user(Uuid::from_u128(raw));

            let token = codec.encode(&claims).unwrap();
            prop_assert_eq!(codec.decode(&token).unwrap(), claims);
        }

        #[test]
        fn prop_foreign_secret_fails(raw in any::<u128>(), a in "[a-z]{8,32}", b in "[A-Z]{8,32}") {
            let issuer = TokenCodec::new(a.as_bytes());
            let verifier = TokenCodec::new(b.as_bytes());

            let token = issuer.encode(&Claims::for_user(Uuid::from_u128(raw))).unwrap();
            prop_assert!(verifier.decode(&token).is_err());
        }
    }
}
