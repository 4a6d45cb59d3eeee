//! Caller authentication.
//!
//! The ledger never verifies credentials itself; it receives an
//! [`Identity`] from an [`IdentityProvider`]. The bundled provider accepts
//! HS256 JWTs whose `sub` claim is the caller's identity.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::ledger::{Identity, IdentityParseError};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Token subject is not an identity: {0}")]
    InvalidSubject(#[from] IdentityParseError),
}

pub trait IdentityProvider: Send + Sync {
    /// Resolve a credential to the authenticated caller.
    fn authenticate(&self, credential: &str) -> Result<Identity, IdentityError>;
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
}

pub struct JwtIdentityProvider {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl IdentityProvider for JwtIdentityProvider {
    fn authenticate(&self, credential: &str) -> Result<Identity, IdentityError> {
        let token_data = decode::<Claims>(credential, &self.decoding_key, &self.validation)?;
        let identity = token_data.claims.sub.parse()?;
        log::debug!("Authenticated caller {}", identity);
        Ok(identity)
    }
}
