use std::sync::Arc;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::password::PasswordError;
use crate::password::PasswordHasher;
use crate::resolver::AuthenticatedIdentity;
use crate::resolver::IdentityLookup;
use crate::resolver::IdentityResolver;
use crate::resolver::ResolveError;
use crate::token::Token;
use crate::token::TokenClaims;
use crate::token::TokenCodec;
use crate::token::TokenError;

/// Authentication coordinator combining password verification, token issuing
/// and identity resolution.
#[derive(Debug, Clone)]
pub struct Authenticator {
    password_hasher: PasswordHasher,
    token_codec: Arc<TokenCodec>,
    identity_resolver: IdentityResolver,
    token_ttl: Duration,
}

/// Result of successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationResult {
    /// Signed access token
    pub access_token: Token,
    /// Instant the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// Authentication operation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error("Token error: {0}")]
    TokenError(#[from] TokenError),
}

impl Authenticator {
    /// Create a new authenticator.
    ///
    /// # Arguments
    /// * `token_codec` - Codec holding the process signing key
    /// * `token_ttl` - Lifetime of issued access tokens
    pub fn new(token_codec: TokenCodec, token_ttl: Duration) -> Self {
        let token_codec = Arc::new(token_codec);
        Self {
            password_hasher: PasswordHasher::new(),
            identity_resolver: IdentityResolver::new(Arc::clone(&token_codec)),
            token_codec,
            token_ttl,
        }
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    /// * `CredentialTooLong` - Password exceeds 72 bytes
    /// * `HashingFailed` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Check a password against a stored hash.
    pub fn verify_password(&self, password: &str, stored_hash: &str) -> bool {
        self.password_hasher.verify(password, stored_hash)
    }

    /// Verify credentials and issue an access token.
    ///
    /// # Arguments
    /// * `password` - Plaintext password to verify
    /// * `stored_hash` - Stored password hash
    /// * `claims` - Claims to encode in the token
    ///
    /// # Errors
    /// * `InvalidCredentials` - Password does not match
    /// * `TokenError` - Token generation failed
    pub fn authenticate(
        &self,
        password: &str,
        stored_hash: &str,
        claims: &TokenClaims,
    ) -> Result<AuthenticationResult, AuthenticationError> {
        if !self.password_hasher.verify(password, stored_hash) {
            return Err(AuthenticationError::InvalidCredentials);
        }

        Ok(self.issue_token(claims)?)
    }

    /// Issue a token without password verification.
    ///
    /// Used right after registration, when the password was just hashed.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token generation failed
    pub fn issue_token(&self, claims: &TokenClaims) -> Result<AuthenticationResult, TokenError> {
        let now = Utc::now();
        let access_token = self.token_codec.encode_at(claims, self.token_ttl, now)?;

        // Same whole-second instant the codec writes into `exp`
        let expires_at =
            DateTime::from_timestamp(now.timestamp() + self.token_ttl.num_seconds(), 0)
                .ok_or_else(|| TokenError::EncodingFailed("expiry out of range".to_string()))?;

        Ok(AuthenticationResult {
            access_token,
            expires_at,
        })
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.token_codec.decode(token)
    }

    /// Resolve the identity behind a bearer token.
    pub async fn resolve_identity<L>(
        &self,
        token: &str,
        lookup: &L,
    ) -> Result<AuthenticatedIdentity, ResolveError>
    where
        L: IdentityLookup + ?Sized,
    {
        self.identity_resolver.resolve(token, lookup).await
    }
}
