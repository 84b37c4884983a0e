use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::token::IdentityRef;
use crate::token::TokenCodec;
use crate::token::TokenError;

/// Trusted user reference attached to a request after verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub user_id: i64,
    pub username: String,
}

/// Failure of the user store behind an `IdentityLookup`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Identity lookup failed: {0}")]
pub struct LookupError(pub String);

/// User lookup capability supplied by the persistence layer.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// Find a user by numeric identifier.
    ///
    /// # Returns
    /// Optional identity (None if no such user)
    async fn find_by_id(&self, user_id: i64) -> Result<Option<AuthenticatedIdentity>, LookupError>;

    /// Find a user by username.
    ///
    /// # Returns
    /// Optional identity (None if no such user)
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AuthenticatedIdentity>, LookupError>;
}

/// Identity resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("Token carries no identity claim")]
    MissingIdentityClaim,

    #[error("Token refers to an unknown user")]
    UnknownUser,

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl ResolveError {
    /// Whether the caller should treat this as a plain authentication failure.
    ///
    /// Everything except a failing user store is.
    pub fn is_unauthenticated(&self) -> bool {
        !matches!(self, ResolveError::Lookup(_))
    }

    /// Specific failure reason, for logs only.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::InvalidToken(e) => e.kind(),
            ResolveError::MissingIdentityClaim => "missing_identity_claim",
            ResolveError::UnknownUser => "unknown_user",
            ResolveError::Lookup(_) => "lookup_failed",
        }
    }
}

/// Turns a bearer token into an authenticated identity.
///
/// Read-only: decodes the token, picks the identity reference and asks the
/// lookup for the user. Runs once per authenticated request.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    codec: Arc<TokenCodec>,
}

impl IdentityResolver {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    /// Resolve the identity behind a bearer token.
    ///
    /// # Arguments
    /// * `token` - Bearer token as presented by the client
    /// * `lookup` - User store
    ///
    /// # Errors
    /// * `InvalidToken` - Token is malformed, forged or expired
    /// * `MissingIdentityClaim` - Token has neither `user_id` nor `sub`
    /// * `UnknownUser` - Referenced user no longer exists
    /// * `Lookup` - User store failed
    pub async fn resolve<L>(
        &self,
        token: &str,
        lookup: &L,
    ) -> Result<AuthenticatedIdentity, ResolveError>
    where
        L: IdentityLookup + ?Sized,
    {
        let claims = self.codec.decode(token)?;

        let identity = match claims
            .identity_ref()
            .ok_or(ResolveError::MissingIdentityClaim)?
        {
            IdentityRef::ById(user_id) => lookup.find_by_id(user_id).await?,
            IdentityRef::ByUsername(username) => lookup.find_by_username(&username).await?,
        };

        identity.ok_or(ResolveError::UnknownUser)
    }
}
