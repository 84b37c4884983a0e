use std::fmt;

use super::errors::KeyError;

/// Secret used when no signing secret is configured outside production.
const DEVELOPMENT_FALLBACK_SECRET: &[u8] = b"dev-secret";

/// Deployment environment the signing key is loaded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Map a `RUN_MODE` value to an environment.
    ///
    /// Only `production` (case-insensitive) is treated as production.
    pub fn from_run_mode(run_mode: &str) -> Self {
        if run_mode.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }
}

/// Where a signing key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    Configured,
    DevelopmentFallback,
}

/// HMAC secret for token signing.
///
/// Loaded once at start-up and never mutated afterwards, so it can be shared
/// across request handlers without synchronization.
#[derive(Clone)]
pub struct SigningKey {
    secret: Vec<u8>,
    origin: KeyOrigin,
}

impl SigningKey {
    /// Create a key from a configured secret.
    ///
    /// # Errors
    /// * `Missing` - Secret is empty
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, KeyError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(KeyError::Missing);
        }

        Ok(Self {
            secret: secret.to_vec(),
            origin: KeyOrigin::Configured,
        })
    }

    /// The fixed key for local runs. Marked so it can be refused elsewhere.
    pub fn development_fallback() -> Self {
        Self {
            secret: DEVELOPMENT_FALLBACK_SECRET.to_vec(),
            origin: KeyOrigin::DevelopmentFallback,
        }
    }

    /// Pick the signing key for an environment.
    ///
    /// A missing or empty secret falls back to the development key outside
    /// production. In production it is an error, as is a configured secret
    /// equal to the development fallback.
    ///
    /// # Errors
    /// * `Missing` - No secret configured in production
    /// * `FallbackInProduction` - Production secret equals the development fallback
    pub fn resolve(secret: Option<&str>, environment: Environment) -> Result<Self, KeyError> {
        let secret = secret.filter(|s| !s.trim().is_empty());

        match (secret, environment) {
            (Some(secret), Environment::Production)
                if secret.trim().as_bytes() == DEVELOPMENT_FALLBACK_SECRET =>
            {
                Err(KeyError::FallbackInProduction)
            }
            (Some(secret), _) => Self::new(secret),
            (None, Environment::Production) => Err(KeyError::Missing),
            (None, Environment::Development) => {
                tracing::warn!("No signing secret configured, using development fallback key");
                Ok(Self::development_fallback())
            }
        }
    }

    pub fn origin(&self) -> KeyOrigin {
        self.origin
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == KeyOrigin::DevelopmentFallback
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("secret", &"<redacted>")
            .field("origin", &self.origin)
            .finish()
    }
}
