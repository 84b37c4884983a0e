//! Authentication core
//!
//! - Password hashing (Argon2id, 72-byte input ceiling)
//! - Signed, stateless session tokens (HMAC-SHA256)
//! - Request-time identity resolution from a bearer token
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash));
//! ```
//!
//! ## Tokens
//! ```
//! use auth::{SigningKey, TokenClaims, TokenCodec};
//! use chrono::Duration;
//!
//! let codec = TokenCodec::new(SigningKey::new("secret_key_at_least_32_bytes_long!").unwrap());
//! let claims = TokenClaims::for_user(42, "alice");
//! let token = codec.encode(&claims, Duration::minutes(30)).unwrap();
//! let decoded = codec.decode(token.as_str()).unwrap();
//! assert_eq!(decoded.user_id, Some(42));
//! ```
//!
//! ## Complete Authentication Flow
//! ```
//! use auth::{Authenticator, SigningKey, TokenClaims, TokenCodec};
//! use chrono::Duration;
//!
//! let key = SigningKey::new("secret_key_at_least_32_bytes_long!").unwrap();
//! let auth = Authenticator::new(TokenCodec::new(key), Duration::minutes(30));
//!
//! // Register: hash password
//! let hash = auth.hash_password("password123").unwrap();
//!
//! // Login: verify and issue token
//! let claims = TokenClaims::for_user(42, "alice");
//! let result = auth.authenticate("password123", &hash, &claims).unwrap();
//!
//! // Validate token
//! let decoded = auth.validate_token(result.access_token.as_str()).unwrap();
//! assert_eq!(decoded.sub.as_deref(), Some("alice"));
//! ```

pub mod authenticator;
pub mod password;
pub mod resolver;
pub mod token;

// Re-export commonly used items
pub use authenticator::AuthenticationError;
pub use authenticator::AuthenticationResult;
pub use authenticator::Authenticator;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use password::MAX_PASSWORD_BYTES;
pub use resolver::AuthenticatedIdentity;
pub use resolver::IdentityLookup;
pub use resolver::IdentityResolver;
pub use resolver::LookupError;
pub use resolver::ResolveError;
pub use token::Environment;
pub use token::IdentityRef;
pub use token::KeyError;
pub use token::KeyOrigin;
pub use token::SigningKey;
pub use token::Token;
pub use token::TokenClaims;
pub use token::TokenCodec;
pub use token::TokenError;
