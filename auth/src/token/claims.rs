use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// Claims carried inside a signed token.
///
/// Field order is fixed so the serialized payload is canonical: `sub`,
/// `user_id`, custom claims in key order, then `exp`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Subject (username)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Numeric user identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,

    /// Additional custom fields (flattened into token)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,

    /// Expiration time (Unix timestamp). A token without it is always expired.
    #[serde(default)]
    pub exp: i64,
}

/// Reference to the account a token was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRef {
    ById(i64),
    ByUsername(String),
}

impl TokenClaims {
    /// Create new empty claims.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create claims for an authenticated user.
    ///
    /// # Arguments
    /// * `user_id` - Numeric user identifier
    /// * `username` - Username (stored in `sub`)
    pub fn for_user(user_id: i64, username: impl ToString) -> Self {
        Self {
            sub: Some(username.to_string()),
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// Set subject.
    pub fn with_subject(mut self, sub: impl ToString) -> Self {
        self.sub = Some(sub.to_string());
        self
    }

    /// Set numeric user identifier.
    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set expiration (Unix timestamp).
    pub fn with_expiration(mut self, exp: i64) -> Self {
        self.exp = exp;
        self
    }

    /// Add a custom field.
    pub fn with_extra(mut self, key: impl ToString, value: impl Serialize) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.extra.insert(key.to_string(), json_value);
        }
        self
    }

    /// Identity the token refers to.
    ///
    /// The numeric id wins over the username: usernames can change after the
    /// token was issued, ids cannot.
    pub fn identity_ref(&self) -> Option<IdentityRef> {
        match (self.user_id, &self.sub) {
            (Some(id), _) => Some(IdentityRef::ById(id)),
            (None, Some(username)) => Some(IdentityRef::ByUsername(username.clone())),
            (None, None) => None,
        }
    }

    /// Check if token is expired.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        current_timestamp >= self.exp
    }
}

impl Default for TokenClaims {
    fn default() -> Self {
        Self {
            sub: None,
            user_id: None,
            extra: BTreeMap::new(),
            exp: 0,
        }
    }
}
