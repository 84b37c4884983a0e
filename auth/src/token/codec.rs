use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use hmac::Hmac;
use hmac::Mac;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::claims::TokenClaims;
use super::errors::KeyError;
use super::errors::TokenError;
use super::key::Environment;
use super::key::SigningKey;

type HmacSha256 = Hmac<Sha256>;

const SEPARATOR: char = '.';

/// Signed, bearer-presented token string.
///
/// Wire format: `base64url(claims-json).hex(hmac-sha256(key, payload-segment))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Token encoder and verifier.
///
/// Stateless apart from the signing key, which is read-only after construction.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    key: SigningKey,
}

impl TokenCodec {
    /// Create a codec with a signing key.
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Create a codec for a deployment environment.
    ///
    /// # Errors
    /// * `FallbackInProduction` - The development fallback key was supplied for production
    pub fn for_environment(key: SigningKey, environment: Environment) -> Result<Self, KeyError> {
        if environment == Environment::Production && key.is_fallback() {
            return Err(KeyError::FallbackInProduction);
        }
        Ok(Self::new(key))
    }

    pub fn key(&self) -> &SigningKey {
        &self.key
    }

    /// Encode claims into a signed token expiring `ttl` from now.
    ///
    /// # Errors
    /// * `EncodingFailed` - Claims could not be serialized
    pub fn encode(&self, claims: &TokenClaims, ttl: Duration) -> Result<Token, TokenError> {
        self.encode_at(claims, ttl, Utc::now())
    }

    /// Encode claims into a signed token expiring `ttl` after `now`.
    ///
    /// Deterministic for identical claims, ttl, `now` and key.
    ///
    /// # Errors
    /// * `EncodingFailed` - Claims could not be serialized
    pub fn encode_at(
        &self,
        claims: &TokenClaims,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Token, TokenError> {
        let claims = claims
            .clone()
            .with_expiration(now.timestamp() + ttl.num_seconds());

        let json =
            serde_json::to_vec(&claims).map_err(|e| TokenError::EncodingFailed(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = self.sign(payload.as_bytes());

        Ok(Token(format!("{}{}{}", payload, SEPARATOR, signature)))
    }

    /// Decode and verify a token against the current time.
    ///
    /// # Errors
    /// * `Malformed` - Token is not two non-empty segments, or the payload is not claims JSON
    /// * `BadSignature` - Signature does not match the payload
    /// * `Expired` - Current time is at or past `exp`
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.decode_at(token, Utc::now())
    }

    /// Decode and verify a token as of `now`.
    ///
    /// The payload JSON is only parsed after the signature has been checked.
    ///
    /// # Errors
    /// * `Malformed` - Token is not two non-empty segments, or the payload is not claims JSON
    /// * `BadSignature` - Signature does not match the payload
    /// * `Expired` - `now` is at or past `exp`
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let (payload, signature) = split_segments(token)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| TokenError::Malformed(format!("payload is not base64url: {}", e)))?;

        let expected = self.sign(payload.as_bytes());
        if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            return Err(TokenError::BadSignature);
        }

        let claims: TokenClaims = serde_json::from_slice(&json)
            .map_err(|e| TokenError::Malformed(format!("payload is not claims json: {}", e)))?;

        if claims.is_expired(now.timestamp()) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn sign(&self, payload: &[u8]) -> String {
        let mut mac =
            HmacSha256::new_from_slice(self.key.as_bytes()).expect("HMAC accepts keys of any size");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }
}

fn split_segments(token: &str) -> Result<(&str, &str), TokenError> {
    let mut segments = token.split(SEPARATOR);

    match (segments.next(), segments.next(), segments.next()) {
        (Some(payload), Some(signature), None) if !payload.is_empty() && !signature.is_empty() => {
            Ok((payload, signature))
        }
        _ => Err(TokenError::Malformed(
            "expected two non-empty segments".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const SECRET: &[u8] = b"test_secret_key_at_least_32_bytes!";

    fn codec() -> TokenCodec {
        TokenCodec::new(SigningKey::new(SECRET).expect("Failed to create key"))
    }

    fn issued_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn flip(c: char) -> char {
        if c == '0' {
            '1'
        } else {
            '0'
        }
    }

    #[test]
    fn test_encode_and_decode() {
        let codec = codec();
        let claims = TokenClaims::for_user(42, "alice").with_extra("role", "user");

        let token = codec
            .encode(&claims, Duration::minutes(30))
            .expect("Failed to encode token");
        let decoded = codec.decode(token.as_str()).expect("Failed to decode token");

        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.user_id, claims.user_id);
        assert_eq!(decoded.extra, claims.extra);
    }

    #[test]
    fn test_expiry_is_issue_time_plus_ttl() {
        let codec = codec();
        let now = issued_at();

        let token = codec
            .encode_at(&TokenClaims::for_user(1, "bob"), Duration::seconds(90), now)
            .expect("Failed to encode token");
        let decoded = codec.decode_at(token.as_str(), now).expect("Failed to decode token");

        assert_eq!(decoded.exp, now.timestamp() + 90);
    }

    #[test]
    fn test_wire_format() {
        let codec = codec();
        let token = codec
            .encode_at(&TokenClaims::for_user(42, "alice"), Duration::minutes(30), issued_at())
            .expect("Failed to encode token");

        let (payload, signature) = token.as_str().split_once('.').expect("Missing separator");
        let json = URL_SAFE_NO_PAD.decode(payload).expect("Payload is not base64url");
        let expected_exp = issued_at().timestamp() + 1800;

        assert_eq!(
            String::from_utf8(json).unwrap(),
            format!(r#"{{"sub":"alice","user_id":42,"exp":{}}}"#, expected_exp)
        );
        assert!(!payload.contains('='));
        assert_eq!(signature.len(), 64);
        assert!(signature
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let codec = codec();
        let claims = TokenClaims::for_user(42, "alice");

        let first = codec
            .encode_at(&claims, Duration::minutes(5), issued_at())
            .expect("Failed to encode token");
        let second = codec
            .encode_at(&claims, Duration::minutes(5), issued_at())
            .expect("Failed to encode token");
        let later = codec
            .encode_at(&claims, Duration::minutes(5), issued_at() + Duration::seconds(1))
            .expect("Failed to encode token");

        assert_eq!(first, second);
        assert_ne!(first, later);
    }

    #[test]
    fn test_tampered_signature_is_rejected() {
        let codec = codec();
        let token = codec
            .encode_at(&TokenClaims::for_user(42, "alice"), Duration::minutes(30), issued_at())
            .expect("Failed to encode token")
            .into_string();
        let signature_start = token.find('.').unwrap() + 1;

        for index in signature_start..token.len() {
            let mut chars: Vec<char> = token.chars().collect();
            chars[index] = flip(chars[index]);
            let tampered: String = chars.into_iter().collect();

            assert_eq!(
                codec.decode_at(&tampered, issued_at()),
                Err(TokenError::BadSignature),
                "tampered index {}",
                index
            );
        }
    }

    #[test]
    fn test_uppercase_signature_is_rejected() {
        let codec = codec();
        let token = codec
            .encode_at(&TokenClaims::for_user(42, "alice"), Duration::minutes(30), issued_at())
            .expect("Failed to encode token")
            .into_string();
        let (payload, signature) = token.split_once('.').unwrap();
        let shouted = format!("{}.{}", payload, signature.to_uppercase());

        assert_eq!(
            codec.decode_at(&shouted, issued_at()),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_non_hex_signature_is_rejected() {
        let codec = codec();
        let token = codec
            .encode_at(&TokenClaims::for_user(42, "alice"), Duration::minutes(30), issued_at())
            .expect("Failed to encode token")
            .into_string();
        let (payload, _) = token.split_once('.').unwrap();

        assert_eq!(
            codec.decode_at(&format!("{}.not-hex-at-all", payload), issued_at()),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let codec = codec();
        let token = codec
            .encode_at(&TokenClaims::for_user(42, "alice"), Duration::minutes(30), issued_at())
            .expect("Failed to encode token")
            .into_string();
        let (_, signature) = token.split_once('.').unwrap();

        let forged_claims = TokenClaims::for_user(1, "admin").with_expiration(i64::MAX);
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{}.{}", forged_payload, signature);

        assert_eq!(
            codec.decode_at(&forged, issued_at()),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_negative_ttl_is_expired() {
        let codec = codec();
        let token = codec
            .encode(&TokenClaims::for_user(42, "alice"), Duration::seconds(-1))
            .expect("Failed to encode token");

        assert_eq!(codec.decode(token.as_str()), Err(TokenError::Expired));
    }

    #[test]
    fn test_decoded_after_expiry_is_expired() {
        let codec = codec();
        let token = codec
            .encode_at(&TokenClaims::for_user(42, "alice"), Duration::minutes(30), issued_at())
            .expect("Failed to encode token");

        let at_expiry = issued_at() + Duration::minutes(30);
        assert_eq!(
            codec.decode_at(token.as_str(), at_expiry),
            Err(TokenError::Expired)
        );
        assert!(codec
            .decode_at(token.as_str(), at_expiry - Duration::seconds(1))
            .is_ok());
    }

    #[test]
    fn test_missing_exp_is_expired() {
        let codec = codec();
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"alice","user_id":42}"#);
        let token = format!("{}.{}", payload, codec.sign(payload.as_bytes()));

        assert_eq!(
            codec.decode_at(&token, issued_at()),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_malformed_tokens() {
        let codec = codec();

        for token in ["", "abc", "a.b.c", "a.", ".b", ".", "..", "a..b"] {
            assert!(
                matches!(codec.decode(token), Err(TokenError::Malformed(_))),
                "token {:?}",
                token
            );
        }
    }

    #[test]
    fn test_extra_separator_is_malformed() {
        let codec = codec();
        let token = codec
            .encode(&TokenClaims::for_user(42, "alice"), Duration::minutes(30))
            .expect("Failed to encode token");

        let extended = format!("{}.deadbeef", token);
        assert!(matches!(
            codec.decode(&extended),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_padded_payload_is_malformed() {
        let codec = codec();
        let payload = format!("{}=", URL_SAFE_NO_PAD.encode(br#"{"exp":1}"#));
        let token = format!("{}.{}", payload, codec.sign(payload.as_bytes()));

        assert!(matches!(
            codec.decode(&token),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_signed_non_json_payload_is_malformed() {
        let codec = codec();
        let payload = URL_SAFE_NO_PAD.encode(b"not json");
        let token = format!("{}.{}", payload, codec.sign(payload.as_bytes()));

        assert!(matches!(
            codec.decode(&token),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_with_wrong_secret() {
        let codec1 = TokenCodec::new(SigningKey::new("secret1_at_least_32_bytes_long_key!").unwrap());
        let codec2 = TokenCodec::new(SigningKey::new("secret2_at_least_32_bytes_long_key!").unwrap());

        let token = codec1
            .encode(&TokenClaims::for_user(42, "alice"), Duration::minutes(30))
            .expect("Failed to encode token");

        assert_eq!(
            codec2.decode(token.as_str()),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_issue_then_decode_later_scenario() {
        let codec = codec();
        let claims = TokenClaims::new().with_subject("alice").with_user_id(42);

        let token = codec
            .encode_at(&claims, Duration::minutes(30), issued_at())
            .expect("Failed to encode token");

        let decoded = codec
            .decode_at(token.as_str(), issued_at() + Duration::minutes(10))
            .expect("Failed to decode token");
        assert_eq!(decoded.sub, Some("alice".to_string()));
        assert_eq!(decoded.user_id, Some(42));
        assert_eq!(decoded.exp, issued_at().timestamp() + 1800);

        let other = TokenCodec::new(SigningKey::new("a-completely-different-key").unwrap());
        assert_eq!(
            other.decode_at(token.as_str(), issued_at() + Duration::minutes(10)),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_fallback_key_refused_for_production() {
        let result =
            TokenCodec::for_environment(SigningKey::development_fallback(), Environment::Production);
        assert!(matches!(result, Err(KeyError::FallbackInProduction)));

        let result =
            TokenCodec::for_environment(SigningKey::development_fallback(), Environment::Development);
        assert!(result.is_ok());
    }
}
