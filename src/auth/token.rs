//! Stateless bearer tokens.
//!
//! Tokens are HS512-signed JWTs carrying the username and an absolute
//! expiry. Nothing is persisted: a token is valid iff its signature verifies
//! against the current [`SigningKey`] and it has not expired. There is no
//! revocation; replacing the key invalidates every outstanding token.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use tracing::debug;

use crate::auth::error::{AuthError, AuthResult};
use crate::types::Username;

type HmacSha512 = Hmac<Sha512>;

/// Default token lifetime: 7 days.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 168;

/// Length of a generated signing key in bytes.
pub const SIGNING_KEY_BYTES: usize = 64;

/// Secret used to sign and verify tokens.
///
/// Constructed once at startup and injected into [`TokenIssuer`].
#[derive(Clone)]
pub struct SigningKey {
    secret: Vec<u8>,
}

impl SigningKey {
    /// Generate a random key. Tokens signed with it do not survive a restart.
    pub fn generate() -> Self {
        let mut secret = vec![0u8; SIGNING_KEY_BYTES];
        rand::rng().fill_bytes(&mut secret);
        Self { secret }
    }

    pub fn from_bytes(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Decode a base64url key (padding optional), as stored in configuration.
    pub fn from_base64(encoded: &str) -> anyhow::Result<Self> {
        let secret = URL_SAFE_NO_PAD.decode(encoded.trim().trim_end_matches('='))?;
        if secret.len() < 32 {
            anyhow::bail!("signing secret must be at least 32 bytes, got {}", secret.len());
        }
        Ok(Self { secret })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("len", &self.secret.len())
            .finish()
    }
}

/// Claims embedded in a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "sub")]
    pub username: Username,
    /// Expiry as Unix seconds.
    #[serde(rename = "exp")]
    pub expires_at: i64,
    /// Issuance as Unix seconds.
    #[serde(rename = "iat")]
    pub issued_at: i64,
}

impl Claims {
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expires_at, 0)
    }
}

/// Issues and validates signed tokens.
pub struct TokenIssuer {
    key: SigningKey,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer with the default 168 hour lifetime.
    pub fn new(key: SigningKey) -> Self {
        Self::with_ttl(key, Duration::hours(DEFAULT_TOKEN_TTL_HOURS))
    }

    pub fn with_ttl(key: SigningKey, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(key.as_bytes()),
            decoding_key: DecodingKey::from_secret(key.as_bytes()),
            key,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a token for `username` expiring one lifetime from now.
    pub fn issue(&self, username: &Username) -> AuthResult<String> {
        self.issue_at(username, Utc::now())
    }

    /// Mint a token as if issued at `now`.
    pub fn issue_at(&self, username: &Username, now: DateTime<Utc>) -> AuthResult<String> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AuthError::Internal("token expiry out of range".to_string()))?;
        let claims = Claims {
            username: username.clone(),
            expires_at: expires_at.timestamp(),
            issued_at: now.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS512), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {}", e)))?;

        debug!("Issued token for {}", username);
        Ok(token)
    }

    /// Validate a token against the current time.
    pub fn validate(&self, token: &str) -> AuthResult<Claims> {
        self.validate_at(token, Utc::now())
    }

    /// Validate a token as of `now`.
    ///
    /// Checks run in order: structure, signature, claims, expiry.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<Claims> {
        let (signed, signature) = split_token(token)?;

        // Verify over the raw signed text first so that tampering with any
        // segment reports as a bad signature rather than a decode failure.
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::InvalidSignature)?;
        let mut mac = HmacSha512::new_from_slice(self.key.as_bytes())
            .map_err(|_| AuthError::InvalidSignature)?;
        mac.update(signed.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidSignature)?;

        let mut validation = Validation::new(Algorithm::HS512);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            })?
            .claims;

        if claims.expires_at <= now.timestamp() {
            return Err(AuthError::Expired);
        }

        Ok(claims)
    }
}

/// Split `header.payload.signature` into the signed text and the signature.
fn split_token(token: &str) -> AuthResult<(&str, &str)> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(AuthError::MalformedToken);
    }
    let signed_len = parts[0].len() + 1 + parts[1].len();
    Ok((&token[..signed_len], parts[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SigningKey::generate())
    }

    fn alice() -> Username {
        Username::new("alice")
    }

    #[test]
    fn test_issue_then_validate() {
        let issuer = issuer();
        let token = issuer.issue(&alice()).unwrap();

        let claims = issuer.validate(&token).unwrap();
        assert_eq!(claims.username, alice());
        assert_eq!(claims.expires_at - claims.issued_at, 168 * 3600);
    }

    #[test]
    fn test_token_shape() {
        let token = issuer().issue(&alice()).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS512);
    }

    #[test]
    fn test_expired_after_lifetime() {
        let issuer = issuer();
        let issued = Utc::now();
        let token = issuer.issue_at(&alice(), issued).unwrap();

        let just_before = issued + Duration::hours(168) - Duration::seconds(1);
        assert!(issuer.validate_at(&token, just_before).is_ok());

        let at_expiry = issued + Duration::hours(168);
        assert_eq!(
            issuer.validate_at(&token, at_expiry).unwrap_err(),
            AuthError::Expired
        );

        let later = issued + Duration::hours(169);
        assert_eq!(issuer.validate_at(&token, later).unwrap_err(), AuthError::Expired);
    }

    #[test]
    fn test_mutated_byte_in_any_segment_is_invalid_signature() {
        let issuer = issuer();
        let token = issuer.issue(&alice()).unwrap();

        for (i, ch) in token.char_indices() {
            if ch == '.' {
                continue;
            }
            let replacement = if ch == 'A' { 'B' } else { 'A' };
            let mut mutated = token.clone();
            mutated.replace_range(i..i + 1, &replacement.to_string());

            assert_eq!(
                issuer.validate(&mutated).unwrap_err(),
                AuthError::InvalidSignature,
                "mutation at byte {} was not rejected as a bad signature",
                i
            );
        }
    }

    #[test]
    fn test_other_key_is_invalid_signature() {
        let token = issuer().issue(&alice()).unwrap();
        assert_eq!(issuer().validate(&token).unwrap_err(), AuthError::InvalidSignature);
    }

    #[test]
    fn test_malformed_tokens() {
        let issuer = issuer();
        for token in ["", "abc", "a.b", "a..c", "a.b.c.d", ".b.c"] {
            assert_eq!(
                issuer.validate(token).unwrap_err(),
                AuthError::MalformedToken,
                "{:?}",
                token
            );
        }
    }

    #[test]
    fn test_correctly_signed_garbage_is_malformed() {
        let key = SigningKey::generate();
        let issuer = TokenIssuer::new(key.clone());

        let signed = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS512","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(r#"{"no_subject":true}"#)
        );
        let mut mac = HmacSha512::new_from_slice(key.as_bytes()).unwrap();
        mac.update(signed.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        let token = format!("{}.{}", signed, signature);

        assert_eq!(issuer.validate(&token).unwrap_err(), AuthError::MalformedToken);
    }

    #[test]
    fn test_signing_key_from_base64() {
        let raw = [9u8; 48];
        let encoded = URL_SAFE_NO_PAD.encode(raw);
        let key = SigningKey::from_base64(&encoded).unwrap();

        let a = TokenIssuer::new(key.clone());
        let b = TokenIssuer::new(SigningKey::from_bytes(raw.to_vec()));
        let token = a.issue(&alice()).unwrap();
        assert!(b.validate(&token).is_ok());

        assert!(SigningKey::from_base64("c2hvcnQ").is_err());
        assert!(SigningKey::from_base64("not base64 !!").is_err());
    }

    #[test]
    fn test_signing_key_debug_hides_secret() {
        let key = SigningKey::from_bytes(vec![1u8; 32]);
        assert_eq!(format!("{:?}", key), "SigningKey { len: 32 }");
    }

    #[test]
    fn test_expiry_overflow_is_internal_error() {
        let issuer = TokenIssuer::with_ttl(SigningKey::generate(), Duration::MAX);
        assert!(matches!(
            issuer.issue(&alice()),
            Err(AuthError::Internal(_))
        ));
    }

    #[test]
    fn test_custom_ttl() {
        let issuer = TokenIssuer::with_ttl(SigningKey::generate(), Duration::hours(1));
        let issued = Utc::now();
        let token = issuer.issue_at(&alice(), issued).unwrap();
        assert!(issuer.validate_at(&token, issued + Duration::minutes(59)).is_ok());
        assert_eq!(
            issuer
                .validate_at(&token, issued + Duration::minutes(61))
                .unwrap_err(),
            AuthError::Expired
        );
    }
}
