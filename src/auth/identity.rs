//! Request credentials and the identities they resolve to.
//!
//! Browsers authenticate with a session cookie and programmatic clients with
//! a bearer token. The two mechanisms keep their own semantics (sessions: no
//! expiry, one per user; tokens: fixed expiry, unlimited, unrevocable), so
//! the resolved [`Identity`] records which one was used.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{SessionId, Username};

/// Default name of the session cookie.
pub const DEFAULT_SESSION_COOKIE: &str = "sessionid";

/// Default scheme expected in the `Authorization` header.
pub const DEFAULT_AUTH_SCHEME: &str = "Bearer";

/// Credential presented by a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    SessionCookie(SessionId),
    Bearer(String),
}

impl Credential {
    /// Pick the credential from raw header values.
    ///
    /// An `Authorization` header takes precedence over the cookie. A header
    /// that does not carry the expected scheme yields no credential rather
    /// than falling back to the cookie.
    pub fn from_headers(
        authorization: Option<&str>,
        cookie_header: Option<&str>,
        cookie_name: &str,
        scheme: &str,
    ) -> Option<Self> {
        if let Some(value) = authorization {
            return parse_authorization(value, scheme).map(|t| Self::Bearer(t.to_string()));
        }

        cookie_header
            .and_then(|header| cookie_value(header, cookie_name))
            .map(|v| Self::SessionCookie(SessionId::new(v)))
    }
}

/// Authenticated identity of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Identity {
    Session {
        username: Username,
        #[serde(skip)]
        session_id: SessionId,
    },
    Token {
        username: Username,
        expires_at: DateTime<Utc>,
    },
}

impl Identity {
    pub fn username(&self) -> &Username {
        match self {
            Self::Session { username, .. } | Self::Token { username, .. } => username,
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Self::Session { .. } => "session",
            Self::Token { .. } => "token",
        }
    }
}

/// Extract the token from `<scheme> <token>`.
///
/// The scheme is matched case-insensitively and the parts may be separated
/// by any whitespace.
pub fn parse_authorization<'a>(value: &'a str, scheme: &str) -> Option<&'a str> {
    let mut parts = value.split_whitespace();
    let presented = parts.next()?;
    let token = parts.next()?;
    if parts.next().is_some() || !presented.eq_ignore_ascii_case(scheme) {
        return None;
    }
    Some(token)
}

/// Find a cookie value in a `Cookie` header.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_authorization() {
        assert_eq!(parse_authorization("Bearer abc.def.ghi", "Bearer"), Some("abc.def.ghi"));
        assert_eq!(parse_authorization("bearer   abc", "Bearer"), Some("abc"));
        assert_eq!(parse_authorization("Bearer\tabc", "Bearer"), Some("abc"));
        assert_eq!(parse_authorization("Basic abc", "Bearer"), None);
        assert_eq!(parse_authorization("Bearer", "Bearer"), None);
        assert_eq!(parse_authorization("Bearer a b", "Bearer"), None);
        assert_eq!(parse_authorization("", "Bearer"), None);
    }

    #[test]
    fn test_cookie_value() {
        let header = "theme=dark; sessionid=abc123; other=1";
        assert_eq!(cookie_value(header, "sessionid"), Some("abc123"));
        assert_eq!(cookie_value(header, "missing"), None);
        assert_eq!(cookie_value("sessionid=", "sessionid"), None);
        assert_eq!(cookie_value("xsessionid=1", "sessionid"), None);
        assert_eq!(cookie_value("sessionid=\"quoted\"", "sessionid"), Some("quoted"));
    }

    #[test]
    fn test_authorization_header_wins() {
        let credential = Credential::from_headers(
            Some("Bearer tok"),
            Some("sessionid=abc"),
            DEFAULT_SESSION_COOKIE,
            DEFAULT_AUTH_SCHEME,
        );
        assert_eq!(credential, Some(Credential::Bearer("tok".to_string())));
    }

    #[test]
    fn test_cookie_used_without_authorization() {
        let credential = Credential::from_headers(
            None,
            Some("sessionid=abc"),
            DEFAULT_SESSION_COOKIE,
            DEFAULT_AUTH_SCHEME,
        );
        assert_eq!(
            credential,
            Some(Credential::SessionCookie(SessionId::new("abc")))
        );
    }

    #[test]
    fn test_bad_authorization_does_not_fall_back() {
        let credential = Credential::from_headers(
            Some("Basic dXNlcjpwdw=="),
            Some("sessionid=abc"),
            DEFAULT_SESSION_COOKIE,
            DEFAULT_AUTH_SCHEME,
        );
        assert_eq!(credential, None);
    }

    #[test]
    fn test_no_credentials() {
        assert_eq!(
            Credential::from_headers(None, None, DEFAULT_SESSION_COOKIE, DEFAULT_AUTH_SCHEME),
            None
        );
    }

    #[test]
    fn test_identity_accessors_and_serialization() {
        let session = Identity::Session {
            username: Username::new("alice"),
            session_id: SessionId::new("secret"),
        };
        assert_eq!(session.username().as_str(), "alice");
        assert_eq!(session.method(), "session");

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["method"], "session");
        assert_eq!(json["username"], "alice");
        assert!(json.get("session_id").is_none());

        let token = Identity::Token {
            username: Username::new("bob"),
            expires_at: Utc::now(),
        };
        assert_eq!(token.method(), "token");
        assert_eq!(serde_json::to_value(&token).unwrap()["method"], "token");
    }
}
