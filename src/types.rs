//! NewType wrappers for strong typing throughout the auth core.
//!
//! These types prevent accidental mixing of semantically different strings
//! (e.g., passing a session id where a username is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// Unique, primary identity of a registered user.
    ///
    /// Usernames are compared by exact string equality everywhere, including
    /// ownership checks in the authorization guard.
    Username
);

newtype_string!(
    /// Opaque session identifier delivered to browsers as a cookie.
    ///
    /// Generated from 128 bits of randomness and encoded base64url without
    /// padding, so it is always 22 characters long.
    SessionId
);

newtype_string!(
    /// Salted SHA-512 digest of a password, base64url encoded.
    PasswordHash
);

newtype_string!(
    /// Stable identifier of a post.
    PostId
);

newtype_string!(
    /// Stable identifier of a comment.
    CommentId
);

/// Kind of content resource an authorization decision is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Post,
    Comment,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_creation() {
        let name = Username::new("alice");
        assert_eq!(name.as_str(), "alice");
        assert_eq!(name.to_string(), "alice");
    }

    #[test]
    fn test_username_from_string() {
        let name: Username = "alice".into();
        assert_eq!(name.as_str(), "alice");

        let name: Username = String::from("bob").into();
        assert_eq!(name.as_str(), "bob");
    }

    #[test]
    fn test_session_id_into_inner() {
        let id = SessionId::new("abc");
        let inner: String = id.into_inner();
        assert_eq!(inner, "abc");
    }

    #[test]
    fn test_username_serde_is_transparent() {
        let name = Username::new("alice");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"alice\"");

        let parsed: Username = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, name);
    }

    #[test]
    fn test_type_equality() {
        assert_eq!(PostId::new("p1"), PostId::new("p1"));
        assert_ne!(PostId::new("p1"), PostId::new("p2"));
    }

    #[test]
    fn test_borrow() {
        use std::borrow::Borrow;
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(Username::new("alice"));
        let owned = Username::new("alice");
        let s: &str = owned.borrow();
        assert!(set.contains(s));
    }

    #[test]
    fn test_resource_kind() {
        assert_eq!(ResourceKind::Post.as_str(), "post");
        assert_eq!(ResourceKind::Comment.to_string(), "comment");
        assert_eq!(
            serde_json::to_string(&ResourceKind::Comment).unwrap(),
            "\"comment\""
        );
    }
}
