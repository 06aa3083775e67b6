//! Request and user identifiers
//!
//! Request IDs are the first 8 hex chars of a random v4 UUID, e.g. `3f9a1c0b`.
//! They are short enough to type into a support thread, which is why collisions
//! are possible and the store regenerates on conflict.

use serde::{Deserialize, Serialize};

/// Length of a generated request ID
pub const REQUEST_ID_LEN: usize = 8;

/// Generate a fresh request ID
pub fn generate_request_id() -> RequestId {
    let uuid = uuid::Uuid::new_v4();
    RequestId(uuid.simple().to_string()[..REQUEST_ID_LEN].to_string())
}

/// Opaque identifier of a craft request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Get the ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque handle to a platform user (requester or crafter)
///
/// The only capability the core needs from a user is rendering a mention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Get the ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render a mention of this user (`<@id>`)
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_id_format() {
        let id = generate_request_id();
        assert_eq!(id.as_str().len(), REQUEST_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_generate_request_id_varies() {
        let a = generate_request_id();
        let b = generate_request_id();
        let c = generate_request_id();
        // Three identical 32-bit random draws in a row would be a broken generator
        assert!(!(a == b && b == c));
    }

    #[test]
    fn test_user_mention() {
        let user = UserId::from("1234");
        assert_eq!(user.mention(), "<@1234>");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = RequestId::from("abcd1234");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""abcd1234""#);

        let user: UserId = serde_json::from_str(r#""42""#).unwrap();
        assert_eq!(user, UserId::from("42"));
    }
}
