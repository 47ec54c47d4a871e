//! Collection member records.

use serde::{Deserialize, Serialize};

/// One member of a collection, reduced to what rendering needs.
///
/// Only `identity` participates in diffing; everything else is
/// render-time decoration and is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberRecord {
    /// Identity key: a user login for stargazers/watchers, an
    /// `owner/name` for forks/dependents.
    pub identity: String,

    /// Display text for the member link (defaults to the identity)
    pub display_name: String,

    /// Web URL of the member
    pub html_url: String,

    /// Avatar URL, when the source provides one
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl MemberRecord {
    /// Create a record whose display name is the identity itself.
    pub fn new(identity: impl Into<String>, html_url: impl Into<String>) -> Self {
        let identity = identity.into();
        Self {
            display_name: identity.clone(),
            identity,
            html_url: html_url.into(),
            avatar_url: None,
        }
    }
}

/// Enrichment profile looked up per identity at render time.
///
/// Cached in memory for the lifetime of one run only.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub login: String,

    /// Human name, when the user has one set
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults_display_to_identity() {
        let record = MemberRecord::new("octocat", "https://github.com/octocat");
        assert_eq!(record.display_name, "octocat");
        assert!(record.avatar_url.is_none());
    }

    #[test]
    fn test_profile_tolerates_missing_fields() {
        let profile: Profile = serde_json::from_str(r#"{"login": "octocat"}"#).unwrap();
        assert_eq!(profile.login, "octocat");
        assert!(profile.name.is_none());
    }
}
