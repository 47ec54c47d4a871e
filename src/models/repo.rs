//! Repository subject data structure.

use serde::{Deserialize, Serialize};

use super::CollectionKind;

/// A repository being watched.
///
/// Deserialized straight from the org repository listing. The aggregate
/// counters are refreshed every run and used only for message rendering,
/// never for diffing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repo {
    /// Short repository name
    pub name: String,

    /// Stable identity key, `owner/name`
    pub full_name: String,

    /// Canonical web URL
    pub html_url: String,

    /// Current star count
    #[serde(default)]
    pub stargazers_count: u64,

    /// Current fork count
    #[serde(default)]
    pub forks_count: u64,

    /// Current watcher (subscriber) count.
    ///
    /// The org listing endpoint omits this field (only the single-repo
    /// endpoint carries it), so rendered counts are refreshed from the
    /// fetched collection via [`Repo::with_member_count`].
    #[serde(default)]
    pub subscribers_count: u64,
}

impl Repo {
    /// Copy of this repo with the aggregate counter for `kind` replaced
    /// by the freshly fetched collection size.
    pub fn with_member_count(&self, kind: CollectionKind, count: u64) -> Self {
        let mut repo = self.clone();
        match kind {
            CollectionKind::Stargazers => repo.stargazers_count = count,
            CollectionKind::Forks => repo.forks_count = count,
            CollectionKind::Watchers => repo.subscribers_count = count,
            CollectionKind::Dependents => {}
        }
        repo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_listing_entry() {
        let json = r#"{
            "name": "timer",
            "full_name": "netresearch/timer",
            "html_url": "https://github.com/netresearch/timer",
            "stargazers_count": 42,
            "forks_count": 7,
            "extra_field_we_ignore": true
        }"#;
        let repo: Repo = serde_json::from_str(json).unwrap();
        assert_eq!(repo.full_name, "netresearch/timer");
        assert_eq!(repo.stargazers_count, 42);
        assert_eq!(repo.subscribers_count, 0);
    }

    #[test]
    fn test_with_member_count_refreshes_one_counter() {
        let repo: Repo = serde_json::from_str(
            r#"{"name": "timer", "full_name": "o/timer", "html_url": "https://github.com/o/timer", "stargazers_count": 42}"#,
        )
        .unwrap();

        let refreshed = repo.with_member_count(CollectionKind::Watchers, 3);
        assert_eq!(refreshed.subscribers_count, 3);
        assert_eq!(refreshed.stargazers_count, 42);

        // Dependents have no aggregate counter to refresh.
        let unchanged = repo.with_member_count(CollectionKind::Dependents, 9);
        assert_eq!(unchanged, repo);
    }
}
