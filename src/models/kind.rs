//! Collection kinds tracked per repository.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A kind of membership collection attached to a repository.
///
/// Declaration order is the notification order: stars before forks before
/// watchers before dependents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Stargazers,
    Forks,
    Watchers,
    Dependents,
}

impl CollectionKind {
    /// All kinds in notification order.
    pub const ALL: [CollectionKind; 4] = [
        CollectionKind::Stargazers,
        CollectionKind::Forks,
        CollectionKind::Watchers,
        CollectionKind::Dependents,
    ];

    /// Stable key used in the snapshot document.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Stargazers => "stargazers",
            CollectionKind::Forks => "forks",
            CollectionKind::Watchers => "watchers",
            CollectionKind::Dependents => "dependents",
        }
    }

    /// Human-readable singular label for log output.
    pub fn label(&self) -> &'static str {
        match self {
            CollectionKind::Stargazers => "stargazer",
            CollectionKind::Forks => "fork",
            CollectionKind::Watchers => "watcher",
            CollectionKind::Dependents => "dependent",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_keys() {
        assert_eq!(CollectionKind::Stargazers.as_str(), "stargazers");
        assert_eq!(CollectionKind::Dependents.as_str(), "dependents");
    }

    #[test]
    fn test_notification_order() {
        let mut kinds = vec![
            CollectionKind::Dependents,
            CollectionKind::Stargazers,
            CollectionKind::Watchers,
            CollectionKind::Forks,
        ];
        kinds.sort();
        assert_eq!(kinds, CollectionKind::ALL.to_vec());
    }

    #[test]
    fn test_serde_round_trip() {
        let json = serde_json::to_string(&CollectionKind::Forks).unwrap();
        assert_eq!(json, "\"forks\"");
        let kind: CollectionKind = serde_json::from_str("\"watchers\"").unwrap();
        assert_eq!(kind, CollectionKind::Watchers);
    }
}
