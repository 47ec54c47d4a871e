//! Notification rendering, batching and delivery.
//!
//! Events render into Matrix-flavored Markdown one-liners. At most the
//! configured cap of individual messages is sent per run, in discovery
//! order; any overflow collapses into exactly one trailing summary message
//! pointing at the full run log. Delivery failures are logged and never
//! block later messages or snapshot persistence.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::fetch::GithubClient;
use crate::models::{CollectionKind, Event, Profile};

/// Webhook payload for one notification.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MatrixMessage {
    pub text: String,
    pub avatar_url: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// Per-run rendering context.
///
/// Holds the enrichment-lookup cache; scoped to one run and passed
/// explicitly, never a process-wide singleton.
#[derive(Default)]
pub struct RunContext {
    profiles: HashMap<String, Option<Profile>>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a user profile, caching the result (including misses) for
    /// the lifetime of this run. A failed lookup degrades to un-enriched
    /// rendering.
    pub async fn profile(&mut self, client: &GithubClient, login: &str) -> Option<Profile> {
        if let Some(cached) = self.profiles.get(login) {
            return cached.clone();
        }

        let url = client.api_url(&format!("/users/{login}"));
        let fetched = match client.fetch_json(&url).await {
            Ok(value) => serde_json::from_value::<Profile>(value).ok(),
            Err(error) => {
                log::debug!("Profile lookup failed for {login}: {error}");
                None
            }
        };

        self.profiles.insert(login.to_string(), fetched.clone());
        fetched
    }
}

/// Render one event into a webhook message.
pub fn render(event: &Event, profile: Option<&Profile>) -> MatrixMessage {
    let member = &event.member;
    let repo = &event.repo;

    let display_name = profile
        .and_then(|p| p.name.clone())
        .unwrap_or_else(|| member.display_name.clone());
    let avatar_url = member
        .avatar_url
        .clone()
        .or_else(|| profile.and_then(|p| p.avatar_url.clone()))
        .unwrap_or_default();

    let member_link = format!("[{}]({})", member.display_name, member.html_url);
    let repo_link = format!("[{}]({})", repo.name, repo.html_url);

    let text = match event.kind {
        CollectionKind::Stargazers => format!(
            "⭐ {} starred {} ({} ⭐)",
            member_link, repo_link, repo.stargazers_count
        ),
        CollectionKind::Forks => format!(
            "🍴 {} forked {} ({} forks)",
            member_link, repo_link, repo.forks_count
        ),
        CollectionKind::Watchers => format!(
            "👀 {} is watching {} ({} watchers)",
            member_link, repo_link, repo.subscribers_count
        ),
        CollectionKind::Dependents => {
            format!("🔗 {} now depends on {}", member_link, repo_link)
        }
    };

    MatrixMessage {
        text,
        avatar_url,
        display_name,
    }
}

/// Apply the batching cap: the first `cap` messages in order, plus one
/// summary message for any overflow.
pub fn plan(mut messages: Vec<MatrixMessage>, cap: usize, run_log_url: &str) -> Vec<MatrixMessage> {
    if messages.len() <= cap {
        return messages;
    }

    let overflow = messages.len() - cap;
    messages.truncate(cap);
    messages.push(MatrixMessage {
        text: format!("+{overflow} more new event(s) this run, see the [full log]({run_log_url})"),
        avatar_url: String::new(),
        display_name: "starwatch".to_string(),
    });
    messages
}

/// Fire-and-forget webhook sender.
pub struct Notifier {
    http: reqwest::Client,
    webhook_url: Option<String>,
    dry_run: bool,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>, timeout_secs: u64, dry_run: bool) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            http,
            webhook_url,
            dry_run,
        })
    }

    /// Send every planned message, in order. A per-message delivery
    /// failure is logged and later messages are still attempted. Returns
    /// the number delivered (or, in a dry run, rendered).
    pub async fn send_all(&self, messages: &[MatrixMessage]) -> usize {
        let mut sent = 0;
        for message in messages {
            if self.dry_run {
                log::info!("[dry-run] {}", message.text);
                sent += 1;
                continue;
            }
            match self.send(message).await {
                Ok(()) => {
                    log::info!("Notified: {}", message.text);
                    sent += 1;
                }
                Err(error) => log::warn!("Notification delivery failed: {error}"),
            }
        }
        sent
    }

    async fn send(&self, message: &MatrixMessage) -> Result<()> {
        let url = self
            .webhook_url
            .as_deref()
            .ok_or_else(|| AppError::notify("no webhook URL configured"))?;

        self.http
            .post(url)
            .json(message)
            .send()
            .await
            .map_err(AppError::notify)?
            .error_for_status()
            .map_err(AppError::notify)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemberRecord, Repo};

    fn sample_repo() -> Repo {
        Repo {
            name: "timer".to_string(),
            full_name: "netresearch/timer".to_string(),
            html_url: "https://github.com/netresearch/timer".to_string(),
            stargazers_count: 42,
            forks_count: 7,
            subscribers_count: 3,
        }
    }

    fn event(kind: CollectionKind, identity: &str) -> Event {
        Event {
            repo: sample_repo(),
            kind,
            member: MemberRecord::new(identity, format!("https://github.com/{identity}")),
        }
    }

    fn message(n: usize) -> MatrixMessage {
        MatrixMessage {
            text: format!("message {n}"),
            avatar_url: String::new(),
            display_name: "starwatch".to_string(),
        }
    }

    #[test]
    fn test_star_message_shape() {
        let rendered = render(&event(CollectionKind::Stargazers, "octocat"), None);
        assert_eq!(
            rendered.text,
            "⭐ [octocat](https://github.com/octocat) starred [timer](https://github.com/netresearch/timer) (42 ⭐)"
        );
        assert_eq!(rendered.display_name, "octocat");
    }

    #[test]
    fn test_dependent_message_has_no_count() {
        let rendered = render(&event(CollectionKind::Dependents, "alice/app"), None);
        assert_eq!(
            rendered.text,
            "🔗 [alice/app](https://github.com/alice/app) now depends on [timer](https://github.com/netresearch/timer)"
        );
    }

    #[test]
    fn test_profile_enriches_display_name_and_avatar() {
        let profile = Profile {
            login: "octocat".to_string(),
            name: Some("The Octocat".to_string()),
            avatar_url: Some("https://avatars.example/1".to_string()),
        };
        let rendered = render(&event(CollectionKind::Watchers, "octocat"), Some(&profile));
        assert_eq!(rendered.display_name, "The Octocat");
        assert_eq!(rendered.avatar_url, "https://avatars.example/1");
    }

    #[test]
    fn test_watcher_count_comes_from_fetched_collection() {
        // The org listing endpoint carries no subscribers_count; the
        // rendered count must come from the fetched watcher set instead
        // of the deserialization default.
        let listed: Repo = serde_json::from_str(
            r#"{
                "name": "timer",
                "full_name": "netresearch/timer",
                "html_url": "https://github.com/netresearch/timer",
                "stargazers_count": 42,
                "forks_count": 7,
                "watchers_count": 42
            }"#,
        )
        .unwrap();
        assert_eq!(listed.subscribers_count, 0);

        let event = Event {
            repo: listed.with_member_count(CollectionKind::Watchers, 3),
            kind: CollectionKind::Watchers,
            member: MemberRecord::new("octocat", "https://github.com/octocat"),
        };
        let rendered = render(&event, None);
        assert!(rendered.text.ends_with("(3 watchers)"), "{}", rendered.text);
    }

    #[test]
    fn test_payload_field_names() {
        let json = serde_json::to_value(message(1)).unwrap();
        assert!(json.get("text").is_some());
        assert!(json.get("avatar_url").is_some());
        assert!(json.get("displayName").is_some());
    }

    #[test]
    fn test_plan_under_cap_is_unchanged() {
        let messages: Vec<_> = (0..5).map(message).collect();
        let planned = plan(messages.clone(), 20, "https://log");
        assert_eq!(planned, messages);
    }

    #[test]
    fn test_plan_caps_and_appends_one_summary() {
        let messages: Vec<_> = (0..25).map(message).collect();
        let planned = plan(messages, 20, "https://example.com/log");

        assert_eq!(planned.len(), 21);
        assert_eq!(planned[0].text, "message 0");
        assert_eq!(planned[19].text, "message 19");
        assert!(planned[20].text.contains("+5 more"));
        assert!(planned[20].text.contains("https://example.com/log"));
    }

    #[test]
    fn test_plan_exactly_at_cap_has_no_summary() {
        let messages: Vec<_> = (0..20).map(message).collect();
        let planned = plan(messages, 20, "https://log");
        assert_eq!(planned.len(), 20);
    }
}
