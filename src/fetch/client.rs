//! Authenticated GitHub HTTP client with pagination and retry.

use std::future::Future;
use std::time::Duration;

use regex::Regex;
use reqwest::header::{ACCEPT, AUTHORIZATION, LINK};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{FetchConfig, GithubConfig};

use super::retry::{RetryPolicy, Verdict, parse_retry_after};

/// Accept header for plain REST endpoints.
pub const ACCEPT_JSON: &str = "application/vnd.github+json";

/// Accept header that makes the stargazers endpoint include `starred_at`
/// and nest the user record.
pub const ACCEPT_STAR: &str = "application/vnd.github.star+json";

const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";

/// One logical list request: where to fetch, how to negotiate content,
/// and how hard to retry.
#[derive(Debug, Clone)]
pub struct FetchDescriptor {
    pub url: String,
    pub accept: &'static str,
    pub max_retries: u32,
}

impl FetchDescriptor {
    pub fn new(url: impl Into<String>, accept: &'static str, max_retries: u32) -> Self {
        Self {
            url: url.into(),
            accept,
            max_retries,
        }
    }
}

/// HTTP client for the GitHub API and web pages.
///
/// Purely functional with respect to in-memory state: the only side effect
/// is network I/O.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    token: String,
    api_base: String,
    request_delay: Duration,
    default_retries: u32,
}

impl GithubClient {
    pub fn new(
        github: &GithubConfig,
        fetch: &FetchConfig,
        token: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(&github.user_agent)
            .timeout(Duration::from_secs(fetch.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            token: token.into(),
            api_base: github.api_base.trim_end_matches('/').to_string(),
            request_delay: Duration::from_millis(fetch.request_delay_ms),
            default_retries: fetch.max_retries,
        })
    }

    /// Build a full API URL from a path like `/repos/{full_name}/forks`.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Issue one GET through the retry policy until it proceeds or the
    /// budget runs out.
    async fn get_with_retry(
        &self,
        url: &str,
        accept: &str,
        authed: bool,
        policy: &RetryPolicy,
    ) -> Result<reqwest::Response> {
        let mut attempt: u32 = 1;
        loop {
            let mut request = self.http.get(url).header(ACCEPT, accept);
            if authed {
                request = request
                    .header(AUTHORIZATION, format!("Bearer {}", self.token))
                    .header(API_VERSION_HEADER, API_VERSION);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let retry_after = parse_retry_after(response.headers());
                    match policy.on_status(status, retry_after, attempt) {
                        Verdict::Proceed => return Ok(response),
                        Verdict::RetryAfter(delay) => {
                            log::warn!(
                                "GET {} returned {}, retrying in {}s (attempt {}/{})",
                                url,
                                status,
                                delay.as_secs(),
                                attempt,
                                policy.max_retries() + 1
                            );
                            tokio::time::sleep(delay).await;
                        }
                        Verdict::GiveUp if RetryPolicy::is_retryable_status(status) => {
                            return Err(AppError::RetryBudgetExhausted {
                                url: url.to_string(),
                                attempts: attempt,
                                last_error: format!("HTTP {status}"),
                            });
                        }
                        Verdict::GiveUp => {
                            return Err(AppError::fetch(url, format!("unexpected status {status}")));
                        }
                    }
                }
                Err(error) => match policy.on_error(attempt) {
                    Verdict::RetryAfter(delay) => {
                        log::warn!(
                            "GET {} failed ({}), retrying in {}s (attempt {}/{})",
                            url,
                            error,
                            delay.as_secs(),
                            attempt,
                            policy.max_retries() + 1
                        );
                        tokio::time::sleep(delay).await;
                    }
                    _ => {
                        return Err(AppError::RetryBudgetExhausted {
                            url: url.to_string(),
                            attempts: attempt,
                            last_error: error.to_string(),
                        });
                    }
                },
            }

            attempt += 1;
        }
    }

    /// Fetch a paginated list endpoint, following `Link: rel="next"`
    /// continuations until none remains.
    ///
    /// Pages are appended in request order; order within a page is the
    /// server's order.
    pub async fn fetch_paginated(&self, descriptor: &FetchDescriptor) -> Result<Vec<Value>> {
        let policy = RetryPolicy::new(descriptor.max_retries);
        let policy = &policy;
        let accept = descriptor.accept;

        collect_pages(descriptor.url.clone(), move |url| async move {
            let response = self.get_with_retry(&url, accept, true, policy).await?;
            let next = response
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_next_link);

            let page: Vec<Value> = response.json().await?;
            if next.is_some() && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
            Ok((page, next))
        })
        .await
    }

    /// Fetch a single JSON object (profile enrichment lookups).
    pub async fn fetch_json(&self, url: &str) -> Result<Value> {
        let policy = RetryPolicy::new(self.default_retries);
        let response = self.get_with_retry(url, ACCEPT_JSON, true, &policy).await?;
        Ok(response.json().await?)
    }

    /// Fetch a web page body without API authentication.
    pub async fn fetch_html(&self, url: &str, max_retries: u32) -> Result<String> {
        let policy = RetryPolicy::new(max_retries);
        let response = self
            .get_with_retry(url, "text/html", false, &policy)
            .await?;
        Ok(response.text().await?)
    }
}

/// Accumulate records across a paginated walk.
///
/// `fetch_page` resolves one page URL to its records plus the next page
/// URL, if any. Pages are requested strictly in sequence and appended in
/// request order; the first failed page aborts the whole walk.
pub(crate) async fn collect_pages<T, F, Fut>(first: String, mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Option<String>)>>,
{
    let mut records = Vec::new();
    let mut next = Some(first);

    while let Some(url) = next {
        let (page, continuation) = fetch_page(url).await?;
        records.extend(page);
        next = continuation;
    }

    Ok(records)
}

/// Extract the `rel="next"` target from an RFC 5988 `Link` header value.
pub fn parse_next_link(value: &str) -> Option<String> {
    let re = Regex::new(r#"<([^>]+)>\s*;\s*rel="next""#).ok()?;
    re.captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_next_link() {
        let value = r#"<https://api.github.com/repos/o/r/stargazers?page=2>; rel="next", <https://api.github.com/repos/o/r/stargazers?page=9>; rel="last""#;
        assert_eq!(
            parse_next_link(value).as_deref(),
            Some("https://api.github.com/repos/o/r/stargazers?page=2")
        );
    }

    #[test]
    fn test_parse_next_link_ignores_other_rels() {
        let value = r#"<https://api.github.com/x?page=1>; rel="prev", <https://api.github.com/x?page=3>; rel="last""#;
        assert_eq!(parse_next_link(value), None);
    }

    #[test]
    fn test_parse_next_link_prev_before_next() {
        let value = r#"<https://e/x?page=1>; rel="prev", <https://e/x?page=3>; rel="next""#;
        assert_eq!(parse_next_link(value).as_deref(), Some("https://e/x?page=3"));
    }

    #[tokio::test]
    async fn test_collect_pages_concatenates_in_request_order() {
        let records = collect_pages("page-1".to_string(), |url| async move {
            Ok(match url.as_str() {
                "page-1" => (vec!["a", "b"], Some("page-2".to_string())),
                "page-2" => (vec!["c", "d"], Some("page-3".to_string())),
                "page-3" => (vec!["e"], None),
                other => panic!("unexpected page {other}"),
            })
        })
        .await
        .unwrap();

        assert_eq!(records, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_collect_pages_single_page_needs_no_continuation() {
        let records = collect_pages("only".to_string(), |_| async move {
            Ok((vec![1, 2, 3], None))
        })
        .await
        .unwrap();
        assert_eq!(records, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_collect_pages_propagates_mid_walk_failure() {
        let result: Result<Vec<&str>> = collect_pages("page-1".to_string(), |url| async move {
            match url.as_str() {
                "page-1" => Ok((vec!["a"], Some("page-2".to_string()))),
                _ => Err(AppError::fetch(&url, "connection reset")),
            }
        })
        .await;

        assert!(result.is_err());
    }

    #[test]
    fn test_api_url_joins_cleanly() {
        let github = GithubConfig {
            api_base: "https://api.github.com/".to_string(),
            ..GithubConfig::default()
        };
        let client = GithubClient::new(&github, &FetchConfig::default(), "t").unwrap();
        assert_eq!(
            client.api_url("/orgs/netresearch/repos"),
            "https://api.github.com/orgs/netresearch/repos"
        );
    }
}
