//! Dependents collection source, scraped from the network/dependents page.
//!
//! There is no REST endpoint for dependents, so this source parses the web
//! page. Before anything is extracted the page must carry its structural
//! landmark (`#dependents`); a page without it is a failed fetch, never an
//! empty collection — redesigns of the page must not be mistaken for
//! everyone un-depending.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CollectionKind, MemberRecord, Repo};
use crate::utils::resolve_url;

use super::client::{GithubClient, collect_pages};
use super::sources::CollectionSource;

const LANDMARK_SELECTOR: &str = "#dependents";
const ROW_SELECTOR: &str = r#"#dependents .Box-row a[data-hovercard-type="repository"]"#;
const PAGINATE_SELECTOR: &str = ".paginate-container a";

/// Repositories depending on a subject repository.
pub struct DependentSource {
    client: Arc<GithubClient>,
    html_base: String,
    max_retries: u32,
}

impl DependentSource {
    pub fn new(client: Arc<GithubClient>, html_base: &str, max_retries: u32) -> Self {
        Self {
            client,
            html_base: html_base.trim_end_matches('/').to_string(),
            max_retries,
        }
    }
}

#[async_trait]
impl CollectionSource for DependentSource {
    fn kind(&self) -> CollectionKind {
        CollectionKind::Dependents
    }

    async fn members(&self, repo: &Repo) -> Result<Vec<MemberRecord>> {
        let first = format!("{}/{}/network/dependents", self.html_base, repo.full_name);
        collect_pages(first, move |url| async move {
            let body = self.client.fetch_html(&url, self.max_retries).await?;
            let page = parse_dependents_page(&body, &url)?;
            Ok((page.records, page.next))
        })
        .await
    }
}

/// One parsed dependents page.
#[derive(Debug)]
struct DependentsPage {
    records: Vec<MemberRecord>,
    next: Option<String>,
}

/// Parse one dependents page body.
///
/// Fails with [`AppError::Landmark`] when the expected page structure is
/// absent.
fn parse_dependents_page(body: &str, page_url: &str) -> Result<DependentsPage> {
    let document = Html::parse_document(body);

    let landmark = selector(LANDMARK_SELECTOR)?;
    if document.select(&landmark).next().is_none() {
        return Err(AppError::Landmark {
            url: page_url.to_string(),
        });
    }

    let base = Url::parse(page_url)?;

    let rows = selector(ROW_SELECTOR)?;
    let mut records = Vec::new();
    for anchor in document.select(&rows) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let identity = href.trim_start_matches('/').to_string();
        if identity.is_empty() {
            continue;
        }
        records.push(MemberRecord::new(identity, resolve_url(&base, href)));
    }

    let paginate = selector(PAGINATE_SELECTOR)?;
    let next = document
        .select(&paginate)
        .find(|a| a.text().collect::<String>().trim() == "Next")
        .and_then(|a| a.value().attr("href"))
        .map(|href| resolve_url(&base, href));

    Ok(DependentsPage { records, next })
}

fn selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw).map_err(|e| AppError::selector(raw, format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_URL: &str = "https://github.com/netresearch/timer/network/dependents";

    fn page(rows: &str, paginate: &str) -> String {
        format!(
            r#"<html><body>
            <div id="dependents">
              <div class="Box">
                {rows}
              </div>
            </div>
            <div class="paginate-container">{paginate}</div>
            </body></html>"#
        )
    }

    fn row(full_name: &str) -> String {
        format!(
            r#"<div class="Box-row">
              <a data-hovercard-type="user" href="/{owner}">{owner}</a> /
              <a data-hovercard-type="repository" href="/{full_name}">{name}</a>
            </div>"#,
            owner = full_name.split('/').next().unwrap_or(""),
            name = full_name.split('/').nth(1).unwrap_or(""),
        )
    }

    #[test]
    fn test_extracts_dependent_rows() {
        let body = page(&format!("{}{}", row("alice/app"), row("bob/tool")), "");
        let parsed = parse_dependents_page(&body, PAGE_URL).unwrap();

        let identities: Vec<_> = parsed.records.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(identities, vec!["alice/app", "bob/tool"]);
        assert_eq!(parsed.records[0].html_url, "https://github.com/alice/app");
        assert!(parsed.next.is_none());
    }

    #[test]
    fn test_missing_landmark_is_a_fetch_failure() {
        let body = "<html><body><p>Dependency graph is being generated</p></body></html>";
        let result = parse_dependents_page(body, PAGE_URL);
        assert!(matches!(result, Err(AppError::Landmark { .. })));
    }

    #[test]
    fn test_landmark_with_no_rows_is_empty_not_error() {
        let body = page("", "");
        let parsed = parse_dependents_page(&body, PAGE_URL).unwrap();
        assert!(parsed.records.is_empty());
    }

    #[test]
    fn test_next_page_link() {
        let body = page(
            &row("alice/app"),
            r#"<a href="https://github.com/netresearch/timer/network/dependents?dependents_after=abc">Next</a>"#,
        );
        let parsed = parse_dependents_page(&body, PAGE_URL).unwrap();
        assert_eq!(
            parsed.next.as_deref(),
            Some("https://github.com/netresearch/timer/network/dependents?dependents_after=abc")
        );
    }

    #[tokio::test]
    async fn test_page_walk_follows_next_until_exhausted() {
        let first = page(
            &row("alice/app"),
            r#"<a href="?dependents_after=abc">Next</a>"#,
        );
        let second = page(&row("bob/tool"), "");

        let records = collect_pages(PAGE_URL.to_string(), |url| {
            let body = if url == PAGE_URL {
                first.clone()
            } else {
                second.clone()
            };
            async move {
                let parsed = parse_dependents_page(&body, &url)?;
                Ok((parsed.records, parsed.next))
            }
        })
        .await
        .unwrap();

        let identities: Vec<_> = records.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(identities, vec!["alice/app", "bob/tool"]);
    }

    #[test]
    fn test_previous_link_is_not_next() {
        let body = page(
            &row("alice/app"),
            r#"<a href="?dependents_before=abc">Previous</a>"#,
        );
        let parsed = parse_dependents_page(&body, PAGE_URL).unwrap();
        assert!(parsed.next.is_none());
    }
}
