//! Link-header pagination.
//!
//! GitHub list endpoints advertise the next page in a `Link` header:
//!
//! ```text
//! Link: <https://api.github.com/orgs/acme/members?page=2>; rel="next", <...>; rel="last"
//! ```
//!
//! [`fetch_all`] follows `rel="next"` until the server stops sending one,
//! concatenating every page's items in arrival order.

use copilot_metrics_models::{Seat, SeatsPage};
use reqwest::StatusCode;
use reqwest::header::LINK;
use serde::de::DeserializeOwned;

use crate::FetchError;
use crate::github::GitHubClient;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// A decoded response page that contributes a list of items.
pub trait Page: DeserializeOwned {
    /// The item type accumulated across pages.
    type Item;

    /// Consumes the page, returning its items in order.
    fn into_items(self) -> Vec<Self::Item>;
}

impl<T: DeserializeOwned> Page for Vec<T> {
    type Item = T;

    fn into_items(self) -> Vec<T> {
        self
    }
}

impl Page for SeatsPage {
    type Item = Seat;

    fn into_items(self) -> Vec<Seat> {
        self.seats
    }
}

/// What a `404 Not Found` on any page means for the fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFound {
    /// The scope is optional (e.g. a team); 404 means "no data".
    Empty,
    /// 404 is an error like any other unexpected status.
    Error,
}

/// Fetches `path` and every page after it, returning all items in page
/// order.
///
/// Stops when a response has no `rel="next"` link, or when the client's
/// page cap is reached.
///
/// # Errors
///
/// * [`FetchError::Http`] / [`FetchError::InvalidUrl`] on transport failure
/// * [`FetchError::Status`] on any non-2xx status other than a tolerated 404
/// * [`FetchError::Decode`] if a page body is not the expected JSON
pub async fn fetch_all<P: Page>(
    client: &GitHubClient,
    path: &str,
    not_found: NotFound,
) -> Result<Vec<P::Item>, FetchError> {
    let mut items = Vec::new();
    let mut next = Some(path.to_string());
    let mut pages: u32 = 0;

    while let Some(current) = next.take() {
        if let Some(max) = client.max_pages()
            && pages >= max
        {
            log::warn!(
                "Reached page cap of {max} for {path}, returning {} items fetched so far",
                items.len()
            );
            break;
        }

        let response = client.get(&current).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND && not_found == NotFound::Empty {
            log::warn!("{current} returned 404, treating as no data");
            return Ok(items);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("{current} returned {status}: {}", preview(&body));
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let link = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_next_link);

        let text = response.text().await?;
        let page: P = serde_json::from_str(&text).map_err(|e| {
            log::error!("Failed to decode {current}: {e}\n  body: {}", preview(&text));
            e
        })?;

        let page_items = page.into_items();
        pages += 1;
        log::debug!(
            "Page {pages} of {path}: {} items (total: {})",
            page_items.len(),
            items.len() + page_items.len()
        );
        items.extend(page_items);

        next = link.and_then(|link| resolve_next_path(client.base_url(), &link));
        if let Some(next) = &next {
            log::debug!("Next page path: {next}");
        }
    }

    Ok(items)
}

/// Extracts the `rel="next"` target from a `Link` header value.
///
/// The `rel` parameter may be quoted or bare and may list several
/// space-separated relation types.
#[must_use]
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|link| {
        let mut parts = link.split(';');
        let target = parts.next()?.trim();
        parts
            .any(is_next_rel)
            .then(|| target.trim_start_matches('<').trim_end_matches('>').to_string())
            .filter(|target| !target.is_empty())
    })
}

fn is_next_rel(param: &str) -> bool {
    let Some((key, value)) = param.split_once('=') else {
        return false;
    };
    key.trim().eq_ignore_ascii_case("rel")
        && value
            .trim()
            .trim_matches('"')
            .split_ascii_whitespace()
            .any(|rel| rel.eq_ignore_ascii_case("next"))
}

/// Normalizes a next-page reference to a path relative to `base_url`.
///
/// Relative references are returned unchanged. Absolute URLs under
/// `base_url` have that prefix stripped. Absolute URLs on another host fall
/// back to everything after the host; if there is nothing after the host,
/// pagination ends.
#[must_use]
pub fn resolve_next_path(base_url: &str, next: &str) -> Option<String> {
    if !(next.starts_with("http://") || next.starts_with("https://")) {
        return Some(next.to_string());
    }

    if let Some(rest) = next.strip_prefix(base_url) {
        return Some(if rest.starts_with('/') {
            rest.to_string()
        } else {
            format!("/{rest}")
        });
    }

    log::warn!("Next page URL {next} does not match base URL {base_url}, using its path");

    let parts: Vec<&str> = next.splitn(4, '/').collect();
    parts.get(3).map(|path| format!("/{path}"))
}

fn preview(text: &str) -> &str {
    if text.len() <= BODY_PREVIEW_LEN {
        return text;
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
