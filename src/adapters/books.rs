//! Google Books volumes API client.
//!
//! Builds the API query string from member input supporting the
//! `title:"..."`, `author:"..."` and `isbn:...` tags alongside free
//! search terms, fetches volume lists and single volumes.

use crate::config::CatalogConfig;
use crate::domain::WorkSummary;
use crate::error::{Result, TomeError};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

/// Google Books catalog client
#[derive(Clone)]
pub struct BooksClient {
    client: Client,
    base_url: String,
    api_key: String,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(rename = "totalItems")]
    total_items: u64,
    #[serde(default)]
    items: Vec<VolumeItem>,
}

#[derive(Debug, Deserialize)]
struct VolumeItem {
    id: String,
    #[serde(rename = "volumeInfo")]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    #[serde(default)]
    title: String,
    subtitle: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    categories: Vec<String>,
    description: Option<String>,
    page_count: Option<u32>,
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
struct ImageLinks {
    thumbnail: Option<String>,
    #[serde(rename = "smallThumbnail")]
    small_thumbnail: Option<String>,
}

impl BooksClient {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_results: config.max_results,
        }
    }

    /// Search the catalog. Returns the total match count reported by the
    /// API and up to `max_results` summaries.
    pub async fn find_volumes(&self, input: &str) -> Result<(u64, Vec<WorkSummary>)> {
        let query = build_search_query(input);
        debug!(%query, "Catalog search");

        let resp = self
            .client
            .get(format!("{}/volumes", self.base_url))
            .query(&[
                ("q", query.as_str()),
                ("maxResults", &self.max_results.to_string()),
                ("orderBy", "relevance"),
                ("key", &self.api_key),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            warn!("Catalog search failed with status {}", resp.status());
            return Ok((0, vec![]));
        }

        let body: VolumesResponse = resp.json().await?;
        let works = body.items.into_iter().map(into_work_summary).collect();
        Ok((body.total_items, works))
    }

    /// Fetch a single volume by id
    pub async fn get_volume(&self, volume_id: &str) -> Result<WorkSummary> {
        let resp = self
            .client
            .get(format!("{}/volumes/{}", self.base_url, volume_id))
            .query(&[("key", &self.api_key)])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(TomeError::VolumeNotFound(volume_id.to_string()));
        }

        let item: VolumeItem = resp.json().await?;
        Ok(into_work_summary(item))
    }
}

fn into_work_summary(item: VolumeItem) -> WorkSummary {
    let info_link = format!("https://books.google.com/books?id={}", item.id);
    let image_link = item
        .volume_info
        .image_links
        .and_then(|links| links.thumbnail.or(links.small_thumbnail));
    WorkSummary {
        id: item.id,
        title: item.volume_info.title,
        subtitle: item.volume_info.subtitle,
        authors: item.volume_info.authors,
        categories: item.volume_info.categories,
        description: item.volume_info.description,
        page_count: item.volume_info.page_count,
        info_link,
        image_link,
    }
}

/// Build the `q` parameter from member input.
///
/// `title:"the hobbit"` maps to `intitle:the+hobbit`, `author:"tolkien"` to
/// `inauthor:tolkien`, `isbn:978...` passes through, and anything left is
/// joined as free terms.
pub fn build_search_query(input: &str) -> String {
    let mut rest = input.trim().to_string();
    let mut tagged: Vec<String> = Vec::new();

    if let Some(title) = extract_quoted_tag(&mut rest, "title:") {
        tagged.push(format!("intitle:{}", join_plus(&title)));
    }
    if let Some(author) = extract_quoted_tag(&mut rest, "author:") {
        tagged.push(format!("inauthor:{}", join_plus(&author)));
    }
    if let Some(isbn) = extract_isbn_tag(&mut rest) {
        tagged.push(format!("isbn:{}", isbn));
    }

    let mut query = String::new();
    let general = join_plus(&rest);
    if !general.is_empty() {
        query.push_str(&general);
        if !tagged.is_empty() {
            query.push('+');
        }
    }
    query.push_str(&tagged.join("+"));
    query
}

/// Pull `tag:"value"` out of `input`, returning the value
fn extract_quoted_tag(input: &mut String, tag: &str) -> Option<String> {
    let start = input.find(tag)?;
    let after_tag = start + tag.len();
    let bytes = input.as_bytes();
    if bytes.get(after_tag) != Some(&b'"') {
        return None;
    }
    let close = input[after_tag + 1..].find('"')? + after_tag + 1;
    let value = input[after_tag + 1..close].to_string();
    input.replace_range(start..close + 1, "");
    Some(value)
}

/// Pull `isbn:<digits>` out of `input`
fn extract_isbn_tag(input: &mut String) -> Option<String> {
    let start = input.find("isbn:")?;
    let digits_start = start + "isbn:".len();
    let digits_end = input[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| digits_start + i)
        .unwrap_or(input.len());
    if digits_end == digits_start {
        return None;
    }
    let digits = input[digits_start..digits_end].to_string();
    input.replace_range(start..digits_end, "");
    Some(digits)
}

/// Collapse whitespace runs into `+`, the Books API term separator
fn join_plus(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join("+")
}
