//! Notion sync adapter.
//!
//! Walks every page the integration token can see via the search API,
//! renders each page's block tree to plain text, and feeds the result to
//! the chunk sink. Pagination is followed to exhaustion on both the search
//! and the block-children endpoints.

use super::{Chunk, ChunkSink, SyncAdapter, SyncOutcome};
use crate::connector::Connector;
use crate::error::ConnectError;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

const NOTION_API_BASE: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";
const PAGE_SIZE: u32 = 100;

/// Pages rendering to fewer characters than this are not worth ingesting.
const MIN_TEXT_LEN: usize = 10;

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct NotionAdapter {
    http: reqwest::Client,
    base_url: String,
}

impl Default for NotionAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotionAdapter {
    pub fn new() -> Self {
        Self::with_base_url(NOTION_API_BASE)
    }

    /// Overrides the API base URL, for tests against a local server.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Lists every page visible to the token, following search cursors.
    async fn search_pages(&self, access_token: &str) -> Result<Vec<Value>> {
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({
                "filter": { "property": "object", "value": "page" },
                "page_size": PAGE_SIZE,
            });
            if let Some(ref c) = cursor {
                body["start_cursor"] = json!(c);
            }

            let response = self
                .http
                .post(format!("{}/search", self.base_url))
                .bearer_auth(access_token)
                .header("Notion-Version", NOTION_VERSION)
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .json(&body)
                .send()
                .await
                .context("Notion search request failed")?;

            if !response.status().is_success() {
                return Err(anyhow!(
                    "Notion search returned HTTP {}",
                    response.status().as_u16()
                ));
            }

            let doc: Value = response.json().await.context("Invalid search response")?;
            if let Some(results) = doc["results"].as_array() {
                pages.extend(results.iter().cloned());
            }

            if doc["has_more"].as_bool().unwrap_or(false) {
                match doc["next_cursor"].as_str() {
                    Some(c) => cursor = Some(c.to_string()),
                    None => break,
                }
            } else {
                break;
            }
        }

        Ok(pages)
    }

    /// Fetches and renders a page's block children to plain text.
    async fn get_page_text(&self, access_token: &str, page_id: &str) -> Result<String> {
        let mut parts = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/blocks/{}/children?page_size={}",
                self.base_url, page_id, PAGE_SIZE
            );
            if let Some(ref c) = cursor {
                url.push_str(&format!("&start_cursor={}", urlencoding::encode(c)));
            }

            let response = self
                .http
                .get(&url)
                .bearer_auth(access_token)
                .header("Notion-Version", NOTION_VERSION)
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .send()
                .await
                .context("Notion blocks request failed")?;

            if !response.status().is_success() {
                return Err(anyhow!(
                    "Notion blocks returned HTTP {}",
                    response.status().as_u16()
                ));
            }

            let doc: Value = response.json().await.context("Invalid blocks response")?;
            if let Some(blocks) = doc["results"].as_array() {
                parts.push(blocks_to_text(blocks));
            }

            if doc["has_more"].as_bool().unwrap_or(false) {
                match doc["next_cursor"].as_str() {
                    Some(c) => cursor = Some(c.to_string()),
                    None => break,
                }
            } else {
                break;
            }
        }

        Ok(parts.join("\n"))
    }
}

#[async_trait]
impl SyncAdapter for NotionAdapter {
    fn app_name(&self) -> &str {
        "notion"
    }

    async fn sync(
        &self,
        connector: &Connector,
        site_id: &str,
        sink: &dyn ChunkSink,
    ) -> SyncOutcome {
        // OAuth connectors carry an access token; manually entered
        // credential connectors hold the integration token as an api_key.
        let access_token = match connector
            .credentials
            .access_token()
            .or_else(|| connector.credentials.api_key())
        {
            Some(t) => t.to_string(),
            None => {
                let err = ConnectError::MissingCredential("access_token".to_string());
                return SyncOutcome::failed(0, err.to_string());
            }
        };

        let pages = match self.search_pages(&access_token).await {
            Ok(pages) => pages,
            Err(e) => {
                warn!(connector = %connector.app_name, error = %e, "notion search failed");
                return SyncOutcome::failed(0, e.to_string());
            }
        };
        debug!(connector = %connector.app_name, pages = pages.len(), "notion search complete");

        let mut chunks = Vec::new();
        for page in &pages {
            let page_id = match page["id"].as_str() {
                Some(id) => id,
                None => continue,
            };

            // One broken page must not sink the whole run.
            let text = match self.get_page_text(&access_token, page_id).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(page_id, error = %e, "skipping unreadable page");
                    continue;
                }
            };
            if text.trim().len() < MIN_TEXT_LEN {
                continue;
            }

            chunks.push(Chunk {
                title: extract_page_title(page),
                source_url: page["url"].as_str().unwrap_or_default().to_string(),
                body: text,
            });
        }

        if chunks.is_empty() {
            info!(connector = %connector.app_name, "notion sync complete, nothing to ingest");
            return SyncOutcome::completed(0);
        }

        match sink.ingest(site_id, chunks).await {
            Ok(chunks_created) => {
                info!(connector = %connector.app_name, chunks_created, "notion sync complete");
                SyncOutcome::completed(chunks_created)
            }
            Err(e) => {
                warn!(connector = %connector.app_name, error = %e, "ingest failed");
                SyncOutcome::failed(0, e.to_string())
            }
        }
    }
}

/// Concatenates the plain text of a rich_text array.
fn rich_text(value: &Value) -> String {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i["plain_text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

/// Renders one level of Notion blocks to plain text, one line per block.
fn blocks_to_text(blocks: &[Value]) -> String {
    let mut lines = Vec::new();

    for block in blocks {
        let block_type = block["type"].as_str().unwrap_or_default();
        let payload = &block[block_type];

        let line = match block_type {
            "paragraph" | "toggle" => rich_text(&payload["rich_text"]),
            "heading_1" => prefixed("# ", &rich_text(&payload["rich_text"])),
            "heading_2" => prefixed("## ", &rich_text(&payload["rich_text"])),
            "heading_3" => prefixed("### ", &rich_text(&payload["rich_text"])),
            "bulleted_list_item" | "numbered_list_item" => {
                prefixed("- ", &rich_text(&payload["rich_text"]))
            }
            "to_do" => {
                let text = rich_text(&payload["rich_text"]);
                if text.is_empty() {
                    String::new()
                } else if payload["checked"].as_bool().unwrap_or(false) {
                    format!("[x] {}", text)
                } else {
                    format!("[ ] {}", text)
                }
            }
            "code" => {
                let text = rich_text(&payload["rich_text"]);
                if text.is_empty() {
                    String::new()
                } else {
                    format!("```\n{}\n```", text)
                }
            }
            "quote" => prefixed("> ", &rich_text(&payload["rich_text"])),
            "divider" => "---".to_string(),
            _ => String::new(),
        };

        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}

fn prefixed(prefix: &str, text: &str) -> String {
    if text.is_empty() {
        String::new()
    } else {
        format!("{}{}", prefix, text)
    }
}

/// Pulls the page title out of the properties map.
///
/// The title property is usually named "title" but can be renamed, so fall
/// back to scanning for any property of type `title`.
fn extract_page_title(page: &Value) -> String {
    let properties = match page["properties"].as_object() {
        Some(p) => p,
        None => return "Untitled".to_string(),
    };

    for prop in properties.values() {
        if prop["type"].as_str() == Some("title") {
            let title = rich_text(&prop["title"]);
            if !title.is_empty() {
                return title;
            }
        }
    }

    "Untitled".to_string()
}
