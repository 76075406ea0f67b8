//! Example in-process scraper: fetches one page and extracts items with
//! CSS selectors.
//!
//! Configuration keys (all optional):
//! - `url`: page to fetch, defaults to `https://example.com`
//! - `selectors.title` / `selectors.content` / `selectors.links`: CSS
//!   selectors for the page title, main content, and outbound links
//!
//! Output: `data/items.json` with the scraped items, a CSV export under
//! `exports/`, and the item schema under `schemas/`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, instrument};
use url::Url;

use crate::paths::TaskPaths;
use crate::scrapers::{ScraperTask, TaskResult};

const DEFAULT_URL: &str = "https://example.com";
const MAX_LINK_ITEMS: usize = 5;

/// One scraped item, as written to `items.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedItem {
    pub title: String,
    pub url: String,
    pub description: String,
    pub timestamp: DateTime<Local>,
    pub tags: Vec<String>,
}

pub struct ExampleScraper;

#[async_trait]
impl ScraperTask for ExampleScraper {
    #[instrument(level = "info", skip_all)]
    async fn run(
        &self,
        config: &BTreeMap<String, serde_json::Value>,
        paths: &TaskPaths,
    ) -> TaskResult {
        let target_url = config
            .get("url")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_URL)
            .to_string();

        info!(url = %target_url, "Fetching target page");
        let body = reqwest::get(&target_url).await?.text().await?;
        debug!(bytes = body.len(), "Downloaded target page");

        // Parse and extract synchronously; the DOM is not held across awaits.
        let items = extract_items(&body, &target_url, config)?;
        info!(count = items.len(), "Extracted items");

        save_items(&items, paths).await?;
        Ok(items.len() as u64)
    }
}

fn selector_for(
    config: &BTreeMap<String, serde_json::Value>,
    key: &str,
    default: &str,
) -> Result<Selector, Box<dyn std::error::Error + Send + Sync>> {
    let raw = config
        .get("selectors")
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_str())
        .unwrap_or(default)
        .to_string();
    Selector::parse(&raw).map_err(|e| format!("invalid selector '{raw}': {e}").into())
}

/// Extract the main item plus up to [`MAX_LINK_ITEMS`] link items from the
/// page.
fn extract_items(
    html: &str,
    target_url: &str,
    config: &BTreeMap<String, serde_json::Value>,
) -> Result<Vec<ScrapedItem>, Box<dyn std::error::Error + Send + Sync>> {
    let title_selector = selector_for(config, "title", "h1")?;
    let content_selector = selector_for(config, "content", "div.content")?;
    let links_selector = selector_for(config, "links", "a")?;

    let document = Html::parse_document(html);
    let base = Url::parse(target_url)?;

    let title = document
        .select(&title_selector)
        .next()
        .map(|e| e.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .unwrap_or_else(|| "No Title Found".to_string());
    let content = document
        .select(&content_selector)
        .next()
        .map(|e| e.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .unwrap_or_else(|| "No Content Found".to_string());

    let description = if content.len() > 200 {
        let mut end = 200;
        while !content.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &content[..end])
    } else {
        content
    };

    let now = Local::now();
    let mut items = vec![ScrapedItem {
        title,
        url: target_url.to_string(),
        description,
        timestamp: now,
        tags: vec!["page".to_string()],
    }];

    for element in document.select(&links_selector) {
        if items.len() > MAX_LINK_ITEMS {
            break;
        }
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if href.starts_with('#') {
            continue;
        }
        let Ok(resolved) = base.join(href) else {
            continue;
        };
        let text = element.text().collect::<Vec<_>>().join(" ").trim().to_string();
        items.push(ScrapedItem {
            title: if text.is_empty() {
                "Link without text".to_string()
            } else {
                text
            },
            url: resolved.to_string(),
            description: format!("Link found on {target_url}"),
            timestamp: now,
            tags: vec!["link".to_string()],
        });
    }

    Ok(items)
}

/// Write `items.json`, the CSV export, and the item schema into the task's
/// partition.
async fn save_items(
    items: &[ScrapedItem],
    paths: &TaskPaths,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let data_file = paths.data.join("items.json");
    fs::write(&data_file, serde_json::to_vec_pretty(items)?).await?;

    let mut export = String::from("title,url,description\n");
    for item in items {
        export.push_str(&format!(
            "{},{},{}\n",
            item.title.replace(',', "\\,"),
            item.url,
            item.description.replace(',', "\\,"),
        ));
    }
    fs::write(paths.exports.join("items_export.csv"), export).await?;

    let schema = serde_json::json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "url": { "type": "string", "format": "uri" },
            "description": { "type": "string" },
            "timestamp": { "type": "string", "format": "date-time" },
            "tags": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["title", "url", "timestamp"]
    });
    fs::write(
        paths.schemas.join("schema.json"),
        serde_json::to_vec_pretty(&schema)?,
    )
    .await?;

    info!(count = items.len(), path = %data_file.display(), "Saved scraped items");
    Ok(())
}
