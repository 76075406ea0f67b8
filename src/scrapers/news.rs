//! News site scraper: indexes article links from a listing page, then
//! scrapes each article for its headline, body, byline, publication date,
//! categories, and main image.
//!
//! Configuration keys:
//! - `url` (required): listing page to index for article links
//! - `max_articles`: cap on articles scraped per run, defaults to 10
//! - `selectors.links` / `selectors.title` / `selectors.content` /
//!   `selectors.published_date` / `selectors.author` /
//!   `selectors.categories` / `selectors.image`: CSS selectors overriding
//!   the built-in defaults
//!
//! Output: `data/articles.json` with the full articles, a CSV export under
//! `exports/`, and the article schema under `schemas/`. A failed article
//! fetch is logged and skipped; only a failed listing fetch fails the task.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::paths::TaskPaths;
use crate::scrapers::{ScraperTask, TaskResult};

const DEFAULT_MAX_ARTICLES: usize = 10;
const SUMMARY_CHARS: usize = 500;
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// One scraped news article, as written to `articles.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub url: String,
    pub content: String,
    pub summary: String,
    pub published_date: Option<DateTime<FixedOffset>>,
    pub author: String,
    pub categories: Vec<String>,
    pub image_url: Option<String>,
    pub source: String,
    pub scraped_at: DateTime<Local>,
}

pub struct NewsScraper;

#[async_trait]
impl ScraperTask for NewsScraper {
    #[instrument(level = "info", skip_all)]
    async fn run(
        &self,
        config: &BTreeMap<String, serde_json::Value>,
        paths: &TaskPaths,
    ) -> TaskResult {
        let listing_url = config
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or("news scraper requires a 'url' config key")?
            .to_string();
        let limit = config
            .get("max_articles")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_MAX_ARTICLES as u64) as usize;
        let selectors = ArticleSelectors::from_config(config)?;

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        info!(url = %listing_url, limit, "Indexing article links");
        let listing = fetch_page(&client, &listing_url).await?;
        let links = discover_article_links(&listing, &listing_url, &selectors.links, limit)?;
        info!(count = links.len(), "Found article links");
        if links.is_empty() {
            warn!(url = %listing_url, "No article links matched the links selector");
        }

        // Fetch sequentially; a failed article is skipped, not fatal.
        let mut articles = Vec::new();
        for url in &links {
            match fetch_page(&client, url).await {
                Ok(body) => {
                    let article = extract_article(&body, url, &listing_url, &selectors);
                    debug!(url = %url, title = %article.title, "Scraped article");
                    articles.push(article);
                }
                Err(e) => {
                    error!(error = %e, url = %url, "Article fetch failed; skipping");
                }
            }
        }

        save_articles(&articles, paths).await?;
        Ok(articles.len() as u64)
    }
}

/// The full selector set for one run, parsed up front so a bad selector
/// fails the task before any page is fetched.
#[derive(Debug)]
struct ArticleSelectors {
    links: Selector,
    title: Selector,
    page_title: Selector,
    content: Selector,
    published_date: Selector,
    author: Selector,
    categories: Selector,
    image: Selector,
    image_fallback: Selector,
}

impl ArticleSelectors {
    fn from_config(
        config: &BTreeMap<String, serde_json::Value>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self {
            links: selector_for(config, "links", "a.article-link, a.headline, article a")?,
            title: selector_for(config, "title", "h1.headline, h1.title, article h1")?,
            page_title: parse_selector("title")?,
            content: selector_for(config, "content", "article, .article-body, .content")?,
            published_date: selector_for(
                config,
                "published_date",
                "time, .date, .published-date",
            )?,
            author: selector_for(config, "author", ".author, .byline")?,
            categories: selector_for(
                config,
                "categories",
                ".category a, .categories a, .tags a",
            )?,
            image: selector_for(config, "image", "meta[property='og:image']")?,
            image_fallback: parse_selector("article img, figure img, .content img")?,
        })
    }
}

async fn fetch_page(client: &reqwest::Client, url: &str) -> reqwest::Result<String> {
    client.get(url).send().await?.error_for_status()?.text().await
}

fn parse_selector(raw: &str) -> Result<Selector, Box<dyn std::error::Error + Send + Sync>> {
    Selector::parse(raw).map_err(|e| format!("invalid selector '{raw}': {e}").into())
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
        .unwrap_or(default);
    parse_selector(raw)
}

fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

/// Collect unique absolute article URLs from the listing page, in document
/// order, capped at `limit`.
fn discover_article_links(
    html: &str,
    listing_url: &str,
    links_selector: &Selector,
    limit: usize,
) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> {
    let base = Url::parse(listing_url)?;
    let document = Html::parse_document(html);

    let mut links: Vec<String> = Vec::new();
    for element in document.select(links_selector) {
        if links.len() >= limit {
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
        let resolved = resolved.to_string();
        if !links.contains(&resolved) {
            links.push(resolved);
        }
    }
    Ok(links)
}

/// Parse a date string in any of the formats news sites commonly emit.
fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let cleaned = clean_text(raw);
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&cleaned) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(&cleaned) {
        return Some(dt);
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&cleaned, format) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    for format in ["%Y-%m-%d", "%B %d, %Y", "%d %B %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc().fixed_offset());
        }
    }
    None
}

/// Extract a full article from one page. Missing fields fall back rather
/// than fail: a page with no matching headline still yields an article.
fn extract_article(
    html: &str,
    url: &str,
    source: &str,
    selectors: &ArticleSelectors,
) -> NewsArticle {
    let document = Html::parse_document(html);
    let base = Url::parse(url).ok();

    let title = document
        .select(&selectors.title)
        .next()
        .or_else(|| document.select(&selectors.page_title).next())
        .map(element_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "No Title".to_string());

    let content = document
        .select(&selectors.content)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let summary = if content.chars().count() > SUMMARY_CHARS {
        let truncated: String = content.chars().take(SUMMARY_CHARS).collect();
        format!("{}...", truncated.trim_end())
    } else {
        content.clone()
    };

    let published_date = document
        .select(&selectors.published_date)
        .next()
        .and_then(|element| {
            if element.value().name() == "meta" {
                element.value().attr("content").map(str::to_string)
            } else {
                element
                    .value()
                    .attr("datetime")
                    .map(str::to_string)
                    .or_else(|| Some(element_text(element)))
            }
        })
        .and_then(|raw| parse_date(&raw));

    let author = document
        .select(&selectors.author)
        .next()
        .and_then(|element| {
            if element.value().name() == "meta" {
                element.value().attr("content").map(str::to_string)
            } else {
                Some(element_text(element))
            }
        })
        .map(|raw| strip_byline_prefix(&raw))
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    let mut categories: Vec<String> = Vec::new();
    for element in document.select(&selectors.categories) {
        let category = element_text(element);
        if !category.is_empty() && !categories.contains(&category) {
            categories.push(category);
        }
    }

    let image_url = document
        .select(&selectors.image)
        .next()
        .and_then(|e| e.value().attr("content"))
        .or_else(|| {
            document
                .select(&selectors.image_fallback)
                .next()
                .and_then(|e| e.value().attr("src"))
        })
        .and_then(|raw| match &base {
            Some(base) => base.join(raw).ok().map(|u| u.to_string()),
            None => Some(raw.to_string()),
        });

    NewsArticle {
        title,
        url: url.to_string(),
        content,
        summary,
        published_date,
        author,
        categories,
        image_url,
        source: source.to_string(),
        scraped_at: Local::now(),
    }
}

fn strip_byline_prefix(raw: &str) -> String {
    let cleaned = clean_text(raw);
    match cleaned.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("by ") => {
            cleaned[3..].trim_start().to_string()
        }
        _ => cleaned,
    }
}

/// Write `articles.json`, the CSV export, and the article schema into the
/// task's partition.
async fn save_articles(
    articles: &[NewsArticle],
    paths: &TaskPaths,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let data_file = paths.data.join("articles.json");
    fs::write(&data_file, serde_json::to_vec_pretty(articles)?).await?;

    let mut export = String::from("title,url,author,published_date,categories\n");
    for article in articles {
        let date = article
            .published_date
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "Unknown".to_string());
        export.push_str(&format!(
            "{},{},{},{},{}\n",
            article.title.replace(',', "\\,"),
            article.url,
            article.author.replace(',', "\\,"),
            date,
            article.categories.join("|").replace(',', "\\,"),
        ));
    }
    fs::write(paths.exports.join("articles.csv"), export).await?;

    let schema = serde_json::json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "url": { "type": "string", "format": "uri" },
            "content": { "type": "string" },
            "summary": { "type": "string" },
            "published_date": { "type": "string", "format": "date-time" },
            "author": { "type": "string" },
            "categories": { "type": "array", "items": { "type": "string" } },
            "image_url": { "type": "string", "format": "uri" },
            "source": { "type": "string" },
            "scraped_at": { "type": "string", "format": "date-time" }
        },
        "required": ["title", "url", "content", "scraped_at"]
    });
    fs::write(
        paths.schemas.join("news_schema.json"),
        serde_json::to_vec_pretty(&schema)?,
    )
    .await?;

    info!(count = articles.len(), path = %data_file.display(), "Saved articles");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::BatchPaths;

    const LISTING: &str = r##"
<html><body>
  <article>
    <a href="/2026/08/first-story">First story</a>
    <a href="/2026/08/first-story">First story (again)</a>
    <a href="#comments">Comments</a>
    <a href="https://other.example/2026/08/second-story">Second story</a>
    <a href="/2026/08/third-story">Third story</a>
  </article>
</body></html>
"##;

    const ARTICLE: &str = r#"
<html>
<head>
  <title>Fallback Title | News Site</title>
  <meta property="og:image" content="/img/lead.jpg">
</head>
<body>
  <h1 class="headline">  Markets   Rally After
    Announcement  </h1>
  <span class="byline">By Jane Doe</span>
  <time datetime="2026-08-20T09:30:00+02:00">20 August 2026</time>
  <div class="categories">
    <a href="/markets">Markets</a>
    <a href="/economy">Economy</a>
    <a href="/markets">Markets</a>
  </div>
  <div class="article-body">Stocks rose sharply this morning.</div>
</body>
</html>
"#;

    const BARE_ARTICLE: &str = r#"
<html>
<head><title>Only A Document Title</title></head>
<body><p>Nothing structured here.</p></body>
</html>
"#;

    fn selectors() -> ArticleSelectors {
        ArticleSelectors::from_config(&BTreeMap::new()).unwrap()
    }

    #[test]
    fn test_discover_links_dedups_and_skips_anchors() {
        let links = discover_article_links(
            LISTING,
            "https://news.example.com",
            &selectors().links,
            10,
        )
        .unwrap();

        assert_eq!(
            links,
            vec![
                "https://news.example.com/2026/08/first-story",
                "https://other.example/2026/08/second-story",
                "https://news.example.com/2026/08/third-story",
            ]
        );
    }

    #[test]
    fn test_discover_links_honors_limit() {
        let links = discover_article_links(
            LISTING,
            "https://news.example.com",
            &selectors().links,
            1,
        )
        .unwrap();
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_extract_article_full_page() {
        let article = extract_article(
            ARTICLE,
            "https://news.example.com/2026/08/first-story",
            "https://news.example.com",
            &selectors(),
        );

        assert_eq!(article.title, "Markets Rally After Announcement");
        assert_eq!(article.author, "Jane Doe");
        assert_eq!(article.categories, vec!["Markets", "Economy"]);
        assert_eq!(
            article.image_url.as_deref(),
            Some("https://news.example.com/img/lead.jpg")
        );
        assert_eq!(
            article.published_date.unwrap().to_rfc3339(),
            "2026-08-20T09:30:00+02:00"
        );
        assert!(article.content.contains("Stocks rose sharply"));
        assert_eq!(article.source, "https://news.example.com");
    }

    #[test]
    fn test_extract_article_falls_back_on_bare_page() {
        let article = extract_article(
            BARE_ARTICLE,
            "https://news.example.com/bare",
            "https://news.example.com",
            &selectors(),
        );

        assert_eq!(article.title, "Only A Document Title");
        assert_eq!(article.author, "Unknown");
        assert!(article.published_date.is_none());
        assert!(article.image_url.is_none());
        assert!(article.categories.is_empty());
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date("2026-08-20T09:30:00+02:00").is_some());
        assert!(parse_date("2026-08-20 09:30:00").is_some());
        assert!(parse_date("2026-08-20").is_some());
        assert!(parse_date("August 20, 2026").is_some());
        assert!(parse_date("  20   August 2026 ").is_some());
        assert!(parse_date("not a date").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_strip_byline_prefix() {
        assert_eq!(strip_byline_prefix("By Jane Doe"), "Jane Doe");
        assert_eq!(strip_byline_prefix("by  Jane Doe"), "Jane Doe");
        assert_eq!(strip_byline_prefix("Jane Doe"), "Jane Doe");
        assert_eq!(strip_byline_prefix("By"), "By");
    }

    #[test]
    fn test_bad_selector_fails_up_front() {
        let mut config = BTreeMap::new();
        config.insert(
            "selectors".to_string(),
            serde_json::json!({ "links": "[[[" }),
        );
        let err = ArticleSelectors::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("invalid selector"));
    }

    #[tokio::test]
    async fn test_save_articles_writes_all_outputs() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = BatchPaths::new(tmp.path().join("out")).task_paths("news");
        paths.create().await.unwrap();

        let article = extract_article(
            ARTICLE,
            "https://news.example.com/2026/08/first-story",
            "https://news.example.com",
            &selectors(),
        );
        save_articles(std::slice::from_ref(&article), &paths)
            .await
            .unwrap();

        let raw = fs::read(paths.data.join("articles.json")).await.unwrap();
        let back: Vec<NewsArticle> = serde_json::from_slice(&raw).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].title, article.title);

        let export = fs::read_to_string(paths.exports.join("articles.csv"))
            .await
            .unwrap();
        assert!(export.starts_with("title,url,author,published_date,categories\n"));
        assert!(export.contains("Markets|Economy"));
        assert!(paths.schemas.join("news_schema.json").is_file());
    }
}
