//! Nitter timeline renderer over plain HTTP.
//!
//! Nitter serves author timelines as server-rendered HTML, 20 posts per
//! page, with a "Load more" link carrying a pagination cursor at the bottom.
//! This backend keeps every page it has loaded for the current author and
//! exposes the accumulated items, which is what an infinite-scroll page
//! shows after scrolling.
//!
//! # Markup
//!
//! | Data | Selector |
//! |------|----------|
//! | Container | `.timeline` |
//! | Item | `.timeline-item` (minus `.show-more`) |
//! | Permalink | `.tweet-link[href]` |
//! | Author | `.username[title]` |
//! | Body | `.tweet-content` |
//! | Timestamp | `.tweet-date a[title]` |
//! | Media | `.attachments` |
//! | Counters | `.tweet-stats .tweet-stat` |
//! | Next page | `.show-more a[href*="cursor="]` |

use super::{ItemField, RenderError, Renderer, Result};
use crate::metrics::StatFragment;
use rand::{Rng, rng};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument, warn};
use url::Url;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.5; rv:126.0) Gecko/20100101 Firefox/126.0",
];

/// Delay between re-fetches while waiting for the container.
const CONTAINER_POLL: Duration = Duration::from_secs(5);

/// Handle to an item of the currently loaded timeline.
///
/// Handles from a previous navigation are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NitterItem {
    generation: u64,
    index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ParsedItem {
    permalink: Option<String>,
    author: Option<String>,
    body: Option<String>,
    timestamp: Option<String>,
    has_media: bool,
    stats: Vec<StatFragment>,
}

#[derive(Debug, Default)]
struct ParsedPage {
    has_container: bool,
    items: Vec<ParsedItem>,
    next_cursor: Option<String>,
}

#[derive(Debug)]
struct LoadedTimeline {
    url: Url,
    items: Vec<ParsedItem>,
    has_container: bool,
    next_cursor: Option<String>,
    last_html: String,
}

/// HTTP-backed [`Renderer`] for Nitter instances.
#[derive(Debug)]
pub struct NitterRenderer {
    client: Client,
    base_url: Url,
    debug_dir: Option<PathBuf>,
    generation: u64,
    timeline: Option<LoadedTimeline>,
}

impl NitterRenderer {
    /// Build a renderer for the instance at `base_url`.
    ///
    /// A random desktop user agent is picked once per session.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or proxy is invalid or the HTTP
    /// client cannot be built.
    pub fn new(base_url: &str, proxy: Option<&str>, debug_dir: Option<PathBuf>) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| RenderError::Navigation {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;
        let user_agent = USER_AGENTS[rng().random_range(0..USER_AGENTS.len())];

        let mut builder = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30));
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        let client = builder.build()?;

        info!(%base_url, user_agent, proxied = proxy.is_some(), "Nitter renderer ready");
        Ok(Self {
            client,
            base_url,
            debug_dir,
            generation: 0,
            timeline: None,
        })
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RenderError::Http(format!("{url} returned status {status}")));
        }
        Ok(resp.text().await?)
    }

    fn item(&self, handle: &NitterItem) -> Result<&ParsedItem> {
        if handle.generation != self.generation {
            return Err(RenderError::StaleItem);
        }
        self.timeline
            .as_ref()
            .and_then(|t| t.items.get(handle.index))
            .ok_or(RenderError::StaleItem)
    }
}

impl Renderer for NitterRenderer {
    type Item = NitterItem;

    fn timeline_url(&self, handle: &str) -> String {
        let handle = handle.trim_start_matches('@');
        match self.base_url.join(&urlencoding::encode(handle)) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), handle),
        }
    }

    #[instrument(level = "info", skip(self))]
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let parsed = Url::parse(url).map_err(|e| RenderError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let html = self.fetch(&parsed).await.map_err(|e| RenderError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let page = parse_timeline(&html)?;

        self.generation += 1;
        debug!(items = page.items.len(), container = page.has_container, "Loaded timeline page");
        self.timeline = Some(LoadedTimeline {
            url: parsed,
            items: page.items,
            has_container: page.has_container,
            next_cursor: page.next_cursor,
            last_html: html,
        });
        Ok(())
    }

    async fn current_page_metric(&self) -> Result<u64> {
        Ok(self.timeline.as_ref().map_or(0, |t| t.items.len() as u64))
    }

    #[instrument(level = "debug", skip(self))]
    async fn request_extend(&mut self) -> Result<()> {
        let Some(timeline) = self.timeline.as_ref() else {
            return Err(RenderError::NoItems);
        };
        let Some(cursor) = timeline.next_cursor.as_deref() else {
            debug!("No further pages");
            return Ok(());
        };
        let next_url = timeline
            .url
            .join(cursor)
            .map_err(|e| RenderError::Http(e.to_string()))?;

        let html = self.fetch(&next_url).await?;
        let page = parse_timeline(&html)?;

        if let Some(timeline) = self.timeline.as_mut() {
            debug!(added = page.items.len(), %next_url, "Appended timeline page");
            timeline.items.extend(page.items);
            timeline.next_cursor = page.next_cursor;
            timeline.last_html = html;
        }
        Ok(())
    }

    #[instrument(level = "info", skip(self))]
    async fn wait_for_container(&mut self, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        loop {
            let Some(timeline) = self.timeline.as_ref() else {
                return Err(RenderError::ContainerTimeout(timeout));
            };
            if timeline.has_container {
                return Ok(());
            }
            if started.elapsed() + CONTAINER_POLL > timeout {
                return Err(RenderError::ContainerTimeout(timeout));
            }

            sleep(CONTAINER_POLL).await;
            let url = timeline.url.clone();
            match self.fetch(&url).await.and_then(|html| Ok((parse_timeline(&html)?, html))) {
                Ok((page, html)) => {
                    self.generation += 1;
                    self.timeline = Some(LoadedTimeline {
                        url,
                        items: page.items,
                        has_container: page.has_container,
                        next_cursor: page.next_cursor,
                        last_html: html,
                    });
                }
                Err(e) => warn!(error = %e, "Re-fetch while waiting for container failed"),
            }
        }
    }

    async fn list_visible_items(&self) -> Result<Vec<NitterItem>> {
        let timeline = self.timeline.as_ref().ok_or(RenderError::NoItems)?;
        if !timeline.has_container || timeline.items.is_empty() {
            return Err(RenderError::NoItems);
        }
        Ok((0..timeline.items.len())
            .map(|index| NitterItem {
                generation: self.generation,
                index,
            })
            .collect())
    }

    async fn get_field(&self, item: &NitterItem, field: ItemField) -> Result<Option<String>> {
        let parsed = self.item(item)?;
        Ok(match field {
            ItemField::Permalink => parsed.permalink.clone(),
            ItemField::AuthorHandle => parsed.author.clone(),
            ItemField::Body => parsed.body.clone(),
            ItemField::Timestamp => parsed.timestamp.clone(),
            ItemField::MediaMarker => parsed.has_media.then(|| "attachments".to_string()),
        })
    }

    async fn stat_fragments(&self, item: &NitterItem) -> Result<Vec<StatFragment>> {
        Ok(self.item(item)?.stats.clone())
    }

    async fn capture_diagnostic(&self, label: &str) {
        let (Some(dir), Some(timeline)) = (self.debug_dir.as_ref(), self.timeline.as_ref()) else {
            return;
        };
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            debug!(error = %e, "Cannot create diagnostics dir");
            return;
        }
        let path = dir.join(format!("{label}.html"));
        match tokio::fs::write(&path, &timeline.last_html).await {
            Ok(()) => debug!(path = %path.display(), "Saved diagnostic snapshot"),
            Err(e) => debug!(path = %path.display(), error = %e, "Diagnostic snapshot failed"),
        }
    }

    async fn close(&mut self) {
        self.timeline = None;
        info!("Nitter renderer closed");
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| RenderError::Http(format!("bad selector {css}: {e}")))
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Parse one timeline page into owned items.
fn parse_timeline(html: &str) -> Result<ParsedPage> {
    let document = Html::parse_document(html);
    let timeline_sel = selector(".timeline")?;
    let item_sel = selector("div.timeline-item:not(.show-more)")?;
    let link_sel = selector(".tweet-link")?;
    let username_sel = selector(".username")?;
    let content_sel = selector(".tweet-content")?;
    let date_sel = selector(".tweet-date a")?;
    let attachments_sel = selector(".attachments")?;
    let stat_sel = selector(".tweet-stats .tweet-stat")?;
    let more_sel = selector(".show-more a[href]")?;

    let has_container = document.select(&timeline_sel).next().is_some();

    let items = document
        .select(&item_sel)
        .map(|item| ParsedItem {
            permalink: item
                .select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string),
            author: item
                .select(&username_sel)
                .next()
                .and_then(|u| u.value().attr("title"))
                .map(str::to_string),
            body: item.select(&content_sel).next().map(text_of),
            timestamp: item
                .select(&date_sel)
                .next()
                .and_then(|a| a.value().attr("title"))
                .map(str::to_string),
            has_media: item.select(&attachments_sel).next().is_some(),
            stats: item
                .select(&stat_sel)
                .map(|stat| StatFragment::new(stat.inner_html(), text_of(stat)))
                .collect(),
        })
        .collect();

    let next_cursor = document
        .select(&more_sel)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains("cursor="))
        .last()
        .map(str::to_string);

    Ok(ParsedPage {
        has_container,
        items,
        next_cursor,
    })
}
