//! The rendering collaborator the collector drives.
//!
//! A renderer owns one navigation session: it loads an author's timeline,
//! grows it on request, and exposes the currently visible items as opaque
//! handles whose fields can be read individually. Any backend providing the
//! [`Renderer`] methods can be plugged into the collector.
//!
//! # Backends
//!
//! | Backend | Module | Notes |
//! |---------|--------|-------|
//! | Nitter over HTTP | [`nitter`] | Fetches pages with `reqwest`, parses with `scraper`, paginates by cursor |
//! | In-memory fake | `fake` | Test-only, scripted timelines |

pub mod nitter;

#[cfg(test)]
pub mod fake;

use crate::metrics::StatFragment;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Timeline container not present after {0:?}")]
    ContainerTimeout(Duration),

    #[error("No timeline items could be located")]
    NoItems,

    #[error("Item handle is stale")]
    StaleItem,

    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for RenderError {
    fn from(err: reqwest::Error) -> Self {
        RenderError::Http(err.to_string())
    }
}

/// Single-valued fields readable from an item handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    /// Link to the post itself.
    Permalink,
    /// Handle of the author as displayed on the item.
    AuthorHandle,
    /// Body text.
    Body,
    /// Timestamp display string (the full date title).
    Timestamp,
    /// Media attachment marker; present iff the item has media.
    MediaMarker,
}

/// Capability set of a rendering backend.
///
/// Field reads return `Ok(None)` for fields the item simply does not have,
/// and `Err` only when the handle itself can no longer be read.
pub trait Renderer {
    /// Opaque handle to a visible item.
    type Item;

    /// Timeline URL for an author handle.
    fn timeline_url(&self, handle: &str) -> String;

    /// Load `url`, replacing the current page.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Monotonic measure of how far the page extends.
    async fn current_page_metric(&self) -> Result<u64>;

    /// Ask the page to grow (scroll to bottom / load the next page).
    async fn request_extend(&mut self) -> Result<()>;

    /// Wait at most `timeout` for the timeline container to be present.
    async fn wait_for_container(&mut self, timeout: Duration) -> Result<()>;

    /// All currently visible items, in page order. Items repeat across calls.
    async fn list_visible_items(&self) -> Result<Vec<Self::Item>>;

    /// Read one field of an item.
    async fn get_field(&self, item: &Self::Item, field: ItemField) -> Result<Option<String>>;

    /// Labeled engagement-count fragments of an item.
    async fn stat_fragments(&self, item: &Self::Item) -> Result<Vec<StatFragment>>;

    /// Best-effort diagnostic capture. Never fails.
    async fn capture_diagnostic(&self, label: &str);

    /// Release the session.
    async fn close(&mut self);
}
