//! Scripted in-memory renderer for collector and batch tests.

use super::{ItemField, RenderError, Renderer, Result};
use crate::metrics::StatFragment;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct FakeItem {
    pub permalink: Option<String>,
    pub author: Option<String>,
    pub body: Option<String>,
    pub timestamp: Option<String>,
    pub has_media: bool,
    pub stats: Vec<StatFragment>,
    pub stale: bool,
    /// Reading only this field fails.
    pub failing_field: Option<ItemField>,
}

impl FakeItem {
    /// A post with a permalink `/author/status/<id>`.
    pub fn post(id: &str, timestamp: &str, body: &str) -> Self {
        Self {
            permalink: Some(format!("/author/status/{id}#m")),
            author: Some("@author".to_string()),
            body: Some(body.to_string()),
            timestamp: Some(timestamp.to_string()),
            ..Default::default()
        }
    }
}

/// Produces the batch appended by the n-th extend request (0-based).
pub type ExtendFn = Box<dyn Fn(usize) -> Vec<FakeItem>>;

pub struct FakeTimeline {
    pub initial: Vec<FakeItem>,
    pub pages: VecDeque<Vec<FakeItem>>,
    pub generator: Option<ExtendFn>,
    pub navigation_failures: usize,
    pub container_present: bool,
    /// `list_visible_items` fails on this call (1-based).
    pub fail_listing_on: Option<usize>,
}

impl Default for FakeTimeline {
    fn default() -> Self {
        Self {
            initial: Vec::new(),
            pages: VecDeque::new(),
            generator: None,
            navigation_failures: 0,
            container_present: true,
            fail_listing_on: None,
        }
    }
}

impl FakeTimeline {
    pub fn with_pages(initial: Vec<FakeItem>, pages: Vec<Vec<FakeItem>>) -> Self {
        Self {
            initial,
            pages: pages.into(),
            ..Default::default()
        }
    }
}

#[derive(Default)]
pub struct FakeRenderer {
    pub timelines: HashMap<String, FakeTimeline>,
    current: Option<String>,
    visible: Vec<FakeItem>,
    extends: usize,
    listings: Cell<usize>,
    pub navigations: usize,
    /// Extend requests across all timelines, nudges included.
    pub extend_requests: usize,
    /// Shared so tests can observe closing after handing the renderer away.
    pub closes: Rc<Cell<usize>>,
    pub diagnostics: RefCell<Vec<String>>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeline(mut self, handle: &str, timeline: FakeTimeline) -> Self {
        let url = self.timeline_url(handle);
        self.timelines.insert(url, timeline);
        self
    }

    fn timeline(&self) -> Result<&FakeTimeline> {
        self.current
            .as_ref()
            .and_then(|url| self.timelines.get(url))
            .ok_or(RenderError::NoItems)
    }
}

impl Renderer for FakeRenderer {
    type Item = usize;

    fn timeline_url(&self, handle: &str) -> String {
        format!("https://fake.test/{handle}")
    }

    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.navigations += 1;
        let Some(timeline) = self.timelines.get_mut(url) else {
            return Err(RenderError::Navigation {
                url: url.to_string(),
                message: "404".to_string(),
            });
        };
        if timeline.navigation_failures > 0 {
            timeline.navigation_failures -= 1;
            return Err(RenderError::Navigation {
                url: url.to_string(),
                message: "connection reset".to_string(),
            });
        }
        self.visible = timeline.initial.clone();
        self.current = Some(url.to_string());
        self.extends = 0;
        self.listings.set(0);
        Ok(())
    }

    async fn current_page_metric(&self) -> Result<u64> {
        Ok(self.visible.len() as u64)
    }

    async fn request_extend(&mut self) -> Result<()> {
        let n = self.extends;
        self.extends += 1;
        self.extend_requests += 1;
        let Some(timeline) = self.current.as_ref().and_then(|u| self.timelines.get_mut(u)) else {
            return Err(RenderError::NoItems);
        };
        if let Some(page) = timeline.pages.pop_front() {
            self.visible.extend(page);
        } else if let Some(generator) = timeline.generator.as_ref() {
            self.visible.extend(generator(n));
        }
        Ok(())
    }

    async fn wait_for_container(&mut self, timeout: Duration) -> Result<()> {
        if self.timeline()?.container_present {
            Ok(())
        } else {
            Err(RenderError::ContainerTimeout(timeout))
        }
    }

    async fn list_visible_items(&self) -> Result<Vec<usize>> {
        let call = self.listings.get() + 1;
        self.listings.set(call);
        if self.timeline()?.fail_listing_on == Some(call) {
            return Err(RenderError::NoItems);
        }
        Ok((0..self.visible.len()).collect())
    }

    async fn get_field(&self, item: &usize, field: ItemField) -> Result<Option<String>> {
        let item = self.visible.get(*item).ok_or(RenderError::StaleItem)?;
        if item.stale || item.failing_field == Some(field) {
            return Err(RenderError::StaleItem);
        }
        Ok(match field {
            ItemField::Permalink => item.permalink.clone(),
            ItemField::AuthorHandle => item.author.clone(),
            ItemField::Body => item.body.clone(),
            ItemField::Timestamp => item.timestamp.clone(),
            ItemField::MediaMarker => item.has_media.then(|| "attachments".to_string()),
        })
    }

    async fn stat_fragments(&self, item: &usize) -> Result<Vec<StatFragment>> {
        let item = self.visible.get(*item).ok_or(RenderError::StaleItem)?;
        Ok(item.stats.clone())
    }

    async fn capture_diagnostic(&self, label: &str) {
        self.diagnostics.borrow_mut().push(label.to_string());
    }

    async fn close(&mut self) {
        self.closes.set(self.closes.get() + 1);
    }
}
