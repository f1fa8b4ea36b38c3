//! Engagement metrics extraction from labeled count fragments.
//!
//! A timeline post exposes its counters as a list of small fragments, each
//! with an icon marker (the label hint) and a display text such as `1,234`.
//! The marker decides which counter the fragment feeds.

use crate::models::EngagementMetrics;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static COUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d,]+").expect("valid count regex"));

/// A single labeled counter fragment as exposed by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatFragment {
    /// Markup hint identifying the counter, e.g. `icon-heart`.
    pub label_hint: String,
    /// Visible text of the fragment, e.g. `1,234`.
    pub display_text: String,
}

impl StatFragment {
    pub fn new(label_hint: impl Into<String>, display_text: impl Into<String>) -> Self {
        Self {
            label_hint: label_hint.into(),
            display_text: display_text.into(),
        }
    }
}

/// The five counters a fragment can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Replies,
    Retweets,
    Quotes,
    Likes,
    Views,
}

impl MetricKind {
    /// Indicator vocabulary, checked in order; the first marker found wins.
    const INDICATORS: [(&'static str, MetricKind); 5] = [
        ("icon-comment", MetricKind::Replies),
        ("icon-retweet", MetricKind::Retweets),
        ("icon-quote", MetricKind::Quotes),
        ("icon-heart", MetricKind::Likes),
        ("icon-play", MetricKind::Views),
    ];

    /// Map a label hint to a counter, or `None` if no indicator matches.
    pub fn from_hint(hint: &str) -> Option<Self> {
        Self::INDICATORS
            .iter()
            .find(|(marker, _)| hint.contains(marker))
            .map(|(_, kind)| *kind)
    }
}

/// Extract engagement metrics from an ordered set of fragments.
///
/// Empty fragments and fragments without a known indicator are ignored. When
/// two fragments map to the same counter the later one wins. If a count
/// cannot be represented the whole record falls back to all zeros.
pub fn extract(fragments: &[StatFragment]) -> EngagementMetrics {
    match try_extract(fragments) {
        Some(metrics) => metrics,
        None => {
            debug!(fragments = fragments.len(), "Metrics extraction failed; using zeros");
            EngagementMetrics::default()
        }
    }
}

fn try_extract(fragments: &[StatFragment]) -> Option<EngagementMetrics> {
    let mut metrics = EngagementMetrics::default();

    for fragment in fragments {
        let text = fragment.display_text.trim();
        if text.is_empty() {
            continue;
        }

        let value = match COUNT_RE.find(text) {
            Some(m) => m.as_str().replace(',', "").parse::<u64>().ok()?,
            None => 0,
        };

        match MetricKind::from_hint(&fragment.label_hint) {
            Some(MetricKind::Replies) => metrics.replies = value,
            Some(MetricKind::Retweets) => metrics.retweets = value,
            Some(MetricKind::Quotes) => metrics.quotes = value,
            Some(MetricKind::Likes) => metrics.likes = value,
            Some(MetricKind::Views) => metrics.views = value,
            None => {}
        }
    }

    Some(metrics)
}
