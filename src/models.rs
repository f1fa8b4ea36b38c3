//! Data models for harvested posts and their persisted representation.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Post`]: A retained timeline post with its classification and metrics
//! - [`EngagementMetrics`]: The five engagement counters scraped from a post
//! - [`PostRecord`]: The narrower projection written to disk
//!
//! Posts are values: the collector builds each one fully before appending it
//! to the retained set and never mutates it afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Engagement counters observed on a single post.
///
/// Each counter is independently optional in the source markup and defaults
/// to zero when its indicator is missing. No invariant links the five counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    /// Number of replies.
    pub replies: u64,
    /// Number of retweets / reposts.
    pub retweets: u64,
    /// Number of quote posts.
    pub quotes: u64,
    /// Number of likes.
    pub likes: u64,
    /// Number of views (plays).
    pub views: u64,
}

/// A post retained by the collector for one author.
///
/// # Fields
///
/// * `author_handle` - Handle the post was observed under (falls back to the queried handle)
/// * `text` - Raw body text, possibly empty
/// * `identity_key` - Key from [`crate::identity::resolve`], unique within one run
/// * `published_at` - Normalized UTC publication instant
/// * `bias_label` - Bias category from the labeler, if any keyword matched
/// * `metrics` - Engagement counters
/// * `has_media` - Whether the post carries an attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub author_handle: String,
    pub text: String,
    pub identity_key: String,
    pub published_at: DateTime<Utc>,
    pub bias_label: Option<String>,
    pub metrics: EngagementMetrics,
    pub has_media: bool,
}

/// The persisted projection of a [`Post`].
///
/// Downstream consumers only expect the author, the text, the bias label and
/// the identity key. A missing bias label is written as the literal `"None"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub user: String,
    pub text: String,
    pub bias: String,
    pub id: String,
}

impl From<&Post> for PostRecord {
    fn from(post: &Post) -> Self {
        Self {
            user: post.author_handle.clone(),
            text: post.text.clone(),
            bias: post
                .bias_label
                .clone()
                .unwrap_or_else(|| "None".to_string()),
            id: post.identity_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_post(bias_label: Option<&str>) -> Post {
        Post {
            author_handle: "@trader".to_string(),
            text: "BTC breaking out".to_string(),
            identity_key: "1801234567890".to_string(),
            published_at: Utc.with_ymd_and_hms(2025, 6, 13, 0, 0, 0).unwrap(),
            bias_label: bias_label.map(str::to_string),
            metrics: EngagementMetrics {
                likes: 12,
                ..Default::default()
            },
            has_media: false,
        }
    }

    #[test]
    fn test_metrics_default_is_all_zero() {
        let m = EngagementMetrics::default();
        assert_eq!(m.replies, 0);
        assert_eq!(m.retweets, 0);
        assert_eq!(m.quotes, 0);
        assert_eq!(m.likes, 0);
        assert_eq!(m.views, 0);
    }

    #[test]
    fn test_record_projection_with_label() {
        let post = sample_post(Some("FOMO"));
        let record = PostRecord::from(&post);
        assert_eq!(record.user, "@trader");
        assert_eq!(record.text, "BTC breaking out");
        assert_eq!(record.bias, "FOMO");
        assert_eq!(record.id, "1801234567890");
    }

    #[test]
    fn test_record_projection_without_label_writes_none() {
        let record = PostRecord::from(&sample_post(None));
        assert_eq!(record.bias, "None");
    }

    #[test]
    fn test_record_serialization_keys() {
        let record = PostRecord::from(&sample_post(None));
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"user\":\"@trader\""));
        assert!(json.contains("\"bias\":\"None\""));
        assert!(!json.contains("metrics"));
    }

    #[test]
    fn test_post_serialization_keeps_metrics() {
        let json = serde_json::to_string(&sample_post(None)).unwrap();
        let back: Post = serde_json::from_str(&json).unwrap();
        assert_eq!(back.metrics.likes, 12);
        assert_eq!(back.published_at, sample_post(None).published_at);
    }
}
