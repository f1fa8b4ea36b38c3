//! Command-line interface definitions for Timeline Harvest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Most arguments can be provided via command-line flags or environment variables.

use crate::config::{Limits, Vocabulary};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the Timeline Harvest application.
///
/// # Examples
///
/// ```sh
/// # Defaults: one author, last 48 hours, no topic gate
/// timeline_harvest
///
/// # Several authors, strict finance gate, extra politics terms
/// timeline_harvest --handles alice,bob --strict-topic-filter --politics-terms tariff,sanctions
///
/// # Through a proxy, keeping HTML snapshots for debugging
/// timeline_harvest --proxy socks5://127.0.0.1:9050 --debug-dir debug_screenshots
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Author handles to harvest, comma-separated
    #[arg(long, env = "CREATOR_HANDLES", value_delimiter = ',', default_value = "Ashcryptoreal")]
    pub handles: Vec<String>,

    /// Output JSON file
    #[arg(short, long, env = "OUTPUT_FILE", default_value = "data/tweets_with_bias.json")]
    pub output_file: String,

    /// Base URL of the timeline host
    #[arg(long, env = "BASE_URL", default_value = "https://nitter.net")]
    pub base_url: String,

    /// Recency window in hours
    #[arg(long, env = "RECENCY_HOURS", default_value_t = 48)]
    pub recency_hours: u32,

    /// Drop posts that do not pass the finance topic gate
    #[arg(long, env = "STRICT_TOPIC_FILTER")]
    pub strict_topic_filter: bool,

    /// Extra politics terms (comma-separated) that reject a post
    #[arg(long, env = "POLITICS_TERMS")]
    pub politics_terms: Option<String>,

    /// Extra entertainment/sports terms (comma-separated) that reject a post
    #[arg(long, env = "OFFTOPIC_TERMS")]
    pub offtopic_terms: Option<String>,

    /// Extra finance terms (comma-separated) that accept a post
    #[arg(long, env = "FINANCE_TERMS")]
    pub finance_terms: Option<String>,

    /// YAML file with an ordered list of `{keyword, bias}` rules
    #[arg(long, env = "BIAS_MAP")]
    pub bias_map: Option<String>,

    /// Maximum scroll rounds per author
    #[arg(long, default_value_t = 30)]
    pub max_rounds: usize,

    /// Stop an author once more than this many posts are retained
    #[arg(long, default_value_t = 1000)]
    pub max_items: usize,

    /// Time budget per author, in seconds
    #[arg(long, default_value_t = 600)]
    pub time_budget_secs: u64,

    /// Stop after this many consecutive rounds without a recent post
    #[arg(long, default_value_t = 3)]
    pub no_fresh_rounds: usize,

    /// Stop once more than this many consecutive posts are too old
    #[arg(long, default_value_t = 30)]
    pub old_streak: usize,

    /// Directory for diagnostic page snapshots (disabled when unset)
    #[arg(long, env = "DEBUG_DIR")]
    pub debug_dir: Option<PathBuf>,

    /// Proxy URL for all requests
    #[arg(long, env = "PROXY_SERVER")]
    pub proxy: Option<String>,
}

impl Cli {
    pub fn limits(&self) -> Limits {
        Limits {
            max_rounds: self.max_rounds,
            max_items: self.max_items,
            time_budget: Duration::from_secs(self.time_budget_secs),
            max_no_fresh_rounds: self.no_fresh_rounds,
            max_old_streak: self.old_streak,
        }
    }

    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary::with_extensions(
            self.politics_terms.as_deref(),
            self.offtopic_terms.as_deref(),
            self.finance_terms.as_deref(),
        )
    }

    /// Handles with surrounding whitespace and `@` removed, empties dropped.
    pub fn normalized_handles(&self) -> Vec<String> {
        self.handles
            .iter()
            .map(|h| h.trim().trim_start_matches('@').to_string())
            .filter(|h| !h.is_empty())
            .collect()
    }
}
