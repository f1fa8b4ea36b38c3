//! Collector configuration: limits, pacing and classifier vocabularies.
//!
//! All values are plain data handed to [`crate::collector::Collector::new`];
//! nothing here is global. The CLI layer builds them from flags and
//! environment variables, tests build them directly.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::ops::Range;
use std::time::Duration;
use tracing::{info, instrument};

/// Termination limits for one author's collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of extend/extract rounds in total, growing or not.
    /// Also the cap on consecutive rounds where the page did not grow.
    pub max_rounds: usize,
    /// Stop once more than this many posts are retained.
    pub max_items: usize,
    /// Wall-clock budget per author.
    pub time_budget: Duration,
    /// Stop after this many consecutive rounds without a fresh item.
    pub max_no_fresh_rounds: usize,
    /// Stop once more than this many consecutive items are older than the cutoff.
    pub max_old_streak: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_rounds: 30,
            max_items: 1000,
            time_budget: Duration::from_secs(600),
            max_no_fresh_rounds: 3,
            max_old_streak: 30,
        }
    }
}

/// Waits used while driving the renderer.
///
/// Ranges are sampled uniformly; an empty range means a fixed wait of its start.
#[derive(Debug, Clone, PartialEq)]
pub struct Pacing {
    /// Base pause after each extend request.
    pub scroll_pause: Duration,
    /// Extra jitter added to `scroll_pause`.
    pub scroll_jitter: Range<Duration>,
    /// Wait after the recovery nudge.
    pub nudge_wait: Duration,
    /// Backoff before each navigation attempt.
    pub navigation_backoff: Range<Duration>,
    /// Settle time after navigation returns.
    pub navigation_settle: Duration,
    /// Settle time after the timeline container appears.
    pub container_settle: Duration,
    /// Bounded wait for the timeline container.
    pub container_timeout: Duration,
    /// Pause between two authors in a batch.
    pub inter_author_pause: Range<Duration>,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            scroll_pause: Duration::from_millis(2500),
            scroll_jitter: Duration::from_millis(300)..Duration::from_millis(1000),
            nudge_wait: Duration::from_secs(5),
            navigation_backoff: Duration::from_secs(1)..Duration::from_secs(3),
            navigation_settle: Duration::from_secs(5),
            container_settle: Duration::from_secs(3),
            container_timeout: Duration::from_secs(60),
            inter_author_pause: Duration::from_secs(2)..Duration::from_secs(5),
        }
    }
}

const BASE_POLITICS_TERMS: &[&str] = &[
    "election",
    "trump",
    "biden",
    "kamala",
    "democrat",
    "republican",
    "congress",
    "senate",
    "parliament",
    "president",
    "governor",
    "campaign",
    "ballot",
    "liberal",
    "conservative",
    "maga",
    "immigration",
    "abortion",
];

const BASE_OFF_TOPIC_TERMS: &[&str] = &[
    "football",
    "soccer",
    "basketball",
    "touchdown",
    "super bowl",
    "playoffs",
    "premier league",
    "world cup",
    "movie",
    "netflix",
    "album",
    "concert",
    "celebrity",
    "oscars",
    "grammy",
    "tv show",
];

const BASE_FINANCE_TERMS: &[&str] = &[
    "stock",
    "market",
    "crypto",
    "bitcoin",
    "ethereum",
    "altcoin",
    "trading",
    "trader",
    "portfolio",
    "earnings",
    "dividend",
    "inflation",
    "interest rate",
    "fed ",
    "etf",
    "nasdaq",
    "s&p",
    "futures",
    "options",
    "bull",
    "bear",
    "hodl",
    "defi",
    "liquidity",
    "breakout",
    "support",
    "resistance",
    "chart",
    "yield",
    "bonds",
    "profit",
    "leverage",
];

const CRYPTO_SYMBOLS: &[&str] = &[
    "btc", "eth", "sol", "xrp", "doge", "ada", "bnb", "usdt", "usdc", "ltc", "avax", "dot",
];

/// Term sets used by the topic gate. All terms are stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    pub politics: Vec<String>,
    pub off_topic: Vec<String>,
    pub finance: Vec<String>,
    pub crypto_symbols: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            politics: owned(BASE_POLITICS_TERMS),
            off_topic: owned(BASE_OFF_TOPIC_TERMS),
            finance: owned(BASE_FINANCE_TERMS),
            crypto_symbols: owned(CRYPTO_SYMBOLS),
        }
    }
}

impl Vocabulary {
    /// Base vocabulary unioned with optional comma-separated extensions.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let v = Vocabulary::with_extensions(Some("tariff, sanctions"), None, None);
    /// assert!(v.politics.contains(&"tariff".to_string()));
    /// ```
    pub fn with_extensions(
        politics: Option<&str>,
        off_topic: Option<&str>,
        finance: Option<&str>,
    ) -> Self {
        let base = Self::default();
        Self {
            politics: union(base.politics, politics),
            off_topic: union(base.off_topic, off_topic),
            finance: union(base.finance, finance),
            crypto_symbols: base.crypto_symbols,
        }
    }
}

fn owned(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|t| t.to_string()).collect()
}

fn union(base: Vec<String>, extension: Option<&str>) -> Vec<String> {
    let extra = extension
        .unwrap_or_default()
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty());
    base.into_iter().chain(extra).unique().collect()
}

/// One entry of the ordered keyword → bias mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiasRule {
    pub keyword: String,
    pub bias: String,
}

impl BiasRule {
    pub fn new(keyword: &str, bias: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            bias: bias.to_string(),
        }
    }
}

/// The built-in mapping. Declaration order is the match priority.
const DEFAULT_BIAS_RULES: &[(&str, &str)] = &[
    ("to the moon", "Overconfidence Bias"),
    ("can't lose", "Overconfidence Bias"),
    ("guaranteed", "Overconfidence Bias"),
    ("100x", "Overconfidence Bias"),
    ("don't miss", "FOMO"),
    ("last chance", "FOMO"),
    ("before it's too late", "FOMO"),
    ("fomo", "FOMO"),
    ("everyone is buying", "Bandwagon Effect"),
    ("everyone's buying", "Bandwagon Effect"),
    ("whales are", "Herd Mentality"),
    ("smart money", "Herd Mentality"),
    ("i told you", "Hindsight Bias"),
    ("called it", "Hindsight Bias"),
    ("obviously", "Hindsight Bias"),
    ("as i predicted", "Confirmation Bias"),
    ("proves", "Confirmation Bias"),
    ("just like last time", "Recency Bias"),
    ("this week", "Recency Bias"),
    ("all-time high", "Anchoring Bias"),
    ("was at", "Anchoring Bias"),
    ("hold until", "Loss Aversion"),
    ("never sell", "Loss Aversion"),
    ("diamond hands", "Loss Aversion"),
    ("already lost", "Sunk Cost Fallacy"),
    ("average down", "Sunk Cost Fallacy"),
    ("due for", "Gambler's Fallacy"),
    ("bound to", "Gambler's Fallacy"),
    ("everyone is talking", "Availability Heuristic"),
    ("headline", "Availability Heuristic"),
    ("bullish", "Optimism Bias"),
    ("bearish", "Negativity Bias"),
    ("crash", "Negativity Bias"),
];

/// The built-in ordered bias mapping.
pub fn default_bias_rules() -> Vec<BiasRule> {
    DEFAULT_BIAS_RULES
        .iter()
        .map(|(keyword, bias)| BiasRule::new(keyword, bias))
        .collect()
}

/// Load an ordered bias mapping from a YAML list of `{keyword, bias}` entries.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid rule list.
#[instrument(level = "info", skip_all, fields(%path))]
pub async fn load_bias_rules(path: &str) -> Result<Vec<BiasRule>, Box<dyn Error>> {
    let raw = tokio::fs::read_to_string(path).await?;
    let rules = parse_bias_rules(&raw)?;
    info!(count = rules.len(), "Loaded bias mapping");
    Ok(rules)
}

fn parse_bias_rules(raw: &str) -> Result<Vec<BiasRule>, serde_yaml::Error> {
    let rules: Vec<BiasRule> = serde_yaml::from_str(raw)?;
    Ok(rules
        .into_iter()
        .map(|r| BiasRule {
            keyword: r.keyword.to_lowercase(),
            bias: r.bias,
        })
        .collect())
}

/// Everything a collector needs besides the renderer.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub limits: Limits,
    pub pacing: Pacing,
    pub vocabulary: Vocabulary,
    pub bias_rules: Vec<BiasRule>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            pacing: Pacing::default(),
            vocabulary: Vocabulary::default(),
            bias_rules: default_bias_rules(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let l = Limits::default();
        assert_eq!(l.max_rounds, 30);
        assert_eq!(l.max_items, 1000);
        assert_eq!(l.time_budget, Duration::from_secs(600));
        assert_eq!(l.max_no_fresh_rounds, 3);
        assert_eq!(l.max_old_streak, 30);
    }

    #[test]
    fn test_extensions_are_unioned_and_lowercased() {
        let v = Vocabulary::with_extensions(Some("Tariff, sanctions,,"), None, Some("stock, Gold"));
        assert!(v.politics.contains(&"tariff".to_string()));
        assert!(v.politics.contains(&"sanctions".to_string()));
        assert!(v.politics.contains(&"election".to_string()));
        assert_eq!(v.finance.iter().filter(|t| *t == "stock").count(), 1);
        assert!(v.finance.contains(&"gold".to_string()));
        assert_eq!(v.off_topic, Vocabulary::default().off_topic);
    }

    #[test]
    fn test_default_bias_rules_keep_order() {
        let rules = default_bias_rules();
        assert_eq!(rules[0].keyword, "to the moon");
        assert_eq!(rules.len(), DEFAULT_BIAS_RULES.len());
    }

    #[test]
    fn test_parse_bias_rules_yaml() {
        let yaml = r#"
- keyword: "Moon"
  bias: "Overconfidence Bias"
- keyword: "dip"
  bias: "Anchoring Bias"
"#;
        let rules = parse_bias_rules(yaml).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0], BiasRule::new("moon", "Overconfidence Bias"));
        assert_eq!(rules[1].bias, "Anchoring Bias");
    }

    #[test]
    fn test_parse_bias_rules_rejects_garbage() {
        assert!(parse_bias_rules("keyword: [unclosed").is_err());
    }

    #[tokio::test]
    async fn test_load_bias_rules_missing_file() {
        assert!(load_bias_rules("/nonexistent/bias.yaml").await.is_err());
    }
}
