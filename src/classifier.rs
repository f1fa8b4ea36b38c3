//! Keyword-based content classification.
//!
//! Two independent stages run on each fresh post:
//!
//! 1. [`TopicGate`] decides whether a post is about finance/markets at all.
//!    It is only enforced when strict topic filtering is on.
//! 2. [`BiasLabeler`] attaches a cognitive-bias label from an ordered
//!    keyword mapping. It always runs and never rejects anything.
//!
//! Both stages are deterministic substring and regex matches over the post
//! text; there is no scoring.

use crate::config::{BiasRule, Vocabulary};
use once_cell::sync::Lazy;
use regex::Regex;

/// An uppercase ticker of 1-5 letters, optionally behind a `$`, with no
/// letter or digit touching it on either side. Case-sensitive on purpose.
static TICKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9])\$?[A-Z]{1,5}(?:[^A-Za-z0-9]|$)").expect("valid ticker regex")
});

/// Why the topic gate reached its decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicVerdict {
    RejectedPolitics(String),
    RejectedOffTopic(String),
    AcceptedTerm(String),
    AcceptedTicker,
    AcceptedCryptoSymbol,
    RejectedNoSignal,
}

impl TopicVerdict {
    pub fn passes(&self) -> bool {
        matches!(
            self,
            TopicVerdict::AcceptedTerm(_)
                | TopicVerdict::AcceptedTicker
                | TopicVerdict::AcceptedCryptoSymbol
        )
    }
}

/// Stage 1: finance-vs-noise gate.
#[derive(Debug, Clone)]
pub struct TopicGate {
    politics: Vec<String>,
    off_topic: Vec<String>,
    finance: Vec<String>,
    crypto_re: Option<Regex>,
}

impl TopicGate {
    pub fn new(vocabulary: &Vocabulary) -> Self {
        let crypto_re = if vocabulary.crypto_symbols.is_empty() {
            None
        } else {
            let alternation = vocabulary
                .crypto_symbols
                .iter()
                .map(|s| regex::escape(s))
                .collect::<Vec<_>>()
                .join("|");
            Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).ok()
        };

        Self {
            politics: vocabulary.politics.clone(),
            off_topic: vocabulary.off_topic.clone(),
            finance: vocabulary.finance.clone(),
            crypto_re,
        }
    }

    /// Evaluate `text`, reporting which rule decided.
    ///
    /// Politics terms dominate everything, then off-topic terms; only then
    /// are the acceptance signals consulted.
    pub fn evaluate(&self, text: &str) -> TopicVerdict {
        let lowered = text.to_lowercase();

        if let Some(term) = first_contained(&self.politics, &lowered) {
            return TopicVerdict::RejectedPolitics(term.to_string());
        }
        if let Some(term) = first_contained(&self.off_topic, &lowered) {
            return TopicVerdict::RejectedOffTopic(term.to_string());
        }
        if let Some(term) = first_contained(&self.finance, &lowered) {
            return TopicVerdict::AcceptedTerm(term.to_string());
        }
        if TICKER_RE.is_match(text) {
            return TopicVerdict::AcceptedTicker;
        }
        if self.crypto_re.as_ref().is_some_and(|re| re.is_match(text)) {
            return TopicVerdict::AcceptedCryptoSymbol;
        }
        TopicVerdict::RejectedNoSignal
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn passes_topic_filter(&self, text: &str) -> bool {
        self.evaluate(text).passes()
    }
}

fn first_contained<'a>(terms: &'a [String], haystack: &str) -> Option<&'a str> {
    terms
        .iter()
        .map(String::as_str)
        .find(|term| !term.is_empty() && haystack.contains(term))
}

/// Stage 2: first-match bias labeling.
#[derive(Debug, Clone)]
pub struct BiasLabeler {
    rules: Vec<BiasRule>,
}

impl BiasLabeler {
    pub fn new(rules: Vec<BiasRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| BiasRule {
                keyword: r.keyword.to_lowercase(),
                bias: r.bias,
            })
            .filter(|r| !r.keyword.is_empty())
            .collect();
        Self { rules }
    }

    /// Label of the first rule, in declaration order, whose keyword occurs
    /// in `text` (case-insensitive). Position inside the text is irrelevant.
    pub fn label_bias(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|r| lowered.contains(&r.keyword))
            .map(|r| r.bias.as_str())
    }
}

/// Result of running both stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub topic: TopicVerdict,
    pub passes_topic: bool,
    pub bias_label: Option<String>,
}

/// Both stages composed in fixed order.
#[derive(Debug, Clone)]
pub struct ContentClassifier {
    gate: TopicGate,
    labeler: BiasLabeler,
}

impl ContentClassifier {
    pub fn new(vocabulary: &Vocabulary, rules: Vec<BiasRule>) -> Self {
        Self {
            gate: TopicGate::new(vocabulary),
            labeler: BiasLabeler::new(rules),
        }
    }

    /// Classify `text`. With `strict` off every post passes the gate.
    pub fn classify(&self, text: &str, strict: bool) -> Classification {
        let topic = self.gate.evaluate(text);
        let passes_topic = !strict || topic.passes();
        Classification {
            topic,
            passes_topic,
            bias_label: self.labeler.label_bias(text).map(str::to_string),
        }
    }
}
