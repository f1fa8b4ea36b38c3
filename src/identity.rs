//! Identity keys for timeline items.
//!
//! Overlapping page loads show the same post many times, so every visible
//! item is reduced to a key before any other work happens. Three tiers are
//! tried in order:
//!
//! 1. **Permalink**: last path segment of the post link, fragment stripped.
//!    The only tier that is stable across rounds.
//! 2. **Fingerprint**: round index, position and a hash of the first 50
//!    characters of the body. Items with the same leading text at the same
//!    round/position collide.
//! 3. **Position**: round index and position only. Unique within one round.

use std::hash::{DefaultHasher, Hash, Hasher};

/// Number of leading body characters fed to the tier-2 fingerprint.
const FINGERPRINT_CHARS: usize = 50;

/// Which tier produced a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityTier {
    Permalink,
    Fingerprint,
    Position,
}

/// The item fields identity resolution looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentitySource<'a> {
    pub permalink: Option<&'a str>,
    pub body: Option<&'a str>,
    pub round: usize,
    pub position: usize,
}

/// Derive the identity key of an item. Always succeeds.
#[cfg_attr(not(test), allow(dead_code))]
pub fn resolve(source: &IdentitySource<'_>) -> String {
    resolve_with_tier(source).0
}

/// Like [`resolve`], also reporting the tier that was used.
pub fn resolve_with_tier(source: &IdentitySource<'_>) -> (String, IdentityTier) {
    if let Some(key) = source.permalink.and_then(permalink_key) {
        return (key, IdentityTier::Permalink);
    }

    match source.body {
        Some(body) => (
            format!(
                "temp_{}_{}_{:016x}",
                source.round,
                source.position,
                fingerprint(body)
            ),
            IdentityTier::Fingerprint,
        ),
        None => (
            format!("unknown_{}_{}", source.round, source.position),
            IdentityTier::Position,
        ),
    }
}

/// Trailing path segment of a permalink without any `#fragment`.
fn permalink_key(permalink: &str) -> Option<String> {
    let last = permalink.rsplit('/').next()?;
    let key = last.split('#').next()?.trim();
    (!key.is_empty()).then(|| key.to_string())
}

fn fingerprint(body: &str) -> u64 {
    let snippet: String = body
        .chars()
        .take(FINGERPRINT_CHARS)
        .filter(|c| *c != '\n')
        .collect();
    let mut hasher = DefaultHasher::new();
    snippet.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permalink_tier() {
        let src = IdentitySource {
            permalink: Some("https://nitter.net/trader/status/1801234567890#m"),
            body: Some("ignored"),
            round: 3,
            position: 7,
        };
        assert_eq!(
            resolve_with_tier(&src),
            ("1801234567890".to_string(), IdentityTier::Permalink)
        );
    }

    #[test]
    fn test_permalink_is_round_independent() {
        let a = IdentitySource {
            permalink: Some("/trader/status/42"),
            round: 1,
            position: 0,
            ..Default::default()
        };
        let b = IdentitySource {
            round: 9,
            position: 13,
            ..a
        };
        assert_eq!(resolve(&a), resolve(&b));
    }

    #[test]
    fn test_empty_permalink_segment_falls_through() {
        let src = IdentitySource {
            permalink: Some("/trader/status/"),
            body: Some("hello"),
            round: 1,
            position: 2,
        };
        assert_eq!(resolve_with_tier(&src).1, IdentityTier::Fingerprint);
    }

    #[test]
    fn test_fingerprint_tier_uses_leading_text() {
        let long_a = format!("{}{}", "x".repeat(50), "tail one");
        let long_b = format!("{}{}", "x".repeat(50), "tail two");
        let a = IdentitySource {
            body: Some(&long_a),
            round: 2,
            position: 4,
            ..Default::default()
        };
        let b = IdentitySource {
            body: Some(&long_b),
            ..a
        };
        let key = resolve(&a);
        assert!(key.starts_with("temp_2_4_"));
        assert_eq!(key, resolve(&b));
    }

    #[test]
    fn test_fingerprint_ignores_newlines() {
        let a = IdentitySource {
            body: Some("line one\nline two"),
            round: 1,
            position: 1,
            ..Default::default()
        };
        let b = IdentitySource {
            body: Some("line oneline two"),
            ..a
        };
        assert_eq!(resolve(&a), resolve(&b));
    }

    #[test]
    fn test_position_tier() {
        let src = IdentitySource {
            round: 5,
            position: 11,
            ..Default::default()
        };
        assert_eq!(
            resolve_with_tier(&src),
            ("unknown_5_11".to_string(), IdentityTier::Position)
        );
    }
}
