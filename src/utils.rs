//! Utility functions for logging, pacing and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - String truncation for log previews of post bodies
//! - Jittered waits sampled from a duration range
//! - File system validation for the output location

use rand::{Rng, rng};
use std::error::Error;
use std::fs as stdfs;
use std::ops::Range;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number
/// of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Sample a wait from `range`. An empty range yields its start.
pub fn jittered(range: &Range<Duration>) -> Duration {
    if range.is_empty() {
        range.start
    } else {
        rng().random_range(range.clone())
    }
}

/// Ensure the directory that will hold `file` exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable.
#[instrument(level = "info", skip_all, fields(file = %file))]
pub async fn ensure_writable_parent(file: &str) -> Result<(), Box<dyn Error>> {
    let dir = match Path::new(file).parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    fs::create_dir_all(&dir).await?;

    // Sync probe keeps the error surface simple
    let probe_path = dir.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!(dir = %dir.display(), "Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let s = "€".repeat(10);
        assert_eq!(truncate_for_log(&s, 2), "€€…(+24 bytes)");
    }

    #[test]
    fn test_jittered_empty_range_is_fixed() {
        let d = Duration::from_millis(250);
        assert_eq!(jittered(&(d..d)), d);
    }

    #[test]
    fn test_jittered_within_range() {
        let range = Duration::from_millis(300)..Duration::from_millis(1000);
        for _ in 0..50 {
            let d = jittered(&range);
            assert!(d >= range.start && d < range.end);
        }
    }

    #[tokio::test]
    async fn test_ensure_writable_parent_creates_dir() {
        let dir = std::env::temp_dir().join(format!("harvest_probe_{}", std::process::id()));
        let file = dir.join("nested").join("out.json");
        ensure_writable_parent(file.to_str().unwrap()).await.unwrap();
        assert!(dir.join("nested").is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
