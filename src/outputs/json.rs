//! JSON output of retained posts.
//!
//! Only the [`PostRecord`] projection is persisted: author, text, bias label
//! (`"None"` when absent) and identity key. The in-memory [`Post`] keeps the
//! timestamp, metrics and media flag, which are not written.

use crate::models::{Post, PostRecord};
use crate::utils::ensure_writable_parent;
use std::error::Error;
use tokio::fs;
use tracing::{info, instrument};

/// Serialize the projection of `posts` as pretty-printed JSON.
pub fn render_posts(posts: &[Post]) -> Result<String, serde_json::Error> {
    let records: Vec<PostRecord> = posts.iter().map(PostRecord::from).collect();
    serde_json::to_string_pretty(&records)
}

/// Write `posts` to `output_file`, creating its directory if needed.
///
/// # Errors
///
/// Returns an error if the directory is not writable, serialization fails or
/// the file cannot be written.
#[instrument(level = "info", skip_all, fields(%output_file, count = posts.len()))]
pub async fn write_posts(posts: &[Post], output_file: &str) -> Result<(), Box<dyn Error>> {
    ensure_writable_parent(output_file).await?;
    let json = render_posts(posts)?;

    info!(path = %output_file, "Writing JSON");
    fs::write(output_file, json).await?;
    info!(path = %output_file, "Wrote posts JSON");

    Ok(())
}
