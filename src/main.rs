//! # Timeline Harvest
//!
//! Incrementally collects recent posts from a list of authors' public
//! timelines, deduplicates and filters them by recency and topic, labels
//! each with a market-sentiment bias, and writes the result as JSON.
//!
//! ## Features
//!
//! - Renders timelines from a Nitter instance over HTTP, following the
//!   "load more" cursor the way a reader would scroll
//! - Stops each author on the first of several budgets: old-post streak,
//!   rounds without fresh posts, item cap, wall-clock budget, stale page
//! - Optional strict finance topic gate with extensible term lists
//! - Ordered keyword bias labeling, overridable from a YAML file
//! - HTML snapshots at key moments when a debug directory is given
//!
//! ## Usage
//!
//! ```sh
//! timeline_harvest --handles alice,bob --strict-topic-filter -o data/out.json
//! ```
//!
//! ## Architecture
//!
//! 1. **Configuration**: CLI/env flags become limits, vocabulary and bias rules
//! 2. **Collection**: one renderer session walks each author in turn
//! 3. **Classification**: each recent post is gated and bias-labeled
//! 4. **Output**: the `{user, text, bias, id}` projection is written as JSON

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod batch;
mod classifier;
mod cli;
mod collector;
mod config;
mod identity;
mod metrics;
mod models;
mod outputs;
mod renderer;
mod timestamps;
mod utils;

use batch::BatchRunner;
use cli::Cli;
use collector::Collector;
use config::{CollectorConfig, Pacing, default_bias_rules, load_bias_rules};
use outputs::json;
use renderer::nitter::NitterRenderer;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("timeline_harvest starting up");

    // Parse CLI
    let args = Cli::parse();
    let handles = args.normalized_handles();
    debug!(?handles, output_file = %args.output_file, base_url = %args.base_url, "Parsed CLI arguments");

    if handles.is_empty() {
        warn!("No author handles given; nothing to collect");
    }

    // Early check: ensure the output location is writable before spending
    // minutes on collection
    if let Err(e) = utils::ensure_writable_parent(&args.output_file).await {
        error!(
            path = %args.output_file,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Assemble collector configuration ----
    let bias_rules = match args.bias_map.as_deref() {
        Some(path) => load_bias_rules(path).await?,
        None => default_bias_rules(),
    };
    let config = CollectorConfig {
        limits: args.limits(),
        pacing: Pacing::default(),
        vocabulary: args.vocabulary(),
        bias_rules,
    };
    debug!(limits = ?config.limits, "Collector configured");

    let renderer = match NitterRenderer::new(
        &args.base_url,
        args.proxy.as_deref(),
        args.debug_dir.clone(),
    ) {
        Ok(r) => r,
        Err(e) => {
            error!(base_url = %args.base_url, error = %e, "Failed to initialize renderer");
            return Err(e.into());
        }
    };

    // ---- Collect ----
    let now = Utc::now();
    let cutoff = timestamps::cutoff_from_hours(args.recency_hours, now);
    info!(
        authors = handles.len(),
        %cutoff,
        strict = args.strict_topic_filter,
        "Starting collection"
    );

    let runner = BatchRunner::new(Collector::new(config));
    let report = runner
        .run(renderer, &handles, cutoff, args.strict_topic_filter)
        .await;

    for author in &report.authors {
        info!(
            handle = %author.handle,
            outcome = ?author.outcome,
            collected = author.collected,
            rounds = author.rounds,
            elapsed_secs = author.elapsed.as_secs_f64(),
            "Author summary"
        );
    }

    let failed: Vec<&str> = report.failed_authors().collect();
    if !failed.is_empty() {
        warn!(?failed, "Some authors could not be collected");
    }

    // ---- Output ----
    if let Err(e) = json::write_posts(&report.posts, &args.output_file).await {
        error!(path = %args.output_file, error = %e, "Failed to write JSON");
        return Err(e);
    }

    info!(
        total = report.posts.len(),
        from = %cutoff,
        to = %Utc::now(),
        "Saved posts"
    );

    let elapsed = start_time.elapsed();
    info!(
        elapsed_secs = elapsed.as_secs_f64(),
        "Execution complete"
    );

    Ok(())
}
