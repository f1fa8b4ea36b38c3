//! Incremental timeline collection for a single author.
//!
//! The collector drives a [`Renderer`] through repeated rounds of
//! "grow the page, read what is visible" and keeps the posts that are recent
//! enough and, in strict mode, on topic.
//!
//! # States
//!
//! ```text
//! INITIALIZING -> LOADING_TIMELINE -> COLLECTING -> DONE(success)
//!        \______________/ (3 failed attempts) -----> DONE(author_failed)
//! ```
//!
//! # Round
//!
//! 1. Measure the page, request an extend, pause with jitter, measure again.
//! 2. List visible items (overlapping with earlier rounds).
//! 3. For each item: resolve its identity key and skip it if already seen;
//!    drop it if older than the cutoff; otherwise gate, label and keep it.
//! 4. Evaluate the stop conditions in priority order (see [`StopReason`]).
//!
//! Every stop condition is a successful end of collection. Per-item read
//! failures skip the item, a failed listing ends the run with what has been
//! retained so far, and navigation failures are retried before the author is
//! given up. None of these reach the caller as errors.

use crate::classifier::ContentClassifier;
use crate::config::CollectorConfig;
use crate::identity::{self, IdentitySource, IdentityTier};
use crate::metrics;
use crate::models::Post;
use crate::renderer::{ItemField, RenderError, Renderer};
use crate::timestamps;
use crate::utils::{jittered, truncate_for_log};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, instrument, warn};

/// Navigation attempts before an author is given up.
const NAVIGATION_ATTEMPTS: usize = 3;

/// A diagnostic snapshot is taken every this many rounds.
const DIAGNOSTIC_EVERY: usize = 10;

/// Why collection stopped. Variants are listed in evaluation priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Too many consecutive items older than the cutoff.
    OldStreak,
    /// Too many consecutive rounds without a fresh item.
    NoFreshRounds,
    /// More posts retained than the item limit.
    ItemCap,
    /// Wall-clock budget exhausted.
    TimeBudget,
    /// Page stopped growing for as many rounds as the round limit.
    StaleRounds,
    /// Round limit reached.
    RoundLimit,
    /// Items could not be listed; partial result.
    ExtractionFailed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::OldStreak => "old_streak",
            StopReason::NoFreshRounds => "no_fresh_rounds",
            StopReason::ItemCap => "item_cap",
            StopReason::TimeBudget => "time_budget",
            StopReason::StaleRounds => "stale_rounds",
            StopReason::RoundLimit => "round_limit",
            StopReason::ExtractionFailed => "extraction_failed",
        };
        f.write_str(s)
    }
}

/// Terminal state of one author's collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success(StopReason),
    AuthorFailed,
}

/// Result of one author's collection.
#[derive(Debug, Clone)]
pub struct CollectionRun {
    pub handle: String,
    pub outcome: Outcome,
    /// Retained posts in discovery order.
    pub posts: Vec<Post>,
    pub rounds: usize,
    pub elapsed: Duration,
}

/// Mutable bookkeeping for one author. Dropped when the run returns.
#[derive(Debug)]
struct CollectionState {
    seen_keys: HashSet<String>,
    retained: Vec<Post>,
    consecutive_stale_rounds: usize,
    consecutive_no_fresh_rounds: usize,
    consecutive_old_streak: usize,
    round_index: usize,
    started_at: Instant,
}

impl CollectionState {
    fn new() -> Self {
        Self {
            seen_keys: HashSet::new(),
            retained: Vec::new(),
            consecutive_stale_rounds: 0,
            consecutive_no_fresh_rounds: 0,
            consecutive_old_streak: 0,
            round_index: 0,
            started_at: Instant::now(),
        }
    }
}

/// What happened to a single visible item.
#[derive(Debug)]
enum ItemOutcome {
    Duplicate,
    Old,
    OffTopic,
    Retained(Box<Post>),
}

impl ItemOutcome {
    fn is_fresh(&self) -> bool {
        matches!(self, ItemOutcome::OffTopic | ItemOutcome::Retained(_))
    }
}

/// Per-run parameters shared by every item.
struct RunContext<'a> {
    handle: &'a str,
    cutoff: DateTime<Utc>,
    strict: bool,
}

/// Collects recent posts for one author at a time.
#[derive(Debug, Clone)]
pub struct Collector {
    config: CollectorConfig,
    classifier: ContentClassifier,
}

impl Collector {
    pub fn new(config: CollectorConfig) -> Self {
        let classifier = ContentClassifier::new(&config.vocabulary, config.bias_rules.clone());
        Self { config, classifier }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Collect retained posts for `handle`. Never fails; an author that
    /// cannot be loaded yields an empty list.
    #[cfg_attr(not(test), allow(dead_code))]
    pub async fn collect<R: Renderer>(
        &self,
        renderer: &mut R,
        handle: &str,
        cutoff: DateTime<Utc>,
        strict_topic_filter: bool,
    ) -> Vec<Post> {
        self.run(renderer, handle, cutoff, strict_topic_filter)
            .await
            .posts
    }

    /// Like [`Collector::collect`], also reporting how the run ended.
    #[instrument(level = "info", skip_all, fields(%handle, strict = strict_topic_filter))]
    pub async fn run<R: Renderer>(
        &self,
        renderer: &mut R,
        handle: &str,
        cutoff: DateTime<Utc>,
        strict_topic_filter: bool,
    ) -> CollectionRun {
        if let Err(e) = self.load_timeline(renderer, handle).await {
            error!(error = %e, attempts = NAVIGATION_ATTEMPTS, "Giving up on author");
            return CollectionRun {
                handle: handle.to_string(),
                outcome: Outcome::AuthorFailed,
                posts: Vec::new(),
                rounds: 0,
                elapsed: Duration::ZERO,
            };
        }

        let ctx = RunContext {
            handle,
            cutoff,
            strict: strict_topic_filter,
        };
        let mut state = CollectionState::new();
        info!(%cutoff, "Beginning collection");

        let reason = self.collect_rounds(renderer, &ctx, &mut state).await;
        let elapsed = state.started_at.elapsed();

        info!(
            %reason,
            rounds = state.round_index,
            retained = state.retained.len(),
            seen = state.seen_keys.len(),
            elapsed_secs = elapsed.as_secs_f64(),
            "Finished collection"
        );

        CollectionRun {
            handle: handle.to_string(),
            outcome: Outcome::Success(reason),
            posts: state.retained,
            rounds: state.round_index,
            elapsed,
        }
    }

    /// INITIALIZING -> LOADING_TIMELINE -> COLLECTING, with retries.
    async fn load_timeline<R: Renderer>(
        &self,
        renderer: &mut R,
        handle: &str,
    ) -> Result<(), RenderError> {
        let url = renderer.timeline_url(handle);
        let mut last_error = None;

        for attempt in 1..=NAVIGATION_ATTEMPTS {
            sleep(jittered(&self.config.pacing.navigation_backoff)).await;
            match self.open_timeline(renderer, handle, &url).await {
                Ok(()) => {
                    info!(%url, attempt, "Timeline loaded");
                    return Ok(());
                }
                Err(e) => {
                    warn!(%url, attempt, max = NAVIGATION_ATTEMPTS, error = %e, "Error loading timeline");
                    renderer
                        .capture_diagnostic(&format!("03_{handle}_timeline_error_{attempt}"))
                        .await;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(RenderError::NoItems))
    }

    async fn open_timeline<R: Renderer>(
        &self,
        renderer: &mut R,
        handle: &str,
        url: &str,
    ) -> Result<(), RenderError> {
        let pacing = &self.config.pacing;

        renderer.navigate(url).await?;
        sleep(pacing.navigation_settle).await;
        renderer
            .capture_diagnostic(&format!("01_{handle}_creator"))
            .await;

        debug!("Waiting for timeline container");
        renderer.wait_for_container(pacing.container_timeout).await?;
        sleep(pacing.container_settle).await;
        renderer
            .capture_diagnostic(&format!("02_{handle}_timeline_loaded"))
            .await;
        Ok(())
    }

    /// The COLLECTING state.
    async fn collect_rounds<R: Renderer>(
        &self,
        renderer: &mut R,
        ctx: &RunContext<'_>,
        state: &mut CollectionState,
    ) -> StopReason {
        let limits = &self.config.limits;
        let pacing = &self.config.pacing;

        while state.round_index < limits.max_rounds
            && state.consecutive_no_fresh_rounds < limits.max_no_fresh_rounds
        {
            state.round_index += 1;
            let round = state.round_index;

            let before = page_metric(renderer).await;
            if let Err(e) = renderer.request_extend().await {
                warn!(round, error = %e, "Extend request failed");
            }
            let pause = pacing.scroll_pause + jittered(&pacing.scroll_jitter);
            debug!(round, ?pause, "Waiting after extend");
            sleep(pause).await;

            let after = page_metric(renderer).await;
            if after == before {
                state.consecutive_stale_rounds += 1;
                debug!(round, stale = state.consecutive_stale_rounds, "Extend did not grow the page");
            } else {
                state.consecutive_stale_rounds = 0;
            }

            let items = match renderer.list_visible_items().await {
                Ok(items) => items,
                Err(e) => {
                    warn!(round, error = %e, "Cannot locate timeline items; ending collection");
                    renderer
                        .capture_diagnostic(&format!("04_{}_scroll_error_{round}", ctx.handle))
                        .await;
                    return StopReason::ExtractionFailed;
                }
            };
            if round % DIAGNOSTIC_EVERY == 0 {
                renderer
                    .capture_diagnostic(&format!("04_{}_scroll_{round}", ctx.handle))
                    .await;
            }

            let mut found_fresh = false;
            let mut added = 0usize;
            for (position, item) in items.iter().enumerate() {
                if state.retained.len() > limits.max_items {
                    break;
                }
                match self.process_item(renderer, item, position, ctx, state).await {
                    Ok(outcome) => {
                        found_fresh |= outcome.is_fresh();
                        if let ItemOutcome::Retained(post) = outcome {
                            state.retained.push(*post);
                            added += 1;
                        }
                    }
                    Err(e) => {
                        warn!(round, position, error = %e, "Error processing item; skipping");
                        renderer
                            .capture_diagnostic(&format!(
                                "05_{}_tweet_error_{round}_{position}",
                                ctx.handle
                            ))
                            .await;
                    }
                }
            }

            if found_fresh {
                state.consecutive_no_fresh_rounds = 0;
            } else {
                state.consecutive_no_fresh_rounds += 1;
            }

            info!(
                round,
                visible = items.len(),
                added,
                retained = state.retained.len(),
                stale = state.consecutive_stale_rounds,
                no_fresh = state.consecutive_no_fresh_rounds,
                old_streak = state.consecutive_old_streak,
                "Round complete"
            );

            if let Some(reason) = self.stop_reason(state) {
                return reason;
            }

            if state.consecutive_stale_rounds * 2 > limits.max_rounds {
                warn!(round, stale = state.consecutive_stale_rounds, "Page keeps not growing; nudging");
                if let Err(e) = renderer.request_extend().await {
                    warn!(round, error = %e, "Nudge failed");
                }
                sleep(pacing.nudge_wait).await;
            }
        }

        if state.consecutive_no_fresh_rounds >= limits.max_no_fresh_rounds {
            StopReason::NoFreshRounds
        } else {
            StopReason::RoundLimit
        }
    }

    /// Stop conditions, first true wins.
    fn stop_reason(&self, state: &CollectionState) -> Option<StopReason> {
        let limits = &self.config.limits;
        if state.consecutive_old_streak > limits.max_old_streak {
            Some(StopReason::OldStreak)
        } else if state.consecutive_no_fresh_rounds >= limits.max_no_fresh_rounds {
            Some(StopReason::NoFreshRounds)
        } else if state.retained.len() > limits.max_items {
            Some(StopReason::ItemCap)
        } else if state.started_at.elapsed() > limits.time_budget {
            Some(StopReason::TimeBudget)
        } else if state.consecutive_stale_rounds >= limits.max_rounds {
            Some(StopReason::StaleRounds)
        } else {
            None
        }
    }

    async fn process_item<R: Renderer>(
        &self,
        renderer: &R,
        item: &R::Item,
        position: usize,
        ctx: &RunContext<'_>,
        state: &mut CollectionState,
    ) -> Result<ItemOutcome, RenderError> {
        let permalink = renderer.get_field(item, ItemField::Permalink).await?;
        let body = renderer.get_field(item, ItemField::Body).await?;

        let (key, tier) = identity::resolve_with_tier(&IdentitySource {
            permalink: permalink.as_deref(),
            body: body.as_deref(),
            round: state.round_index,
            position,
        });
        if tier != IdentityTier::Permalink {
            debug!(%key, ?tier, "No permalink; using fallback identity");
        }
        if !state.seen_keys.insert(key.clone()) {
            return Ok(ItemOutcome::Duplicate);
        }

        let now = Utc::now();
        let published_at = match renderer.get_field(item, ItemField::Timestamp).await? {
            Some(raw) => timestamps::normalize(&raw, now),
            None => now,
        };
        if published_at < ctx.cutoff {
            state.consecutive_old_streak += 1;
            debug!(%key, %published_at, "Skipping old item");
            return Ok(ItemOutcome::Old);
        }
        state.consecutive_old_streak = 0;

        let text = body.unwrap_or_default();
        let classification = self.classifier.classify(&text, ctx.strict);
        if !classification.passes_topic {
            debug!(
                %key,
                verdict = ?classification.topic,
                text = %truncate_for_log(&text, 80),
                "Dropping off-topic item"
            );
            return Ok(ItemOutcome::OffTopic);
        }

        // Past the cutoff nothing may fail: the item already counts as fresh.
        let author_handle = match renderer.get_field(item, ItemField::AuthorHandle).await {
            Ok(handle) => handle,
            Err(e) => {
                debug!(%key, error = %e, "Author handle unavailable");
                None
            }
        }
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| format!("@{}", ctx.handle));

        let metrics = match renderer.stat_fragments(item).await {
            Ok(fragments) => metrics::extract(&fragments),
            Err(e) => {
                debug!(%key, error = %e, "Metrics unavailable");
                Default::default()
            }
        };
        let has_media = match renderer.get_field(item, ItemField::MediaMarker).await {
            Ok(marker) => marker.is_some(),
            Err(e) => {
                debug!(%key, error = %e, "Media marker unavailable");
                false
            }
        };

        Ok(ItemOutcome::Retained(Box::new(Post {
            author_handle,
            text,
            identity_key: key,
            published_at,
            bias_label: classification.bias_label,
            metrics,
            has_media,
        })))
    }
}

async fn page_metric<R: Renderer>(renderer: &R) -> u64 {
    match renderer.current_page_metric().await {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "Cannot measure page");
            0
        }
    }
}
