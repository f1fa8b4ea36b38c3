//! Sequential collection over a list of authors.
//!
//! The renderer is a single stateful session, so authors are processed one
//! after the other and the session is reused between them. The runner takes
//! ownership of the renderer and closes it once, after the last author,
//! whatever happened to the individual authors.

use crate::collector::{Collector, Outcome};
use crate::models::Post;
use crate::renderer::Renderer;
use crate::utils::jittered;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument};

/// Per-author line of a batch report.
#[derive(Debug, Clone)]
pub struct AuthorSummary {
    pub handle: String,
    pub outcome: Outcome,
    pub collected: usize,
    pub rounds: usize,
    pub elapsed: Duration,
}

/// Merged result of a batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// All retained posts, author by author, each in discovery order.
    pub posts: Vec<Post>,
    pub authors: Vec<AuthorSummary>,
}

impl BatchReport {
    pub fn failed_authors(&self) -> impl Iterator<Item = &str> {
        self.authors
            .iter()
            .filter(|a| a.outcome == Outcome::AuthorFailed)
            .map(|a| a.handle.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct BatchRunner {
    collector: Collector,
}

impl BatchRunner {
    pub fn new(collector: Collector) -> Self {
        Self { collector }
    }

    /// Collect every handle in order and merge the results.
    ///
    /// Author-level failures are logged and leave that author out of the
    /// output; the batch always continues.
    #[instrument(level = "info", skip_all, fields(authors = handles.len(), %cutoff, strict = strict_topic_filter))]
    pub async fn run<R: Renderer>(
        &self,
        mut renderer: R,
        handles: &[String],
        cutoff: DateTime<Utc>,
        strict_topic_filter: bool,
    ) -> BatchReport {
        let pause = &self.collector.config().pacing.inter_author_pause;
        let mut report = BatchReport::default();

        for (i, handle) in handles.iter().enumerate() {
            if i > 0 {
                sleep(jittered(pause)).await;
            }

            info!(%handle, "Scraping author");
            let run = self
                .collector
                .run(&mut renderer, handle, cutoff, strict_topic_filter)
                .await;

            match run.outcome {
                Outcome::AuthorFailed => error!(%handle, "Author failed; continuing with batch"),
                Outcome::Success(reason) => info!(
                    %handle,
                    %reason,
                    collected = run.posts.len(),
                    secs = run.elapsed.as_secs_f64(),
                    "Scraped author"
                ),
            }

            report.authors.push(AuthorSummary {
                handle: run.handle,
                outcome: run.outcome,
                collected: run.posts.len(),
                rounds: run.rounds,
                elapsed: run.elapsed,
            });
            report.posts.extend(run.posts);
        }

        renderer.close().await;
        info!(total = report.posts.len(), "Batch complete");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::StopReason;
    use crate::config::CollectorConfig;
    use crate::renderer::fake::{FakeItem, FakeRenderer, FakeTimeline};
    use crate::timestamps::cutoff_from_hours;

    fn runner() -> BatchRunner {
        BatchRunner::new(Collector::new(CollectorConfig::default()))
    }

    fn handles(list: &[&str]) -> Vec<String> {
        list.iter().map(|h| h.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_author_does_not_abort_batch() {
        let r = FakeRenderer::new()
            .with_timeline(
                "broken",
                FakeTimeline {
                    navigation_failures: 10,
                    ..Default::default()
                },
            )
            .with_timeline(
                "healthy",
                FakeTimeline::with_pages(vec![FakeItem::post("1", "1h", "bitcoin")], vec![]),
            );
        let closes = r.closes.clone();

        let report = runner()
            .run(r, &handles(&["broken", "healthy"]), cutoff_from_hours(48, Utc::now()), false)
            .await;

        assert_eq!(report.posts.len(), 1);
        assert_eq!(report.authors.len(), 2);
        assert_eq!(report.failed_authors().collect::<Vec<_>>(), vec!["broken"]);
        assert_eq!(closes.get(), 1);
        assert_eq!(
            report.authors[1].outcome,
            Outcome::Success(StopReason::NoFreshRounds)
        );
        assert_eq!(report.authors[0].collected, 0);
        assert_eq!(report.authors[0].rounds, 0);
        assert_eq!(report.authors[0].elapsed, Duration::ZERO);
        assert_eq!(report.authors[1].collected, 1);
        assert_eq!(report.authors[1].rounds, 4);
        assert!(report.authors[1].elapsed > Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_dedup_across_authors() {
        let shared = || FakeTimeline::with_pages(vec![FakeItem::post("42", "1h", "eth")], vec![]);
        let r = FakeRenderer::new()
            .with_timeline("a", shared())
            .with_timeline("b", shared());

        let report = runner()
            .run(r, &handles(&["a", "b"]), cutoff_from_hours(48, Utc::now()), false)
            .await;

        let keys: Vec<_> = report.posts.iter().map(|p| p.identity_key.as_str()).collect();
        assert_eq!(keys, vec!["42", "42"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch_still_closes() {
        let r = FakeRenderer::new();
        let closes = r.closes.clone();
        let report = runner()
            .run(r, &[], cutoff_from_hours(48, Utc::now()), false)
            .await;
        assert_eq!(closes.get(), 1);
        assert!(report.posts.is_empty());
        assert!(report.authors.is_empty());
    }
}
