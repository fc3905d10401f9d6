//! News aggregation: fetch configured feeds, filter, and render a report.
//!
//! The fetcher is a collaborator boundary; core owns the aggregation
//! pipeline and the job that pushes the rendered report to its targets.

pub mod render;
pub mod scheduler;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{Duration, Utc};
use futures_util::future::join_all;
use tracing::{info, warn};

use colloquy_types::config::NewsConfig;
use colloquy_types::error::NewsError;
use colloquy_types::news::NewsItem;

use crate::admin::JobTrigger;
use crate::push::{PushTarget, SharedPusher};

/// Items older than this are dropped from the report.
const MAX_ITEM_AGE_HOURS: i64 = 24;

/// Fetches and normalizes one RSS feed.
pub trait FeedFetcher: Send + Sync {
    fn fetch(
        &self,
        name: &str,
        url: &str,
    ) -> impl Future<Output = Result<Vec<NewsItem>, NewsError>> + Send;
}

/// Aggregates configured feeds into a single capped, deduplicated list.
pub struct NewsService<F: FeedFetcher> {
    fetcher: F,
    config: NewsConfig,
}

impl<F: FeedFetcher> NewsService<F> {
    pub fn new(fetcher: F, config: NewsConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &NewsConfig {
        &self.config
    }

    /// Fetch all feeds concurrently and aggregate.
    ///
    /// A feed that fails is logged and skipped; the report is built from
    /// whatever arrived. Per feed: newest first, capped. Across feeds:
    /// keyword filter, recency filter, link dedupe, global cap.
    pub async fn collect(&self) -> Vec<NewsItem> {
        let fetches = self.config.feeds.iter().map(|(name, url)| async move {
            match self.fetcher.fetch(name, url).await {
                Ok(items) => items,
                Err(err) => {
                    warn!(feed = %name, error = %err, "feed fetch failed");
                    Vec::new()
                }
            }
        });

        let mut aggregated = Vec::new();
        for mut items in join_all(fetches).await {
            items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
            items.truncate(self.config.max_items_per_feed);
            aggregated.extend(items);
        }

        let cutoff = Utc::now() - Duration::hours(MAX_ITEM_AGE_HOURS);
        let mut seen_links = std::collections::BTreeSet::new();
        aggregated.retain(|item| {
            self.matches_keywords(&item.title)
                && item.published_at >= cutoff
                && seen_links.insert(item.link.clone())
        });
        aggregated.truncate(self.config.max_total_items);
        aggregated
    }

    /// Collect, render, and return the report text. `None` when nothing
    /// survived the filters.
    pub async fn report(&self) -> Option<String> {
        let items = self.collect().await;
        if items.is_empty() {
            return None;
        }
        Some(render::render(&items, self.config.report_format))
    }

    fn matches_keywords(&self, title: &str) -> bool {
        if self.config.include_keywords.is_empty() {
            return true;
        }
        self.config
            .include_keywords
            .iter()
            .any(|kw| title.contains(kw.as_str()))
    }
}

/// The scheduled (and admin-triggerable) news push.
pub struct NewsJob<F: FeedFetcher> {
    service: NewsService<F>,
    pusher: SharedPusher,
}

impl<F: FeedFetcher> NewsJob<F> {
    pub fn new(service: NewsService<F>, pusher: SharedPusher) -> Self {
        Self { service, pusher }
    }

    /// Build the report and push it to every configured target group.
    pub async fn run(&self) -> Result<(), NewsError> {
        let Some(report) = self.service.report().await else {
            info!("news report empty, nothing pushed");
            return Ok(());
        };
        for group in &self.service.config().target_group_ids {
            let target = PushTarget::Group(group.clone());
            self.pusher.deliver(&target, &report).await?;
        }
        info!(
            targets = self.service.config().target_group_ids.len(),
            "news report pushed"
        );
        Ok(())
    }
}

impl<F: FeedFetcher + 'static> JobTrigger for NewsJob<F> {
    fn trigger(&self) -> Pin<Box<dyn Future<Output = Result<(), NewsError>> + Send + '_>> {
        Box::pin(self.run())
    }
}

/// A job handle the scheduler closure can clone into each firing.
pub type SharedNewsJob<F> = Arc<NewsJob<F>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use colloquy_types::error::PushError;
    use colloquy_types::identity::UserId;

    use crate::push::MessagePusher;

    struct StaticFetcher {
        items: BTreeMap<String, Vec<NewsItem>>,
    }

    impl FeedFetcher for StaticFetcher {
        async fn fetch(&self, name: &str, _url: &str) -> Result<Vec<NewsItem>, NewsError> {
            self.items
                .get(name)
                .cloned()
                .ok_or_else(|| NewsError::Fetch(format!("no such feed {name}")))
        }
    }

    struct RecordingPusher {
        sent: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl MessagePusher for RecordingPusher {
        async fn send_user(&self, _user: &UserId, _text: &str) -> Result<(), PushError> {
            Ok(())
        }

        async fn send_group(&self, group: &str, text: &str) -> Result<(), PushError> {
            self.sent
                .lock()
                .unwrap()
                .push((group.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn item(source: &str, title: &str, link: &str, age_hours: i64) -> NewsItem {
        NewsItem {
            source: source.to_string(),
            title: title.to_string(),
            link: link.to_string(),
            published_at: Utc::now() - Duration::hours(age_hours),
            summary: String::new(),
        }
    }

    fn config(feeds: &[&str]) -> NewsConfig {
        NewsConfig {
            enabled: true,
            feeds: feeds
                .iter()
                .map(|n| (n.to_string(), format!("https://{n}.example/rss")))
                .collect(),
            max_items_per_feed: 2,
            max_total_items: 3,
            target_group_ids: vec!["g1".to_string()],
            ..NewsConfig::default()
        }
    }

    #[tokio::test]
    async fn test_per_feed_cap_keeps_newest() {
        let fetcher = StaticFetcher {
            items: BTreeMap::from([(
                "a".to_string(),
                vec![
                    item("a", "old", "https://x/1", 20),
                    item("a", "new", "https://x/2", 1),
                    item("a", "mid", "https://x/3", 10),
                ],
            )]),
        };
        let service = NewsService::new(fetcher, config(&["a"]));
        let items = service.collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "new");
        assert_eq!(items[1].title, "mid");
    }

    #[tokio::test]
    async fn test_stale_items_and_duplicate_links_dropped() {
        let fetcher = StaticFetcher {
            items: BTreeMap::from([
                (
                    "a".to_string(),
                    vec![
                        item("a", "fresh", "https://x/1", 1),
                        item("a", "stale", "https://x/2", 48),
                    ],
                ),
                (
                    "b".to_string(),
                    vec![item("b", "same story", "https://x/1", 2)],
                ),
            ]),
        };
        let service = NewsService::new(fetcher, config(&["a", "b"]));
        let items = service.collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "fresh");
    }

    #[tokio::test]
    async fn test_keyword_filter() {
        let fetcher = StaticFetcher {
            items: BTreeMap::from([(
                "a".to_string(),
                vec![
                    item("a", "rust release", "https://x/1", 1),
                    item("a", "gardening tips", "https://x/2", 1),
                ],
            )]),
        };
        let mut cfg = config(&["a"]);
        cfg.include_keywords = vec!["rust".to_string()];
        let service = NewsService::new(fetcher, cfg);
        let items = service.collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "rust release");
    }

    #[tokio::test]
    async fn test_failed_feed_is_skipped() {
        let fetcher = StaticFetcher {
            items: BTreeMap::from([(
                "a".to_string(),
                vec![item("a", "only", "https://x/1", 1)],
            )]),
        };
        // "missing" is configured but the fetcher errors on it.
        let service = NewsService::new(fetcher, config(&["a", "missing"]));
        let items = service.collect().await;
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_job_pushes_to_all_groups() {
        let fetcher = StaticFetcher {
            items: BTreeMap::from([(
                "a".to_string(),
                vec![item("a", "headline", "https://x/1", 1)],
            )]),
        };
        let mut cfg = config(&["a"]);
        cfg.target_group_ids = vec!["g1".to_string(), "g2".to_string()];
        let sent = Arc::new(Mutex::new(Vec::new()));
        let job = NewsJob::new(
            NewsService::new(fetcher, cfg),
            SharedPusher::new(RecordingPusher { sent: sent.clone() }),
        );

        job.run().await.unwrap();
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "g1");
        assert!(sent[0].1.contains("headline"));
    }
}
