use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::cache::{CacheEntry, FeedCache};
use crate::config::FeedConfig;
use crate::error::RefreshError;
use crate::fetcher::FeedSource;
use crate::rewriter::{render, rewrite_titles, RewriteStats};
use crate::translator::Translate;

/// Collaborators shared by every feed's refresh.
pub struct RefreshContext {
    pub fetcher: Arc<dyn FeedSource>,
    pub translator: Arc<dyn Translate>,
    pub language: String,
    pub cache: Arc<FeedCache>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Published(RewriteStats),
    /// A refresh of the same feed was still running.
    Skipped,
}

pub struct FeedJob {
    config: FeedConfig,
    route: String,
    running: Mutex<()>,
}

impl FeedJob {
    pub fn new(config: FeedConfig) -> Self {
        let route = config.route();
        Self {
            config,
            route,
            running: Mutex::new(()),
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    /// Fetch, rewrite and publish this feed. On error the cache is left
    /// untouched, so the previously published entry keeps being served.
    pub async fn refresh(&self, ctx: &RefreshContext) -> Result<RefreshOutcome, RefreshError> {
        let Ok(_running) = self.running.try_lock() else {
            return Ok(RefreshOutcome::Skipped);
        };

        let feed = ctx.fetcher.fetch(&self.config.url).await?;
        let mut doc = feed.document()?;
        let stats = rewrite_titles(
            &mut doc,
            &self.config.item_path,
            &self.config.title_path,
            &ctx.language,
            ctx.translator.as_ref(),
        )
        .await?;
        let body = render(&doc)?;

        ctx.cache
            .publish(&self.route, CacheEntry::new(body, feed.content_type))
            .await;
        Ok(RefreshOutcome::Published(stats))
    }

    /// [`FeedJob::refresh`] with the outcome logged. Returns whether a new
    /// entry was published.
    pub async fn run(&self, ctx: &RefreshContext) -> bool {
        tracing::info!("{}: refresh {}", self.route, self.config.url);
        let started = Instant::now();

        match self.refresh(ctx).await {
            Ok(RefreshOutcome::Published(stats)) => {
                tracing::info!(
                    "{}: published {} items ({} translated, {} untouched) in {:?}",
                    self.route,
                    stats.items,
                    stats.translated,
                    stats.untouched,
                    started.elapsed()
                );
                true
            }
            Ok(RefreshOutcome::Skipped) => {
                tracing::warn!("{}: previous refresh still running, skipping", self.route);
                false
            }
            Err(e) => {
                tracing::error!(
                    "{}: refresh of {} failed, keeping previous entry: {}",
                    self.route,
                    self.config.url,
                    e
                );
                false
            }
        }
    }
}
