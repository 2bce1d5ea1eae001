use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::{Parser, Subcommand};

pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod fetcher;
pub mod refresh;
pub mod rewriter;
pub mod scheduler;
pub mod server;
pub mod translator;

use cache::FeedCache;
use config::Config;
use fetcher::{build_client, HttpFetcher};
use refresh::{FeedJob, RefreshContext};
use scheduler::Scheduler;
use translator::GoogleTranslator;

#[derive(Parser, Debug)]
#[clap(about, version)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default config file
    Init {
        #[clap(short, long, default_value = "config.json")]
        config: PathBuf,

        /// Overwrite an existing file
        #[clap(short, long)]
        force: bool,
    },
    /// Refresh the configured feeds and serve them
    Run {
        #[clap(short, long, default_value = "config.json")]
        config: PathBuf,
    },
}

/// Builds the scheduler for `config` around an existing cache.
pub fn build_scheduler(config: &Config, cache: Arc<FeedCache>) -> anyhow::Result<Scheduler> {
    let schedule = config.schedule()?;
    let client = build_client().context("Failed to create HTTP client")?;

    let ctx = Arc::new(RefreshContext {
        fetcher: Arc::new(HttpFetcher::new(client.clone())),
        translator: Arc::new(GoogleTranslator::new(client, &config.translate_endpoint)),
        language: config.language.clone(),
        cache,
    });
    let jobs = config.rss.iter().cloned().map(FeedJob::new).collect();

    Ok(Scheduler::new(schedule, jobs, ctx))
}

/// Refreshes every feed once, starts the schedule and serves until the
/// server stops.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let cache = Arc::new(FeedCache::new());
    let scheduler = Arc::new(build_scheduler(&config, cache.clone())?);

    scheduler.run_startup().await;

    tracing::info!("Refresh crontab: {}", config.cron);
    let handle = scheduler.clone().start();

    let routes: Vec<String> = scheduler
        .jobs()
        .iter()
        .map(|job| job.route().to_string())
        .collect();
    let cache = web::Data::from(cache);
    let address = config.address();

    tracing::info!("Server running at http://{}", address);
    let res = HttpServer::new(move || {
        App::new()
            .app_data(cache.clone())
            .configure(|cfg| server::configure(cfg, &routes))
    })
    .bind(&address)
    .with_context(|| format!("Failed to bind {address}"))?
    .run()
    .await;

    handle.stop();
    res.context("HTTP server error")
}
