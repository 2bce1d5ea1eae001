use std::sync::Arc;

use chrono::{DateTime, Local};
use cron::Schedule;
use tokio::task::JoinHandle;

use crate::refresh::{FeedJob, RefreshContext};

/// Refreshes every feed on a cron schedule.
///
/// Feeds refresh one after another within a tick. The next tick is computed
/// once the current one has finished, so a tick that overruns the schedule
/// drops the ticks it missed instead of overlapping with them.
pub struct Scheduler {
    schedule: Schedule,
    jobs: Vec<FeedJob>,
    ctx: Arc<RefreshContext>,
}

pub struct SchedulerHandle {
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Scheduler {
    pub fn new(schedule: Schedule, jobs: Vec<FeedJob>, ctx: Arc<RefreshContext>) -> Self {
        Self {
            schedule,
            jobs,
            ctx,
        }
    }

    pub fn jobs(&self) -> &[FeedJob] {
        &self.jobs
    }

    /// Runs every job once, in config order. Returns how many published.
    pub async fn run_all(&self) -> usize {
        let mut published = 0;
        for job in &self.jobs {
            if job.run(&self.ctx).await {
                published += 1;
            }
        }
        published
    }

    /// Initial refresh of every feed, done before the HTTP server binds.
    pub async fn run_startup(&self) {
        let published = self.run_all().await;
        tracing::info!(
            "Startup refresh published {}/{} feeds",
            published,
            self.jobs.len()
        );
    }

    pub fn next_tick(&self, after: &DateTime<Local>) -> Option<DateTime<Local>> {
        self.schedule.after(after).next()
    }

    pub fn start(self: Arc<Self>) -> SchedulerHandle {
        let task = tokio::spawn(async move {
            loop {
                let now = Local::now();
                let Some(next) = self.next_tick(&now) else {
                    tracing::warn!("Schedule has no upcoming ticks, scheduler stopped");
                    break;
                };
                tracing::debug!("Next refresh at {}", next);

                let wait = (next - now).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;
                self.run_all().await;
            }
        });
        SchedulerHandle { task }
    }
}
