// Daily job scheduler
// Sleeps until the configured UTC hour, then runs the tracking pass every
// 24 hours. Best effort: a missed or failed run is logged and the next
// tick proceeds as normal.

use chrono::{Datelike, Duration as ChronoDuration, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::services::rank_tracking::RankTrackingService;

pub struct JobScheduler {
    tracking: Arc<RankTrackingService>,
    run_hour_utc: u32,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl JobScheduler {
    pub fn new(tracking: Arc<RankTrackingService>, run_hour_utc: u32) -> Self {
        Self {
            tracking,
            run_hour_utc: run_hour_utc % 24,
            shutdown_tx: None,
        }
    }

    /// Seconds until the next occurrence of the run hour after `now`
    pub fn seconds_until_next_run(now: chrono::DateTime<Utc>, run_hour: u32) -> u64 {
        let today_run = Utc
            .with_ymd_and_hms(now.year(), now.month(), now.day(), run_hour, 0, 0)
            .single()
            .unwrap_or(now);

        let next = if today_run > now {
            today_run
        } else {
            today_run + ChronoDuration::days(1)
        };

        (next - now).num_seconds().max(0) as u64
    }

    /// Spawn the scheduler loop. Returns immediately; the loop runs until
    /// `shutdown` is called or the process exits.
    pub fn start(&mut self) {
        let (tx, mut rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(tx);

        let tracking = Arc::clone(&self.tracking);
        let run_hour = self.run_hour_utc;

        tokio::spawn(async move {
            let initial_delay = Self::seconds_until_next_run(Utc::now(), run_hour);
            info!(
                run_hour_utc = run_hour,
                delay_secs = initial_delay,
                "Rank tracking scheduler armed"
            );

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(initial_delay)) => {},
                _ = &mut rx => {
                    info!("Scheduler shut down before first run");
                    return;
                },
            }

            let mut interval = tokio::time::interval(Duration::from_secs(24 * 60 * 60));
            loop {
                // First tick fires immediately, which is the run we just
                // slept for
                tokio::select! {
                    _ = interval.tick() => {
                        info!("Starting scheduled rank tracking run");
                        match tracking.run_daily_tracking().await {
                            Ok(summary) => info!(
                                processed = summary.businesses_processed,
                                failed = summary.businesses_failed,
                                records = summary.records_created,
                                "Scheduled tracking run finished"
                            ),
                            Err(e) => error!(error = %e, "Scheduled tracking run failed"),
                        }
                    },
                    _ = &mut rx => {
                        info!("Scheduler shutting down");
                        return;
                    },
                }
            }
        });
    }

    /// Signal the scheduler loop to stop. A run already in progress
    /// finishes on its own.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(()).is_err() {
                warn!("Scheduler task already stopped");
            }
        }
    }
}
