//! Periodic full-fleet sweep.
//!
//! Iterates every tracked course/credential pair, runs ingestion followed
//! by topic/video resolution, and sleeps a fixed delay between cycles.
//! A failure on one pair is logged and never stops the loop from reaching
//! the next pair or the next cycle. The loop winds down when the global
//! shutdown flag is set.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::SweepConfig;
use crate::models::SweepStatus;
use crate::pipeline::Pipeline;

pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    config: SweepConfig,
    default_token: Option<String>,
}

impl Scheduler {
    pub fn new(pipeline: Arc<Pipeline>, config: SweepConfig, default_token: Option<String>) -> Self {
        Self {
            pipeline,
            config,
            default_token,
        }
    }

    /// Run sweep cycles until shutdown is requested.
    pub async fn run(&self) {
        if self.config.courses.is_empty() {
            warn!("No tracked courses configured; daemon has nothing to sweep");
        }

        loop {
            for course in &self.config.courses {
                if crate::is_shutdown_requested() {
                    info!("Shutdown requested, stopping sweep loop");
                    return;
                }

                let Some(token) = course.token.as_deref().or(self.default_token.as_deref())
                else {
                    warn!("No credential for course {}, skipping", course.id);
                    continue;
                };
                let course_name = course.name.clone().unwrap_or_else(|| course.id.clone());

                let report = self.pipeline.ingest_course(&course.id, token).await;
                match report.status {
                    SweepStatus::Completed => info!(
                        "Course {}: sweep completed ({} quizzes, {} issues)",
                        course.id,
                        report.quizzes_processed,
                        report.issues.len()
                    ),
                    SweepStatus::Failed => error!(
                        "Course {}: sweep failed ({} issues), will retry next cycle",
                        course.id,
                        report.issues.len()
                    ),
                    SweepStatus::Skipped => {
                        info!("Course {}: sweep skipped, previous still running", course.id)
                    }
                }

                let resolved = self
                    .pipeline
                    .resolve_topics_and_videos(&course.id, &course_name)
                    .await;
                if !resolved.issues.is_empty() {
                    warn!(
                        "Course {}: {} resolution issue(s), affected questions retry next cycle",
                        course.id,
                        resolved.issues.len()
                    );
                }
            }

            if self.sleep_interruptible().await {
                return;
            }
        }
    }

    /// Sleep the inter-cycle delay in one-second slices so a shutdown
    /// request is honored promptly. Returns true when shutting down.
    async fn sleep_interruptible(&self) -> bool {
        let mut remaining = self.config.interval_secs;
        while remaining > 0 {
            if crate::is_shutdown_requested() {
                info!("Shutdown requested, stopping sweep loop");
                return true;
            }
            tokio::time::sleep(Duration::from_secs(remaining.min(1))).await;
            remaining -= remaining.min(1);
        }
        crate::is_shutdown_requested()
    }
}
