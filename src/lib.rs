//! Remedia - Quiz Remediation Pipeline
//!
//! Pulls quiz statistics out of an external LMS, works out which students
//! missed which questions, and keeps long-lived per-student remediation
//! records. Missed questions are lazily enriched with a topic label (named
//! by an external model) and an instructional video, so each student can be
//! handed a deduplicated watch list for everything they got wrong.
//!
//! - **LMS client**: paginated fetch of quizzes, enrollments, statistics
//! - **Classifier**: per question-type rules for "who answered this wrong"
//! - **Aggregator**: idempotent merge into per-student course records
//! - **Resolver**: topic naming + video lookup with cross-question reuse
//! - **Recommendations**: one video per distinct link, first seen wins
//!
//! # Quick Start
//!
//! ```ignore
//! use remedia::{config::Config, pipeline::Pipeline};
//!
//! let config = Config::load(None)?;
//! let pipeline = Pipeline::from_config(&config)?;
//! let report = pipeline.ingest_course("1042", &token).await;
//! ```

pub mod aggregate;
pub mod classify;
pub mod cli;
pub mod config;
pub mod errors;
pub mod lms;
pub mod models;
pub mod pipeline;
pub mod recommend;
pub mod resolve;
pub mod scheduler;
pub mod store;
pub mod telemetry;

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Ask long-running loops (the sweep daemon) to wind down at the next
/// safe point. Set from the signal handler in `main`.
pub fn request_shutdown() {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Whether a shutdown has been requested.
pub fn is_shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}
