//! Command-line interface for the remediation pipeline.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::RemediaError;
use crate::models::{SweepReport, SweepStatus};
use crate::pipeline::Pipeline;
use crate::scheduler::Scheduler;
use crate::telemetry;

#[derive(Parser)]
#[command(name = "remedia")]
#[command(about = "Quiz remediation pipeline — find what students missed, point them at the right videos")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Verbose mode (per-quiz and per-student detail)
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep one course (or every tracked course) now
    Sweep {
        /// Course id; omit to sweep every tracked course once
        #[arg(long)]
        course: Option<String>,
    },
    /// Run topic naming and video resolution for a course
    Resolve {
        #[arg(long)]
        course: String,
        /// Course name passed to the topic namer (defaults to the id)
        #[arg(long)]
        name: Option<String>,
    },
    /// Print a student's deduplicated video recommendations
    Recommend {
        #[arg(long)]
        student: String,
        #[arg(long)]
        course: String,
        /// Emit JSON instead of a human-readable list
        #[arg(long)]
        json: bool,
    },
    /// Set the free-text context used to disambiguate topics for a course
    Context {
        #[arg(long)]
        course: String,
        #[arg(long)]
        text: String,
    },
    /// Sweep all tracked courses on a fixed interval until stopped
    Daemon,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        telemetry::init_tracing_verbose();
    } else {
        telemetry::init_tracing();
    }

    let config = Config::load(cli.config.as_deref())
        .map_err(|e| RemediaError::Config(format!("{:#}", e)))?;
    let pipeline = Arc::new(Pipeline::from_config(&config)?);

    match cli.command {
        Commands::Sweep { course } => {
            let mut failed = false;
            match course {
                Some(course_id) => {
                    let token = token_for(&config, &course_id)?;
                    let report = pipeline.ingest_course(&course_id, &token).await;
                    print_sweep_report(&report);
                    failed = report.status == SweepStatus::Failed;
                }
                None => {
                    if config.sweep.courses.is_empty() {
                        bail!("no tracked courses in config; pass --course or add [[sweep.courses]] entries");
                    }
                    for tracked in &config.sweep.courses {
                        let Some(token) = tracked
                            .token
                            .clone()
                            .or_else(|| config.lms.token.clone())
                        else {
                            eprintln!(
                                "{} no credential for course {}, skipping",
                                "warning:".yellow(),
                                tracked.id
                            );
                            continue;
                        };
                        let report = pipeline.ingest_course(&tracked.id, &token).await;
                        print_sweep_report(&report);
                        failed |= report.status == SweepStatus::Failed;
                    }
                }
            }
            if failed {
                bail!("one or more course sweeps failed");
            }
        }

        Commands::Resolve { course, name } => {
            let course_name = name.unwrap_or_else(|| course.clone());
            let report = pipeline.resolve_topics_and_videos(&course, &course_name).await;
            println!(
                "{} course {}: {} topics named, {} videos found, {} reused, {} issue(s)",
                "resolved".green().bold(),
                report.course_id,
                report.topics_named,
                report.videos_found,
                report.videos_reused,
                report.issues.len()
            );
            for issue in &report.issues {
                eprintln!("  {} {}", "issue:".yellow(), issue.error);
            }
        }

        Commands::Recommend {
            student,
            course,
            json,
        } => {
            let recommendations = pipeline
                .recommendations_for_student(&student, &course)
                .await
                .map_err(anyhow::Error::from)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&recommendations)?);
            } else if recommendations.is_empty() {
                println!("No recommendations yet for student {} in course {}", student, course);
            } else {
                for rec in &recommendations {
                    println!(
                        "{} {} — {}\n    {} {}",
                        "•".cyan(),
                        rec.topic.bold(),
                        rec.quiz_name,
                        rec.video.title,
                        rec.video.link.underline()
                    );
                }
            }
        }

        Commands::Context { course, text } => {
            pipeline
                .set_course_context(&course, &text)
                .await
                .map_err(anyhow::Error::from)?;
            println!("{} context for course {}", "updated".green().bold(), course);
        }

        Commands::Daemon => {
            let default_token = config.lms.token.clone();
            let scheduler = Scheduler::new(pipeline, config.sweep.clone(), default_token);
            println!(
                "Sweeping {} course(s) every {}s — ctrl-c to stop",
                config.sweep.courses.len(),
                config.sweep.interval_secs
            );
            scheduler.run().await;
        }
    }

    Ok(())
}

fn token_for(config: &Config, course_id: &str) -> Result<String> {
    config
        .sweep
        .courses
        .iter()
        .find(|c| c.id == course_id)
        .and_then(|c| c.token.clone())
        .or_else(|| config.lms.token.clone())
        .context("no LMS credential configured (set lms.token or REMEDIA_LMS_TOKEN)")
}

fn print_sweep_report(report: &SweepReport) {
    let status = match report.status {
        SweepStatus::Completed => "completed".green().bold(),
        SweepStatus::Failed => "failed".red().bold(),
        SweepStatus::Skipped => "skipped".yellow().bold(),
    };
    println!(
        "{} course {}: {} quizzes, {} student records written, {} issue(s)",
        status,
        report.course_id,
        report.quizzes_processed,
        report.students_updated,
        report.issues.len()
    );
    for issue in &report.issues {
        eprintln!("  {} {}", "issue:".yellow(), issue.error);
    }
}
