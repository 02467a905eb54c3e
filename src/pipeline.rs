//! Pipeline composition root.
//!
//! Wires the LMS client, the topic/video collaborators, and the document
//! store behind the three outward-facing operations: `ingest_course`,
//! `resolve_topics_and_videos`, and `recommendations_for_student`.
//!
//! Sweeps are single-flight per course: a second `ingest_course` for a
//! course still being swept returns a `Skipped` report instead of racing
//! the per-student merge. Within one sweep, quizzes are processed strictly
//! sequentially — classification and persistence for quiz N complete
//! before quiz N+1 starts.

use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use crate::aggregate::{self, ClassifiedQuestion, QuizOutcome};
use crate::classify;
use crate::config::Config;
use crate::errors::{MalformedDataError, RemediaError};
use crate::lms::types::plain_text;
use crate::lms::{HttpLmsClient, LmsClient};
use crate::models::{
    Question, Quiz, Recommendation, ResolveReport, SweepIssue, SweepReport, SweepStatus,
    NONE_RESPONDER,
};
use crate::recommend;
use crate::resolve::{self, HttpVideoFinder, LlmTopicNamer, TopicNamer, VideoFinder};
use crate::store::{FileStore, MemoryStore, Store};

pub struct Pipeline {
    lms: Arc<dyn LmsClient>,
    topics: Arc<dyn TopicNamer>,
    videos: Arc<dyn VideoFinder>,
    store: Arc<dyn Store>,
    in_flight: Mutex<HashSet<String>>,
}

impl Pipeline {
    pub fn new(
        lms: Arc<dyn LmsClient>,
        topics: Arc<dyn TopicNamer>,
        videos: Arc<dyn VideoFinder>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            lms,
            topics,
            videos,
            store,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Build the production pipeline from configuration: HTTP LMS client,
    /// LLM topic namer, keyed video search, and the configured store.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn Store> = match &config.store.path {
            Some(path) => Arc::new(FileStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };
        Ok(Self::new(
            Arc::new(HttpLmsClient::new(&config.lms, &config.retry)?),
            Arc::new(LlmTopicNamer::new(&config.topics)?),
            Arc::new(HttpVideoFinder::new(&config.videos)?),
            store,
        ))
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// One full sweep of a course: fetch quizzes and enrollments, classify
    /// every question's statistics, and merge the results into student
    /// records. Failures are contained per quiz / per question / per
    /// student; only a rejected credential aborts the rest of the course.
    pub async fn ingest_course(&self, course_id: &str, token: &str) -> SweepReport {
        let _guard = match FlightGuard::acquire(&self.in_flight, course_id) {
            Some(guard) => guard,
            None => {
                info!("Sweep for course {} already in flight, skipping", course_id);
                return SweepReport::skipped(course_id);
            }
        };

        info!("Starting sweep for course {}", course_id);
        let mut report = SweepReport {
            course_id: course_id.to_string(),
            status: SweepStatus::Completed,
            quizzes_processed: 0,
            students_updated: 0,
            issues: Vec::new(),
        };

        let quizzes = match self.lms.list_quizzes(course_id, token).await {
            Ok(quizzes) => quizzes,
            Err(e) => {
                warn!("Quiz listing failed for course {}: {}", course_id, e);
                report.status = SweepStatus::Failed;
                report.issues.push(SweepIssue::course_level(e));
                return report;
            }
        };

        let enrolled: BTreeSet<String> =
            match self.lms.list_active_students(course_id, token).await {
                Ok(students) => students.into_iter().collect(),
                Err(e) => {
                    warn!("Enrollment listing failed for course {}: {}", course_id, e);
                    report.status = SweepStatus::Failed;
                    report.issues.push(SweepIssue::course_level(e));
                    return report;
                }
            };

        for quiz in quizzes {
            let stats = match self.lms.quiz_statistics(course_id, &quiz.id, token).await {
                Ok(stats) => stats,
                Err(e) if e.is_auth() => {
                    warn!("Credential rejected mid-sweep for course {}: {}", course_id, e);
                    report.status = SweepStatus::Failed;
                    report.issues.push(SweepIssue::for_quiz(&quiz.id, e));
                    break;
                }
                Err(e) => {
                    warn!("Statistics fetch failed for quiz {}: {}", quiz.id, e);
                    report.issues.push(SweepIssue::for_quiz(&quiz.id, e));
                    continue;
                }
            };

            if let Err(e) = self
                .store
                .upsert_quiz(Quiz {
                    id: quiz.id.clone(),
                    title: quiz.title.clone(),
                    course_id: course_id.to_string(),
                })
                .await
            {
                report.issues.push(SweepIssue::for_quiz(&quiz.id, e));
            }

            let mut outcome = QuizOutcome {
                quiz_id: quiz.id.clone(),
                quiz_name: quiz.title.clone(),
                questions: Vec::new(),
            };

            for stat in &stats {
                if let Some(reason) = classify::malformed_reason(stat) {
                    let e = MalformedDataError {
                        quiz_id: quiz.id.clone(),
                        question_id: stat.id.clone(),
                        reason: reason.to_string(),
                    };
                    warn!("Skipping malformed question: {}", e);
                    report
                        .issues
                        .push(SweepIssue::for_question(&quiz.id, &stat.id, e));
                    continue;
                }

                let text = plain_text(&stat.question_text);

                if let Err(e) = self
                    .store
                    .upsert_question(Question {
                        id: stat.id.clone(),
                        quiz_id: quiz.id.clone(),
                        course_id: course_id.to_string(),
                        question_type: stat.question_type.clone(),
                        text: text.clone(),
                        core_topic: None,
                        video: None,
                    })
                    .await
                {
                    report
                        .issues
                        .push(SweepIssue::for_question(&quiz.id, &stat.id, e));
                    continue;
                }

                let responders: BTreeSet<String> = classify::incorrect_responders(stat)
                    .into_iter()
                    .filter(|id| id != NONE_RESPONDER && enrolled.contains(id))
                    .collect();

                if !responders.is_empty() {
                    outcome.questions.push(ClassifiedQuestion {
                        question_id: stat.id.clone(),
                        question_text: text,
                        responders,
                    });
                }
            }

            report.students_updated += aggregate::aggregate_quiz(
                self.store.as_ref(),
                course_id,
                &outcome,
                &mut report.issues,
            )
            .await;
            report.quizzes_processed += 1;
        }

        info!(
            "Sweep for course {} finished: {:?}, {} quizzes, {} student records written, {} issues",
            course_id,
            report.status,
            report.quizzes_processed,
            report.students_updated,
            report.issues.len()
        );
        report
    }

    /// Run topic naming and video resolution over a course's questions.
    pub async fn resolve_topics_and_videos(
        &self,
        course_id: &str,
        course_name: &str,
    ) -> ResolveReport {
        resolve::resolve_course(
            self.store.as_ref(),
            self.topics.as_ref(),
            self.videos.as_ref(),
            course_id,
            course_name,
        )
        .await
    }

    /// Read-side: a student's deduplicated video watch list.
    pub async fn recommendations_for_student(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> Result<Vec<Recommendation>, RemediaError> {
        recommend::recommendations_for_student(self.store.as_ref(), student_id, course_id).await
    }

    /// Upsert the free-text course description the topic namer uses.
    pub async fn set_course_context(
        &self,
        course_id: &str,
        description: &str,
    ) -> Result<(), RemediaError> {
        if course_id.trim().is_empty() {
            return Err(RemediaError::InvalidIdentifier("empty course id".into()));
        }
        Ok(self.store.upsert_context(course_id, description).await?)
    }
}

/// Removes the course id from the in-flight set when the sweep ends,
/// including on early returns.
struct FlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    course_id: String,
}

impl<'a> FlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<String>>, course_id: &str) -> Option<Self> {
        if !set.lock().insert(course_id.to_string()) {
            return None;
        }
        Some(Self {
            set,
            course_id: course_id.to_string(),
        })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.course_id);
    }
}
