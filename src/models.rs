//! Domain records persisted by the pipeline and the report types returned
//! from its outward-facing operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel responder id meaning "no identifiable student answered this
/// incorrectly". Produced by the classifier when a question has no
/// attributable incorrect responses; filtered before aggregation.
pub const NONE_RESPONDER: &str = "none";

/// A quiz as fetched from the LMS. Refreshed on every sweep, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub course_id: String,
}

/// A question record keyed by (quiz id, question id).
///
/// `core_topic` and `video` start unset and are populated lazily by the
/// resolver. `video` is only ever set after `core_topic` is set; the store
/// enforces that ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub quiz_id: String,
    pub course_id: String,
    pub question_type: String,
    pub text: String,
    #[serde(default)]
    pub core_topic: Option<String>,
    #[serde(default)]
    pub video: Option<VideoInfo>,
}

/// Metadata for an instructional video resolved for a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub link: String,
    pub title: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// One question a student answered incorrectly, as recorded in their
/// remediation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissedQuestion {
    pub question_id: String,
    pub question_text: String,
}

/// Per-quiz slice of a student's record. Missed questions are deduplicated
/// by question id and only ever appended to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizEntry {
    pub quiz_name: String,
    pub quiz_id: String,
    pub missed_questions: Vec<MissedQuestion>,
    /// Reserved for downstream consumers marking an entry as handled.
    #[serde(default)]
    pub used: bool,
}

/// A student's remediation record for one course.
///
/// Quiz entries live in an ordered map keyed by quiz name, which gives the
/// merge step near-constant cost per question and a deterministic iteration
/// order for the recommendation walk. Records only grow: a miss stays
/// recorded even if the student later answers the question correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentCourseRecord {
    pub student_id: String,
    pub course_id: String,
    pub quizzes: BTreeMap<String, QuizEntry>,
    pub updated_at: DateTime<Utc>,
}

impl StudentCourseRecord {
    pub fn new(student_id: impl Into<String>, course_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            course_id: course_id.into(),
            quizzes: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Total missed questions across all quiz entries.
    pub fn missed_count(&self) -> usize {
        self.quizzes.values().map(|q| q.missed_questions.len()).sum()
    }
}

/// One entry in a student's deduplicated video watch list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub quiz_name: String,
    pub question_id: String,
    pub question_text: String,
    pub topic: String,
    pub video: VideoInfo,
}

/// Outcome of one course sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepStatus {
    /// All quizzes were processed; per-item issues may still be listed.
    Completed,
    /// The sweep was cut short (credential rejected, listing failed).
    Failed,
    /// Another sweep of the same course was already in flight.
    Skipped,
}

/// A contained per-item failure recorded during a sweep or resolution run.
#[derive(Debug, Clone, Serialize)]
pub struct SweepIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    pub error: String,
}

impl SweepIssue {
    pub fn for_quiz(quiz_id: impl Into<String>, error: impl ToString) -> Self {
        Self {
            quiz_id: Some(quiz_id.into()),
            question_id: None,
            student_id: None,
            error: error.to_string(),
        }
    }

    pub fn for_question(
        quiz_id: impl Into<String>,
        question_id: impl Into<String>,
        error: impl ToString,
    ) -> Self {
        Self {
            quiz_id: Some(quiz_id.into()),
            question_id: Some(question_id.into()),
            student_id: None,
            error: error.to_string(),
        }
    }

    pub fn for_student(student_id: impl Into<String>, error: impl ToString) -> Self {
        Self {
            quiz_id: None,
            question_id: None,
            student_id: Some(student_id.into()),
            error: error.to_string(),
        }
    }

    pub fn course_level(error: impl ToString) -> Self {
        Self {
            quiz_id: None,
            question_id: None,
            student_id: None,
            error: error.to_string(),
        }
    }
}

/// Result of `ingest_course`: status plus the contained per-item issues.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub course_id: String,
    pub status: SweepStatus,
    pub quizzes_processed: usize,
    pub students_updated: usize,
    pub issues: Vec<SweepIssue>,
}

impl SweepReport {
    pub fn skipped(course_id: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            status: SweepStatus::Skipped,
            quizzes_processed: 0,
            students_updated: 0,
            issues: Vec::new(),
        }
    }
}

/// Result of a topic/video resolution pass over one course.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveReport {
    pub course_id: String,
    pub topics_named: usize,
    pub videos_found: usize,
    pub videos_reused: usize,
    pub issues: Vec<SweepIssue>,
}

impl ResolveReport {
    pub fn new(course_id: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            topics_named: 0,
            videos_found: 0,
            videos_reused: 0,
            issues: Vec::new(),
        }
    }
}
