//! Student Record Aggregator
//!
//! Merges one quiz's classified results into per-student course records.
//! The merge is idempotent: re-running the same sweep against unchanged
//! statistics performs no duplicate inserts, and records only ever grow —
//! a recorded miss is remediation history and is never removed, even if
//! the student later answers the question correctly.

use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::models::{
    MissedQuestion, QuizEntry, StudentCourseRecord, SweepIssue, NONE_RESPONDER,
};
use crate::store::Store;

/// One question with the responder ids who missed it.
#[derive(Debug, Clone)]
pub struct ClassifiedQuestion {
    pub question_id: String,
    pub question_text: String,
    pub responders: BTreeSet<String>,
}

/// Classified results for one quiz, ready to merge.
#[derive(Debug, Clone)]
pub struct QuizOutcome {
    pub quiz_id: String,
    pub quiz_name: String,
    pub questions: Vec<ClassifiedQuestion>,
}

/// Merge one missed question into a student's record. Returns whether the
/// record changed (false when the question id was already present).
pub fn merge_missed_question(
    record: &mut StudentCourseRecord,
    quiz_id: &str,
    quiz_name: &str,
    question_id: &str,
    question_text: &str,
) -> bool {
    let entry = record
        .quizzes
        .entry(quiz_name.to_string())
        .or_insert_with(|| QuizEntry {
            quiz_name: quiz_name.to_string(),
            quiz_id: quiz_id.to_string(),
            missed_questions: Vec::new(),
            used: false,
        });

    if entry
        .missed_questions
        .iter()
        .any(|m| m.question_id == question_id)
    {
        return false;
    }

    entry.missed_questions.push(MissedQuestion {
        question_id: question_id.to_string(),
        question_text: question_text.to_string(),
    });
    true
}

/// Merge a quiz's outcome into every affected student's record and persist
/// each one. A persistence failure for one student is recorded as an issue
/// and does not stop the remaining students. Returns how many records were
/// actually written.
pub async fn aggregate_quiz(
    store: &dyn Store,
    course_id: &str,
    outcome: &QuizOutcome,
    issues: &mut Vec<SweepIssue>,
) -> usize {
    // Group by student first so each record is loaded and written once.
    let mut per_student: BTreeMap<&str, Vec<&ClassifiedQuestion>> = BTreeMap::new();
    for question in &outcome.questions {
        for responder in &question.responders {
            if responder == NONE_RESPONDER {
                continue;
            }
            per_student.entry(responder).or_default().push(question);
        }
    }

    let mut updated = 0;
    for (student_id, questions) in per_student {
        let mut record = match store.get_record(student_id, course_id).await {
            Ok(Some(existing)) => existing,
            Ok(None) => StudentCourseRecord::new(student_id, course_id),
            Err(e) => {
                warn!("Failed to load record for student {}: {}", student_id, e);
                issues.push(SweepIssue::for_student(student_id, e));
                continue;
            }
        };

        let mut changed = false;
        for question in questions {
            changed |= merge_missed_question(
                &mut record,
                &outcome.quiz_id,
                &outcome.quiz_name,
                &question.question_id,
                &question.question_text,
            );
        }

        if !changed {
            debug!(
                "Record for student {} already covers quiz {}",
                student_id, outcome.quiz_id
            );
            continue;
        }

        record.updated_at = Utc::now();
        match store.upsert_record(record).await {
            Ok(()) => updated += 1,
            Err(e) => {
                warn!("Failed to persist record for student {}: {}", student_id, e);
                issues.push(SweepIssue::for_student(student_id, e));
            }
        }
    }

    updated
}
