//! Assessment-Video Deduplication
//!
//! Builds a student's watch list: one recommendation per distinct video
//! link, first occurrence wins. Ordering follows the record's quiz-entry
//! order (the ordered map), then missed-question order within each entry.

use std::collections::HashSet;
use tracing::debug;

use crate::errors::RemediaError;
use crate::models::Recommendation;
use crate::store::Store;

/// The deduplicated (question, video) list for one student in one course.
///
/// Missing records and unresolved videos yield an empty list, never an
/// error; only malformed identifiers do.
pub async fn recommendations_for_student(
    store: &dyn Store,
    student_id: &str,
    course_id: &str,
) -> Result<Vec<Recommendation>, RemediaError> {
    if student_id.trim().is_empty() {
        return Err(RemediaError::InvalidIdentifier("empty student id".into()));
    }
    if course_id.trim().is_empty() {
        return Err(RemediaError::InvalidIdentifier("empty course id".into()));
    }

    let Some(record) = store.get_record(student_id, course_id).await? else {
        debug!("No record for student {} in course {}", student_id, course_id);
        return Ok(Vec::new());
    };

    let mut seen_links: HashSet<String> = HashSet::new();
    let mut recommendations = Vec::new();

    for entry in record.quizzes.values() {
        for missed in &entry.missed_questions {
            let Some(question) = store.get_question(&entry.quiz_id, &missed.question_id).await?
            else {
                continue;
            };
            let (Some(topic), Some(video)) = (question.core_topic, question.video) else {
                continue;
            };
            if !seen_links.insert(video.link.clone()) {
                continue;
            }
            recommendations.push(Recommendation {
                quiz_name: entry.quiz_name.clone(),
                question_id: missed.question_id.clone(),
                question_text: missed.question_text.clone(),
                topic,
                video,
            });
        }
    }

    Ok(recommendations)
}
