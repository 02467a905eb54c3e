//! In-memory document store.
//!
//! Collections are ordered maps under a single `parking_lot::RwLock`; all
//! operations are short critical sections with no await points. The
//! topic→video index is maintained on every video write, which makes the
//! resolver's reuse rule a single lookup instead of a scan over all
//! questions.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::PersistenceError;
use crate::models::{Question, Quiz, StudentCourseRecord, VideoInfo};

use super::{CourseContextStore, QuestionStore, StudentRecordStore};

type Result<T> = std::result::Result<T, PersistenceError>;

/// Everything the store holds, serializable as one snapshot so the file
/// store can persist it wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Collections {
    /// Keyed `quiz_id/question_id`.
    pub questions: BTreeMap<String, Question>,
    /// Keyed `course_id/quiz_id`.
    pub quizzes: BTreeMap<String, Quiz>,
    /// Keyed `student_id/course_id`.
    pub records: BTreeMap<String, StudentCourseRecord>,
    /// Keyed by course id.
    pub contexts: BTreeMap<String, String>,
    /// Topic → first resolved video for that topic.
    pub topic_videos: BTreeMap<String, VideoInfo>,
}

fn question_key(quiz_id: &str, question_id: &str) -> String {
    format!("{}/{}", quiz_id, question_id)
}

fn quiz_key(course_id: &str, quiz_id: &str) -> String {
    format!("{}/{}", course_id, quiz_id)
}

fn record_key(student_id: &str, course_id: &str) -> String {
    format!("{}/{}", student_id, course_id)
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_collections(collections: Collections) -> Self {
        Self {
            inner: RwLock::new(collections),
        }
    }

    pub(crate) fn snapshot(&self) -> Collections {
        self.inner.read().clone()
    }
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn upsert_quiz(&self, quiz: Quiz) -> Result<()> {
        let mut inner = self.inner.write();
        inner.quizzes.insert(quiz_key(&quiz.course_id, &quiz.id), quiz);
        Ok(())
    }

    async fn quizzes_for_course(&self, course_id: &str) -> Result<Vec<Quiz>> {
        let inner = self.inner.read();
        Ok(inner
            .quizzes
            .values()
            .filter(|q| q.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn upsert_question(&self, mut question: Question) -> Result<()> {
        let key = question_key(&question.quiz_id, &question.id);
        let mut inner = self.inner.write();
        if let Some(existing) = inner.questions.get(&key) {
            if question.core_topic.is_none() {
                question.core_topic = existing.core_topic.clone();
            }
            if question.video.is_none() {
                question.video = existing.video.clone();
            }
        }
        inner.questions.insert(key, question);
        Ok(())
    }

    async fn get_question(&self, quiz_id: &str, question_id: &str) -> Result<Option<Question>> {
        let inner = self.inner.read();
        Ok(inner.questions.get(&question_key(quiz_id, question_id)).cloned())
    }

    async fn questions_for_course(&self, course_id: &str) -> Result<Vec<Question>> {
        let inner = self.inner.read();
        Ok(inner
            .questions
            .values()
            .filter(|q| q.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn set_core_topic(
        &self,
        quiz_id: &str,
        question_id: &str,
        topic: &str,
        force: bool,
    ) -> Result<()> {
        let key = question_key(quiz_id, question_id);
        let mut inner = self.inner.write();
        let question = inner
            .questions
            .get_mut(&key)
            .ok_or_else(|| PersistenceError::new("questions", &key, "question not found"))?;

        match &question.core_topic {
            Some(existing) if existing == topic => {}
            Some(_) if !force => {
                // Set-at-most-once: keep the existing value.
            }
            Some(_) => {
                // A forced topic change invalidates the derived video.
                question.core_topic = Some(topic.to_string());
                question.video = None;
            }
            None => question.core_topic = Some(topic.to_string()),
        }
        Ok(())
    }

    async fn set_video(&self, quiz_id: &str, question_id: &str, video: VideoInfo) -> Result<()> {
        let key = question_key(quiz_id, question_id);
        let mut inner = self.inner.write();
        let question = inner
            .questions
            .get_mut(&key)
            .ok_or_else(|| PersistenceError::new("questions", &key, "question not found"))?;

        let topic = question
            .core_topic
            .clone()
            .ok_or_else(|| PersistenceError::new("questions", &key, "video requires a resolved topic"))?;

        question.video = Some(video.clone());
        // First video wins in the reuse index.
        inner.topic_videos.entry(topic).or_insert(video);
        Ok(())
    }

    async fn video_for_topic(&self, topic: &str) -> Result<Option<VideoInfo>> {
        let inner = self.inner.read();
        Ok(inner.topic_videos.get(topic).cloned())
    }
}

#[async_trait]
impl StudentRecordStore for MemoryStore {
    async fn upsert_record(&self, record: StudentCourseRecord) -> Result<()> {
        let key = record_key(&record.student_id, &record.course_id);
        let mut inner = self.inner.write();
        inner.records.insert(key, record);
        Ok(())
    }

    async fn get_record(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> Result<Option<StudentCourseRecord>> {
        let inner = self.inner.read();
        Ok(inner.records.get(&record_key(student_id, course_id)).cloned())
    }
}

#[async_trait]
impl CourseContextStore for MemoryStore {
    async fn upsert_context(&self, course_id: &str, description: &str) -> Result<()> {
        let mut inner = self.inner.write();
        inner
            .contexts
            .insert(course_id.to_string(), description.to_string());
        Ok(())
    }

    async fn get_context(&self, course_id: &str) -> Result<Option<String>> {
        let inner = self.inner.read();
        Ok(inner.contexts.get(course_id).cloned())
    }
}
