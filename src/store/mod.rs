//! Persistence collaborator
//!
//! The pipeline talks to a document store through three logical
//! collections, each behind a small upsert/find trait so the whole
//! pipeline can run against an in-memory fake in tests. Two
//! implementations ship: [`MemoryStore`] and the JSON-snapshot
//! [`FileStore`].

use async_trait::async_trait;

use crate::errors::PersistenceError;
use crate::models::{Question, Quiz, StudentCourseRecord, VideoInfo};

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

type Result<T> = std::result::Result<T, PersistenceError>;

/// Quizzes and questions, keyed by (quiz id, question id).
#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn upsert_quiz(&self, quiz: Quiz) -> Result<()>;

    async fn quizzes_for_course(&self, course_id: &str) -> Result<Vec<Quiz>>;

    /// Insert or refresh a question. An existing `core_topic`/`video` is
    /// preserved when the incoming record has none, so re-sweeping never
    /// wipes lazily-resolved fields.
    async fn upsert_question(&self, question: Question) -> Result<()>;

    async fn get_question(&self, quiz_id: &str, question_id: &str) -> Result<Option<Question>>;

    async fn questions_for_course(&self, course_id: &str) -> Result<Vec<Question>>;

    /// Set a question's topic. Idempotent: an already-set topic is kept
    /// unless `force` is passed. A forced change to a different topic
    /// clears the derived video.
    async fn set_core_topic(
        &self,
        quiz_id: &str,
        question_id: &str,
        topic: &str,
        force: bool,
    ) -> Result<()>;

    /// Attach video metadata. Fails if the question has no resolved topic.
    async fn set_video(&self, quiz_id: &str, question_id: &str, video: VideoInfo) -> Result<()>;

    /// Index lookup for the cross-question reuse rule: any video already
    /// resolved for this topic.
    async fn video_for_topic(&self, topic: &str) -> Result<Option<VideoInfo>>;
}

/// Per-student course records, keyed by (student id, course id).
#[async_trait]
pub trait StudentRecordStore: Send + Sync {
    /// Replace the course-keyed sub-document for this student.
    async fn upsert_record(&self, record: StudentCourseRecord) -> Result<()>;

    async fn get_record(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> Result<Option<StudentCourseRecord>>;
}

/// Free-text course descriptions consumed by the topic namer.
#[async_trait]
pub trait CourseContextStore: Send + Sync {
    async fn upsert_context(&self, course_id: &str, description: &str) -> Result<()>;

    async fn get_context(&self, course_id: &str) -> Result<Option<String>>;
}

/// The full persistence surface the pipeline needs.
pub trait Store: QuestionStore + StudentRecordStore + CourseContextStore {}

impl<T: QuestionStore + StudentRecordStore + CourseContextStore> Store for T {}
