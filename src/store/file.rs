//! JSON-snapshot store.
//!
//! Wraps [`MemoryStore`] and writes the whole collection set to one JSON
//! file after every mutation, so CLI runs see each other's data. Writes go
//! through a temp file followed by a rename to avoid torn snapshots.
//! Suitable for the single-process deployment this pipeline targets; a
//! real document database can slot in behind the same traits.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use crate::errors::PersistenceError;
use crate::models::{Question, Quiz, StudentCourseRecord, VideoInfo};

use super::memory::{Collections, MemoryStore};
use super::{CourseContextStore, QuestionStore, StudentRecordStore};

type Result<T> = std::result::Result<T, PersistenceError>;

pub struct FileStore {
    path: PathBuf,
    mem: MemoryStore,
}

impl FileStore {
    /// Open (or create) a snapshot file and load its collections.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let mem = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let collections: Collections = serde_json::from_str(&content)?;
            debug!(
                "Loaded store snapshot from {} ({} questions, {} records)",
                path.display(),
                collections.questions.len(),
                collections.records.len()
            );
            MemoryStore::from_collections(collections)
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            MemoryStore::new()
        };
        Ok(Self { path, mem })
    }

    fn persist(&self) -> Result<()> {
        let snapshot = self.mem.snapshot();
        let json = serde_json::to_string_pretty(&snapshot).map_err(|e| {
            PersistenceError::new("snapshot", self.path.display().to_string(), e.to_string())
        })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .and_then(|_| std::fs::rename(&tmp, &self.path))
            .map_err(|e| {
                let _ = std::fs::remove_file(&tmp);
                PersistenceError::new("snapshot", self.path.display().to_string(), e.to_string())
            })
    }
}

#[async_trait]
impl QuestionStore for FileStore {
    async fn upsert_quiz(&self, quiz: Quiz) -> Result<()> {
        self.mem.upsert_quiz(quiz).await?;
        self.persist()
    }

    async fn quizzes_for_course(&self, course_id: &str) -> Result<Vec<Quiz>> {
        self.mem.quizzes_for_course(course_id).await
    }

    async fn upsert_question(&self, question: Question) -> Result<()> {
        self.mem.upsert_question(question).await?;
        self.persist()
    }

    async fn get_question(&self, quiz_id: &str, question_id: &str) -> Result<Option<Question>> {
        self.mem.get_question(quiz_id, question_id).await
    }

    async fn questions_for_course(&self, course_id: &str) -> Result<Vec<Question>> {
        self.mem.questions_for_course(course_id).await
    }

    async fn set_core_topic(
        &self,
        quiz_id: &str,
        question_id: &str,
        topic: &str,
        force: bool,
    ) -> Result<()> {
        self.mem
            .set_core_topic(quiz_id, question_id, topic, force)
            .await?;
        self.persist()
    }

    async fn set_video(&self, quiz_id: &str, question_id: &str, video: VideoInfo) -> Result<()> {
        self.mem.set_video(quiz_id, question_id, video).await?;
        self.persist()
    }

    async fn video_for_topic(&self, topic: &str) -> Result<Option<VideoInfo>> {
        self.mem.video_for_topic(topic).await
    }
}

#[async_trait]
impl StudentRecordStore for FileStore {
    async fn upsert_record(&self, record: StudentCourseRecord) -> Result<()> {
        self.mem.upsert_record(record).await?;
        self.persist()
    }

    async fn get_record(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> Result<Option<StudentCourseRecord>> {
        self.mem.get_record(student_id, course_id).await
    }
}

#[async_trait]
impl CourseContextStore for FileStore {
    async fn upsert_context(&self, course_id: &str, description: &str) -> Result<()> {
        self.mem.upsert_context(course_id, description).await?;
        self.persist()
    }

    async fn get_context(&self, course_id: &str) -> Result<Option<String>> {
        self.mem.get_context(course_id).await
    }
}
