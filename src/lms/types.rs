//! Wire types for the LMS REST surface.
//!
//! The LMS reports most identifiers as numbers but quotes them in some
//! payloads (notably statistics responder lists), so every id field is
//! normalized to `String` during deserialization.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};

/// A quiz as listed by `GET /courses/:id/quizzes`.
#[derive(Debug, Clone, Deserialize)]
pub struct QuizRecord {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub title: String,
}

/// One enrollment row from `GET /courses/:id/enrollments`.
#[derive(Debug, Clone, Deserialize)]
pub struct Enrollment {
    #[serde(deserialize_with = "de_id")]
    pub user_id: String,
    #[serde(default)]
    pub enrollment_state: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl Enrollment {
    pub fn is_active_student(&self) -> bool {
        let active = self
            .enrollment_state
            .as_deref()
            .map(|s| s == "active")
            .unwrap_or(true);
        let student = self
            .kind
            .as_deref()
            .map(|k| k == "StudentEnrollment")
            .unwrap_or(true);
        active && student
    }
}

/// Envelope returned by the quiz statistics endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct StatisticsEnvelope {
    #[serde(default)]
    pub quiz_statistics: Vec<QuizStatisticsPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizStatisticsPage {
    #[serde(default)]
    pub question_statistics: Vec<QuestionStatistic>,
}

/// Per-question statistics block: the classifier's input.
///
/// Depending on the declared question type the payload carries either a
/// flat `answers` list, a nested `answer_sets` list, or a flat list with
/// `full_credit` flags instead of `correct` flags.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionStatistic {
    #[serde(deserialize_with = "de_id", default)]
    pub id: String,
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub question_type: String,
    #[serde(default)]
    pub answers: Option<Vec<AnswerStatistic>>,
    #[serde(default)]
    pub answer_sets: Option<Vec<AnswerSetStatistic>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnswerStatistic {
    #[serde(deserialize_with = "de_opt_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub correct: Option<bool>,
    #[serde(default)]
    pub full_credit: Option<bool>,
    #[serde(deserialize_with = "de_opt_id_list", default)]
    pub user_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnswerSetStatistic {
    #[serde(deserialize_with = "de_opt_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub answers: Vec<AnswerStatistic>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Num(i64),
    Str(String),
}

impl IdRepr {
    fn into_string(self) -> String {
        match self {
            IdRepr::Num(n) => n.to_string(),
            IdRepr::Str(s) => s,
        }
    }
}

fn de_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(IdRepr::deserialize(d)?.into_string())
}

fn de_opt_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v: Option<IdRepr> = Option::deserialize(d)?;
    Ok(v.map(IdRepr::into_string))
}

fn de_opt_id_list<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
    let v: Option<Vec<IdRepr>> = Option::deserialize(d)?;
    Ok(v.map(|ids| ids.into_iter().map(IdRepr::into_string).collect()))
}

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Reduce the LMS's HTML question text to plain text: strip tags, decode
/// the handful of entities the LMS actually emits, collapse whitespace.
pub fn plain_text(html: &str) -> String {
    let stripped = TAG_RE.replace_all(html, " ");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    WS_RE.replace_all(decoded.trim(), " ").to_string()
}
