use thiserror::Error;

/// The central error type for the remedia pipeline.
///
/// This hierarchy keeps failure containment explicit: upstream and
/// persistence errors are contained at the smallest unit (one quiz, one
/// question, one student) and collected into sweep reports, while only
/// configuration problems and rejected credentials abort a whole course.
#[derive(Error, Debug)]
pub enum RemediaError {
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Malformed data: {0}")]
    MalformedData(#[from] MalformedDataError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// An external collaborator (LMS, topic namer, video finder) failed.
/// All variants are retryable on the next sweep except `Authentication`,
/// which aborts the remaining work for the course/credential pair.
#[derive(Error, Debug, Clone)]
pub enum UpstreamError {
    #[error("request timed out")]
    Timeout,

    #[error("authentication rejected: {0}")]
    Authentication(String),

    #[error("upstream returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("failed to parse upstream response: {0}")]
    Parse(String),

    #[error("network error: {0}")]
    Network(String),
}

impl UpstreamError {
    /// Credential-rejection errors are the only upstream failures that
    /// abort the rest of a course sweep.
    pub fn is_auth(&self) -> bool {
        matches!(self, UpstreamError::Authentication(_))
    }
}

/// A statistics payload was missing the fields its declared question type
/// requires. The offending question is skipped, not the whole quiz.
#[derive(Error, Debug, Clone)]
#[error("question {question_id} in quiz {quiz_id}: {reason}")]
pub struct MalformedDataError {
    pub quiz_id: String,
    pub question_id: String,
    pub reason: String,
}

/// A store read or write failed. Surfaced per student / per question and
/// never aborts the enclosing sweep.
#[derive(Error, Debug, Clone)]
#[error("{collection}[{key}]: {reason}")]
pub struct PersistenceError {
    pub collection: &'static str,
    pub key: String,
    pub reason: String,
}

impl PersistenceError {
    pub fn new(collection: &'static str, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            collection,
            key: key.into(),
            reason: reason.into(),
        }
    }
}

// Exit codes for the CLI.
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_UPSTREAM_ERROR: u8 = 3;

/// Map an error chain to a process exit code.
pub fn get_exit_code(e: &anyhow::Error) -> u8 {
    if let Some(err) = e.downcast_ref::<RemediaError>() {
        return match err {
            RemediaError::Config(_) => EXIT_CONFIG_ERROR,
            RemediaError::Upstream(_) => EXIT_UPSTREAM_ERROR,
            _ => EXIT_ERROR,
        };
    }

    if e.downcast_ref::<UpstreamError>().is_some() {
        return EXIT_UPSTREAM_ERROR;
    }

    // Fallback string matching when the typed error got flattened.
    let msg = e.to_string().to_lowercase();
    if msg.contains("config") {
        EXIT_CONFIG_ERROR
    } else if msg.contains("upstream") || msg.contains("network") || msg.contains("timed out") {
        EXIT_UPSTREAM_ERROR
    } else {
        EXIT_ERROR
    }
}
