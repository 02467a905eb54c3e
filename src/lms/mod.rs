//! LMS Client
//!
//! Read-only adapter over the LMS REST API: quizzes, enrollments, and
//! per-quiz statistics. Cursor pagination is followed internally so callers
//! always get complete result sets. This module never writes to any store.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

pub mod types;

use crate::config::{LmsConfig, RetrySettings};
use crate::errors::UpstreamError;
use types::{Enrollment, QuizRecord, QuestionStatistic, StatisticsEnvelope};

/// Trait abstraction over the LMS, enabling test fakes.
#[async_trait]
pub trait LmsClient: Send + Sync {
    /// All quizzes for a course, across every page.
    async fn list_quizzes(
        &self,
        course_id: &str,
        token: &str,
    ) -> Result<Vec<QuizRecord>, UpstreamError>;

    /// Ids of actively enrolled students.
    async fn list_active_students(
        &self,
        course_id: &str,
        token: &str,
    ) -> Result<Vec<String>, UpstreamError>;

    /// Per-question statistics for one quiz.
    async fn quiz_statistics(
        &self,
        course_id: &str,
        quiz_id: &str,
        token: &str,
    ) -> Result<Vec<QuestionStatistic>, UpstreamError>;
}

/// Retry configuration for LMS calls.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// Initial delay between retries (doubles each attempt).
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub retryable_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            retryable_status_codes: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            initial_delay_ms: settings.base_delay_ms,
            max_delay_ms: settings.max_delay_ms,
            retryable_status_codes: vec![429, 500, 502, 503, 504],
        }
    }
}

pub struct HttpLmsClient {
    client: Client,
    base_url: String,
    per_page: usize,
    retry_config: RetryConfig,
}

impl HttpLmsClient {
    pub fn new(config: &LmsConfig, retry: &RetrySettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(5)))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            per_page: config.per_page,
            retry_config: RetryConfig::from_settings(retry),
        })
    }

    /// GET one URL with retry; returns the body and the `rel="next"` link.
    async fn get_with_retry(
        &self,
        url: &str,
        token: &str,
    ) -> Result<(serde_json::Value, Option<String>), UpstreamError> {
        let mut last_error = UpstreamError::Network("no attempt made".to_string());
        let mut delay_ms = self.retry_config.initial_delay_ms;

        for attempt in 0..=self.retry_config.max_retries {
            if attempt > 0 {
                warn!(
                    "Retry attempt {}/{} after {}ms delay",
                    attempt, self.retry_config.max_retries, delay_ms
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                // Exponential backoff with ±10% jitter
                delay_ms = (delay_ms * 2).min(self.retry_config.max_delay_ms);
                let jitter = (delay_ms as f64 * 0.1 * (rand::random::<f64>() - 0.5)) as i64;
                delay_ms = delay_ms.saturating_add_signed(jitter);
            }

            debug!("GET {} (attempt {})", url, attempt + 1);

            let result = self
                .client
                .get(url)
                .bearer_auth(token)
                .header("Accept", "application/json")
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let next = next_link(
                            response
                                .headers()
                                .get(reqwest::header::LINK)
                                .and_then(|v| v.to_str().ok()),
                        );
                        let body = response
                            .json::<serde_json::Value>()
                            .await
                            .map_err(|e| UpstreamError::Parse(e.to_string()))?;
                        return Ok((body, next));
                    }

                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        let body = response.text().await.unwrap_or_default();
                        return Err(UpstreamError::Authentication(format!(
                            "{}: {}",
                            status, body
                        )));
                    }

                    let body = response.text().await.unwrap_or_default();
                    let err = UpstreamError::HttpStatus {
                        status: status.as_u16(),
                        message: truncate(&body, 512),
                    };
                    if self
                        .retry_config
                        .retryable_status_codes
                        .contains(&status.as_u16())
                    {
                        last_error = err;
                        continue;
                    }
                    return Err(err);
                }
                Err(e) if e.is_timeout() => return Err(UpstreamError::Timeout),
                Err(e) => {
                    last_error = UpstreamError::Network(e.to_string());
                    continue;
                }
            }
        }

        Err(last_error)
    }

    /// Follow `rel="next"` links until the collection is exhausted.
    async fn get_paginated(
        &self,
        first_url: String,
        token: &str,
    ) -> Result<Vec<serde_json::Value>, UpstreamError> {
        let mut items = Vec::new();
        let mut url = Some(first_url);

        while let Some(current) = url.take() {
            let (body, next) = self.get_with_retry(&current, token).await?;
            match body {
                serde_json::Value::Array(page) => items.extend(page),
                other => {
                    return Err(UpstreamError::Parse(format!(
                        "expected a JSON array page, got {}",
                        json_kind(&other)
                    )))
                }
            }
            url = next;
        }

        Ok(items)
    }
}

#[async_trait]
impl LmsClient for HttpLmsClient {
    async fn list_quizzes(
        &self,
        course_id: &str,
        token: &str,
    ) -> Result<Vec<QuizRecord>, UpstreamError> {
        let url = format!(
            "{}/courses/{}/quizzes?per_page={}",
            self.base_url, course_id, self.per_page
        );
        let items = self.get_paginated(url, token).await?;
        items
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(|e| UpstreamError::Parse(e.to_string())))
            .collect()
    }

    async fn list_active_students(
        &self,
        course_id: &str,
        token: &str,
    ) -> Result<Vec<String>, UpstreamError> {
        let url = format!(
            "{}/courses/{}/enrollments?type[]=StudentEnrollment&state[]=active&per_page={}",
            self.base_url, course_id, self.per_page
        );
        let items = self.get_paginated(url, token).await?;
        let enrollments: Vec<Enrollment> = items
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(|e| UpstreamError::Parse(e.to_string())))
            .collect::<Result<_, _>>()?;
        Ok(enrollments
            .into_iter()
            .filter(Enrollment::is_active_student)
            .map(|e| e.user_id)
            .collect())
    }

    async fn quiz_statistics(
        &self,
        course_id: &str,
        quiz_id: &str,
        token: &str,
    ) -> Result<Vec<QuestionStatistic>, UpstreamError> {
        let url = format!(
            "{}/courses/{}/quizzes/{}/statistics",
            self.base_url, course_id, quiz_id
        );
        let (body, _) = self.get_with_retry(&url, token).await?;
        let envelope: StatisticsEnvelope =
            serde_json::from_value(body).map_err(|e| UpstreamError::Parse(e.to_string()))?;
        Ok(envelope
            .quiz_statistics
            .into_iter()
            .flat_map(|page| page.question_statistics)
            .collect())
    }
}

/// Extract the `rel="next"` URL from a Link header, discarding anything
/// that does not parse as an absolute URL.
fn next_link(header: Option<&str>) -> Option<String> {
    let header = header?;
    for part in header.split(',') {
        let mut sections = part.split(';');
        let target = sections.next()?.trim();
        let is_next = sections.any(|s| s.trim() == "rel=\"next\"");
        if is_next {
            let target = target.trim_start_matches('<').trim_end_matches('>');
            if url::Url::parse(target).is_ok() {
                return Some(target.to_string());
            }
        }
    }
    None
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a bool",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
