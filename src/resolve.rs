//! Topic/Video Resolver
//!
//! Two-phase enrichment over the question store. Phase one names a core
//! topic for every question that lacks one, using the external model with
//! the course name and any stored course context as disambiguation. Phase
//! two attaches video metadata: a topic that some other question already
//! resolved reuses that video straight from the store index, everything
//! else goes to the external video lookup. A failed call leaves the field
//! unset so the question is retried on the next sweep.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{TopicConfig, VideoConfig};
use crate::errors::UpstreamError;
use crate::models::{ResolveReport, SweepIssue, VideoInfo};
use crate::store::Store;

/// External topic-naming collaborator: question text in, topic label out.
#[async_trait]
pub trait TopicNamer: Send + Sync {
    async fn name_topic(
        &self,
        question_text: &str,
        course_name: &str,
        course_context: &str,
    ) -> Result<String, UpstreamError>;
}

/// External video-lookup collaborator: topic in, video metadata out.
#[async_trait]
pub trait VideoFinder: Send + Sync {
    async fn find_video(&self, topic: &str) -> Result<Option<VideoInfo>, UpstreamError>;
}

const TOPIC_SYSTEM_PROMPT: &str = "You name the single core academic topic a quiz question \
tests. Respond with a short topic phrase only, no punctuation or explanation.";

/// Topic namer backed by an OpenAI-style chat completions endpoint.
pub struct LlmTopicNamer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl LlmTopicNamer {
    pub fn new(config: &TopicConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(5)))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl TopicNamer for LlmTopicNamer {
    async fn name_topic(
        &self,
        question_text: &str,
        course_name: &str,
        course_context: &str,
    ) -> Result<String, UpstreamError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| UpstreamError::Authentication("no topic API key configured".into()))?;

        let user_prompt = format!(
            "Course: {}\nCourse context: {}\n\nQuestion:\n{}",
            course_name, course_context, question_text
        );
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": TOPIC_SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt},
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let url = format!("{}/chat/completions", self.endpoint);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let response = check_status(response).await?;
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| UpstreamError::Parse(e.to_string()))?;

        let topic = payload
            .pointer("/choices/0/message/content")
            .and_then(serde_json::Value::as_str)
            .map(|s| s.trim().trim_matches('"').to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| UpstreamError::Parse("no topic in model response".into()))?;

        Ok(topic)
    }
}

/// Video finder backed by a keyed search API (YouTube Data shape).
pub struct HttpVideoFinder {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    max_results: usize,
}

impl HttpVideoFinder {
    pub fn new(config: &VideoConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(5)))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_results: config.max_results.max(1),
        })
    }
}

#[async_trait]
impl VideoFinder for HttpVideoFinder {
    async fn find_video(&self, topic: &str) -> Result<Option<VideoInfo>, UpstreamError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| UpstreamError::Authentication("no video API key configured".into()))?;

        let url = format!("{}/search", self.endpoint);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", &self.max_results.to_string()),
                ("q", &format!("{} tutorial", topic)),
                ("key", api_key),
            ])
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let response = check_status(response).await?;
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| UpstreamError::Parse(e.to_string()))?;

        let Some(item) = payload.pointer("/items/0") else {
            return Ok(None);
        };

        let video_id = item
            .pointer("/id/videoId")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| UpstreamError::Parse("search item without a video id".into()))?;
        let title = item
            .pointer("/snippet/title")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(topic);

        Ok(Some(VideoInfo {
            link: format!("https://www.youtube.com/watch?v={}", video_id),
            title: title.to_string(),
            channel: item
                .pointer("/snippet/channelTitle")
                .and_then(serde_json::Value::as_str)
                .map(String::from),
            thumbnail: item
                .pointer("/snippet/thumbnails/default/url")
                .and_then(serde_json::Value::as_str)
                .map(String::from),
        }))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout
    } else {
        UpstreamError::Network(e.to_string())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Err(UpstreamError::Authentication(format!("{}: {}", status, body)))
    } else {
        Err(UpstreamError::HttpStatus {
            status: status.as_u16(),
            message: body.chars().take(512).collect(),
        })
    }
}

/// Run both resolution phases over every question of a course.
pub async fn resolve_course(
    store: &dyn Store,
    namer: &dyn TopicNamer,
    finder: &dyn VideoFinder,
    course_id: &str,
    course_name: &str,
) -> ResolveReport {
    let mut report = ResolveReport::new(course_id);

    let course_context = match store.get_context(course_id).await {
        Ok(ctx) => ctx.unwrap_or_default(),
        Err(e) => {
            report.issues.push(SweepIssue::course_level(&e));
            String::new()
        }
    };

    // Phase 1: name topics.
    let questions = match store.questions_for_course(course_id).await {
        Ok(questions) => questions,
        Err(e) => {
            report.issues.push(SweepIssue::course_level(&e));
            return report;
        }
    };

    for question in &questions {
        if question.core_topic.is_some() || question.text.trim().is_empty() {
            continue;
        }
        match namer
            .name_topic(&question.text, course_name, &course_context)
            .await
        {
            Ok(topic) => {
                debug!("Named topic {:?} for question {}", topic, question.id);
                match store
                    .set_core_topic(&question.quiz_id, &question.id, &topic, false)
                    .await
                {
                    Ok(()) => report.topics_named += 1,
                    Err(e) => report
                        .issues
                        .push(SweepIssue::for_question(&question.quiz_id, &question.id, e)),
                }
            }
            Err(e) => {
                warn!("Topic naming failed for question {}: {}", question.id, e);
                report
                    .issues
                    .push(SweepIssue::for_question(&question.quiz_id, &question.id, e));
            }
        }
    }

    // Phase 2: attach videos, reusing any video already resolved for the
    // same topic before going to the external lookup.
    let questions = match store.questions_for_course(course_id).await {
        Ok(questions) => questions,
        Err(e) => {
            report.issues.push(SweepIssue::course_level(&e));
            return report;
        }
    };

    for question in &questions {
        let Some(topic) = &question.core_topic else {
            continue;
        };
        if question.video.is_some() {
            continue;
        }

        let reused = match store.video_for_topic(topic).await {
            Ok(video) => video,
            Err(e) => {
                report
                    .issues
                    .push(SweepIssue::for_question(&question.quiz_id, &question.id, e));
                continue;
            }
        };

        let (video, was_reused) = match reused {
            Some(video) => (Some(video), true),
            None => match finder.find_video(topic).await {
                Ok(video) => (video, false),
                Err(e) => {
                    warn!("Video lookup failed for topic {:?}: {}", topic, e);
                    report
                        .issues
                        .push(SweepIssue::for_question(&question.quiz_id, &question.id, e));
                    continue;
                }
            },
        };

        let Some(video) = video else {
            debug!("No video found for topic {:?}", topic);
            continue;
        };

        match store.set_video(&question.quiz_id, &question.id, video).await {
            Ok(()) => {
                if was_reused {
                    report.videos_reused += 1;
                } else {
                    report.videos_found += 1;
                }
            }
            Err(e) => report
                .issues
                .push(SweepIssue::for_question(&question.quiz_id, &question.id, e)),
        }
    }

    info!(
        "Resolved course {}: {} topics named, {} videos found, {} reused, {} issues",
        course_id,
        report.topics_named,
        report.videos_found,
        report.videos_reused,
        report.issues.len()
    );
    report
}
