//! Content-synthesis collaborator boundary.
//!
//! The synthesizer is the external service that turns a template plus
//! curriculum context into question text, answer, distractors, explanation
//! and hints. It may fail or time out; both are treated as a failed slot
//! attempt by the generation loop, so the exclusion/retry logic applies
//! uniformly.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::curriculum::CurriculumMapping;
use crate::error::SynthesisError;
use crate::template::QuestionTemplate;

/// Environment variable naming the synthesis endpoint.
pub const SYNTH_URL_ENV: &str = "QUIZFORGE_SYNTH_URL";
/// Environment variable holding the optional API key.
pub const SYNTH_KEY_ENV: &str = "QUIZFORGE_SYNTH_KEY";

/// Raw content produced by the collaborator for one slot attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedContent {
    /// Question text.
    pub text: String,
    /// Correct (or model) answer.
    pub answer: String,
    /// Distractors for multiple-choice templates; empty otherwise.
    #[serde(default)]
    pub distractors: Vec<String>,
    /// Explanation of the answer.
    #[serde(default)]
    pub explanation: String,
    /// Progressive hints.
    #[serde(default)]
    pub hints: Vec<String>,
}

/// External content-synthesis collaborator.
///
/// Implementations must be cancel-safe: the generation loop wraps every
/// call in a deadline so a hung collaborator cannot block a worker.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(
        &self,
        template: &QuestionTemplate,
        curriculum: &CurriculumMapping,
    ) -> Result<SynthesizedContent, SynthesisError>;
}

/// Renders the template's structural pattern with the curriculum context
/// into the synthesis prompt.
pub fn render_prompt(
    template: &QuestionTemplate,
    curriculum: &CurriculumMapping,
) -> Result<String, SynthesisError> {
    let mut ctx = tera::Context::new();
    ctx.insert("subject", &curriculum.subject);
    ctx.insert("key_stage", &curriculum.key_stage.to_string());
    ctx.insert("year", &curriculum.year);
    ctx.insert("term", &curriculum.term);
    ctx.insert("topic", &curriculum.topic);
    ctx.insert("objectives", &curriculum.objectives);
    ctx.insert("difficulty", &template.difficulty.as_str());
    ctx.insert("question_type", &template.question_type.to_string());
    ctx.insert("distractor_count", &template.distractor_count);

    Ok(tera::Tera::one_off(&template.pattern, &ctx, false)?)
}

/// The request body sent to the synthesis service.
#[derive(Debug, Serialize)]
struct SynthesisRequestBody<'a> {
    prompt: String,
    question_type: String,
    difficulty: &'a str,
    distractor_count: usize,
    curriculum: &'a CurriculumMapping,
}

/// HTTP client for a JSON content-synthesis service.
pub struct HttpSynthesizer {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl HttpSynthesizer {
    /// Creates a client for the given endpoint.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: None,
            request_timeout,
        }
    }

    /// Sets the bearer API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Creates a client from `QUIZFORGE_SYNTH_URL` / `QUIZFORGE_SYNTH_KEY`.
    pub fn from_env(request_timeout: Duration) -> Result<Self, SynthesisError> {
        let base_url = std::env::var(SYNTH_URL_ENV).map_err(|_| SynthesisError::MissingEndpoint)?;
        let mut client = Self::new(base_url, request_timeout);
        if let Ok(key) = std::env::var(SYNTH_KEY_ENV) {
            client = client.with_api_key(key);
        }
        Ok(client)
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(
        &self,
        template: &QuestionTemplate,
        curriculum: &CurriculumMapping,
    ) -> Result<SynthesizedContent, SynthesisError> {
        let prompt = render_prompt(template, curriculum)?;
        debug!(template_id = %template.id, "Rendered synthesis prompt");

        let body = SynthesisRequestBody {
            prompt,
            question_type: template.question_type.to_string(),
            difficulty: template.difficulty.as_str(),
            distractor_count: template.distractor_count,
            curriculum,
        };

        let url = format!("{}/synthesize", self.base_url.trim_end_matches('/'));
        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let send = async {
            let response = request
                .send()
                .await
                .map_err(|e| SynthesisError::RequestFailed(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(SynthesisError::ApiError {
                    code: status.as_u16(),
                    message,
                });
            }

            response
                .json::<SynthesizedContent>()
                .await
                .map_err(|e| SynthesisError::ParseError(e.to_string()))
        };

        // Hard deadline: a hung collaborator must not block a worker.
        match tokio::time::timeout(self.request_timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(SynthesisError::Timeout(self.request_timeout)),
        }
    }
}
