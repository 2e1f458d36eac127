pub mod prompt;
mod tracker;

use std::time::Duration;

use quadlab_core::{ChallengeValidator, Coefficients, TutorConfig, ValidatedChallenge};
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

pub use tracker::{RequestTracker, Ticket};

/// Fixed text shown to the learner when the service cannot be reached.
pub const UNAVAILABLE_MESSAGE: &str = "I'm having trouble connecting right now.";

/// Fixed text shown when the service answers with nothing.
pub const EMPTY_REPLY_MESSAGE: &str = "I'm not sure about that.";

/// Client for the remote text-generation service.
pub struct TutorClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    config: TutorConfig,
}

#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

impl TutorClient {
    /// Create a new client, reading the API key from the configured
    /// environment variable.
    pub fn new(config: TutorConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key(),
            config,
        })
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Ask for a Markdown walkthrough of the equation.
    pub async fn explain(&self, coef: &Coefficients) -> Result<String, Error> {
        let generation = GenerationConfig {
            temperature: Some(self.config.temperature),
            ..Default::default()
        };
        self.generate(&prompt::explain_prompt(coef), generation)
            .await
    }

    /// Answer a free-form question about the equation.
    pub async fn ask(&self, question: &str, coef: &Coefficients) -> Result<String, Error> {
        self.generate(&prompt::tutor_prompt(question, coef), GenerationConfig::default())
            .await
    }

    /// Request a new equation to solve.
    ///
    /// Malformed or empty model output resolves to the validator's fallback;
    /// only transport and HTTP failures are returned as errors.
    pub async fn challenge(
        &self,
        validator: &ChallengeValidator,
    ) -> Result<ValidatedChallenge, Error> {
        let generation = GenerationConfig {
            response_mime_type: Some("application/json"),
            response_schema: Some(prompt::challenge_schema()),
            ..Default::default()
        };
        let text = match self.generate(prompt::CHALLENGE_PROMPT, generation).await {
            Ok(text) => text,
            Err(Error::EmptyResponse) => String::new(),
            Err(err) => return Err(err),
        };
        let challenge = validator.validate_text(&text);
        if let quadlab_core::Verdict::Fallback(reason) = &challenge.verdict {
            tracing::warn!(%reason, "discarding suggested challenge");
        }
        Ok(challenge)
    }

    async fn generate(&self, prompt: &str, generation: GenerationConfig) -> Result<String, Error> {
        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GenerateRequest<'a> {
            contents: [Content<'a>; 1],
            generation_config: GenerationConfig,
        }

        #[derive(serde::Serialize)]
        struct Content<'a> {
            role: &'a str,
            parts: [Part<'a>; 1],
        }

        #[derive(serde::Serialize)]
        struct Part<'a> {
            text: &'a str,
        }

        #[derive(serde::Deserialize)]
        struct GenerateResponse {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }

        #[derive(serde::Deserialize)]
        struct Candidate {
            content: Option<CandidateContent>,
        }

        #[derive(serde::Deserialize)]
        struct CandidateContent {
            #[serde(default)]
            parts: Vec<ResponsePart>,
        }

        #[derive(serde::Deserialize)]
        struct ResponsePart {
            text: Option<String>,
        }

        let key = self.api_key.as_deref().ok_or(Error::MissingApiKey)?;
        let req = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            generation_config: generation,
        };
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.config.model
        );
        tracing::debug!(model = %self.config.model, "sending generateContent request");
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", key)
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            tracing::warn!(%status, "text generation request failed");
            return Err(Error::Http { status, text });
        }
        let body = resp.json::<GenerateResponse>().await?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(Error::EmptyResponse);
        }
        Ok(text)
    }
}

/// Errors produced by [`TutorClient`].
///
/// Every variant means the service is unavailable from the learner's point
/// of view; hosts show [`UNAVAILABLE_MESSAGE`] and keep their state.
#[derive(Debug, Error)]
pub enum Error {
    /// Error from the underlying HTTP client, including timeouts.
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    /// Non-successful HTTP status returned by the server.
    #[error("HTTP {status}: {text}")]
    Http { status: StatusCode, text: String },
    /// The service answered without any candidate text.
    #[error("empty response from text generation service")]
    EmptyResponse,
    /// No API key is configured.
    #[error("no API key configured")]
    MissingApiKey,
}
