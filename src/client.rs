//! # Inference Server Client
//!
//! Blocking HTTP client for the local OpenAI-style inference server. Two
//! endpoints matter: `GET /v1/models` as a readiness probe and
//! `POST /v1/chat/completions` for generation.
//!
//! The readiness wait is expressed as a loop over an injected
//! [`WaitPolicy`] so tests can simulate server start-up without real
//! delays and callers can impose a bounded wait. The default policy,
//! [`FixedDelay`], matches the driver contract: probe forever with a
//! one-second pause between attempts.
//!
//! Generation sits behind the [`CaptionEngine`] trait so the batch loop
//! can run against a scripted engine in tests.

use std::{thread, time::Duration};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::config::GenerationParams;
use crate::error::{CaptionError, CaptionResult};

/// Base URL of the inference server the supervisor starts.
pub const DEFAULT_API_BASE: &str = "http://localhost:5001";

/// One generation request: a prompt, raw image bytes, and the sampling
/// parameters to merge into the payload.
#[derive(Debug)]
pub struct CaptionRequest<'a> {
    pub prompt: &'a str,
    pub image: &'a [u8],
    /// MIME type used for the data URI (`image/png` or `image/jpeg`).
    pub mime: &'a str,
    pub params: &'a GenerationParams,
}

/// Abstract interface for producing one caption per request.
/// Enables pluggable backends so the driver loop is testable offline.
pub trait CaptionEngine {
    /// Generate text for a single image.
    ///
    /// # Errors
    ///
    /// Per-item errors only: a non-success status, a transport failure, or
    /// an empty response. None of these abort the batch.
    fn generate(&mut self, request: &CaptionRequest<'_>) -> CaptionResult<String>;
}

/// Controls pacing and cancellation of the readiness wait.
pub trait WaitPolicy {
    /// Called after each failed probe. Return `false` to stop waiting.
    fn pause(&mut self) -> bool;
}

/// Probe forever with a fixed pause between attempts. The driver default.
#[derive(Debug)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl WaitPolicy for FixedDelay {
    fn pause(&mut self) -> bool {
        thread::sleep(self.delay);
        true
    }
}

/// Probe at a fixed pace but give up after a maximum number of attempts.
/// For callers that need a bounded wait instead of the indefinite default.
#[derive(Debug)]
pub struct BoundedDelay {
    delay: Duration,
    pauses_left: u32,
}

impl BoundedDelay {
    pub fn new(delay: Duration, max_pauses: u32) -> Self {
        Self {
            delay,
            pauses_left: max_pauses,
        }
    }
}

impl WaitPolicy for BoundedDelay {
    fn pause(&mut self) -> bool {
        if self.pauses_left == 0 {
            return false;
        }
        self.pauses_left -= 1;
        thread::sleep(self.delay);
        true
    }
}

/// Client for one inference server instance.
pub struct InferenceClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl InferenceClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Block until the server's models endpoint answers with success.
    ///
    /// Connection failures and non-success statuses both count as "not
    /// ready yet" and are swallowed; they only surface as
    /// [`CaptionError::NotReady`] when `policy` declines to keep waiting.
    pub fn wait_until_ready(&self, policy: &mut dyn WaitPolicy) -> CaptionResult<()> {
        let mut attempts: u64 = 0;
        loop {
            attempts += 1;
            if self.probe() {
                return Ok(());
            }
            log::debug!("inference server not ready (probe {attempts})");
            if !policy.pause() {
                return Err(CaptionError::NotReady { attempts });
            }
        }
    }

    fn probe(&self) -> bool {
        self.http
            .get(format!("{}/v1/models", self.base_url))
            .send()
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }
}

impl CaptionEngine for InferenceClient {
    fn generate(&mut self, request: &CaptionRequest<'_>) -> CaptionResult<String> {
        let body = ChatRequest::build(request);
        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&body)
            .send()
            .map_err(|e| CaptionError::http("chat completion", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CaptionError::Generation {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| CaptionError::http("decoding completion response", e))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(CaptionError::EmptyResponse)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<Message>,
    #[serde(flatten)]
    params: &'a GenerationParams,
}

impl<'a> ChatRequest<'a> {
    /// An empty system message followed by one user message carrying the
    /// prompt text and the image as an inlined base64 data URI.
    fn build(request: &CaptionRequest<'a>) -> Self {
        let data_uri = format!(
            "data:{};base64,{}",
            request.mime,
            STANDARD.encode(request.image)
        );
        Self {
            messages: vec![
                Message {
                    role: "system",
                    content: Content::Text(String::new()),
                },
                Message {
                    role: "user",
                    content: Content::Parts(vec![
                        Part::Text {
                            text: request.prompt.to_string(),
                        },
                        Part::ImageUrl {
                            image_url: ImageUrl { url: data_uri },
                        },
                    ]),
                },
            ],
            params: request.params,
        }
    }
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Content,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Content {
    Text(String),
    Parts(Vec<Part>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Part {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: String,
}
