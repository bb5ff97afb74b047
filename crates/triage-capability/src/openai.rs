//! OpenAI-compatible chat provider.
//!
//! One HTTP client drives three capability seams (classify, generate,
//! score). Prompts ask for machine-readable replies; parsing is lenient
//! where the model tends to drift (markdown fences, unknown labels, prose
//! around a number) and strict where silence would hide a real fault.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};
use triage_ticket::{Answer, Classification, ContextChunk, Label, Priority};

use crate::error::{status_error, CapabilityError};
use crate::traits::{AnswerGenerator, ConfidenceScorer, TicketClassifier};

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const CLASSIFY_SYSTEM: &str = "You triage support tickets. Reply with one JSON object \
    {\"labels\": [..], \"sentiment\": \"..\", \"priority\": \"P2\"}. Labels must come from: \
    How-to, Product, Connector, Lineage, API/SDK, SSO, Glossary, Best practices, \
    Sensitive data, Bug, Permissions. Sentiment is one word. Priority is P0, P1, P2 or P3.";

const GENERATE_SYSTEM: &str = "You answer support tickets using only the documentation \
    context provided. If the context does not cover the question, say so briefly. \
    Reply with the answer text only.";

const SCORE_SYSTEM: &str = "Rate how confident you are that the answer fully resolves \
    the ticket, given the documentation context. Reply with a single number between \
    0.0 and 1.0 and nothing else.";

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid number pattern"));

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default)]
    priority: Option<String>,
}

/// Slice the first JSON object out of a reply, tolerating markdown fences
/// and surrounding prose.
fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end >= start => &trimmed[start..=end],
        _ => trimmed,
    }
}

fn parse_classification(raw: &str) -> Result<Classification, CapabilityError> {
    let payload: RawClassification = serde_json::from_str(extract_json(raw))
        .map_err(|err| CapabilityError::invalid_response(format!("classification payload: {err}")))?;

    let mut labels = Vec::with_capacity(payload.labels.len());
    for name in &payload.labels {
        match name.parse::<Label>() {
            Ok(label) => labels.push(label),
            Err(_) => warn!(label = %name, "dropping label outside the vocabulary"),
        }
    }

    let priority = match payload.priority.as_deref() {
        Some(raw_priority) => raw_priority.parse::<Priority>().unwrap_or_else(|_| {
            warn!(priority = %raw_priority, "unparseable priority, defaulting to P2");
            Priority::P2
        }),
        None => Priority::P2,
    };

    let sentiment = payload.sentiment.unwrap_or_else(|| "Neutral".to_string());
    Ok(Classification::new(labels, sentiment, priority))
}

fn parse_score(raw: &str) -> Result<f64, CapabilityError> {
    let matched = NUMBER_RE
        .find(raw)
        .ok_or_else(|| CapabilityError::invalid_response(format!("no number in score reply: {raw:?}")))?;
    let value: f64 = matched
        .as_str()
        .parse()
        .map_err(|err| CapabilityError::invalid_response(format!("score reply: {err}")))?;
    Ok(value.clamp(0.0, 1.0))
}

fn render_context(context: &[ContextChunk]) -> String {
    if context.is_empty() {
        return "No documentation found.".to_string();
    }
    context
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n---\n")
}

/// Chat-completions client for any endpoint speaking the OpenAI wire shape.
#[derive(Clone, Debug)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, CapabilityError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(CapabilityError::MissingApiKey("OPENAI_API_KEY".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
        })
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String, CapabilityError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0.0,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });
        debug!(model = %self.model, url = %self.api_url, "sending chat completion");

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CapabilityError::invalid_response("chat completion had no choices"))
    }
}

#[async_trait]
impl TicketClassifier for OpenAiProvider {
    async fn classify(&self, text: &str) -> Result<Classification, CapabilityError> {
        let raw = self.chat(CLASSIFY_SYSTEM, text).await?;
        parse_classification(&raw)
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiProvider {
    async fn generate(
        &self,
        text: &str,
        context: &[ContextChunk],
    ) -> Result<Answer, CapabilityError> {
        let user = format!("Context:\n{}\n\nTicket:\n{text}", render_context(context));
        let raw = self.chat(GENERATE_SYSTEM, &user).await?;
        Ok(Answer::new(raw.trim()))
    }
}

#[async_trait]
impl ConfidenceScorer for OpenAiProvider {
    async fn score_confidence(
        &self,
        text: &str,
        context: &[ContextChunk],
        answer: &Answer,
    ) -> Result<f64, CapabilityError> {
        let user = format!(
            "Context:\n{}\n\nTicket:\n{text}\n\nAnswer:\n{}",
            render_context(context),
            answer.text
        );
        let raw = self.chat(SCORE_SYSTEM, &user).await?;
        parse_score(&raw)
    }
}
