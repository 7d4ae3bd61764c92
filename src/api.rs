//! LLM interaction: location extraction through the Gemini API.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait defining async LLM interaction
//! - [`GeminiClient`]: the production backend, one `generateContent` call
//!   per question
//! - [`extract_locations`]: builds the prompt, asks once, parses the answer
//!
//! There is no retry and no fallback model: a failed call or an answer that
//! is not a list of locations goes straight back to the user.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::LlmSettings;
use crate::error::{NewsMapError, Result};
use crate::models::{LocationRecord, RawLocation};
use crate::utils::{looks_truncated, strip_code_fences, truncate_chars, truncate_for_log};

/// Trait for async LLM interaction.
///
/// Implementors send a prompt to an LLM and return its answer. The future
/// is `Send` so web handlers can stay generic over the backend.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send a prompt to the LLM and receive a response.
    fn ask(&self, text: &str) -> impl Future<Output = Result<Self::Response>> + Send;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

/// Gemini `generateContent` backend.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(client: Client, api_key: String, settings: &LlmSettings) -> Self {
        Self {
            client,
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl AskAsync for GeminiClient {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, text: &str) -> Result<Self::Response> {
        let t0 = Instant::now();
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| NewsMapError::Llm(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NewsMapError::Llm(e.to_string()))?;
        let dt = t0.elapsed();

        if !status.is_success() {
            warn!(%status, elapsed_ms = dt.as_millis() as u64, body = %truncate_for_log(&body, 300), "Gemini call failed");
            return Err(NewsMapError::Llm(format!(
                "Gemini returned HTTP {status}: {}",
                api_error_message(&body)
            )));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| NewsMapError::Llm(format!("unexpected Gemini response: {e}")))?;

        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(NewsMapError::Llm(format!("prompt blocked by Gemini ({reason})")));
        }

        let answer = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| NewsMapError::Llm("Gemini returned no text".to_string()))?;

        info!(elapsed_ms = dt.as_millis() as u64, bytes = answer.len(), "Gemini call succeeded");
        Ok(answer)
    }
}

// Google error bodies look like {"error": {"code": 400, "message": "..."}}.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| truncate_for_log(body.trim(), 200))
}

/// Build the extraction prompt for an article.
pub fn build_prompt(article_text: &str) -> String {
    format!(
        r#"You extract structured information from news text.

Task:
Identify every real-world location mentioned (cities, states, countries, landmarks).
For each location return an object with:
- "name": the place name (string)
- "type": city, state, country, landmark, etc. (string)
- "confidence": a number between 0.0 and 1.0
- "summary": 1-2 sentences on what the article says happened there

Confidence reflects how certain you are that the text refers to this specific place:
- clear, unambiguous reference: 0.9-1.0
- likely correct but other places share the name: 0.6-0.89
- vague or indirect mention: 0.3-0.59
- very uncertain: below 0.3

Rules:
- Keep each summary under 40 words.
- If the article describes no events at a location, use "No specific events described." as its summary.
- Answer with a JSON array of these objects and nothing else. Return [] when there are no locations.
- Do not wrap the answer in Markdown code fences.

Input text:
{article_text}
"#
    )
}

/// Parse the model's answer into location records.
///
/// Accepts a JSON array of location objects, optionally wrapped in a code
/// fence, or an object holding that array under `locations`. Anything else
/// is a [`NewsMapError::Parse`].
pub fn parse_locations(raw: &str) -> Result<Vec<LocationRecord>> {
    let body = strip_code_fences(raw);
    let value: Value = serde_json::from_str(body).map_err(|e| {
        if looks_truncated(&e) {
            NewsMapError::Parse(format!("response looks truncated: {e}"))
        } else {
            NewsMapError::Parse(format!("response is not valid JSON: {e}"))
        }
    })?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("locations") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(NewsMapError::Parse(
                    "expected a list of locations, got an object without one".to_string(),
                ));
            }
        },
        other => {
            return Err(NewsMapError::Parse(format!(
                "expected a list of locations, got {}",
                json_kind(&other)
            )));
        }
    };

    let total = items.len();
    let mut records = Vec::with_capacity(total);
    for (index, item) in items.into_iter().enumerate() {
        let raw: RawLocation = serde_json::from_value(item)
            .map_err(|e| NewsMapError::Parse(format!("location #{index} is malformed: {e}")))?;
        match LocationRecord::from_raw(raw) {
            Some(record) => records.push(record),
            None => debug!(index, "Dropping location without a name"),
        }
    }

    debug!(total, kept = records.len(), "Parsed location records");
    Ok(records)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Ask the LLM for the locations in an article.
///
/// The article is cut to `max_chars` characters before it goes into the
/// prompt.
#[instrument(level = "info", skip_all, fields(article_chars = article_text.chars().count()))]
pub async fn extract_locations<A>(llm: &A, article_text: &str, max_chars: usize) -> Result<Vec<LocationRecord>>
where
    A: AskAsync<Response = String>,
{
    let text = truncate_chars(article_text, max_chars);
    if text.len() < article_text.len() {
        info!(max_chars, "Article truncated before extraction");
    }

    let answer = llm.ask(&build_prompt(text)).await?;
    parse_locations(&answer).inspect_err(|e| {
        warn!(error = %e, response_preview = %truncate_for_log(&answer, 300), "Model returned non-conforming JSON");
    })
}
