use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use zeroize::Zeroizing;

/// Errors from the AI text service.
#[derive(Debug, Error)]
pub enum AiError {
    /// The service answered with a non-success status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The request failed in transit or timed out.
    #[error("Network error: {0}")]
    Network(reqwest::Error),

    /// The service answered but the envelope was not understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The service answered without any text.
    #[error("Empty response")]
    Empty,
}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        AiError::Network(e.without_url())
    }
}

/// The header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// The boundary to a generative text service.
#[async_trait]
pub trait AiClient: Send + Sync {
    /// Sends a prompt and returns the raw generated text.
    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

/// Sampling settings sent with every request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            response_mime_type: "application/json",
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: &'a GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Pulls the generated text out of a `generateContent` response body.
///
/// The text parts of the first candidate are concatenated.
fn extract_text(body: &str) -> Result<String, AiError> {
    let response: GenerateContentResponse =
        sonic_rs::from_str(body).map_err(|e| AiError::InvalidResponse(e.to_string()))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AiError::Empty);
    }

    Ok(text)
}

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: Zeroizing<String>,
    generation_config: GenerationConfig,
}

impl GeminiClient {
    /// Creates a new `GeminiClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The API base URL.
    /// * `model` - The model to call.
    /// * `api_key` - The API key.
    /// * `timeout` - The request timeout.
    ///
    /// # Returns
    ///
    /// A `Result` containing the client.
    pub fn new(
        base_url: String,
        model: String,
        api_key: Zeroizing<String>,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            generation_config: GenerationConfig::default(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl AiClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        tracing::debug!("🤖 Calling {} ({} prompt bytes)", self.model, prompt.len());

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: &self.generation_config,
        };
        let body = sonic_rs::to_string(&request).map_err(|e| AiError::InvalidResponse(e.to_string()))?;

        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(AiError::Api {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            });
        }

        let generated = extract_text(&text)?;
        tracing::debug!("✅ {} returned {} bytes", self.model, generated.len());
        Ok(generated)
    }
}
