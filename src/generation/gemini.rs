use super::{GenerationClient, GenerationClientError, NO_ANSWER_PLACEHOLDER, or_placeholder};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

/// Generation client for the Gemini `generateContent` REST endpoint.
pub struct GeminiGenerationClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiGenerationClient {
    /// Construct a client for `model`, authenticated with `api_key`.
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            http: Client::builder()
                .user_agent("knowledge-rag/generate")
                .build()
                .unwrap_or_default(),
            base_url,
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!(
            "{}/v1beta/models/{model}:generateContent",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

/// Only `text` is read; function calls, inline data and similar parts leave it unset.
#[derive(Debug, Default, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Concatenated text of the first candidate, or `None` when any part is not text.
fn extract_answer_text(response: &GenerateContentResponse) -> Option<String> {
    let candidate = response.candidates.first()?;
    let parts = &candidate.content.as_ref()?.parts;
    if parts.is_empty() {
        return None;
    }

    let mut answer = String::new();
    for part in parts {
        answer.push_str(part.text.as_deref()?);
    }
    Some(answer)
}

#[async_trait]
impl GenerationClient for GeminiGenerationClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationClientError> {
        let payload = json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": prompt }]
                }
            ]
        });

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                GenerationClientError::ProviderUnavailable(format!(
                    "failed to reach Gemini at {}: {error}",
                    self.base_url
                ))
            })?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            let status = response.status();
            return Err(GenerationClientError::ProviderUnavailable(format!(
                "Gemini rejected credentials ({status})"
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, model = %self.model, "Gemini request failed");
            return Err(GenerationClientError::GenerationFailed(format!(
                "Gemini returned {status}: {body}"
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|error| {
            GenerationClientError::InvalidResponse(format!(
                "failed to decode Gemini response: {error}"
            ))
        })?;

        match extract_answer_text(&body) {
            Some(text) => Ok(or_placeholder(text)),
            None => {
                tracing::warn!(
                    model = %self.model,
                    candidates = body.candidates.len(),
                    finish_reason = ?body.candidates.first().and_then(|c| c.finish_reason.as_deref()),
                    block_reason = ?body.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_deref()),
                    "Gemini response carried no text answer"
                );
                Ok(NO_ANSWER_PLACEHOLDER.to_string())
            }
        }
    }
}
