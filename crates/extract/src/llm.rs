use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::prompt;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3";

/// Handle to a local Ollama server. Constructed by the caller and passed to
/// whichever component needs it.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>, // "json" for structured output
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(base_url: String, model: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url,
            model,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Plain text completion.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        self.send(prompt, None).await
    }

    /// Completion constrained to JSON output.
    pub async fn generate_json(&self, prompt: &str) -> Result<String> {
        self.send(prompt, Some("json")).await
    }

    async fn send(&self, prompt: &str, format: Option<&str>) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            format,
        };

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        if !response.status().is_success() {
            anyhow::bail!("Ollama request failed: {}", response.status());
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        debug!(model = %self.model, chars = ollama_response.response.len(), "Ollama completion received");
        Ok(ollama_response.response)
    }

    /// Generate with a correction round-trip when the model returns invalid JSON
    pub async fn generate_json_with_retry(
        &self,
        prompt: &str,
        max_attempts: usize,
    ) -> Result<String> {
        let max_attempts = max_attempts.max(1);
        let mut response = self.generate_json(prompt).await?;

        for attempt in 1..=max_attempts {
            if serde_json::from_str::<serde_json::Value>(&response).is_ok() {
                return Ok(response);
            }

            warn!(attempt, max_attempts, "Model returned invalid JSON, asking for a fix");

            if attempt < max_attempts {
                response = self
                    .generate_json(&prompt::build_retry_prompt(&response))
                    .await?;
            }
        }

        anyhow::bail!("Failed to get valid JSON after {} attempts", max_attempts)
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL.to_string(), DEFAULT_MODEL.to_string())
    }
}
