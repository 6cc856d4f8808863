
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::ollama::{DEFAULT_RETRY_ATTEMPTS, build_agent, request_with_retry};
use crate::{LessonError, Result};

const DEFAULT_GENERATION_TIMEOUT_SECONDS: u64 = 120;

/// Black-box text generation backend.
///
/// Anything that can turn a prompt into raw text (expected to contain JSON
/// where the prompt demands it) can stand in for the default Ollama client.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Client for the Ollama completion endpoint
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    base_url: Url,
    model: String,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .ollama
            .ollama_url()
            .map_err(|e| LessonError::Config(e.to_string()))?;

        Ok(Self {
            base_url,
            model: config.ollama.generation_model.clone(),
            agent: build_agent(Duration::from_secs(DEFAULT_GENERATION_TIMEOUT_SECONDS)),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }
}

impl TextGenerator for OllamaGenerator {
    #[inline]
    fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            "Generating completion with {} (prompt length: {})",
            self.model,
            prompt.len()
        );

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let url = self
            .base_url
            .join("/api/generate")
            .map_err(|e| LessonError::Llm(format!("failed to build generate URL: {}", e)))?;

        let request_json = serde_json::to_string(&request)
            .map_err(|e| LessonError::Llm(format!("failed to serialize request: {}", e)))?;

        let response_text = request_with_retry(self.retry_attempts, || {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .map_err(|reason| LessonError::Llm(format!("generation request failed: {}", reason)))?;

        let generate_response: GenerateResponse = serde_json::from_str(&response_text)
            .map_err(|e| LessonError::Llm(format!("failed to parse generate response: {}", e)))?;

        debug!(
            "Received completion of {} characters",
            generate_response.response.len()
        );

        Ok(generate_response.response.trim().to_string())
    }
}
