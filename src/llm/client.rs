use crate::error::{PlaybookError, Result};
use crate::llm::types::*;
use crate::narrative::NarrativeRenderer;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// Points the client at another endpoint, e.g. a local proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn generate_text(
        &self,
        model: &str,
        system_prompt: Option<&str>,
        prompt: &str,
    ) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let payload = GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            system_instruction: system_prompt.map(Content::user),
        };

        let res = self.client.post(&url).json(&payload).send().await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(PlaybookError::NarrativeRender(format!(
                "Gemini API Error (status {}): {}",
                status, err_text
            )));
        }

        let body: GenerateContentResponse = res.json().await?;
        debug!(
            "Gemini returned {} candidate(s)",
            body.candidates.as_ref().map_or(0, Vec::len)
        );

        body.first_text().ok_or_else(|| {
            PlaybookError::NarrativeRender("Model returned no text content".to_string())
        })
    }
}

/// [`NarrativeRenderer`] backed by a Gemini model.
pub struct GeminiRenderer {
    client: GeminiClient,
    model: String,
    system_prompt: Option<String>,
}

impl GeminiRenderer {
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

#[async_trait]
impl NarrativeRenderer for GeminiRenderer {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.client
            .generate_text(&self.model, self.system_prompt.as_deref(), prompt)
            .await
    }
}
