// ============================================================================
// File: src/llm_client.rs
// Gemini API client and the text-generation agents built on it
// ============================================================================

use async_trait::async_trait;
use chrono::Local;
use reqwest::Client;
use serde_json::json;
use tiktoken_rs::p50k_base;
use tracing::debug;

use crate::config::Config;
use crate::error::{PlannerError, PlannerResult};
use crate::models::{Content, GenerateContentRequest, GenerateContentResponse, Part};

/// Text returned by a generation call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Completion {
    pub content: String,
    pub tokens: usize,
}

/// Text-generation collaborator
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str, web_search: bool) -> PlannerResult<Completion>;
}

pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> PlannerResult<Self> {
        let client = Client::builder()
            .timeout(config.settings.request_timeout())
            .build()
            .map_err(|e| PlannerError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.settings.gemini_url.trim_end_matches('/').to_string(),
            api_key: config.google_api_key.clone(),
            model: config.settings.model.clone(),
        })
    }

    fn build_request(system: &str, prompt: &str, web_search: bool) -> GenerateContentRequest {
        GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: system.to_string() }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: prompt.to_string() }],
            }],
            tools: if web_search {
                vec![json!({ "google_search": {} })]
            } else {
                Vec::new()
            },
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, system: &str, prompt: &str, web_search: bool) -> PlannerResult<Completion> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        debug!(model = %self.model, web_search, "Calling model");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_request(system, prompt, web_search))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PlannerError::CollaboratorUnavailable(format!(
                "API error for model '{}': HTTP {}\nResponse: {}",
                self.model, status, error_text
            )));
        }

        let response_text = response.text().await?;
        let response_data: GenerateContentResponse = serde_json::from_str(&response_text)
            .map_err(|e| {
                PlannerError::MalformedResponse(format!(
                    "Failed to parse response from model '{}': {}\nRaw response: {}",
                    self.model, e, response_text
                ))
            })?;

        completion_from(response_data, &self.model)
    }
}

/// Join the text parts of the first candidate.
fn completion_from(response: GenerateContentResponse, model: &str) -> PlannerResult<Completion> {
    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        PlannerError::MalformedResponse(format!("Model '{}' returned no candidates", model))
    })?;

    let content = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect::<Vec<_>>().join(""))
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(PlannerError::MalformedResponse(format!(
            "Model '{}' returned empty content",
            model
        )));
    }

    let tokens = response
        .usage_metadata
        .and_then(|u| u.total_token_count)
        .unwrap_or_else(|| estimate_tokens(&content));

    Ok(Completion { content, tokens })
}

fn estimate_tokens(text: &str) -> usize {
    match p50k_base() {
        Ok(bpe) => bpe.encode_with_special_tokens(text).len(),
        // Rough estimation: ~4 characters per token
        Err(_) => text.len() / 4,
    }
}

/// A named role with standing instructions
#[derive(Debug, Clone)]
pub struct Agent {
    pub name: String,
    pub instructions: Vec<String>,
    pub web_search: bool,
    pub add_datetime: bool,
}

impl Agent {
    pub fn new(name: &str, instructions: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            instructions,
            web_search: false,
            add_datetime: true,
        }
    }

    pub fn with_web_search(mut self) -> Self {
        self.web_search = true;
        self
    }

    pub fn system_prompt(&self) -> String {
        let mut system = format!("You are {}.\n\nInstructions:\n", self.name);
        for (i, instruction) in self.instructions.iter().enumerate() {
            system.push_str(&format!("{}. {}\n", i + 1, instruction));
        }

        if self.add_datetime {
            system.push_str(&format!(
                "\nThe current time is {}.\n",
                Local::now().format("%Y-%m-%d %H:%M:%S")
            ));
        }

        system
    }

    pub async fn run(&self, generator: &dyn TextGenerator, prompt: &str) -> PlannerResult<Completion> {
        debug!(agent = %self.name, "Running agent");
        generator.generate(&self.system_prompt(), prompt, self.web_search).await
    }
}
