//! Operator summaries for raised alerts.
//!
//! The summarizer is an external collaborator: it may be slow, misconfigured
//! or down. Every failure surfaces as a [`SummaryError`] whose text becomes
//! the summary, so a broken summarizer never stops frame processing.

use crate::config::SummarizerConfig;
use async_trait::async_trait;
use common::DensityLevel;
use crowd_analytics::HistoricalPattern;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("LLM Error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid summarizer response: {0}")]
    InvalidResponse(String),
}

/// Interpretable signals handed to the summarizer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRequest {
    pub zone: String,
    pub person_count: u32,
    pub density_level: DensityLevel,
    pub baseline_mean: f64,
    pub baseline_std: f64,
    pub z_score: f64,
    pub pattern: Option<HistoricalPattern>,
}

/// Operator wording for a z-score
pub fn deviation_label(z_score: f64) -> &'static str {
    let z = z_score.abs();
    if z < 1.0 {
        "within normal range"
    } else if z < 3.0 {
        "moderately above normal"
    } else {
        "significantly above normal"
    }
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn summarize(&self, request: &SummaryRequest) -> Result<String, SummaryError>;
}

/// Build the right summarizer for the configuration
pub fn from_config(config: &SummarizerConfig) -> Result<Box<dyn Summarizer>, SummaryError> {
    match &config.api_key {
        Some(key) => Ok(Box::new(OpenRouterSummarizer::new(config, key.clone())?)),
        None => Ok(Box::new(TemplateSummarizer)),
    }
}

pub fn build_prompt(request: &SummaryRequest) -> String {
    format!(
        r#"
Zone: {zone}

Observed people count: {count}
Crowd density level (PRIMARY INDICATOR): {level}
Deviation from historical baseline (SECONDARY CONTEXT): {deviation}

IMPORTANT INSTRUCTIONS:
- Treat the density level as the authoritative assessment
- Deviation text provides context only and must not override the density level
- If density level is LOW, do NOT describe the situation as elevated or high
- If density level is LOW, avoid phrases like "significant" or "requires attention"

Task:
Write a 2-3 sentence summary for a patrol supervisor.

Rules:
- Be factual and calm
- Do NOT infer intent (no protest, no panic, no criminal motive)
- Compare current conditions to what is normally observed
- Avoid dramatic or alarmist language
- Focus on operational relevance only

IMPORTANT:
- Output ONLY the summary text
- Do NOT include explanations, bullet points, labels, headings, word counts, or self-evaluation
"#,
        zone = request.zone,
        count = request.person_count,
        level = request.density_level,
        deviation = deviation_label(request.z_score),
    )
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// OpenRouter-compatible chat-completions client
pub struct OpenRouterSummarizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenRouterSummarizer {
    pub fn new(config: &SummarizerConfig, api_key: String) -> Result<Self, SummaryError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Summarizer for OpenRouterSummarizer {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    #[instrument(skip_all, fields(zone = %request.zone, model = %self.model))]
    async fn summarize(&self, request: &SummaryRequest) -> Result<String, SummaryError> {
        let payload = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_prompt(request),
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SummaryError::Status { status, body });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| SummaryError::InvalidResponse("no choices returned".to_string()))
    }
}

/// Offline summarizer used when no API key is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateSummarizer;

#[async_trait]
impl Summarizer for TemplateSummarizer {
    fn name(&self) -> &'static str {
        "template"
    }

    async fn summarize(&self, request: &SummaryRequest) -> Result<String, SummaryError> {
        let mut text = format!(
            "{} people observed in {}. Crowd density is {}, {} compared with the usual level of about {:.0}.",
            request.person_count,
            request.zone,
            request.density_level.as_str().to_lowercase(),
            deviation_label(request.z_score),
            request
                .pattern
                .as_ref()
                .map(|p| p.avg_people)
                .unwrap_or(request.baseline_mean),
        );
        if let Some(pattern) = &request.pattern {
            text.push_str(&format!(" {}.", pattern));
        }
        Ok(text)
    }
}
