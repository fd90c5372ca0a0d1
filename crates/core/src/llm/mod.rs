pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod json;

use crate::config::Settings;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2000;

/// A single text-in/text-out call to the model service.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Anthropic,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<String>;
}

/// Builds the configured model client.
///
/// Returns `Ok(None)` when the selected provider has no API key; the bot then runs with
/// the offline extractor only.
pub fn client_from_settings(settings: &Settings) -> anyhow::Result<Option<Arc<dyn LlmClient>>> {
    let provider = settings
        .llm_provider
        .as_deref()
        .map(|s| s.trim().to_ascii_lowercase())
        .unwrap_or_else(|| Provider::Gemini.as_str().to_string());

    match provider.as_str() {
        "gemini" | "google" => {
            if settings.gemini_api_key.is_none() {
                tracing::warn!("GEMINI_API_KEY missing; model extraction disabled");
                return Ok(None);
            }
            let client: Arc<dyn LlmClient> = Arc::new(gemini::GeminiClient::from_settings(settings)?);
            Ok(Some(client))
        }
        "anthropic" | "claude" => {
            if settings.anthropic_api_key.is_none() {
                tracing::warn!("ANTHROPIC_API_KEY missing; model extraction disabled");
                return Ok(None);
            }
            let client: Arc<dyn LlmClient> =
                Arc::new(anthropic::AnthropicClient::from_settings(settings)?);
            Ok(Some(client))
        }
        "none" | "offline" => Ok(None),
        other => anyhow::bail!("unsupported LLM_PROVIDER: {other}"),
    }
}
