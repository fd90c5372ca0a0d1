pub mod classify;
pub mod fallback;
pub mod prompt;
pub mod text;

use crate::config::Settings;
use crate::domain::contract::RecordContext;
use crate::domain::expense::ExpenseRecord;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::json::{parse_expenses, preview};
use crate::llm::{CompletionRequest, LlmClient, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE};
use crate::time::local::local_date;
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;

/// Why the model path produced nothing usable. Every variant is recovered by the
/// fallback extractor.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionFailure {
    #[error("no model client configured")]
    ModelUnavailable,

    #[error("model call failed: {0:#}")]
    ModelCall(#[source] anyhow::Error),

    #[error("model output could not be parsed: {detail}")]
    Parse { detail: String, raw_output: String },
}

#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    pub default_currency: String,
    pub utc_offset: FixedOffset,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl ExtractorOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        let temperature = std::env::var("LLM_TEMPERATURE")
            .ok()
            .and_then(|s| s.parse::<f32>().ok())
            .filter(|t| (0.0..=2.0).contains(t))
            .unwrap_or(DEFAULT_TEMPERATURE);
        let max_output_tokens = std::env::var("LLM_MAX_OUTPUT_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS);

        Self {
            default_currency: settings.default_currency.clone(),
            utc_offset: settings.utc_offset,
            temperature,
            max_output_tokens,
        }
    }
}

/// Text -> expense records. Stateless between calls; safe to share across tasks.
#[derive(Clone)]
pub struct ExpenseExtractor {
    llm: Option<Arc<dyn LlmClient>>,
    options: ExtractorOptions,
}

impl ExpenseExtractor {
    pub fn new(llm: Option<Arc<dyn LlmClient>>, options: ExtractorOptions) -> Self {
        Self { llm, options }
    }

    pub fn offline(options: ExtractorOptions) -> Self {
        Self::new(None, options)
    }

    pub fn has_model(&self) -> bool {
        self.llm.is_some()
    }

    pub fn options(&self) -> &ExtractorOptions {
        &self.options
    }

    /// Extracts every expense in `message`, sent at `sent_at`.
    ///
    /// Always returns at least one record; failures on the model path divert to the
    /// offline extractor.
    pub async fn extract(&self, message: &str, sent_at: DateTime<Utc>) -> Vec<ExpenseRecord> {
        let ctx = RecordContext {
            message_date: local_date(sent_at, self.options.utc_offset),
            default_currency: &self.options.default_currency,
            raw_message: message,
            timestamp: Utc::now(),
        };

        match self.extract_with_model(&ctx).await {
            Ok(records) => {
                tracing::info!(count = records.len(), "extracted expenses via model");
                records
            }
            Err(failure) => {
                match &failure {
                    ExtractionFailure::ModelUnavailable => {
                        tracing::debug!("no model configured; using fallback extractor")
                    }
                    ExtractionFailure::Parse { raw_output, .. } => tracing::warn!(
                        error = %failure,
                        raw_output = %preview(raw_output),
                        "model output unusable; using fallback extractor"
                    ),
                    ExtractionFailure::ModelCall(err) => match provider_body(err) {
                        Some(body) => tracing::warn!(
                            error = %failure,
                            raw_output = %preview(body),
                            "model call failed; using fallback extractor"
                        ),
                        None => tracing::warn!(
                            error = %failure,
                            "model call failed; using fallback extractor"
                        ),
                    },
                }
                let records = fallback::extract(&ctx);
                tracing::info!(count = records.len(), "extracted expenses via fallback");
                records
            }
        }
    }

    /// The model path alone: prompt, call, normalize, parse, post-process.
    pub async fn extract_with_model(
        &self,
        ctx: &RecordContext<'_>,
    ) -> Result<Vec<ExpenseRecord>, ExtractionFailure> {
        let llm = self.llm.as_ref().ok_or(ExtractionFailure::ModelUnavailable)?;
        if ctx.raw_message.trim().is_empty() {
            return Err(ExtractionFailure::Parse {
                detail: "message is empty".to_string(),
                raw_output: String::new(),
            });
        }

        let request = CompletionRequest {
            prompt: prompt::build_prompt(
                ctx.message_date,
                ctx.raw_message,
                ctx.default_currency,
            ),
            temperature: self.options.temperature,
            max_output_tokens: self.options.max_output_tokens,
        };

        let text = llm
            .complete(request)
            .await
            .map_err(ExtractionFailure::ModelCall)?;
        tracing::debug!(
            provider = %llm.provider(),
            response = %preview(&text),
            "model response"
        );

        parse_expenses(&text, ctx).map_err(|err| ExtractionFailure::Parse {
            detail: format!("{err:#}"),
            raw_output: text,
        })
    }
}

/// Raw provider response carried by an `LlmDiagnosticsError` anywhere in the chain.
fn provider_body(err: &anyhow::Error) -> Option<&str> {
    err.chain()
        .find_map(|e| e.downcast_ref::<LlmDiagnosticsError>())
        .and_then(|diag| diag.raw_output.as_deref())
}
