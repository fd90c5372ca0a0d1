pub mod conversation;
pub mod domain;
pub mod extract;
pub mod llm;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;
    use chrono::FixedOffset;

    const DEFAULT_CURRENCY: &str = "INR";
    // Sender zone of the original deployment (Asia/Kolkata).
    const DEFAULT_UTC_OFFSET: &str = "+05:30";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub telegram_bot_token: Option<String>,
        pub llm_provider: Option<String>,
        pub gemini_api_key: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub default_currency: String,
        pub utc_offset: FixedOffset,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let default_currency = std::env::var("DEFAULT_CURRENCY")
                .ok()
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

            let offset_raw = std::env::var("EXPENSE_UTC_OFFSET")
                .unwrap_or_else(|_| DEFAULT_UTC_OFFSET.to_string());
            let utc_offset = crate::time::local::parse_utc_offset(&offset_raw)
                .with_context(|| format!("invalid EXPENSE_UTC_OFFSET: {offset_raw}"))?;

            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
                llm_provider: std::env::var("LLM_PROVIDER").ok(),
                gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
                anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                default_currency,
                utc_offset,
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_telegram_bot_token(&self) -> anyhow::Result<&str> {
            self.telegram_bot_token
                .as_deref()
                .context("TELEGRAM_BOT_TOKEN is required")
        }

        pub fn require_gemini_api_key(&self) -> anyhow::Result<&str> {
            self.gemini_api_key
                .as_deref()
                .context("GEMINI_API_KEY is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }
    }

    #[cfg(test)]
    impl Settings {
        pub(crate) fn for_tests() -> Self {
            Self {
                database_url: None,
                telegram_bot_token: None,
                llm_provider: None,
                gemini_api_key: None,
                anthropic_api_key: None,
                sentry_dsn: None,
                default_currency: DEFAULT_CURRENCY.to_string(),
                utc_offset: FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap(),
            }
        }
    }
}
