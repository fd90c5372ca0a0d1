use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use kharcha_core::conversation::{parse_incoming, ConversationHandler, Incoming};
use kharcha_core::extract::{ExpenseExtractor, ExtractorOptions};
use kharcha_core::storage::memory::MemoryLedger;
use kharcha_core::storage::postgres::PgLedger;
use kharcha_core::storage::Ledger;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod telegram;

use telegram::{TelegramClient, Update};

const POLL_TIMEOUT_SECS: u64 = 30;
const MAX_BACKOFF_SECS: u64 = 60;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(20);
const PROCESSING: &str = "⏳ Processing...";

#[derive(Debug, Parser)]
#[command(name = "kharcha_bot")]
struct Args {
    /// Keep expenses in memory instead of writing to the database.
    #[arg(long)]
    dry_run: bool,

    /// Skip the model service; every message goes through the rule-based extractor.
    #[arg(long)]
    offline: bool,

    /// Extract a single message, print the records as JSON and exit.
    #[arg(long, value_name = "TEXT")]
    parse: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = kharcha_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let llm = if args.offline {
        None
    } else {
        kharcha_core::llm::client_from_settings(&settings)?
    };
    let extractor = ExpenseExtractor::new(llm, ExtractorOptions::from_settings(&settings));
    tracing::info!(
        model = extractor.has_model(),
        currency = %extractor.options().default_currency,
        utc_offset = %extractor.options().utc_offset,
        "extractor ready"
    );

    if let Some(text) = args.parse.as_deref() {
        let records = extractor.extract(text, Utc::now()).await;
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let ledger: Arc<dyn Ledger> = if args.dry_run {
        tracing::info!(dry_run = true, "using in-memory ledger");
        Arc::new(MemoryLedger::new())
    } else {
        let db_url = settings.require_database_url()?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
            .context("connect DATABASE_URL failed")?;
        kharcha_core::storage::migrate(&pool).await?;
        Arc::new(PgLedger::new(pool))
    };

    let token = settings.require_telegram_bot_token()?;
    let telegram = TelegramClient::new(token, POLL_TIMEOUT_SECS)?;
    let handler = ConversationHandler::new(extractor, ledger);

    tracing::info!(ledger = if args.dry_run { "memory" } else { "postgres" }, "bot polling");
    poll(telegram, handler).await;
    tracing::info!("bot stopped");
    Ok(())
}

async fn poll(telegram: TelegramClient, handler: ConversationHandler) {
    let mut offset: Option<i64> = None;
    let mut failures: u32 = 0;
    let mut in_flight = JoinSet::new();

    loop {
        while in_flight.try_join_next().is_some() {}

        let batch = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            batch = telegram.get_updates(offset, POLL_TIMEOUT_SECS) => batch,
        };

        let updates = match batch {
            Ok(updates) => {
                failures = 0;
                updates
            }
            Err(err) => {
                failures += 1;
                let backoff = backoff_for(failures);
                tracing::warn!(attempt = failures, ?backoff, error = %format!("{err:#}"), "getUpdates failed; retrying");
                if !sleep_unless(backoff, tokio::signal::ctrl_c()).await {
                    break;
                }
                continue;
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);

            let telegram = telegram.clone();
            let handler = handler.clone();
            in_flight.spawn(async move {
                let update_id = update.update_id;
                if let Err(err) = handle_update(&telegram, &handler, update).await {
                    sentry_anyhow::capture_anyhow(&err);
                    tracing::error!(update_id, error = %format!("{err:#}"), "update handling failed");
                }
            });
        }
    }

    tracing::info!(pending = in_flight.len(), "shutting down; waiting for in-flight updates");
    let unfinished = drain(in_flight, SHUTDOWN_GRACE).await;
    if unfinished > 0 {
        tracing::warn!(unfinished, "in-flight updates aborted at shutdown");
    }
}

/// Sleeps for `backoff` unless `shutdown` resolves first. Returns false on shutdown.
async fn sleep_unless<F: Future>(backoff: Duration, shutdown: F) -> bool {
    tokio::select! {
        _ = shutdown => false,
        _ = tokio::time::sleep(backoff) => true,
    }
}

/// Waits up to `grace` for spawned tasks, then aborts the rest. Returns how many were aborted.
async fn drain(mut tasks: JoinSet<()>, grace: Duration) -> usize {
    let finished = tokio::time::timeout(grace, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;

    if finished.is_ok() {
        return 0;
    }
    let unfinished = tasks.len();
    tasks.shutdown().await;
    unfinished
}

async fn handle_update(
    telegram: &TelegramClient,
    handler: &ConversationHandler,
    update: Update,
) -> anyhow::Result<()> {
    let Some(message) = update.message else {
        return Ok(());
    };
    let Some(text) = message.text.as_deref() else {
        return Ok(());
    };
    let chat_id = message.chat.id;
    let sent_at = DateTime::<Utc>::from_timestamp(message.date, 0).unwrap_or_else(Utc::now);

    tracing::info!(chat_id, message_id = message.message_id, "message received");

    // Commands answer immediately; expense messages get a placeholder that is edited later.
    if !matches!(parse_incoming(text), Incoming::Expense(_)) {
        let reply = handler.handle_text(text, sent_at).await;
        telegram.send_message(chat_id, &reply).await?;
        return Ok(());
    }

    let placeholder = telegram.send_message(chat_id, PROCESSING).await?;
    let reply = handler.handle_text(text, sent_at).await;
    telegram
        .edit_message_text(chat_id, placeholder.message_id, &reply)
        .await
        .context("failed to replace processing placeholder")
}

fn backoff_for(failures: u32) -> Duration {
    let secs = 1u64 << failures.saturating_sub(1).min(6);
    Duration::from_secs(secs.min(MAX_BACKOFF_SECS))
}

fn init_sentry(settings: &kharcha_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
