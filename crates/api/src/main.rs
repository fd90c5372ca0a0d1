use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kharcha_core::domain::expense::ExpenseRecord;
use kharcha_core::extract::{ExpenseExtractor, ExtractorOptions};
use kharcha_core::storage::postgres::PgLedger;
use kharcha_core::storage::Ledger;
use kharcha_core::time::local::local_date;

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

    let ledger: Option<Arc<dyn Ledger>> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match kharcha_core::storage::migrate(&pool).await {
                Ok(()) => Some(Arc::new(PgLedger::new(pool))),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            None
        }
    };

    let llm = match kharcha_core::llm::client_from_settings(&settings) {
        Ok(llm) => llm,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "model client unavailable; extracting offline");
            None
        }
    };
    let extractor = ExpenseExtractor::new(llm, ExtractorOptions::from_settings(&settings));

    let app = router(AppState { ledger, extractor });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/summary/today", get(get_today_summary))
        .route("/summary/:date", get(get_summary_by_date))
        .route("/extract", post(extract))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    ledger: Option<Arc<dyn Ledger>>,
    extractor: ExpenseExtractor,
}

#[derive(Debug, Serialize)]
struct DaySummary {
    date: NaiveDate,
    currency: String,
    total: f64,
    transactions: i64,
}

#[derive(Debug, Deserialize)]
struct ExtractRequest {
    message: String,
    /// Defaults to the time the request arrives.
    #[serde(default)]
    sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct ExtractResponse {
    records: Vec<ExpenseRecord>,
}

async fn get_today_summary(State(state): State<AppState>) -> Result<Json<DaySummary>, StatusCode> {
    let today = local_date(Utc::now(), state.extractor.options().utc_offset);
    summarize(&state, today).await
}

async fn get_summary_by_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DaySummary>, StatusCode> {
    if state.ledger.is_none() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| StatusCode::BAD_REQUEST)?;
    summarize(&state, date).await
}

async fn summarize(state: &AppState, date: NaiveDate) -> Result<Json<DaySummary>, StatusCode> {
    let Some(ledger) = &state.ledger else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let (total, transactions) = async {
        let total = ledger.total_for(date).await?;
        let count = ledger.count_for(date).await?;
        anyhow::Ok((total, count))
    }
    .await
    .map_err(|e| {
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(error = %e, %date, "summary query failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(DaySummary {
        date,
        currency: state.extractor.options().default_currency.clone(),
        total,
        transactions,
    }))
}

/// Runs the extraction pipeline without persisting anything.
async fn extract(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Json<ExtractResponse> {
    let sent_at = req.sent_at.unwrap_or_else(Utc::now);
    let records = state.extractor.extract(&req.message, sent_at).await;
    Json(ExtractResponse { records })
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
