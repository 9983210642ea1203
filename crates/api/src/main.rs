use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pocket_trader_core::config::Settings;
use pocket_trader_core::domain::assessment::RiskAssessment;
use pocket_trader_core::domain::market::{PricePeriod, SearchSuggestion, StockOverview};
use pocket_trader_core::domain::transcript::{Transcript, TranscriptSummary};
use pocket_trader_core::error::CoreError;
use pocket_trader_core::ingest::provider::{CompanyDirectory, PriceHistoryProvider, TranscriptSource};
use pocket_trader_core::ingest::transcripts::TranscriptApiClient;
use pocket_trader_core::ingest::yahoo::YahooClient;
use pocket_trader_core::llm::TextGenerator;
use pocket_trader_core::risk::RiskEstimator;
use pocket_trader_core::summarize::{self, SummaryOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let yahoo = Arc::new(YahooClient::from_settings(&settings)?);
    let transcripts = Arc::new(TranscriptApiClient::from_settings(&settings)?);

    let generator = match pocket_trader_core::llm::from_settings(&settings) {
        Ok(Some(g)) => Some(g),
        Ok(None) => {
            tracing::warn!("no LLM API key configured; transcript summaries are disabled");
            None
        }
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "LLM client setup failed; transcript summaries are disabled");
            None
        }
    };

    let state = AppState {
        prices: yahoo.clone(),
        directory: yahoo.clone(),
        risk: RiskEstimator::new(yahoo),
        transcripts,
        generator,
        summary_options: SummaryOptions::from_env(),
    };

    let app = router(state).layer(cors_layer(&settings.cors_allowed_origins));

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
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
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/search", get(search_stocks))
        .route("/stock/:symbol", get(get_stock_overview))
        .route("/risk/:symbol", get(get_stock_risk))
        .route("/transcripts/:symbol", get(get_latest_transcript))
        .route("/transcripts/:symbol/summary", get(get_transcript_summary))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    // Wildcards are not allowed together with credentials, so mirror instead.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

#[derive(Clone)]
struct AppState {
    prices: Arc<dyn PriceHistoryProvider>,
    directory: Arc<dyn CompanyDirectory>,
    risk: RiskEstimator,
    transcripts: Arc<dyn TranscriptSource>,
    generator: Option<Arc<dyn TextGenerator>>,
    summary_options: SummaryOptions,
}

#[derive(Debug)]
struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            CoreError::UpstreamUnavailable(_) | CoreError::GenerationFailure(_) => {
                StatusCode::BAD_GATEWAY
            }
            CoreError::NoData(_) | CoreError::NoContent(_) => StatusCode::NOT_FOUND,
            CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CoreError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            sentry::capture_error(&self.0);
            tracing::error!(kind = self.0.kind(), error = %self.0, "request failed");
        } else {
            tracing::info!(kind = self.0.kind(), error = %self.0, "request rejected");
        }

        let body = ErrorBody {
            error: self.0.to_string(),
            kind: self.0.kind(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize)]
struct RootMessage {
    message: &'static str,
}

async fn root() -> Json<RootMessage> {
    Json(RootMessage {
        message: "Pocket Trader backend running",
    })
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: Option<String>,
}

async fn search_stocks(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<SearchSuggestion>> {
    let query = params.q.unwrap_or_default();
    let query = query.trim();
    if query.is_empty() {
        return Err(CoreError::InvalidInput("query parameter q must not be empty".to_string()).into());
    }

    let suggestions = state
        .directory
        .search(query)
        .await
        .map_err(|e| CoreError::UpstreamUnavailable(format!("{e:#}")))?;
    Ok(Json(suggestions))
}

async fn get_stock_overview(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<StockOverview> {
    let symbol = validate_symbol(&symbol)?;

    let profile = state
        .directory
        .fetch_profile(symbol)
        .await
        .map_err(|e| CoreError::UpstreamUnavailable(format!("{e:#}")))?;
    let history = state
        .prices
        .fetch_history(symbol, PricePeriod::OneYear)
        .await
        .map_err(|e| CoreError::UpstreamUnavailable(format!("{e:#}")))?;

    Ok(Json(StockOverview::build(symbol, profile, &history)))
}

async fn get_stock_risk(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<RiskAssessment> {
    let symbol = validate_symbol(&symbol)?;
    Ok(Json(state.risk.assess(symbol).await?))
}

async fn get_latest_transcript(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<Transcript> {
    let symbol = validate_symbol(&symbol)?;
    let transcript = summarize::fetch_latest_transcript(symbol, state.transcripts.as_ref()).await?;
    Ok(Json(transcript))
}

async fn get_transcript_summary(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<TranscriptSummary> {
    let symbol = validate_symbol(&symbol)?;
    let Some(generator) = state.generator.as_deref() else {
        return Err(CoreError::NotConfigured(
            "transcript summaries are unavailable: no LLM provider configured".to_string(),
        )
        .into());
    };

    let summary = summarize::summarize_transcript(
        symbol,
        state.transcripts.as_ref(),
        generator,
        state.summary_options,
    )
    .await?;
    Ok(Json(summary))
}

fn validate_symbol(symbol: &str) -> Result<&str, CoreError> {
    let s = symbol.trim();
    let valid = !s.is_empty()
        && s.len() <= 16
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
    if valid {
        Ok(s)
    } else {
        Err(CoreError::InvalidInput(format!("invalid symbol: {symbol}")))
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
