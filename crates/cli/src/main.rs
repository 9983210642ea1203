use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pocket_trader_core::config::Settings;
use pocket_trader_core::domain::market::{PricePeriod, StockOverview};
use pocket_trader_core::error::CoreError;
use pocket_trader_core::ingest::provider::{CompanyDirectory, PriceHistoryProvider};
use pocket_trader_core::ingest::transcripts::TranscriptApiClient;
use pocket_trader_core::ingest::yahoo::YahooClient;
use pocket_trader_core::risk::RiskEstimator;
use pocket_trader_core::summarize::{self, SummaryOptions};

#[derive(Debug, Parser)]
#[command(name = "pocket_trader", about = "Risk scores and earnings-call summaries for one ticker")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Short-term volatility and long-term trend classification.
    Risk { symbol: String },

    /// Company snapshot with one year of closes.
    Stock { symbol: String },

    /// Ticker suggestions for a free-text query.
    Search { query: String },

    /// Most recent earnings-call transcript.
    Transcript { symbol: String },

    /// LLM summary of the most recent earnings call.
    Summary {
        symbol: String,

        /// Print one key point per line instead of JSON.
        #[arg(long)]
        points: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    match run(&settings, args.command).await {
        Ok(Outcome::Json(v)) => {
            println!("{}", serde_json::to_string_pretty(&v)?);
            Ok(ExitCode::SUCCESS)
        }
        Ok(Outcome::Lines(lines)) => {
            for line in lines {
                println!("- {line}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            if matches!(
                err,
                CoreError::UpstreamUnavailable(_) | CoreError::GenerationFailure(_)
            ) {
                sentry::capture_error(&err);
            }
            tracing::error!(kind = err.kind(), error = %err, "command failed");
            let body = serde_json::json!({"error": err.to_string(), "kind": err.kind()});
            eprintln!("{body}");
            Ok(ExitCode::FAILURE)
        }
    }
}

enum Outcome {
    Json(serde_json::Value),
    Lines(Vec<String>),
}

async fn run(settings: &Settings, command: Command) -> Result<Outcome, CoreError> {
    let yahoo = Arc::new(
        YahooClient::from_settings(settings).map_err(|e| CoreError::NotConfigured(format!("{e:#}")))?,
    );

    match command {
        Command::Risk { symbol } => {
            let assessment = RiskEstimator::new(yahoo).assess(&symbol).await?;
            to_json(&assessment)
        }
        Command::Stock { symbol } => {
            let profile = yahoo.fetch_profile(&symbol).await.map_err(upstream)?;
            let history = yahoo
                .fetch_history(&symbol, PricePeriod::OneYear)
                .await
                .map_err(upstream)?;
            to_json(&StockOverview::build(&symbol, profile, &history))
        }
        Command::Search { query } => {
            let suggestions = yahoo.search(query.trim()).await.map_err(upstream)?;
            to_json(&suggestions)
        }
        Command::Transcript { symbol } => {
            let source = transcript_client(settings)?;
            let transcript = summarize::fetch_latest_transcript(&symbol, &source).await?;
            to_json(&transcript)
        }
        Command::Summary { symbol, points } => {
            let source = transcript_client(settings)?;
            let generator = pocket_trader_core::llm::from_settings(settings)
                .map_err(|e| CoreError::NotConfigured(format!("{e:#}")))?
                .ok_or_else(|| {
                    CoreError::NotConfigured(
                        "set OPENAI_API_KEY or ANTHROPIC_API_KEY to enable summaries".to_string(),
                    )
                })?;

            let summary = summarize::summarize_transcript(
                &symbol,
                &source,
                generator.as_ref(),
                SummaryOptions::from_env(),
            )
            .await?;

            if points {
                Ok(Outcome::Lines(
                    summary.key_points().into_iter().map(str::to_string).collect(),
                ))
            } else {
                to_json(&summary)
            }
        }
    }
}

fn transcript_client(settings: &Settings) -> Result<TranscriptApiClient, CoreError> {
    TranscriptApiClient::from_settings(settings)
        .map_err(|e| CoreError::NotConfigured(format!("{e:#}")))
}

fn upstream(err: anyhow::Error) -> CoreError {
    CoreError::UpstreamUnavailable(format!("{err:#}"))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Outcome, CoreError> {
    serde_json::to_value(value)
        .map(Outcome::Json)
        .map_err(|e| CoreError::InvalidInput(format!("failed to serialize output: {e}")))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_summary_with_points_flag() {
        let args = Args::try_parse_from(["pocket_trader", "summary", "AAPL", "--points"]).unwrap();
        match args.command {
            Command::Summary { symbol, points } => {
                assert_eq!(symbol, "AAPL");
                assert!(points);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_search_query() {
        let args = Args::try_parse_from(["pocket_trader", "search", "apple"]).unwrap();
        assert!(matches!(args.command, Command::Search { query } if query == "apple"));
    }

    #[test]
    fn symbol_is_required() {
        assert!(Args::try_parse_from(["pocket_trader", "risk"]).is_err());
    }
}
