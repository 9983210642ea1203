use crate::config::Settings;
use crate::domain::transcript::Transcript;
use crate::ingest::provider::TranscriptSource;
use crate::ingest::types::TranscriptRecord;
use crate::ingest::{build_http_client, join_url};
use anyhow::{Context, Result};

const DEFAULT_BASE_URL: &str = "https://discountingcashflows.com";
const LIST_PATH: &str = "/api/transcript/";

/// Client for the public transcript-list API. The endpoint returns every
/// available call for a ticker, newest first.
#[derive(Debug, Clone)]
pub struct TranscriptApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl TranscriptApiClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .transcript_api_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let http = build_http_client(settings.upstream_timeout_secs)?;
        Ok(Self { http, base_url })
    }
}

#[async_trait::async_trait]
impl TranscriptSource for TranscriptApiClient {
    fn provider_name(&self) -> &'static str {
        "discountingcashflows"
    }

    async fn list_transcripts(&self, symbol: &str) -> Result<Vec<Transcript>> {
        let url = join_url(&self.base_url, LIST_PATH);
        let res = self
            .http
            .get(url)
            .query(&[("ticker", symbol.trim())])
            .send()
            .await
            .context("transcript list request failed")?;

        let status = res.status();
        if !status.is_success() {
            anyhow::bail!(
                "Failed to fetch transcripts list (status {}).",
                status.as_u16()
            );
        }

        let text = res
            .text()
            .await
            .context("failed to read transcript list response")?;
        parse_transcript_list(symbol, &text)
    }
}

/// Only the newest record has to be well formed; older entries that don't
/// match the expected shape are skipped.
fn parse_transcript_list(symbol: &str, text: &str) -> Result<Vec<Transcript>> {
    let entries = serde_json::from_str::<Vec<serde_json::Value>>(text)
        .context("failed to parse transcript list response")?;

    let symbol = symbol.trim().to_ascii_uppercase();
    let mut transcripts = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.into_iter().enumerate() {
        let record = match serde_json::from_value::<TranscriptRecord>(entry) {
            Ok(r) => r,
            Err(e) if idx == 0 => {
                return Err(e).context("failed to parse latest transcript record");
            }
            Err(e) => {
                tracing::warn!(%symbol, index = idx, error = %e, "skipping malformed transcript record");
                continue;
            }
        };
        transcripts.push(Transcript {
            symbol: symbol.clone(),
            year: record.year,
            quarter: record.quarter,
            content: record.content.unwrap_or_default(),
        });
    }
    Ok(transcripts)
}
