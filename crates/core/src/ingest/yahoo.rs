use crate::config::Settings;
use crate::domain::market::{
    CompanyProfile, PricePeriod, PricePoint, PriceSeries, SearchSuggestion,
};
use crate::ingest::provider::{CompanyDirectory, PriceHistoryProvider};
use crate::ingest::types::{
    ChartEnvelope, ChartResult, QuoteSummaryEnvelope, SearchResponse,
};
use crate::ingest::{build_http_client, join_url};
use anyhow::{Context, Result};
use chrono::DateTime;
use serde::de::DeserializeOwned;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
const SEARCH_QUOTES_COUNT: u32 = 6;

#[derive(Debug, Clone)]
pub struct YahooClient {
    http: reqwest::Client,
    base_url: String,
}

impl YahooClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .yahoo_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let http = build_http_client(settings.upstream_timeout_secs)?;
        Ok(Self { http, base_url })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &'static str,
    ) -> Result<T> {
        let url = join_url(&self.base_url, path);
        let res = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Yahoo Finance {what} request failed"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .with_context(|| format!("failed to read Yahoo Finance {what} response"))?;
        if !status.is_success() {
            tracing::debug!(%status, what, body = %text, "Yahoo Finance error response");
            anyhow::bail!(status_error_message(status, what, &text));
        }

        serde_json::from_str::<T>(&text)
            .with_context(|| format!("failed to parse Yahoo Finance {what} response"))
    }

    async fn fetch_chart(&self, symbol: &str, period: PricePeriod) -> Result<ChartResult> {
        let path = format!("/v8/finance/chart/{}", symbol.trim());
        let query = [
            ("range", period.as_token().to_string()),
            ("interval", "1d".to_string()),
            ("includePrePost", "false".to_string()),
        ];
        let envelope: ChartEnvelope = self.get_json(&path, &query, "chart").await?;
        first_chart_result(envelope, symbol)
    }

    async fn fetch_quote_summary(&self, symbol: &str) -> Result<CompanyProfile> {
        let path = format!("/v10/finance/quoteSummary/{}", symbol.trim());
        let query = [("modules", "assetProfile,price".to_string())];
        let envelope: QuoteSummaryEnvelope =
            self.get_json(&path, &query, "quoteSummary").await?;
        profile_from_quote_summary(envelope)
    }
}

#[async_trait::async_trait]
impl PriceHistoryProvider for YahooClient {
    fn provider_name(&self) -> &'static str {
        "yahoo_finance"
    }

    async fn fetch_history(&self, symbol: &str, period: PricePeriod) -> Result<PriceSeries> {
        let chart = self.fetch_chart(symbol, period).await?;
        let series = series_from_chart(&chart);
        tracing::debug!(
            symbol,
            period = period.as_token(),
            points = series.len(),
            "fetched price history"
        );
        Ok(series)
    }
}

#[async_trait::async_trait]
impl CompanyDirectory for YahooClient {
    async fn fetch_profile(&self, symbol: &str) -> Result<CompanyProfile> {
        match self.fetch_quote_summary(symbol).await {
            Ok(profile) => Ok(profile),
            Err(err) => {
                // quoteSummary is frequently gated; the chart meta still carries a name.
                tracing::warn!(symbol, error = %err, "quoteSummary unavailable; falling back to chart metadata");
                let chart = self.fetch_chart(symbol, PricePeriod::OneMonth).await?;
                Ok(CompanyProfile {
                    long_name: chart.meta.long_name.or(chart.meta.short_name),
                    ..Default::default()
                })
            }
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchSuggestion>> {
        let params = [
            ("q", query.to_string()),
            ("quotesCount", SEARCH_QUOTES_COUNT.to_string()),
            ("newsCount", "0".to_string()),
            ("enableFuzzyQuery", "false".to_string()),
            ("quotesQueryId", "tss_match_phrase_query".to_string()),
        ];
        let res: SearchResponse = self.get_json("/v1/finance/search", &params, "search").await?;
        suggestions_from_search(res)
    }
}

fn first_chart_result(envelope: ChartEnvelope, symbol: &str) -> Result<ChartResult> {
    if let Some(err) = envelope.chart.error {
        anyhow::bail!("Yahoo Finance chart error for {symbol}: {err}");
    }
    envelope
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .with_context(|| format!("Yahoo Finance returned no chart for {symbol}"))
}

/// Pairs timestamps with closes, dropping bars whose close is missing.
fn series_from_chart(chart: &ChartResult) -> PriceSeries {
    let closes = chart
        .indicators
        .quote
        .first()
        .map(|q| q.close.as_slice())
        .unwrap_or_default();

    let points = chart
        .timestamp
        .iter()
        .zip(closes)
        .filter_map(|(&ts, close)| {
            let close = (*close)?;
            let date = DateTime::from_timestamp(ts, 0)?.date_naive();
            Some(PricePoint { date, close })
        })
        .collect();

    PriceSeries::new(points)
}

/// Error bodies can be whole HTML pages. Only a Yahoo error description
/// (`{"<module>": {"error": {"description": ...}}}`) is passed on.
fn status_error_message(status: reqwest::StatusCode, what: &str, body: &str) -> String {
    let description = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.as_object()?.values().find_map(|module| {
                module
                    .pointer("/error/description")
                    .and_then(|d| d.as_str())
                    .map(str::to_string)
            })
        });
    match description {
        Some(d) => format!("Yahoo Finance API error: {status} ({what}): {d}"),
        None => format!("Yahoo Finance API error: {status} ({what})"),
    }
}

fn profile_from_quote_summary(envelope: QuoteSummaryEnvelope) -> Result<CompanyProfile> {
    if let Some(err) = envelope.quote_summary.error {
        anyhow::bail!("Yahoo Finance quoteSummary error: {err}");
    }
    let result = envelope
        .quote_summary
        .result
        .and_then(|r| r.into_iter().next())
        .context("Yahoo Finance quoteSummary returned no result")?;

    let asset = result.asset_profile.unwrap_or_default();
    let price = result.price.unwrap_or_default();
    Ok(CompanyProfile {
        long_name: price.long_name.or(price.short_name),
        sector: asset.sector,
        market_cap: price.market_cap.and_then(|m| m.raw),
        business_summary: asset.long_business_summary,
    })
}

fn suggestions_from_search(res: SearchResponse) -> Result<Vec<SearchSuggestion>> {
    let quotes = res.quotes.context("No quotes found in response")?;
    Ok(quotes
        .into_iter()
        .filter_map(|q| {
            let symbol = q.symbol?;
            let name = q.shortname.or(q.longname)?;
            Some(SearchSuggestion { symbol, name })
        })
        .collect())
}
