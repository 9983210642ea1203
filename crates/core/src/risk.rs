//! Short-term volatility and long-term trend classification over daily closes.

use crate::domain::assessment::{LongTermOutlook, RiskAssessment, ShortTermRisk};
use crate::domain::market::{PricePeriod, PriceSeries};
use crate::error::{CoreError, CoreResult};
use crate::ingest::provider::PriceHistoryProvider;
use std::sync::Arc;

/// Daily return standard deviation above which short-term risk is `High`.
pub const HIGH_VOLATILITY_THRESHOLD: f64 = 0.02;

pub fn assess_risk(
    symbol: &str,
    one_year: &PriceSeries,
    one_month: &PriceSeries,
) -> CoreResult<RiskAssessment> {
    let short_term_volatility = short_term_volatility(&one_month.closes())?;
    let long_term_trend_slope = trend_slope(&one_year.closes())?;

    Ok(RiskAssessment {
        symbol: symbol.trim().to_ascii_uppercase(),
        short_term_volatility,
        short_term_risk: classify_short_term(short_term_volatility),
        long_term_trend_slope,
        long_term_outlook: classify_long_term(long_term_trend_slope),
    })
}

/// Population standard deviation of daily returns; `None` below two closes.
pub fn short_term_volatility(closes: &[f64]) -> CoreResult<Option<f64>> {
    if closes.len() < 2 {
        return Ok(None);
    }
    let returns = daily_returns(closes)?;
    Ok(Some(population_std_dev(&returns)))
}

pub fn daily_returns(closes: &[f64]) -> CoreResult<Vec<f64>> {
    ensure_finite(closes)?;
    closes
        .windows(2)
        .map(|w| {
            let (prev, cur) = (w[0], w[1]);
            if prev == 0.0 {
                return Err(CoreError::NoData(
                    "cannot compute a daily return from a zero close".to_string(),
                ));
            }
            Ok((cur - prev) / prev)
        })
        .collect()
}

fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// OLS slope of close against day index 0..n, in price units per day.
pub fn trend_slope(closes: &[f64]) -> CoreResult<f64> {
    if closes.len() < 2 {
        return Ok(0.0);
    }
    ensure_finite(closes)?;

    let n = closes.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = closes.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &y) in closes.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }
    Ok(sxy / sxx)
}

pub fn classify_short_term(volatility: Option<f64>) -> ShortTermRisk {
    match volatility {
        Some(v) if v > HIGH_VOLATILITY_THRESHOLD => ShortTermRisk::High,
        _ => ShortTermRisk::Moderate,
    }
}

/// A flat trend counts as `Bearish`.
pub fn classify_long_term(slope: f64) -> LongTermOutlook {
    if slope > 0.0 {
        LongTermOutlook::Bullish
    } else {
        LongTermOutlook::Bearish
    }
}

fn ensure_finite(closes: &[f64]) -> CoreResult<()> {
    if closes.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(CoreError::NoData(
            "price series contains a non-finite close".to_string(),
        ))
    }
}

/// Fetches the two price windows for a symbol and runs [`assess_risk`].
#[derive(Clone)]
pub struct RiskEstimator {
    prices: Arc<dyn PriceHistoryProvider>,
}

impl RiskEstimator {
    pub fn new(prices: Arc<dyn PriceHistoryProvider>) -> Self {
        Self { prices }
    }

    pub async fn assess(&self, symbol: &str) -> CoreResult<RiskAssessment> {
        let one_year = self
            .prices
            .fetch_history(symbol, PricePeriod::OneYear)
            .await
            .map_err(CoreError::upstream)?;
        if one_year.is_empty() {
            return Err(CoreError::NoData(
                "No historical data found for symbol.".to_string(),
            ));
        }

        let one_month = self
            .prices
            .fetch_history(symbol, PricePeriod::OneMonth)
            .await
            .map_err(CoreError::upstream)?;

        let assessment = assess_risk(symbol, &one_year, &one_month)?;
        tracing::info!(
            symbol = %assessment.symbol,
            provider = self.prices.provider_name(),
            year_points = one_year.len(),
            month_points = one_month.len(),
            volatility = ?assessment.short_term_volatility,
            slope = assessment.long_term_trend_slope,
            "risk assessed"
        );
        Ok(assessment)
    }
}
