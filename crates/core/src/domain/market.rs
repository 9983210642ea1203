use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily closes in chronological order, one point per trading day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        // Providers hand back chronological data; keep it that way if one doesn't.
        points.sort_by_key(|p| p.date);
        Self { points }
    }

    pub fn from_closes(start: NaiveDate, closes: &[f64]) -> Self {
        let points = closes
            .iter()
            .zip(start.iter_days())
            .map(|(&close, date)| PricePoint { date, close })
            .collect();
        Self { points }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }
}

/// Period tokens understood by the price-data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricePeriod {
    OneYear,
    OneMonth,
}

impl PricePeriod {
    pub fn as_token(self) -> &'static str {
        match self {
            PricePeriod::OneYear => "1y",
            PricePeriod::OneMonth => "1mo",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub long_name: Option<String>,
    pub sector: Option<String>,
    pub market_cap: Option<f64>,
    pub business_summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSuggestion {
    pub symbol: String,
    pub name: String,
}

const NO_BUSINESS_SUMMARY: &str = "No summary available.";

/// Company snapshot plus one year of closes, as served by `/stock/{symbol}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockOverview {
    pub symbol: String,
    pub company_name: String,
    pub sector: Option<String>,
    pub market_cap: Option<f64>,
    pub last_close_price: Option<f64>,
    pub business_summary: String,
    pub historical_data: Vec<HistoricalRow>,
}

/// Chart row; the keys match what the front end plots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRow {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Close")]
    pub close: f64,
}

impl StockOverview {
    pub fn build(symbol: &str, profile: CompanyProfile, history: &PriceSeries) -> Self {
        let symbol = symbol.trim().to_ascii_uppercase();
        Self {
            company_name: profile.long_name.unwrap_or_else(|| symbol.clone()),
            sector: profile.sector,
            market_cap: profile.market_cap,
            last_close_price: history.last().map(|p| p.close),
            business_summary: profile
                .business_summary
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| NO_BUSINESS_SUMMARY.to_string()),
            historical_data: history
                .points()
                .iter()
                .map(|p| HistoricalRow {
                    date: p.date,
                    close: p.close,
                })
                .collect(),
            symbol,
        }
    }
}
