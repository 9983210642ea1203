use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShortTermRisk {
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LongTermOutlook {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub symbol: String,
    pub short_term_volatility: Option<f64>,
    pub short_term_risk: ShortTermRisk,
    pub long_term_trend_slope: f64,
    pub long_term_outlook: LongTermOutlook,
}
