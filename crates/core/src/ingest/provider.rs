use crate::domain::market::{CompanyProfile, PricePeriod, PriceSeries, SearchSuggestion};
use crate::domain::transcript::Transcript;
use anyhow::Result;

#[async_trait::async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Daily closes for `symbol` over `period`, oldest first. Unknown symbols are an error.
    async fn fetch_history(&self, symbol: &str, period: PricePeriod) -> Result<PriceSeries>;
}

#[async_trait::async_trait]
pub trait CompanyDirectory: Send + Sync {
    async fn fetch_profile(&self, symbol: &str) -> Result<CompanyProfile>;

    async fn search(&self, query: &str) -> Result<Vec<SearchSuggestion>>;
}

/// Earnings-call transcripts for a symbol.
///
/// Implementations must return the list most-recent-first; callers take the
/// first element as the latest call without re-sorting.
#[async_trait::async_trait]
pub trait TranscriptSource: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn list_transcripts(&self, symbol: &str) -> Result<Vec<Transcript>>;
}
