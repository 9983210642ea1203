use thiserror::Error;

/// Failure modes surfaced by the risk and transcript operations.
///
/// Every variant is returned to the caller as a value; the router renders it
/// as `{"error": ..., "kind": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Provider unreachable, non-success status, or an empty result list.
    #[error("{0}")]
    UpstreamUnavailable(String),

    /// Empty or unusable price series for the requested computation.
    #[error("{0}")]
    NoData(String),

    /// Transcript missing or a sentinel placeholder.
    #[error("{0}")]
    NoContent(String),

    /// The text-generation call failed or returned nothing.
    #[error("{0}")]
    GenerationFailure(String),

    #[error("{0}")]
    InvalidInput(String),

    /// A collaborator required by the operation is not configured.
    #[error("{0}")]
    NotConfigured(String),
}

impl CoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::UpstreamUnavailable(_) => "upstream_unavailable",
            CoreError::NoData(_) => "no_data",
            CoreError::NoContent(_) => "no_content",
            CoreError::GenerationFailure(_) => "generation_failure",
            CoreError::InvalidInput(_) => "invalid_input",
            CoreError::NotConfigured(_) => "not_configured",
        }
    }

    pub(crate) fn upstream(err: anyhow::Error) -> Self {
        CoreError::UpstreamUnavailable(format!("{err:#}"))
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_bare_message() {
        let err = CoreError::NoContent("No transcript available for symbol: AAPL".to_string());
        assert_eq!(err.to_string(), "No transcript available for symbol: AAPL");
        assert_eq!(err.kind(), "no_content");
    }

    #[test]
    fn upstream_keeps_the_context_chain() {
        let err = anyhow::anyhow!("HTTP 503").context("transcript list request failed");
        let core = CoreError::upstream(err);
        assert_eq!(core.kind(), "upstream_unavailable");
        assert_eq!(core.to_string(), "transcript list request failed: HTTP 503");
    }
}
