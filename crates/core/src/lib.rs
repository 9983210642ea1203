pub mod domain;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod risk;
pub mod summarize;

pub mod config {
    use anyhow::Context;

    const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
    const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 20;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub openai_api_key: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub llm_provider: Option<String>,
        pub sentry_dsn: Option<String>,
        pub yahoo_base_url: Option<String>,
        pub transcript_api_base_url: Option<String>,
        pub upstream_timeout_secs: u64,
        pub cors_allowed_origins: Vec<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let upstream_timeout_secs = match std::env::var("UPSTREAM_TIMEOUT_SECS") {
                Ok(s) => s
                    .parse::<u64>()
                    .with_context(|| format!("UPSTREAM_TIMEOUT_SECS is not a number: {s}"))?,
                Err(_) => DEFAULT_UPSTREAM_TIMEOUT_SECS,
            };

            Ok(Self {
                openai_api_key: non_empty_var("OPENAI_API_KEY"),
                anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
                llm_provider: non_empty_var("LLM_PROVIDER"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                yahoo_base_url: non_empty_var("YAHOO_BASE_URL"),
                transcript_api_base_url: non_empty_var("TRANSCRIPT_API_BASE_URL"),
                upstream_timeout_secs,
                cors_allowed_origins: parse_origins(std::env::var("CORS_ALLOWED_ORIGINS").ok()),
            })
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }

    fn parse_origins(v: Option<String>) -> Vec<String> {
        let mut out: Vec<String> = v
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if out.is_empty() {
            out.push(DEFAULT_CORS_ORIGIN.to_string());
        }
        out
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn parse_origins_splits_and_trims() {
            let origins = parse_origins(Some(
                "http://localhost:5173, https://pocket-trader-app.com/ ,".to_string(),
            ));
            assert_eq!(
                origins,
                vec!["http://localhost:5173", "https://pocket-trader-app.com"]
            );
        }

        #[test]
        fn parse_origins_defaults_to_local_dev_server() {
            assert_eq!(parse_origins(None), vec![DEFAULT_CORS_ORIGIN]);
            assert_eq!(parse_origins(Some(" , ".to_string())), vec![DEFAULT_CORS_ORIGIN]);
        }
    }
}
