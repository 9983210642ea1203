//! Latest-transcript lookup and LLM summarization.
//!
//! The pipeline is fetch -> validate -> build prompt(s) -> generate. Any stage
//! can fail; the first failure is returned and nothing partial is produced.

use crate::domain::transcript::{Transcript, TranscriptSummary};
use crate::error::{CoreError, CoreResult};
use crate::ingest::provider::TranscriptSource;
use crate::llm::{GenerateRequest, TextGenerator};

pub const SYSTEM_PROMPT: &str = "You are a helpful financial assistant.";
pub const TEMPERATURE: f32 = 0.7;
pub const MAX_OUTPUT_TOKENS: u32 = 1000;

const NO_TRANSCRIPT_SENTINEL: &str = "No transcript";
const DEFAULT_CHUNK_BUDGET_BYTES: usize = 48_000;
const DEFAULT_MAX_CHUNKS: usize = 6;

/// How long transcripts are split before generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryOptions {
    /// Largest slice of transcript text embedded in one prompt.
    pub chunk_budget_bytes: usize,
    /// Parts beyond this count are dropped.
    pub max_chunks: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            chunk_budget_bytes: DEFAULT_CHUNK_BUDGET_BYTES,
            max_chunks: DEFAULT_MAX_CHUNKS,
        }
    }
}

impl SummaryOptions {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Ok(s) = std::env::var("SUMMARY_CHUNK_BUDGET_BYTES") {
            if let Ok(n) = s.parse::<usize>() {
                out.chunk_budget_bytes = n.max(1);
            }
        }

        if let Ok(s) = std::env::var("SUMMARY_MAX_CHUNKS") {
            if let Ok(n) = s.parse::<usize>() {
                out.max_chunks = n.max(1);
            }
        }

        out
    }
}

/// Most recent transcript for `symbol`: the first element the source returns.
pub async fn fetch_latest_transcript(
    symbol: &str,
    source: &dyn TranscriptSource,
) -> CoreResult<Transcript> {
    let transcripts = source
        .list_transcripts(symbol)
        .await
        .map_err(CoreError::upstream)?;

    transcripts.into_iter().next().ok_or_else(|| {
        CoreError::UpstreamUnavailable(format!(
            "transcript provider {} returned no transcripts for {}",
            source.provider_name(),
            symbol.trim().to_ascii_uppercase()
        ))
    })
}

pub async fn summarize_transcript(
    symbol: &str,
    source: &dyn TranscriptSource,
    generator: &dyn TextGenerator,
    options: SummaryOptions,
) -> CoreResult<TranscriptSummary> {
    let transcript = fetch_latest_transcript(symbol, source).await?;
    ensure_has_content(symbol, &transcript)?;

    let prompts = build_prompts(&transcript.content, options);
    tracing::info!(
        symbol = %transcript.symbol,
        year = transcript.year,
        quarter = transcript.quarter,
        transcript_bytes = transcript.content.len(),
        parts = prompts.len(),
        provider = ?generator.provider(),
        "summarizing transcript"
    );

    let mut parts = Vec::with_capacity(prompts.len());
    for prompt in prompts {
        let req = GenerateRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt,
            temperature: TEMPERATURE,
            max_tokens: MAX_OUTPUT_TOKENS,
        };
        let text = generator
            .generate(&req)
            .await
            .map_err(|e| CoreError::GenerationFailure(format!("{e:#}")))?;
        parts.push(classify_completion(text)?);
    }

    Ok(TranscriptSummary {
        symbol: transcript.symbol,
        year: transcript.year,
        quarter: transcript.quarter,
        summary: parts.join("\n"),
    })
}

fn ensure_has_content(symbol: &str, transcript: &Transcript) -> CoreResult<()> {
    let content = transcript.content.trim_start();
    if content.is_empty() || content.starts_with(NO_TRANSCRIPT_SENTINEL) {
        return Err(CoreError::NoContent(format!(
            "No transcript available for symbol: {}",
            symbol.trim()
        )));
    }
    Ok(())
}

fn classify_completion(text: String) -> CoreResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CoreError::GenerationFailure("empty completion".to_string()));
    }
    Ok(trimmed.to_string())
}

/// One prompt per transcript part. Short transcripts yield exactly one prompt.
pub fn build_prompts(content: &str, options: SummaryOptions) -> Vec<String> {
    let mut chunks = split_into_chunks(content, options.chunk_budget_bytes);
    if chunks.len() > options.max_chunks {
        tracing::warn!(
            parts = chunks.len(),
            max_chunks = options.max_chunks,
            "transcript exceeds the part limit; trailing parts are not summarized"
        );
        chunks.truncate(options.max_chunks);
    }

    let total = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let part = (total > 1).then_some((i + 1, total));
            summary_prompt(chunk, part)
        })
        .collect()
}

fn summary_prompt(transcript: &str, part: Option<(usize, usize)>) -> String {
    let mut prompt = String::from(
        "Summarize the following earnings call transcript in a concise way. \
         Focus on key insights, financial performance, outlook, and any guidance given. \
         Format the key points on separate lines so they can be displayed as bullet points.\n",
    );
    if let Some((index, total)) = part {
        prompt.push_str(&format!(
            "This is part {index} of {total} of the transcript; summarize only this part.\n"
        ));
    }
    prompt.push_str("\nTranscript:\n");
    prompt.push_str(transcript);
    prompt.push('\n');
    prompt
}

/// Splits `text` into slices of at most `budget` bytes, cutting after the last
/// newline in the window, else after the last space, else at a char boundary.
pub fn split_into_chunks(text: &str, budget: usize) -> Vec<&str> {
    let budget = budget.max(1);
    let mut out = Vec::new();
    let mut rest = text;

    while rest.len() > budget {
        let mut end = budget;
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // A single char wider than the budget.
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }

        let window = &rest[..end];
        let cut = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .map(|i| i + 1)
            .filter(|&i| i > 0 && !window[..i].trim().is_empty())
            .unwrap_or(end);

        let chunk = rest[..cut].trim_end();
        if !chunk.is_empty() {
            out.push(chunk);
        }
        rest = rest[cut..].trim_start();
    }

    if !rest.trim().is_empty() || out.is_empty() {
        out.push(rest);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Provider;
    use std::sync::Mutex;

    struct FakeSource(anyhow::Result<Vec<Transcript>>);

    #[async_trait::async_trait]
    impl TranscriptSource for FakeSource {
        fn provider_name(&self) -> &'static str {
            "fake"
        }

        async fn list_transcripts(&self, _symbol: &str) -> anyhow::Result<Vec<Transcript>> {
            match &self.0 {
                Ok(list) => Ok(list.clone()),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }
    }

    #[derive(Default)]
    struct FakeGenerator {
        replies: Mutex<Vec<anyhow::Result<String>>>,
        seen: Mutex<Vec<GenerateRequest>>,
    }

    impl FakeGenerator {
        fn replying(replies: Vec<anyhow::Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<GenerateRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl TextGenerator for FakeGenerator {
        fn provider(&self) -> Provider {
            Provider::OpenAI
        }

        async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<String> {
            self.seen.lock().unwrap().push(req.clone());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok("- default".to_string()))
        }
    }

    fn transcript(year: i32, quarter: u8, content: &str) -> Transcript {
        Transcript {
            symbol: "AAPL".to_string(),
            year,
            quarter,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn empty_list_is_upstream_unavailable() {
        let source = FakeSource(Ok(vec![]));
        let generator = FakeGenerator::default();
        let err = summarize_transcript("aapl", &source, &generator, SummaryOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "upstream_unavailable");
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_passes_its_message_through() {
        let source = FakeSource(Err(anyhow::anyhow!(
            "Failed to fetch transcripts list (status 500)."
        )));
        let generator = FakeGenerator::default();
        let err = summarize_transcript("aapl", &source, &generator, SummaryOptions::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::UpstreamUnavailable("Failed to fetch transcripts list (status 500).".to_string())
        );
    }

    #[tokio::test]
    async fn sentinel_content_skips_generation() {
        let source = FakeSource(Ok(vec![transcript(2025, 2, "No transcript found")]));
        let generator = FakeGenerator::default();
        let err = summarize_transcript("AAPL", &source, &generator, SummaryOptions::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::NoContent("No transcript available for symbol: AAPL".to_string())
        );
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn blank_content_is_no_content() {
        let source = FakeSource(Ok(vec![transcript(2025, 2, "  \n ")]));
        let generator = FakeGenerator::default();
        let err = summarize_transcript("AAPL", &source, &generator, SummaryOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "no_content");
    }

    #[tokio::test]
    async fn summarizes_the_first_listed_transcript() {
        let source = FakeSource(Ok(vec![
            transcript(2025, 2, "CEO: Revenue grew 8% year over year."),
            transcript(2025, 1, "older call"),
        ]));
        let generator = FakeGenerator::replying(vec![Ok(
            "  - Revenue grew 8%\n- Guidance maintained \n".to_string(),
        )]);

        let summary = summarize_transcript("aapl", &source, &generator, SummaryOptions::default())
            .await
            .unwrap();
        assert_eq!(summary.symbol, "AAPL");
        assert_eq!((summary.year, summary.quarter), (2025, 2));
        assert_eq!(summary.summary, "- Revenue grew 8%\n- Guidance maintained");

        let calls = generator.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].system, SYSTEM_PROMPT);
        assert_eq!(calls[0].temperature, TEMPERATURE);
        assert_eq!(calls[0].max_tokens, MAX_OUTPUT_TOKENS);
        assert!(calls[0]
            .prompt
            .contains("Transcript:\nCEO: Revenue grew 8% year over year.\n"));
        assert!(!calls[0].prompt.contains("older call"));
        assert!(!calls[0].prompt.contains("part 1"));
    }

    #[tokio::test]
    async fn generation_error_is_reported() {
        let source = FakeSource(Ok(vec![transcript(2025, 2, "CEO: hello")]));
        let generator =
            FakeGenerator::replying(vec![Err(anyhow::anyhow!("insufficient_quota"))]);
        let err = summarize_transcript("aapl", &source, &generator, SummaryOptions::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::GenerationFailure("insufficient_quota".to_string())
        );
    }

    #[tokio::test]
    async fn blank_completion_is_a_generation_failure() {
        let source = FakeSource(Ok(vec![transcript(2025, 2, "CEO: hello")]));
        let generator = FakeGenerator::replying(vec![Ok("   ".to_string())]);
        let err = summarize_transcript("aapl", &source, &generator, SummaryOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::GenerationFailure("empty completion".to_string()));
    }

    #[tokio::test]
    async fn long_transcripts_are_summarized_in_parts() {
        let content = "Operator: welcome.\nCFO: margins expanded.\nCEO: outlook raised.";
        let source = FakeSource(Ok(vec![transcript(2024, 4, content)]));
        let generator = FakeGenerator::replying(vec![
            Ok("- Welcome".to_string()),
            Ok("- Margins expanded".to_string()),
            Ok("- Outlook raised".to_string()),
        ]);
        let options = SummaryOptions {
            chunk_budget_bytes: 25,
            max_chunks: 10,
        };

        let summary = summarize_transcript("aapl", &source, &generator, options)
            .await
            .unwrap();
        assert_eq!(
            summary.summary,
            "- Welcome\n- Margins expanded\n- Outlook raised"
        );

        let calls = generator.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].prompt.contains("part 1 of 3"));
        assert!(calls[2].prompt.contains("CEO: outlook raised."));
    }

    #[tokio::test]
    async fn failure_in_a_later_part_discards_earlier_parts() {
        let content = "Operator: welcome.\nCFO: margins expanded.";
        let source = FakeSource(Ok(vec![transcript(2024, 4, content)]));
        let generator = FakeGenerator::replying(vec![
            Ok("- Welcome".to_string()),
            Err(anyhow::anyhow!("timeout")),
        ]);
        let options = SummaryOptions {
            chunk_budget_bytes: 25,
            max_chunks: 10,
        };
        let err = summarize_transcript("aapl", &source, &generator, options)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "generation_failure");
    }

    #[test]
    fn prompts_are_capped_at_max_chunks() {
        let options = SummaryOptions {
            chunk_budget_bytes: 4,
            max_chunks: 2,
        };
        let prompts = build_prompts("aaa bbb ccc ddd", options);
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("part 1 of 2"));
        assert!(prompts[1].ends_with("Transcript:\nbbb\n"));
    }

    #[test]
    fn split_prefers_line_breaks() {
        let text = "line one\nline two\nline three";
        assert_eq!(
            split_into_chunks(text, 18),
            vec!["line one\nline two", "line three"]
        );
    }

    #[test]
    fn split_falls_back_to_spaces_then_hard_cuts() {
        assert_eq!(split_into_chunks("alpha beta gamma", 11), vec!["alpha beta", "gamma"]);
        assert_eq!(split_into_chunks("abcdefgh", 3), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn split_respects_utf8_boundaries() {
        // Each 'é' is two bytes.
        let chunks = split_into_chunks("éééé", 3);
        assert_eq!(chunks, vec!["é", "é", "é", "é"]);
        assert_eq!(split_into_chunks("€", 1), vec!["€"]);
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        assert_eq!(split_into_chunks("short", 100), vec!["short"]);
        assert_eq!(split_into_chunks("", 100), vec![""]);
    }
}
