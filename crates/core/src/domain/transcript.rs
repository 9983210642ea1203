use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub symbol: String,
    pub year: i32,
    pub quarter: u8,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSummary {
    pub symbol: String,
    pub year: i32,
    pub quarter: u8,
    pub summary: String,
}

impl TranscriptSummary {
    /// One entry per non-blank summary line, with list markers stripped.
    pub fn key_points(&self) -> Vec<&str> {
        self.summary
            .lines()
            .map(strip_list_marker)
            .filter(|l| !l.is_empty())
            .collect()
    }
}

fn strip_list_marker(line: &str) -> &str {
    let t = line.trim();
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = t.strip_prefix(marker) {
            return rest.trim();
        }
    }

    // "1. " / "12) "
    let digits = t.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &t[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return rest.trim();
        }
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_points_strip_markers_and_blank_lines() {
        let summary = TranscriptSummary {
            symbol: "AAPL".to_string(),
            year: 2025,
            quarter: 3,
            summary: "- Revenue up 8%\n\n* Services at record high\n1. Guidance raised\n2) Buyback extended\nMargins flat"
                .to_string(),
        };
        assert_eq!(
            summary.key_points(),
            vec![
                "Revenue up 8%",
                "Services at record high",
                "Guidance raised",
                "Buyback extended",
                "Margins flat",
            ]
        );
    }

    #[test]
    fn key_points_keep_leading_numbers_that_are_not_markers() {
        let summary = TranscriptSummary {
            symbol: "AAPL".to_string(),
            year: 2025,
            quarter: 3,
            summary: "2025 outlook unchanged".to_string(),
        };
        assert_eq!(summary.key_points(), vec!["2025 outlook unchanged"]);
    }
}
