//! Output formatting for CLI commands.

#![allow(clippy::format_push_string)]

use serde::Serialize;

use crate::agent::{DialogueOutcome, DialogueToken, StopReason};
use crate::search::SearchOutcome;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
    /// One JSON object per line.
    Ndjson,
}

impl OutputFormat {
    /// Parses a format name, falling back to [`OutputFormat::Text`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "ndjson" | "jsonl" => Self::Ndjson,
            _ => Self::Text,
        }
    }

    /// Serializes `value` for this format.
    #[must_use]
    pub fn to_json<T: Serialize>(self, value: &T) -> String {
        let rendered = match self {
            Self::Ndjson => serde_json::to_string(value),
            Self::Text | Self::Json => serde_json::to_string_pretty(value),
        };
        rendered.unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"))
    }
}

const fn stop_label(reason: StopReason) -> &'static str {
    match reason {
        StopReason::Completed => "completed",
        StopReason::RoundLimit => "round limit reached",
        StopReason::Failed => "failed",
    }
}

/// Formats a finished dialogue.
#[must_use]
pub fn format_outcome(outcome: &DialogueOutcome, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = outcome.text.clone();
            output.push_str(&format!(
                "\n\n---\nStop: {} | Rounds: {} | Tool calls: {} | Tokens: {}\n",
                stop_label(outcome.stop_reason),
                outcome.rounds,
                outcome.tool_calls,
                outcome.usage.total_tokens
            ));
            output
        }
        OutputFormat::Json | OutputFormat::Ndjson => format.to_json(outcome),
    }
}

/// Formats one streamed token. Text tokens are passed through unchanged in
/// text mode; everything else is one JSON line.
#[must_use]
pub fn format_token(token: &DialogueToken, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => match token {
            DialogueToken::Text(text) => text.clone(),
            DialogueToken::ToolMarker(marker) => format!("\n{marker}\n"),
            DialogueToken::Failed(message) => format!("\nError: {message}\n"),
            DialogueToken::End(_) => "\n".to_string(),
        },
        OutputFormat::Json | OutputFormat::Ndjson => {
            let value = match token {
                DialogueToken::Text(text) => serde_json::json!({"type": "text", "text": text}),
                DialogueToken::ToolMarker(marker) => {
                    serde_json::json!({"type": "tool_marker", "text": marker})
                }
                DialogueToken::Failed(message) => {
                    serde_json::json!({"type": "failed", "message": message})
                }
                DialogueToken::End(reason) => serde_json::json!({"type": "end", "stop_reason": reason}),
            };
            format!("{}\n", OutputFormat::Ndjson.to_json(&value))
        }
    }
}

/// Formats a direct search result.
#[must_use]
pub fn format_search(pdf_name: &str, outcome: &SearchOutcome, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if !outcome.file_exists {
                return format!("Document not found: {pdf_name}\n");
            }
            if let Some(ref error) = outcome.error {
                return format!("Search failed in {pdf_name}: {error}\n");
            }
            if !outcome.query_exists {
                return format!("No match in {pdf_name}\n");
            }
            let mut output = format!("{} match(es) in {pdf_name}:\n", outcome.matches.len());
            for (i, snippet) in outcome.matches.iter().enumerate() {
                output.push_str(&format!("\n[{}] {}\n", i + 1, snippet));
            }
            output
        }
        OutputFormat::Json | OutputFormat::Ndjson => format.to_json(outcome),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("NDJSON"), OutputFormat::Ndjson);
        assert_eq!(OutputFormat::parse("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("bogus"), OutputFormat::Text);
    }

    #[test]
    fn test_format_search_text() {
        let outcome = SearchOutcome {
            file_exists: true,
            query_exists: true,
            matches: vec!["aaa needle bbb".to_string()],
            error: None,
        };
        let text = format_search("report", &outcome, OutputFormat::Text);
        assert!(text.starts_with("1 match(es) in report"));
        assert!(text.contains("[1] aaa needle bbb"));

        let missing = format_search("gone", &SearchOutcome::default(), OutputFormat::Text);
        assert_eq!(missing, "Document not found: gone\n");
    }

    #[test]
    fn test_format_search_json_omits_empty_error() {
        let json = format_search("report", &SearchOutcome::default(), OutputFormat::Ndjson);
        assert_eq!(
            json,
            r#"{"file_exists":false,"query_exists":false,"matches":[]}"#
        );
    }

    #[test]
    fn test_format_token_ndjson() {
        let line = format_token(&DialogueToken::End(StopReason::RoundLimit), OutputFormat::Json);
        assert_eq!(line, "{\"stop_reason\":\"round_limit\",\"type\":\"end\"}\n");
        let text = format_token(&DialogueToken::Text("hi".to_string()), OutputFormat::Text);
        assert_eq!(text, "hi");
    }
}
