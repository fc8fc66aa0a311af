// colloquy/src/parser.rs

//! Classifies raw backend replies into final answers or tool-call intents.
//!
//! The reply protocol is text-based: a backend either ends the exchange with
//! a `FINAL:` marker followed by the answer, or emits a single JSON object
//! `{"tool": ..., "args": {...}}`, optionally wrapped in a fenced `json`
//! block. Free-text replies that match neither shape are returned as
//! [`ParsedReply::Unparsed`] and treated as an implicit final answer by the
//! conversation loop.

use crate::models::tools::ToolCallIntent;
use lazy_static::lazy_static;
use regex::Regex;

/// Literal token signaling loop termination with an answer.
pub const FINAL_MARKER: &str = "FINAL:";

/// Field naming the requested tool in a structured intent.
pub const TOOL_FIELD: &str = "tool";

/// Field carrying the argument payload in a structured intent.
pub const ARGS_FIELD: &str = "args";

/// The outcome of classifying one raw reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReply {
    Final(String),
    ToolCall(ToolCallIntent),
    Unparsed,
}

lazy_static! {
    static ref FENCED_JSON: Regex =
        Regex::new(r"(?si)```json\s*\n(.*?)```").expect("fenced block regex");
}

/// Applies the parser strategies in fixed precedence; first success wins.
pub fn parse_reply(reply: &str) -> ParsedReply {
    if let Some(answer) = final_answer(reply) {
        return ParsedReply::Final(answer);
    }
    if let Some(intent) = fenced_intent(reply)
        .or_else(|| whole_reply_intent(reply))
        .or_else(|| embedded_intent(reply))
    {
        return ParsedReply::ToolCall(intent);
    }
    ParsedReply::Unparsed
}

/// Strategy 1: a `FINAL:` marker anywhere in the text wins outright, even
/// over a well-formed intent earlier in the same reply.
fn final_answer(reply: &str) -> Option<String> {
    reply
        .find(FINAL_MARKER)
        .map(|idx| reply[idx + FINAL_MARKER.len()..].trim().to_string())
}

/// Strategy 2: the first fenced block labeled `json`.
fn fenced_intent(reply: &str) -> Option<ToolCallIntent> {
    let captures = FENCED_JSON.captures(reply)?;
    parse_intent(captures.get(1)?.as_str())
}

/// Strategy 3: the entire reply is the intent object.
fn whole_reply_intent(reply: &str) -> Option<ToolCallIntent> {
    parse_intent(reply.trim())
}

/// Strategy 4: scan left-to-right for minimal balanced-brace substrings
/// that textually mention both fields; the first one that parses is
/// authoritative.
fn embedded_intent(reply: &str) -> Option<ToolCallIntent> {
    for candidate in balanced_objects(reply) {
        if candidate.contains(TOOL_FIELD) && candidate.contains(ARGS_FIELD) {
            if let Some(intent) = parse_intent(candidate) {
                return Some(intent);
            }
        }
    }
    None
}

fn parse_intent(text: &str) -> Option<ToolCallIntent> {
    serde_json::from_str::<ToolCallIntent>(text).ok()
}

/// Yields every balanced `{...}` substring starting at each opening brace,
/// in scan order. Braces inside string literals are ignored.
fn balanced_objects(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut candidates = Vec::new();
    for (start, &byte) in bytes.iter().enumerate() {
        if byte != b'{' {
            continue;
        }
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        for (offset, &b) in bytes[start..].iter().enumerate() {
            if in_string {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_string = false;
                }
                continue;
            }
            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        candidates.push(&text[start..=start + offset]);
                        break;
                    }
                }
                _ => {}
            }
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn intent(name: &str, args: serde_json::Value) -> ToolCallIntent {
        ToolCallIntent {
            name: name.to_string(),
            arguments: args.as_object().unwrap().clone(),
        }
    }

    #[test]
    fn marker_returns_trimmed_trailing_text() {
        assert_eq!(parse_reply("FINAL: 42"), ParsedReply::Final("42".to_string()));
        assert_eq!(
            parse_reply("Some thinking first.\nFINAL:   the answer  "),
            ParsedReply::Final("the answer".to_string())
        );
    }

    #[test]
    fn marker_overrides_earlier_tool_call() {
        let reply = r#"{"tool": "shell", "args": {"command": "ls"}}
            FINAL: done"#;
        assert_eq!(parse_reply(reply), ParsedReply::Final("done".to_string()));
    }

    #[test]
    fn fenced_whole_and_embedded_forms_agree() {
        let expected = intent("Echo", json!({"x": 1}));

        let fenced = "Let me use a tool.\n```json\n{\"tool\": \"Echo\", \"args\": {\"x\": 1}}\n```\n";
        let whole = r#"{"tool": "Echo", "args": {"x": 1}}"#;
        let embedded = r#"I will call {"tool": "Echo", "args": {"x": 1}} now."#;

        for reply in [fenced, whole, embedded] {
            match parse_reply(reply) {
                ParsedReply::ToolCall(parsed) => assert_eq!(parsed, expected, "reply: {}", reply),
                other => panic!("expected tool call for {:?}, got {:?}", reply, other),
            }
        }
    }

    #[test]
    fn fenced_label_is_case_insensitive() {
        let reply = "```JSON\n{\"tool\": \"Echo\", \"args\": {}}\n```";
        assert!(matches!(parse_reply(reply), ParsedReply::ToolCall(_)));
    }

    #[test]
    fn embedded_scan_prefers_first_valid_candidate() {
        // Two well-formed candidates: scan order decides.
        let reply = r#"either {"tool": "first", "args": {}} or {"tool": "second", "args": {}}"#;
        match parse_reply(reply) {
            ParsedReply::ToolCall(parsed) => assert_eq!(parsed.name, "first"),
            other => panic!("expected tool call, got {:?}", other),
        }
    }

    #[test]
    fn embedded_scan_skips_malformed_candidates() {
        let reply = r#"{"tool": "broken", "args": } then {"tool": "ok", "args": {"n": 2}}"#;
        match parse_reply(reply) {
            ParsedReply::ToolCall(parsed) => assert_eq!(parsed.name, "ok"),
            other => panic!("expected tool call, got {:?}", other),
        }
    }

    #[test]
    fn braces_inside_strings_do_not_break_matching() {
        let reply = r#"{"tool": "Echo", "args": {"text": "a { b } c"}}"#;
        match parse_reply(reply) {
            ParsedReply::ToolCall(parsed) => {
                assert_eq!(parsed.arguments["text"], json!("a { b } c"));
            }
            other => panic!("expected tool call, got {:?}", other),
        }
    }

    #[test]
    fn object_missing_either_field_is_unparsed() {
        assert_eq!(parse_reply(r#"{"tool": "Echo"}"#), ParsedReply::Unparsed);
        assert_eq!(parse_reply(r#"{"args": {}}"#), ParsedReply::Unparsed);
    }

    #[test]
    fn free_text_is_unparsed() {
        assert_eq!(parse_reply("I do not know."), ParsedReply::Unparsed);
        assert_eq!(parse_reply(""), ParsedReply::Unparsed);
    }
}
