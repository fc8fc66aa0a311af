// colloquy/src/tools/code.rs

//! Fenced code-block extraction tool.

use super::Tool;
use crate::models::tools::{ParameterSpec, ParametersSchema};
use anyhow::Result;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Map, Value};

lazy_static! {
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"```([\w#+-]*)\s*\n([\s\S]*?)```").expect("fenced code regex");
}

/// Extracts the most recent fenced code block from a body of text,
/// optionally preferring a language label. Returns a compact JSON string
/// with `language` and `code` fields so downstream tools can consume it.
pub struct ExtractCodeTool;

#[async_trait]
impl Tool for ExtractCodeTool {
    fn name(&self) -> &str {
        "extract_code"
    }

    fn description(&self) -> &str {
        "Extract the most recent fenced code block from text, optionally preferring a language. \
         Returns JSON with fields: language, code."
    }

    fn parameters(&self) -> ParametersSchema {
        ParametersSchema::empty()
            .with_property("text", ParameterSpec::string("Text to scan"), true)
            .with_property(
                "prefer_language",
                ParameterSpec::string("Language label to prefer, e.g. 'python'"),
                false,
            )
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<String> {
        let text = arguments
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let preferred = arguments
            .get("prefer_language")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let blocks: Vec<(Option<String>, &str)> = FENCED_BLOCK
            .captures_iter(text)
            .map(|captures| {
                let lang = captures
                    .get(1)
                    .map(|m| m.as_str().trim().to_lowercase())
                    .filter(|s| !s.is_empty());
                (lang, captures.get(2).map(|m| m.as_str()).unwrap_or(""))
            })
            .collect();

        let Some(latest) = blocks.last() else {
            return Ok(json!({"language": null, "code": "", "note": "no fenced code block found"})
                .to_string());
        };

        // Latest occurrence wins; a preferred language wins over recency.
        let chosen = preferred
            .as_deref()
            .and_then(|pref| {
                blocks
                    .iter()
                    .rev()
                    .find(|(lang, _)| lang.as_deref().is_some_and(|l| l.starts_with(pref)))
            })
            .unwrap_or(latest);

        Ok(json!({"language": chosen.0, "code": chosen.1.trim()}).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn extract(text: &str, prefer: Option<&str>) -> Value {
        let mut args = Map::new();
        args.insert("text".to_string(), json!(text));
        if let Some(p) = prefer {
            args.insert("prefer_language".to_string(), json!(p));
        }
        let output = ExtractCodeTool.call(args).await.unwrap();
        serde_json::from_str(&output).unwrap()
    }

    #[tokio::test]
    async fn picks_latest_block_by_default() {
        let text = "```python\nfirst\n```\nthen\n```js\nsecond\n```";
        let out = extract(text, None).await;
        assert_eq!(out["language"], "js");
        assert_eq!(out["code"], "second");
    }

    #[tokio::test]
    async fn preferred_language_overrides_recency() {
        let text = "```python\nfirst\n```\nthen\n```js\nsecond\n```";
        let out = extract(text, Some("python")).await;
        assert_eq!(out["language"], "python");
        assert_eq!(out["code"], "first");
    }

    #[tokio::test]
    async fn no_block_reports_a_note() {
        let out = extract("plain prose only", None).await;
        assert_eq!(out["code"], "");
        assert!(out["note"].as_str().unwrap().contains("no fenced"));
    }
}
