// colloquy/src/tools/fs.rs

use super::Tool;
use crate::models::tools::{ParameterSpec, ParametersSchema};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::info;

/// Writes text content to a file on disk.
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write text content to a file on disk."
    }

    fn parameters(&self) -> ParametersSchema {
        ParametersSchema::empty()
            .with_property("path", ParameterSpec::string("Destination file path"), true)
            .with_property("content", ParameterSpec::string("Text content to write"), true)
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<String> {
        let path = arguments
            .get("path")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let content = arguments
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        info!(path = %path, bytes = content.len(), "Writing file");
        tokio::fs::write(&path, &content)
            .await
            .with_context(|| format!("Failed to write file: {}", path))?;
        Ok(format!("Successfully wrote to file: {}", path))
    }
}
