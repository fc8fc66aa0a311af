// colloquy/src/tools/shell.rs

//! Shell command execution tool.
//!
//! **Warning:** commands run as provided, with no sandboxing or
//! confirmation. Callers are responsible for deciding whether exposing this
//! tool to a backend is acceptable.

use super::Tool;
use crate::models::tools::{ParameterSpec, ParametersSchema};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::process::Command;
use tracing::debug;

pub struct ShellTool;

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its output."
    }

    fn parameters(&self) -> ParametersSchema {
        ParametersSchema::empty().with_property(
            "command",
            ParameterSpec::string("The command to execute"),
            true,
        )
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<String> {
        let command = arguments
            .get("command")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        debug!(command = %command, "Executing shell command");

        let (shell, flag) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };

        let output = Command::new(shell)
            .arg(flag)
            .arg(&command)
            .output()
            .await
            .with_context(|| format!("Failed to spawn shell process for command: {}", command))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if output.status.success() {
            Ok(if stdout.is_empty() { stderr } else { stdout })
        } else {
            let code = output.status.code().unwrap_or(-1);
            let detail = if stderr.is_empty() { stdout } else { stderr };
            Ok(format!("Shell error ({}): {}", code, detail))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn captures_stdout() {
        let output = ShellTool.call(args(json!({"command": "echo hello"}))).await.unwrap();
        assert_eq!(output, "hello");
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn nonzero_exit_is_reported_as_text_not_error() {
        let output = ShellTool
            .call(args(json!({"command": "ls /definitely/not/a/path"})))
            .await
            .unwrap();
        assert!(output.starts_with("Shell error ("), "got: {}", output);
    }
}
