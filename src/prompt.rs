// colloquy/src/prompt.rs

//! Builds the opening turn of a conversation.

use crate::models::tools::ToolDescriptor;
use crate::parser::{ARGS_FIELD, FINAL_MARKER, TOOL_FIELD};

/// Everything the prompt assembler needs for one task.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptInputs<'a> {
    pub role: &'a str,
    pub goal: &'a str,
    pub task: &'a str,
    pub expected_output: Option<&'a str>,
    pub prior_context: Option<&'a str>,
}

/// Assembles the initial prompt text. Pure function, no side effects.
///
/// When tool descriptors are present, a machine-readable schema block is
/// appended enumerating every tool together with the reply protocol, so the
/// backend can select a capability by name.
pub fn assemble_prompt(inputs: PromptInputs<'_>, tools: &[ToolDescriptor]) -> String {
    let mut prompt = format!(
        "Role: {}\nGoal: {}\nTask: {}",
        inputs.role, inputs.goal, inputs.task
    );
    if let Some(expected) = inputs.expected_output {
        prompt.push_str(&format!("\n\nExpected output: {}", expected));
    }
    if let Some(context) = inputs.prior_context {
        if !context.is_empty() {
            prompt.push_str(&format!("\n\nContext from previous tasks:\n{}", context));
        }
    }
    if !tools.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(&tool_schema_block(tools));
    }
    prompt
}

fn tool_schema_block(tools: &[ToolDescriptor]) -> String {
    let schemas = serde_json::to_string_pretty(tools).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Available tools (JSON schemas):\n{schemas}\n\n\
         To call a tool, reply with a single JSON object: \
         {{\"{tool}\": \"<name>\", \"{args}\": {{...}}}} \
         (optionally inside a ```json fenced block).\n\
         When you have the final answer, reply with '{marker}' followed by the answer.",
        schemas = schemas,
        tool = TOOL_FIELD,
        args = ARGS_FIELD,
        marker = FINAL_MARKER,
    )
}
