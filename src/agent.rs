// colloquy/src/agent.rs

use crate::errors::AgentError;
use crate::models::chat::Message;
use crate::parser::{parse_reply, ParsedReply};
use crate::prompt::{assemble_prompt, PromptInputs};
use crate::providers::{gemini, Provider};
use crate::retry::RetryPolicy;
use crate::task::Task;
use crate::tools::{dispatch, Dispatch, ToolRegistry};
use anyhow::Result;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Upper bound on backend calls for one task.
pub const DEFAULT_MAX_STEPS: u32 = 6;

/// The result of one completed conversation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConversationOutcome {
    /// The resolved textual answer. Always present, possibly empty when the
    /// step limit was reached with nothing usable in hand.
    pub output: String,
    /// Every turn exchanged, in order, including tool-result turns.
    pub transcript: Vec<Message>,
    /// How many backend calls were made.
    pub steps: u32,
}

/// Drives one agent/task pair to a textual result.
///
/// Each step is one backend call: the reply is classified as a final
/// answer, a tool-call intent, or plain prose. Tool results are appended to
/// the transcript and the backend is called again, up to [`DEFAULT_MAX_STEPS`]
/// times. Tool failures stay inside the conversation; only exhausted
/// provider failures escape as errors.
pub struct ConversationLoop {
    provider: Box<dyn Provider>,
    registry: ToolRegistry,
    retry: RetryPolicy,
    max_steps: u32,
}

impl ConversationLoop {
    /// Wires a loop around a provider. Gemini gets its fallback model chain
    /// by default; other backends retry on the configured model only.
    pub fn new(provider: Box<dyn Provider>) -> Self {
        let retry = if provider.name() == "gemini" {
            RetryPolicy::new().with_fallbacks(gemini::FALLBACK_MODELS.iter().copied())
        } else {
            RetryPolicy::new()
        };
        Self {
            provider,
            registry: ToolRegistry::new(),
            retry,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Runs one task to completion.
    pub async fn run(
        &self,
        task: &Task,
        prior_context: Option<&str>,
    ) -> Result<ConversationOutcome, AgentError> {
        let descriptors = self.registry.descriptors();
        let prompt = assemble_prompt(
            PromptInputs {
                role: &task.agent.role,
                goal: &task.agent.goal,
                task: &task.description,
                expected_output: task.expected_output.as_deref(),
                prior_context,
            },
            &descriptors,
        );
        info!(agent = %task.agent.name, model = self.provider.model(), "Starting conversation");

        let mut transcript = vec![Message::user(prompt)];
        let mut last_tool_result: Option<String> = None;
        let mut last_reply: Option<String> = None;
        let mut steps = 0;

        while steps < self.max_steps {
            steps += 1;
            let reply = self.retry.complete(self.provider.as_ref(), &transcript).await?;
            transcript.push(Message::assistant(reply.clone()));

            match parse_reply(&reply) {
                ParsedReply::Final(answer) => {
                    debug!(agent = %task.agent.name, steps, "Conversation resolved with a final answer");
                    return Ok(outcome(answer, transcript, steps));
                }
                ParsedReply::Unparsed => {
                    // Prose with no marker and no intent is the answer.
                    debug!(agent = %task.agent.name, steps, "Conversation resolved with a plain reply");
                    return Ok(outcome(reply, transcript, steps));
                }
                ParsedReply::ToolCall(intent) => {
                    debug!(agent = %task.agent.name, tool = %intent.name, steps, "Backend requested a tool");
                    let call_id = Uuid::new_v4().to_string();
                    match dispatch(&self.registry, &intent).await {
                        Dispatch::Unavailable(notice) => {
                            transcript.push(Message::tool(notice.clone(), intent.name, call_id));
                            return Ok(outcome(notice, transcript, steps));
                        }
                        Dispatch::Feedback(result) => {
                            transcript.push(Message::tool(result.clone(), intent.name, call_id));
                            last_tool_result = Some(result);
                        }
                    }
                }
            }
            last_reply = Some(reply);
        }

        warn!(agent = %task.agent.name, max_steps = self.max_steps, "Step limit reached without a final answer");
        let output = last_tool_result.or(last_reply).unwrap_or_default();
        Ok(outcome(output, transcript, self.max_steps))
    }

    /// Blocking variant of [`ConversationLoop::run`], for synchronous
    /// callers. See [`crate::sync_bridge`].
    pub fn run_blocking(
        &self,
        task: &Task,
        prior_context: Option<&str>,
    ) -> Result<ConversationOutcome> {
        let outcome = crate::sync_bridge::block_on(self.run(task, prior_context))??;
        Ok(outcome)
    }
}

fn outcome(output: String, transcript: Vec<Message>, steps: u32) -> ConversationOutcome {
    ConversationOutcome {
        output,
        transcript,
        steps,
    }
}
