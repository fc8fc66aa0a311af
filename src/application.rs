// colloquy/src/application.rs

//! Sequential multi-task orchestration.

use crate::agent::{ConversationLoop, ConversationOutcome};
use crate::errors::AgentError;
use crate::memory::ShortTermMemory;
use crate::models::chat::Message;
use crate::storage::JsonlRunLogger;
use crate::task::Task;
use serde::Serialize;
use tracing::{info, warn};

/// One finished task, as recorded in the run log.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub agent: String,
    pub task: String,
    pub output: String,
    pub steps: u32,
}

/// Runs tasks in order on one conversation loop, feeding each task's result
/// into the next task's prompt through short-term memory.
///
/// A failed task aborts the run; results of the tasks that did finish are
/// already in the log by then.
pub struct TaskRunner {
    conversation: ConversationLoop,
    memory: ShortTermMemory,
    logger: Option<JsonlRunLogger>,
}

impl TaskRunner {
    pub fn new(conversation: ConversationLoop) -> Self {
        Self {
            conversation,
            memory: ShortTermMemory::new(),
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: JsonlRunLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_memory(mut self, memory: ShortTermMemory) -> Self {
        self.memory = memory;
        self
    }

    /// Runs every task in order and returns one report per task.
    pub async fn run(&mut self, tasks: &[Task]) -> Result<Vec<TaskReport>, AgentError> {
        let mut reports = Vec::with_capacity(tasks.len());
        for task in tasks {
            info!(agent = %task.agent.name, task = %task.description, "Running task");
            let context = self.memory.dump();
            let prior = if context.is_empty() {
                None
            } else {
                Some(context.as_str())
            };
            let outcome = self.conversation.run(task, prior).await?;
            reports.push(self.record(task, &outcome));
        }
        Ok(reports)
    }

    /// Blocking variant of [`TaskRunner::run`].
    pub fn run_blocking(&mut self, tasks: &[Task]) -> anyhow::Result<Vec<TaskReport>> {
        let reports = crate::sync_bridge::block_on(self.run(tasks))??;
        Ok(reports)
    }

    fn record(&mut self, task: &Task, outcome: &ConversationOutcome) -> TaskReport {
        self.memory.add(Message::assistant(format!(
            "{} result: {}",
            task.agent.name, outcome.output
        )));
        let report = TaskReport {
            agent: task.agent.name.clone(),
            task: task.description.clone(),
            output: outcome.output.clone(),
            steps: outcome.steps,
        };
        if let Some(logger) = &self.logger {
            if let Err(e) = logger.append(&report) {
                // Logging must not fail the run.
                warn!(error = ?e, "Failed to append to run log");
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::models::chat::Message;
    use crate::providers::Provider;
    use crate::task::Agent;
    use async_trait::async_trait;
    use futures::stream::BoxStream;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    /// Answers every completion with "FINAL: <n>" for the n-th call and
    /// records the opening prompt it was handed each time.
    struct SequenceBackend {
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl SequenceBackend {
        fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
            let prompts = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    prompts: prompts.clone(),
                },
                prompts,
            )
        }
    }

    #[async_trait]
    impl Provider for SequenceBackend {
        fn name(&self) -> &'static str {
            "sequence"
        }
        fn model(&self) -> &str {
            "sequence-model"
        }
        async fn complete_as(
            &self,
            _model: &str,
            messages: &[Message],
        ) -> Result<String, ProviderError> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(messages[0].content.clone());
            Ok(format!("FINAL: answer {}", prompts.len()))
        }
        fn stream(
            &self,
            _messages: &[Message],
        ) -> BoxStream<'static, Result<String, ProviderError>> {
            Box::pin(futures::stream::empty())
        }
    }

    fn tasks() -> Vec<Task> {
        vec![
            Task::new(
                "Write the function",
                Agent::new("Dev", "Developer", "Write code"),
            ),
            Task::new(
                "Review the function",
                Agent::new("QA", "Reviewer", "Find defects"),
            ),
        ]
    }

    #[tokio::test]
    async fn results_chain_into_the_next_prompt() {
        let (backend, prompts) = SequenceBackend::new();
        let mut runner = TaskRunner::new(ConversationLoop::new(Box::new(backend)));

        let reports = runner.run(&tasks()).await.unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].output, "answer 1");
        assert_eq!(reports[1].agent, "QA");

        let prompts = prompts.lock().unwrap();
        assert!(!prompts[0].contains("Context from previous tasks"));
        assert!(prompts[1].contains("Context from previous tasks:\nDev result: answer 1"));
    }

    #[tokio::test]
    async fn memory_accumulates_every_result() {
        let (backend, _) = SequenceBackend::new();
        let mut runner = TaskRunner::new(ConversationLoop::new(Box::new(backend)));
        runner.run(&tasks()).await.unwrap();

        let dump = runner.memory.dump();
        assert!(dump.starts_with("Dev result: answer 1"));
        assert!(dump.contains("QA result: answer 2"));
    }

    #[tokio::test]
    async fn reports_are_appended_to_the_run_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        let (backend, _) = SequenceBackend::new();
        let mut runner = TaskRunner::new(ConversationLoop::new(Box::new(backend)))
            .with_logger(JsonlRunLogger::new(&path).unwrap());

        runner.run(&tasks()).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        let first: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(first["record"]["agent"], "Dev");
        assert_eq!(first["record"]["output"], "answer 1");
    }
}
