// colloquy/src/task.rs

//! Units of work assigned to an agent persona.

use serde::{Deserialize, Serialize};

/// The persona a conversation is run as. Purely descriptive; all behavior
/// lives in the loop and its wiring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Agent {
    pub name: String,
    pub role: String,
    pub goal: String,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        goal: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            goal: goal.into(),
        }
    }
}

/// One task for one agent. `expected_output` is advisory prompt text, not a
/// validated contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expected_output: Option<String>,
    pub agent: Agent,
}

impl Task {
    pub fn new(description: impl Into<String>, agent: Agent) -> Self {
        Self {
            description: description.into(),
            expected_output: None,
            agent,
        }
    }

    pub fn with_expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = Some(expected.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_expected_output() {
        let agent = Agent::new("Dev", "Developer", "Write code");
        let task = Task::new("Implement fibonacci", agent).with_expected_output("a function");
        assert_eq!(task.expected_output.as_deref(), Some("a function"));
        assert_eq!(task.agent.name, "Dev");
    }
}
