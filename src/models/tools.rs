// colloquy/src/models/tools.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Published metadata letting a backend discover and invoke a capability.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: ParametersSchema,
}

/// The argument schema for a tool: a flat object with typed properties.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ParametersSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: HashMap<String, ParameterSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl ParametersSchema {
    /// An object schema with no declared properties.
    pub fn empty() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: HashMap::new(),
            required: Vec::new(),
        }
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        spec: ParameterSpec,
        required: bool,
    ) -> Self {
        let name = name.into();
        if required {
            self.required.push(name.clone());
        }
        self.properties.insert(name, spec);
        self
    }
}

impl Default for ParametersSchema {
    fn default() -> Self {
        Self::empty()
    }
}

/// A single declared parameter.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    pub description: String,
}

impl ParameterSpec {
    pub fn new(param_type: ParameterType, description: impl Into<String>) -> Self {
        Self {
            param_type,
            description: description.into(),
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(ParameterType::String, description)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParameterType {
    fn matches(self, value: &Value) -> bool {
        match self {
            ParameterType::String => value.is_string(),
            ParameterType::Integer => value.is_i64() || value.is_u64(),
            ParameterType::Number => value.is_number(),
            ParameterType::Boolean => value.is_boolean(),
            ParameterType::Array => value.is_array(),
            ParameterType::Object => value.is_object(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Integer => "integer",
            ParameterType::Number => "number",
            ParameterType::Boolean => "boolean",
            ParameterType::Array => "array",
            ParameterType::Object => "object",
        }
    }
}

/// A structured request from the backend to run a named tool.
///
/// Wire shape: `{"tool": "<name>", "args": {..}}`, optionally wrapped in a
/// fenced `json` block inside the reply text.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolCallIntent {
    #[serde(rename = "tool")]
    pub name: String,
    #[serde(rename = "args")]
    pub arguments: Map<String, Value>,
}

/// Checks an argument payload against a descriptor schema.
///
/// Returns a human-readable description of the first problem found; the
/// dispatcher feeds that text back into the transcript rather than failing
/// the loop.
pub fn validate_arguments(
    schema: &ParametersSchema,
    arguments: &Map<String, Value>,
) -> Result<(), String> {
    for required in &schema.required {
        if !arguments.contains_key(required) {
            return Err(format!("missing required argument '{}'", required));
        }
    }
    for (key, value) in arguments {
        match schema.properties.get(key) {
            None => return Err(format!("unexpected argument '{}'", key)),
            Some(spec) => {
                if !spec.param_type.matches(value) {
                    return Err(format!(
                        "argument '{}' should be a {}, got {}",
                        key,
                        spec.param_type.label(),
                        value_kind(value)
                    ));
                }
            }
        }
    }
    Ok(())
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
