//! Tool trait and tool schema types.
//!
//! A [`ToolDefinition`] is the provider-neutral description of a tool that an
//! agent declares; a [`Tool`] is the implementation that actually runs. The
//! two are joined by name at invocation time: the agent's [`ToolSet`] decides
//! what the model may call, the [`ToolRegistry`] decides what can execute.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{ToolConversionError, ToolError};
use crate::message::Message;

/// The semantic type of a tool input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InputType {
    String,
    Integer,
    Float,
    Boolean,
    List,
    Dict,
    Any,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::String => "string",
            InputType::Integer => "integer",
            InputType::Float => "float",
            InputType::Boolean => "boolean",
            InputType::List => "list",
            InputType::Dict => "dict",
            InputType::Any => "any",
        }
    }

    /// Whether a (non-null) JSON value is of this semantic type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            InputType::String => value.is_string(),
            InputType::Integer => value.is_i64() || value.is_u64(),
            InputType::Float => value.is_number(),
            InputType::Boolean => value.is_boolean(),
            InputType::List => value.is_array(),
            InputType::Dict => value.is_object(),
            InputType::Any => true,
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputType {
    type Err = ToolConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(InputType::String),
            "integer" => Ok(InputType::Integer),
            "float" => Ok(InputType::Float),
            "boolean" => Ok(InputType::Boolean),
            "list" => Ok(InputType::List),
            "dict" => Ok(InputType::Dict),
            "any" => Ok(InputType::Any),
            _ => Err(ToolConversionError::UnrecognizedType {
                type_name: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for InputType {
    type Error = ToolConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InputType> for String {
    fn from(value: InputType) -> Self {
        value.as_str().to_string()
    }
}

/// One declared input of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInputSpec {
    pub name: String,

    #[serde(rename = "type")]
    pub input_type: InputType,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl ToolInputSpec {
    pub fn required(
        name: impl Into<String>,
        input_type: InputType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            input_type,
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        input_type: InputType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, input_type, description)
        }
    }
}

/// Provider-neutral description of a tool an agent can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub inputs: Vec<ToolInputSpec>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            inputs: Vec::new(),
        }
    }

    /// Builder-style: append an input.
    pub fn with_input(mut self, input: ToolInputSpec) -> Self {
        self.inputs.push(input);
        self
    }

    /// Check parsed arguments against the declared inputs.
    ///
    /// A `null` for an optional input counts as absent. Arguments that are
    /// not declared are ignored.
    pub fn validate_arguments(&self, arguments: &Map<String, Value>) -> Result<(), ToolError> {
        for input in &self.inputs {
            match arguments.get(&input.name) {
                None | Some(Value::Null) if !input.required => {}
                None | Some(Value::Null) => {
                    return Err(self.invalid(&input.name, "missing required argument".into()));
                }
                Some(value) if !input.input_type.accepts(value) => {
                    return Err(self.invalid(
                        &input.name,
                        format!(
                            "expected {}, got {}",
                            input.input_type,
                            json_type_name(value)
                        ),
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn invalid(&self, field: &str, reason: String) -> ToolError {
        ToolError::InvalidArguments {
            tool_name: self.name.clone(),
            field: field.to_string(),
            reason,
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// A model-issued request to run a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Unique within one assistant turn
    pub call_id: String,

    pub tool_name: String,

    /// Arguments exactly as the provider sent them (a JSON string)
    pub raw_arguments: String,
}

/// The outcome of one tool call, successful or captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub payload: Value,
    pub is_error: bool,
}

impl ToolResult {
    /// Successful result. Non-object output is wrapped as `{"result": ...}`.
    pub fn success(call_id: impl Into<String>, output: Value) -> Self {
        let payload = match output {
            Value::Object(_) => output,
            other => serde_json::json!({ "result": other }),
        };
        Self {
            call_id: call_id.into(),
            payload,
            is_error: false,
        }
    }

    /// A failure represented as data so the model can see it and carry on.
    pub fn captured(call_id: impl Into<String>, tool_name: &str, error: &ToolError) -> Self {
        let mut payload = Map::new();
        payload.insert("error".into(), Value::String(error.to_string()));
        payload.insert("tool".into(), Value::String(tool_name.to_string()));
        if let ToolError::InvalidArguments { field, .. } = error {
            payload.insert("field".into(), Value::String(field.clone()));
        }
        Self {
            call_id: call_id.into(),
            payload: Value::Object(payload),
            is_error: true,
        }
    }

    /// The `tool` message carrying this result back to the model.
    pub fn to_message(&self) -> Message {
        Message::tool_result(self.call_id.clone(), self.payload.to_string())
    }
}

/// The core Tool trait.
///
/// Implementations are registered in a [`ToolRegistry`] and executed by the
/// tool invocation unit after their arguments have been validated against
/// [`Tool::to_definition`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "calculate_pension").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// The declared inputs, in the order they should be presented.
    fn inputs(&self) -> Vec<ToolInputSpec>;

    /// Execute the tool with already-validated arguments.
    async fn execute(&self, arguments: Map<String, Value>) -> Result<Value, ToolError>;

    /// The provider-neutral definition of this tool.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            inputs: self.inputs(),
        }
    }
}

/// Name → implementation. Built once at startup and shared read-only.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tool definitions, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<_> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Definitions for the given names, in the given order.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<ToolDefinition>, ToolError> {
        names
            .iter()
            .map(|name| {
                self.tools
                    .get(name)
                    .map(|t| t.to_definition())
                    .ok_or_else(|| ToolError::NotFound(name.clone()))
            })
            .collect()
    }

    /// All registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The tools an agent declared, fixed when an execution starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolSet {
    tools: Vec<ToolDefinition>,
}

impl ToolSet {
    pub fn new(tools: Vec<ToolDefinition>) -> Self {
        Self { tools }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl From<Vec<ToolDefinition>> for ToolSet {
    fn from(tools: Vec<ToolDefinition>) -> Self {
        Self::new(tools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn inputs(&self) -> Vec<ToolInputSpec> {
            vec![ToolInputSpec::required("text", InputType::String, "Text to echo")]
        }
        async fn execute(&self, arguments: Map<String, Value>) -> Result<Value, ToolError> {
            Ok(arguments.get("text").cloned().unwrap_or(Value::Null))
        }
    }

    fn pension_definition() -> ToolDefinition {
        ToolDefinition::new("calculate_pension", "Estimate pension")
            .with_input(ToolInputSpec::required(
                "current_salary",
                InputType::Float,
                "Salary",
            ))
            .with_input(ToolInputSpec::required(
                "years_of_service",
                InputType::Integer,
                "Years",
            ))
            .with_input(ToolInputSpec::optional(
                "retirement_age",
                InputType::Integer,
                "Age",
            ))
    }

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn input_type_parses_case_insensitively() {
        assert_eq!("FLOAT".parse::<InputType>().unwrap(), InputType::Float);
        assert_eq!("dict".parse::<InputType>().unwrap(), InputType::Dict);
    }

    #[test]
    fn unrecognized_input_type_is_a_conversion_error() {
        let err = "datetime".parse::<InputType>().unwrap_err();
        assert_eq!(
            err,
            ToolConversionError::UnrecognizedType {
                type_name: "datetime".into()
            }
        );

        let decoded: Result<ToolInputSpec, _> =
            serde_json::from_value(json!({"name": "when", "type": "datetime"}));
        let msg = decoded.unwrap_err().to_string();
        assert!(msg.contains("datetime"), "{msg}");
    }

    #[test]
    fn required_defaults_to_true_when_omitted() {
        let spec: ToolInputSpec =
            serde_json::from_value(json!({"name": "x", "type": "string"})).unwrap();
        assert!(spec.required);
        assert_eq!(serde_json::to_value(spec).unwrap()["type"], "string");
    }

    #[test]
    fn valid_arguments_pass() {
        let def = pension_definition();
        let ok = args(json!({"current_salary": 85000, "years_of_service": 10}));
        assert!(def.validate_arguments(&ok).is_ok());
    }

    #[test]
    fn null_optional_counts_as_absent() {
        let def = pension_definition();
        let a = args(json!({
            "current_salary": 85000.5,
            "years_of_service": 10,
            "retirement_age": null
        }));
        assert!(def.validate_arguments(&a).is_ok());
    }

    #[test]
    fn wrong_type_names_the_field() {
        let def = pension_definition();
        let a = args(json!({"current_salary": "not a number", "years_of_service": 10}));
        match def.validate_arguments(&a).unwrap_err() {
            ToolError::InvalidArguments { field, reason, .. } => {
                assert_eq!(field, "current_salary");
                assert!(reason.contains("expected float"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn integer_rejects_fractional_numbers() {
        let def = pension_definition();
        let a = args(json!({"current_salary": 1.0, "years_of_service": 10.5}));
        let err = def.validate_arguments(&a).unwrap_err();
        assert!(err.to_string().contains("years_of_service"));
    }

    #[test]
    fn missing_required_is_rejected() {
        let def = pension_definition();
        let err = def
            .validate_arguments(&args(json!({"current_salary": 1.0})))
            .unwrap_err();
        assert!(err.to_string().contains("years_of_service"));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn any_accepts_everything() {
        let def = ToolDefinition::new("t", "d")
            .with_input(ToolInputSpec::required("v", InputType::Any, ""));
        for v in [json!(1), json!("s"), json!([1]), json!({"a": 1}), json!(true)] {
            assert!(def.validate_arguments(&args(json!({ "v": v }))).is_ok());
        }
    }

    #[test]
    fn non_object_output_is_wrapped() {
        let r = ToolResult::success("c1", json!(42));
        assert_eq!(r.payload, json!({"result": 42}));
        let r = ToolResult::success("c1", json!({"total": 1}));
        assert_eq!(r.payload, json!({"total": 1}));
        assert!(!r.is_error);
    }

    #[test]
    fn captured_error_carries_tool_and_field() {
        let err = ToolError::InvalidArguments {
            tool_name: "calculate_pension".into(),
            field: "current_salary".into(),
            reason: "expected float, got string".into(),
        };
        let r = ToolResult::captured("c9", "calculate_pension", &err);
        assert!(r.is_error);
        assert_eq!(r.payload["field"], "current_salary");
        assert_eq!(r.payload["tool"], "calculate_pension");

        let msg = r.to_message();
        assert_eq!(msg.tool_call_id.as_deref(), Some("c9"));
        assert!(msg.text().contains("current_salary"));
    }

    #[tokio::test]
    async fn registry_register_and_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        assert!(registry.contains("echo"));
        assert_eq!(registry.names(), vec!["echo"]);

        let tool = registry.get("echo").unwrap();
        let out = tool.execute(args(json!({"text": "hi"}))).await.unwrap();
        assert_eq!(out, json!("hi"));
    }

    #[test]
    fn registry_resolves_in_requested_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let defs = registry.resolve(&["echo".into()]).unwrap();
        assert_eq!(defs[0].inputs.len(), 1);

        let err = registry.resolve(&["nope".into()]).unwrap_err();
        assert_eq!(err, ToolError::NotFound("nope".into()));
    }

    #[test]
    fn tool_set_lookup() {
        let set = ToolSet::new(vec![pension_definition()]);
        assert!(set.get("calculate_pension").is_some());
        assert!(set.get("shell").is_none());
        assert_eq!(set.len(), 1);
    }
}
