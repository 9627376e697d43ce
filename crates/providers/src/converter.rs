//! Tool schema conversion: provider-neutral [`ToolDefinition`]s to a
//! provider's function-calling wire format.
//!
//! Only OpenAI's strict function schema is implemented. The output is fully
//! deterministic: the same definitions always serialize to the same bytes.

use agentflow_core::agent::ProviderKind;
use agentflow_core::error::ToolConversionError;
use agentflow_core::provider::{FunctionSpec, ParameterSchema, PropertySchema, ProviderFunctionSpec};
use agentflow_core::tool::{InputType, ToolDefinition};
use std::collections::{BTreeMap, HashSet};

/// Convert an agent's tools for the target provider.
pub fn convert(
    tools: &[ToolDefinition],
    provider: ProviderKind,
) -> Result<Vec<ProviderFunctionSpec>, ToolConversionError> {
    match provider {
        ProviderKind::OpenAi => convert_openai(tools),
        ProviderKind::Anthropic | ProviderKind::Gemini => Err(
            ToolConversionError::UnsupportedProvider(provider.to_string()),
        ),
    }
}

fn convert_openai(tools: &[ToolDefinition]) -> Result<Vec<ProviderFunctionSpec>, ToolConversionError> {
    let mut seen = HashSet::new();
    tools
        .iter()
        .map(|tool| {
            if !seen.insert(tool.name.as_str()) {
                return Err(ToolConversionError::DuplicateTool(tool.name.clone()));
            }
            openai_function(tool)
        })
        .collect()
}

fn openai_function(tool: &ToolDefinition) -> Result<ProviderFunctionSpec, ToolConversionError> {
    if tool.name.trim().is_empty() {
        return Err(ToolConversionError::EmptyToolName);
    }
    if tool.description.trim().is_empty() {
        return Err(ToolConversionError::EmptyDescription {
            tool: tool.name.clone(),
        });
    }

    let mut properties = BTreeMap::new();
    let mut required = Vec::with_capacity(tool.inputs.len());

    for input in &tool.inputs {
        if input.name.trim().is_empty() {
            return Err(ToolConversionError::EmptyInputName {
                tool: tool.name.clone(),
            });
        }

        let mut property = openai_property(input.input_type);
        property.description = Some(input.description.clone());

        if properties.insert(input.name.clone(), property).is_some() {
            return Err(ToolConversionError::DuplicateInput {
                tool: tool.name.clone(),
                input: input.name.clone(),
            });
        }
        // Strict mode wants every property listed, optional or not.
        required.push(input.name.clone());
    }

    Ok(ProviderFunctionSpec {
        kind: "function".into(),
        function: FunctionSpec {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: ParameterSchema {
                schema_type: "object".into(),
                properties,
                required,
                additional_properties: false,
            },
            strict: true,
        },
    })
}

fn openai_property(input_type: InputType) -> PropertySchema {
    match input_type {
        InputType::String | InputType::Any => PropertySchema::of_type("string"),
        InputType::Integer => PropertySchema::of_type("integer"),
        InputType::Float => PropertySchema::of_type("number"),
        InputType::Boolean => PropertySchema::of_type("boolean"),
        InputType::List => PropertySchema {
            items: Some(Box::new(PropertySchema::of_type("string"))),
            ..PropertySchema::of_type("array")
        },
        InputType::Dict => PropertySchema {
            properties: Some(BTreeMap::new()),
            additional_properties: Some(false),
            ..PropertySchema::of_type("object")
        },
    }
}
