//! Argument accessors shared by the built-in tools.
//!
//! Arguments have already been validated against the tool's declared inputs
//! by the time `execute` runs; these helpers only do the typed extraction and
//! the domain-range checks the schema can't express.

use agentflow_core::error::ToolError;
use serde_json::{Map, Value};

pub(crate) struct Args<'a> {
    tool: &'static str,
    map: &'a Map<String, Value>,
}

impl<'a> Args<'a> {
    pub(crate) fn new(tool: &'static str, map: &'a Map<String, Value>) -> Self {
        Self { tool, map }
    }

    pub(crate) fn invalid(&self, field: &str, reason: impl Into<String>) -> ToolError {
        ToolError::InvalidArguments {
            tool_name: self.tool.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    fn present(&self, field: &str) -> Option<&'a Value> {
        self.map.get(field).filter(|v| !v.is_null())
    }

    pub(crate) fn str(&self, field: &str) -> Result<&'a str, ToolError> {
        self.opt_str(field)?
            .ok_or_else(|| self.invalid(field, "missing required argument"))
    }

    pub(crate) fn opt_str(&self, field: &str) -> Result<Option<&'a str>, ToolError> {
        match self.present(field) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(Some)
                .ok_or_else(|| self.invalid(field, "expected string")),
        }
    }

    pub(crate) fn f64(&self, field: &str) -> Result<f64, ToolError> {
        self.present(field)
            .and_then(Value::as_f64)
            .ok_or_else(|| self.invalid(field, "expected float"))
    }

    pub(crate) fn i64(&self, field: &str) -> Result<i64, ToolError> {
        self.opt_i64(field)?
            .ok_or_else(|| self.invalid(field, "missing required argument"))
    }

    pub(crate) fn opt_i64(&self, field: &str) -> Result<Option<i64>, ToolError> {
        match self.present(field) {
            None => Ok(None),
            Some(v) => v
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.invalid(field, "expected integer")),
        }
    }

    pub(crate) fn object(&self, field: &str) -> Result<&'a Map<String, Value>, ToolError> {
        self.present(field)
            .and_then(Value::as_object)
            .ok_or_else(|| self.invalid(field, "expected dict"))
    }
}

/// Deterministic hash for mock data, so the same input always yields the same record.
pub(crate) fn stable_hash(key: &str) -> u32 {
    key.bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32))
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
