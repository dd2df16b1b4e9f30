// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Parameter Merge Policy
//!
//! Decides which key/value parameters reach the chart for a lifecycle request.
//!
//! The effective set is either the plan-declared defaults or, when the operator
//! allows caller parameters and the caller supplied some, the caller's set.
//! Caller values **replace** plan defaults as a whole; the two maps are never
//! merged key by key.
//!
//! When caller parameters are disallowed the raw payload is not decoded at all,
//! so a malformed payload cannot fail a request that would have ignored it.

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Key/value parameters handed to the deployment engine
pub type Parameters = BTreeMap<String, Value>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParameterError {
    #[error("Error parsing {operation} parameters: expected a JSON object, got {found}")]
    NotAnObject {
        operation: &'static str,
        found: &'static str,
    },
}

/// Decode caller-supplied raw parameters into a key/value map.
///
/// Absent or `null` payloads decode to an empty map.
pub fn decode_parameters(
    operation: &'static str,
    raw: Option<&Value>,
) -> Result<Parameters, ParameterError> {
    match raw {
        None | Some(Value::Null) => Ok(Parameters::new()),
        Some(Value::Object(map)) => Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        Some(other) => Err(ParameterError::NotAnObject {
            operation,
            found: json_kind(other),
        }),
    }
}

/// Decode caller parameters only when the operator policy honours them.
///
/// Returns `None` when the policy ignores caller input for this operation.
pub fn decode_if_allowed(
    operation: &'static str,
    allowed: bool,
    raw: Option<&Value>,
) -> Result<Option<Parameters>, ParameterError> {
    if !allowed {
        return Ok(None);
    }
    decode_parameters(operation, raw).map(Some)
}

/// Combine plan defaults with decoded caller parameters.
pub fn effective_parameters(defaults: &Parameters, caller: Option<Parameters>) -> Parameters {
    match caller {
        Some(caller) if !caller.is_empty() => caller,
        _ => defaults.clone(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
