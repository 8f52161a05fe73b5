//! Parsing and validating the model's JSON reply.
//!
//! Models wrap JSON in Markdown fences or add sentences around it often
//! enough that the first complete `{...}` object is extracted before
//! parsing. The parsed value must then satisfy the flow's output schema.

use serde::de::DeserializeOwned;
use tracing::{trace, warn};

use crate::error::FlowError;

/// Return the first complete JSON object in `text`, if any.
///
/// Scanning starts at each `{` in turn and stops after exactly one value, so
/// prose before or after the object (braces included) is ignored.
pub fn extract_json_object(text: &str) -> Option<&str> {
    text.match_indices('{').find_map(|(start, _)| {
        let rest = text.get(start..)?;
        let mut values = serde_json::Deserializer::from_str(rest).into_iter::<serde_json::Value>();
        match values.next() {
            Some(Ok(serde_json::Value::Object(_))) => rest.get(..values.byte_offset()),
            _ => None,
        }
    })
}

/// Schema violations of `value`, one formatted line each. Empty when valid.
pub fn schema_violations(schema: &serde_json::Value, value: &serde_json::Value) -> Vec<String> {
    let validator = match jsonschema::validator_for(schema) {
        Ok(v) => v,
        Err(e) => {
            warn!("output schema failed to compile, skipping validation: {e}");
            return Vec::new();
        }
    };

    validator
        .iter_errors(value)
        .map(|e| format!("  - {}: {e}", e.instance_path()))
        .collect()
}

/// Extract, parse, schema-check and deserialize a model reply.
pub fn parse_output<T: DeserializeOwned>(
    text: &str,
    schema: &serde_json::Value,
) -> Result<T, FlowError> {
    trace!("model reply: {text}");
    let candidate = extract_json_object(text)
        .ok_or_else(|| FlowError::MalformedOutput("no JSON object in reply".to_string()))?;
    let value: serde_json::Value = serde_json::from_str(candidate)
        .map_err(|e| FlowError::MalformedOutput(e.to_string()))?;

    let violations = schema_violations(schema, &value);
    if !violations.is_empty() {
        return Err(FlowError::SchemaViolation(violations));
    }

    serde_json::from_value(value).map_err(|e| FlowError::SchemaViolation(vec![format!("  - {e}")]))
}
