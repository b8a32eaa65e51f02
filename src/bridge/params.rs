use crate::adapter::StringMap;
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is a JSON {0}, expected an object")]
    NotAnObject(&'static str),
}

/// A decoded key/value payload plus the keys that could not be represented
/// as strings
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DecodedParams {
    pub entries: StringMap,
    pub skipped: Vec<String>,
}

/// Decode a flat JSON object into a string map.
///
/// Strings are taken verbatim, numbers and booleans are stringified. `null`,
/// arrays and nested objects are reported in `skipped`. An empty payload
/// decodes to an empty map.
pub fn decode_params(encoded: &str) -> Result<DecodedParams, ParamsError> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Ok(DecodedParams::default());
    }

    let object = match serde_json::from_str::<Value>(encoded)? {
        Value::Object(object) => object,
        other => return Err(ParamsError::NotAnObject(kind_of(&other))),
    };

    let mut decoded = DecodedParams::default();
    for (key, value) in object {
        match value {
            Value::String(text) => {
                decoded.entries.insert(key, text);
            }
            Value::Number(number) => {
                decoded.entries.insert(key, number.to_string());
            }
            Value::Bool(flag) => {
                decoded.entries.insert(key, flag.to_string());
            }
            Value::Null | Value::Array(_) | Value::Object(_) => decoded.skipped.push(key),
        }
    }

    Ok(decoded)
}

/// Encode a string map as the flat JSON object [`decode_params`] accepts
pub fn encode_params(params: &StringMap) -> String {
    let object: Map<String, Value> = params
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    Value::Object(object).to_string()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
