//! Turns raw classifier replies into results that are always complete.
//!
//! Resolution runs in three tiers: a failed call or an undecodable payload
//! yields the all-sentinel result, and a decoded payload with missing fields
//! keeps what it has and fills only the gaps.

use serde_json::{Map, Value};

use crate::error::Result;
use crate::llm::parser::decode_payload;
use crate::models::{
    ClassificationResult, FallbackCause, Resolution, FIELD_CONFIDENCE, FIELD_MAPPING_LABEL,
    FIELD_MAPPING_TYPE,
};

const RESULT_FIELDS: [&str; 3] = [FIELD_MAPPING_TYPE, FIELD_MAPPING_LABEL, FIELD_CONFIDENCE];
const WRAPPER_KEYS: [&str; 2] = ["entries", "results"];

/// Resolves the reply to a single-entry request.
pub fn resolve_entry(raw: Result<String>) -> Resolution {
    let text = match raw {
        Ok(text) => text,
        Err(e) => return Resolution::fallback(FallbackCause::Transport(e.to_string())),
    };

    let value = match decode_payload(&text) {
        Ok(value) => value,
        Err(e) => return Resolution::fallback(FallbackCause::PayloadParse(e.to_string())),
    };

    match locate_result_object(&value) {
        Some(object) => resolve_fields(object),
        None => Resolution::fallback(FallbackCause::PayloadParse(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        ))),
    }
}

/// Resolves the reply to a whole-module request. Always returns exactly one
/// resolution per name in `names`, in the same order.
pub fn resolve_module(raw: Result<String>, names: &[&str]) -> Vec<Resolution> {
    let all = |cause: FallbackCause| vec![Resolution::fallback(cause); names.len()];

    let text = match raw {
        Ok(text) => text,
        Err(e) => return all(FallbackCause::Transport(e.to_string())),
    };

    let value = match decode_payload(&text) {
        Ok(value) => value,
        Err(e) => return all(FallbackCause::PayloadParse(e.to_string())),
    };

    // A one-entry module may be answered with a bare result object
    if let [_] = names {
        if let Some(object) = value.as_object().filter(|o| has_result_fields(o)) {
            return vec![resolve_fields(object)];
        }
    }

    let items: Vec<&Map<String, Value>> = match entry_list(&value) {
        Some(items) => items,
        None => {
            // A module reply may also be keyed by entry name
            if let Some(object) = value.as_object() {
                return names
                    .iter()
                    .map(|name| match object.get(*name).and_then(Value::as_object) {
                        Some(fields) => resolve_fields(fields),
                        None => Resolution::fallback(FallbackCause::MissingEntry),
                    })
                    .collect();
            }
            return all(FallbackCause::PayloadParse(format!(
                "expected a list of entries, got {}",
                json_kind(&value)
            )));
        }
    };

    names
        .iter()
        .enumerate()
        .map(|(position, name)| {
            let named = items
                .iter()
                .find(|item| item.get("name").and_then(Value::as_str) == Some(*name));
            let positional = items
                .get(position)
                .filter(|item| !item.contains_key("name"));

            match named.or(positional) {
                Some(fields) => resolve_fields(fields),
                None => Resolution::fallback(FallbackCause::MissingEntry),
            }
        })
        .collect()
}

fn resolve_fields(object: &Map<String, Value>) -> Resolution {
    let mut missing = Vec::new();
    let mut read = |field: &'static str| match object.get(field).and_then(scalar_text) {
        Some(value) => value,
        None => {
            missing.push(field);
            ClassificationResult::sentinel_for(field).to_string()
        }
    };

    let result = ClassificationResult {
        standards_mapping_type: read(FIELD_MAPPING_TYPE),
        standards_mapping_label: read(FIELD_MAPPING_LABEL),
        confidence_level: read(FIELD_CONFIDENCE),
    };

    if missing.is_empty() {
        Resolution::clean(result)
    } else {
        Resolution {
            result,
            cause: Some(FallbackCause::PartialFields(missing)),
        }
    }
}

/// Finds the object carrying the result fields: the payload itself, or the
/// first result of a top-level array or of a list wrapped under
/// `entries`/`results`.
fn locate_result_object(value: &Value) -> Option<&Map<String, Value>> {
    if let Some(object) = value.as_object().filter(|o| has_result_fields(o)) {
        return Some(object);
    }

    entry_list(value)
        .and_then(|items| items.into_iter().next())
        .or_else(|| value.as_object())
}

fn has_result_fields(object: &Map<String, Value>) -> bool {
    RESULT_FIELDS.iter().any(|f| object.contains_key(*f))
}

fn entry_list(value: &Value) -> Option<Vec<&Map<String, Value>>> {
    let array = match value {
        Value::Array(items) => items,
        Value::Object(object) => WRAPPER_KEYS
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_array))?,
        _ => return None,
    };
    Some(array.iter().filter_map(Value::as_object).collect())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
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
