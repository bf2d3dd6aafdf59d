use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Bucket for entries whose module name is missing or blank.
pub const UNGROUPED_MODULE: &str = "ungrouped";

/// One row of a data dictionary.
///
/// `attributes` holds the full source record, including `name`. Keys are kept
/// in a sorted map so the record always serializes the same way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub name: String,
    pub module_name: String,
    pub attributes: Map<String, Value>,
}

impl Entry {
    pub fn from_value(module_name: &str, value: &Value) -> Result<Self> {
        let attributes = value.as_object().ok_or_else(|| {
            Error::InputStructure(format!(
                "Entry in module '{}' is not an object: {}",
                module_name, value
            ))
        })?;

        let name = match attributes.get("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
            Some(other) => {
                return Err(Error::InputStructure(format!(
                    "Entry in module '{}' has an invalid name: {}",
                    module_name, other
                )))
            }
            None => {
                return Err(Error::InputStructure(format!(
                    "Entry in module '{}' is missing 'name'",
                    module_name
                )))
            }
        };

        Ok(Self {
            name,
            module_name: module_name.to_string(),
            attributes: attributes.clone(),
        })
    }
}

/// Module name for a key of the input mapping. Keys are used verbatim; only
/// the empty key means "no module".
pub fn module_key(raw: &str) -> String {
    if raw.is_empty() {
        UNGROUPED_MODULE.to_string()
    } else {
        raw.to_string()
    }
}

/// Normalizes a module value read from a spreadsheet cell, mapping blank or
/// null-like cells to the ungrouped bucket. Spreadsheet exports write missing
/// groups as "null", "None" or "nan".
pub fn normalize_module_name(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.to_lowercase().as_str() {
        "" | "null" | "none" | "nan" => UNGROUPED_MODULE.to_string(),
        _ => trimmed.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleBatch {
    pub module_name: String,
    pub entries: Vec<Entry>,
}

impl ModuleBatch {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }
}
