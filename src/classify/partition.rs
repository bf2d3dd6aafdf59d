use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::models::{module_key, normalize_module_name, Entry, ModuleBatch, UNGROUPED_MODULE};

/// Splits an input document (module name → entry list) into batches.
///
/// Batches follow the document's key order and entries keep their input
/// order. Keys are taken verbatim, except that the empty key goes to the
/// ungrouped bucket. Any structural problem is fatal: nothing is classified
/// from a document that fails here.
pub fn partition(document: &Value) -> Result<Vec<ModuleBatch>> {
    let modules = document.as_object().ok_or_else(|| {
        Error::InputStructure(format!(
            "expected a mapping of module name to entries, got {}",
            describe(document)
        ))
    })?;

    let mut batches: Vec<ModuleBatch> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for (raw_name, entries) in modules {
        let module_name = module_key(raw_name);
        let entries = entries.as_array().ok_or_else(|| {
            Error::InputStructure(format!(
                "module '{}' must hold a list of entries, got {}",
                raw_name,
                describe(entries)
            ))
        })?;

        let slot = *slots.entry(module_name.clone()).or_insert_with(|| {
            batches.push(ModuleBatch::new(module_name.clone()));
            batches.len() - 1
        });

        for value in entries {
            batches[slot].entries.push(Entry::from_value(&module_name, value)?);
        }
    }

    for batch in &batches {
        let mut seen = HashSet::new();
        for entry in &batch.entries {
            if !seen.insert(entry.name.as_str()) {
                return Err(Error::InputStructure(format!(
                    "duplicate entry name '{}' in module '{}'",
                    entry.name, batch.module_name
                )));
            }
        }
    }

    Ok(batches)
}

/// Groups flat records (one object per spreadsheet row) into the
/// module → entries mapping `partition` expects. Records without a usable
/// value in `group_by` land in the ungrouped bucket.
pub fn group_records(records: &Value, group_by: &str) -> Result<Value> {
    let rows = records.as_array().ok_or_else(|| {
        Error::InputStructure(format!(
            "expected a list of records to group, got {}",
            describe(records)
        ))
    })?;

    let mut grouped: Map<String, Value> = Map::new();
    for row in rows {
        let record = row.as_object().ok_or_else(|| {
            Error::InputStructure(format!("record is not an object: {}", row))
        })?;

        let module_name = match record.get(group_by) {
            Some(Value::String(s)) => normalize_module_name(s),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => UNGROUPED_MODULE.to_string(),
        };

        if let Value::Array(entries) = grouped
            .entry(module_name)
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            entries.push(row.clone());
        }
    }

    Ok(Value::Object(grouped))
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
