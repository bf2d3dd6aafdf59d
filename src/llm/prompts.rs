use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::models::{Entry, EntryOutcome, ModuleBatch};

pub const SYSTEM_PROMPT: &str = r#"You are a helpful assistant designed to output JSON.
You match data dictionary entries against the HEAL Core Common Data Elements (CDE) list.

For a single entry, respond with valid JSON matching this exact schema:
{
    "standards_mapping_type": "string (the matching CDE type, or 'No CDE match')",
    "standards_mapping_label": "string (the matching CRF/CDE label, or 'No CRF match')",
    "confidence_level": "High|Medium|Low (or 'No CDE match')"
}

When asked about several entries at once, respond with:
{
    "entries": [
        {
            "name": "string (the entry name, copied verbatim)",
            "standards_mapping_type": "string",
            "standards_mapping_label": "string",
            "confidence_level": "string"
        }
    ]
}

Guidelines:
- Only report a match you have clear evidence for from the entry's attributes
- Use 'No CDE match' / 'No CRF match' when nothing on the list corresponds
- Never invent CDE names that are not on the master list when one is provided"#;

/// Canonical category definitions (the "master CDE list"). Opaque to the
/// classifier core; it is only serialized into prompts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceList(Value);

impl ReferenceList {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// A fully rendered prompt. Identical inputs always render byte-identical
/// requests, which is what the response cache keys on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRequest {
    pub module_name: String,
    pub entry_names: Vec<String>,
    pub system: String,
    pub prompt: String,
}

impl ClassificationRequest {
    pub fn cache_key(&self) -> String {
        format!("{}\n\n{}", self.system, self.prompt)
    }

    pub fn estimate_tokens(&self) -> usize {
        // Rough estimate: ~4 characters per token
        (self.system.len() + self.prompt.len()) / 4
    }
}

/// Builds the request for one entry. `entry_number` is 1-based within the
/// module. `prior` carries results already resolved for earlier entries and
/// is only set by the module-context strategy.
pub fn build_entry_request(
    entry: &Entry,
    entry_number: usize,
    reference: Option<&ReferenceList>,
    prior: Option<&[EntryOutcome]>,
) -> Result<ClassificationRequest> {
    ensure_named(entry)?;

    let mut payload = json!({
        "entry_data": {
            "entry_number": entry_number,
            "data": entry.attributes,
        }
    });
    if let Some(reference) = reference {
        payload["master_cde_list"] = reference.as_value().clone();
    }
    if let Some(prior) = prior {
        payload["prior_classifications"] = serde_json::to_value(prior)?;
    }

    let prompt = format!(
        "Please analyze the following entry for the module '{}' and determine if it corresponds \
         to the HEAL Core Common Data Elements (CDE) list. Specify the 'standards_mapping_type', \
         'standards_mapping_label', and 'confidence_level'. Respond in JSON format.\n\n{}",
        entry.module_name,
        serde_json::to_string_pretty(&payload)?
    );

    Ok(ClassificationRequest {
        module_name: entry.module_name.clone(),
        entry_names: vec![entry.name.clone()],
        system: SYSTEM_PROMPT.to_string(),
        prompt,
    })
}

/// Builds a single request covering every entry of a module.
pub fn build_module_request(
    batch: &ModuleBatch,
    reference: Option<&ReferenceList>,
) -> Result<ClassificationRequest> {
    if batch.is_empty() {
        return Err(Error::InputStructure(format!(
            "Module '{}' has no entries to classify",
            batch.module_name
        )));
    }

    let mut rendered = Vec::with_capacity(batch.len());
    for (i, entry) in batch.entries.iter().enumerate() {
        ensure_named(entry)?;
        rendered.push(format!(
            "Entry {}: {}",
            i + 1,
            serde_json::to_string_pretty(&entry.attributes)?
        ));
    }

    let mut prompt = format!(
        "Please analyze the following entries for the module '{}' and determine if they \
         correspond to the HEAL Core Common Data Elements (CDE) list. For each entry, specify \
         the 'standards_mapping_type', 'standards_mapping_label', and 'confidence_level'. \
         Respond in JSON format as {{\"entries\": [...]}} with one object per entry, \
         in the same order, each including the entry's 'name'.\n\n{}",
        batch.module_name,
        rendered.join("\n\n")
    );

    if let Some(reference) = reference {
        prompt.push_str("\n\nMaster CDE list:\n");
        prompt.push_str(&serde_json::to_string_pretty(reference.as_value())?);
    }

    Ok(ClassificationRequest {
        module_name: batch.module_name.clone(),
        entry_names: batch.entries.iter().map(|e| e.name.clone()).collect(),
        system: SYSTEM_PROMPT.to_string(),
        prompt,
    })
}

fn ensure_named(entry: &Entry) -> Result<()> {
    if entry.name.trim().is_empty() {
        return Err(Error::InputStructure(format!(
            "Entry in module '{}' is missing 'name'",
            entry.module_name
        )));
    }
    Ok(())
}
