use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::llm::ReferenceList;
use crate::models::RunResult;

pub fn load_document<P: AsRef<Path>>(path: P) -> Result<Value> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| Error::Document {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    serde_json::from_str(&text).map_err(|e| Error::Document {
        path: path.to_path_buf(),
        message: format!("invalid JSON: {}", e),
    })
}

pub fn load_reference_list<P: AsRef<Path>>(path: P) -> Result<ReferenceList> {
    load_document(path).map(ReferenceList::new)
}

pub fn write_run_result<P: AsRef<Path>>(result: &RunResult, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(result)?;
    fs::write(path, json).map_err(|e| Error::Document {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    tracing::info!("Results written to {}", path.display());
    Ok(())
}
