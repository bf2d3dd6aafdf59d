use serde_json::Value;

use crate::error::{Error, Result};

/// Decodes a raw model reply into JSON. Accepts a bare JSON document, a
/// fenced code block, or the first balanced object embedded in prose.
pub fn decode_payload(response: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(response.trim()) {
        return Ok(value);
    }

    let json_str = extract_json(response)?;

    serde_json::from_str(&json_str)
        .map_err(|e| Error::PayloadParse(format!("Failed to parse model response: {}", e)))
}

fn extract_json(text: &str) -> Result<String> {
    // Try to find JSON block in markdown code blocks
    if let Some(start) = text.find("```json") {
        let start = start + 7;
        if let Some(end) = text[start..].find("```") {
            return Ok(text[start..start + end].trim().to_string());
        }
    }

    // Try plain code block
    if let Some(start) = text.find("```") {
        let start = start + 3;
        // Skip any language identifier on the same line
        let start = text[start..]
            .find('\n')
            .map(|i| start + i + 1)
            .unwrap_or(start);
        if let Some(end) = text[start..].find("```") {
            let content = text[start..start + end].trim();
            if content.starts_with('{') || content.starts_with('[') {
                return Ok(content.to_string());
            }
        }
    }

    // Try to find raw JSON object
    if let Some(start) = text.find('{') {
        let mut depth = 0;
        let mut end = start;
        let mut in_string = false;
        let mut escape_next = false;

        for (i, c) in text[start..].char_indices() {
            if escape_next {
                escape_next = false;
                continue;
            }

            match c {
                '\\' if in_string => escape_next = true,
                '"' => in_string = !in_string,
                '{' if !in_string => depth += 1,
                '}' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        end = start + i + 1;
                        break;
                    }
                }
                _ => {}
            }
        }

        if depth == 0 && end > start {
            return Ok(text[start..end].to_string());
        }
    }

    Err(Error::PayloadParse("No valid JSON found in response".to_string()))
}
