use serde::{Deserialize, Serialize};

/// Sentinel for "no matching Common Data Element".
pub const NO_CDE_MATCH: &str = "No CDE match";
/// Sentinel for "no matching Case Report Form".
pub const NO_CRF_MATCH: &str = "No CRF match";

pub const FIELD_MAPPING_TYPE: &str = "standards_mapping_type";
pub const FIELD_MAPPING_LABEL: &str = "standards_mapping_label";
pub const FIELD_CONFIDENCE: &str = "confidence_level";

/// The verdict for a single entry. All three fields are always populated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub standards_mapping_type: String,
    pub standards_mapping_label: String,
    pub confidence_level: String,
}

impl ClassificationResult {
    pub fn new(
        mapping_type: impl Into<String>,
        mapping_label: impl Into<String>,
        confidence: impl Into<String>,
    ) -> Self {
        Self {
            standards_mapping_type: mapping_type.into(),
            standards_mapping_label: mapping_label.into(),
            confidence_level: confidence.into(),
        }
    }

    pub fn no_match() -> Self {
        Self::new(NO_CDE_MATCH, NO_CRF_MATCH, NO_CDE_MATCH)
    }

    pub fn is_no_match(&self) -> bool {
        *self == Self::no_match()
    }

    /// Sentinel used when `field` could not be read from a response.
    pub fn sentinel_for(field: &str) -> &'static str {
        match field {
            FIELD_MAPPING_LABEL => NO_CRF_MATCH,
            _ => NO_CDE_MATCH,
        }
    }
}

impl Default for ClassificationResult {
    fn default() -> Self {
        Self::no_match()
    }
}

/// Why an entry's result is (partly) a fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackCause {
    Transport(String),
    PayloadParse(String),
    PartialFields(Vec<&'static str>),
    MissingEntry,
}

impl FallbackCause {
    pub fn kind(&self) -> &'static str {
        match self {
            FallbackCause::Transport(_) => "transport",
            FallbackCause::PayloadParse(_) => "payload_parse",
            FallbackCause::PartialFields(_) => "partial_fields",
            FallbackCause::MissingEntry => "missing_entry",
        }
    }
}

impl std::fmt::Display for FallbackCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackCause::Transport(msg) => write!(f, "transport failure: {}", msg),
            FallbackCause::PayloadParse(msg) => write!(f, "unparseable payload: {}", msg),
            FallbackCause::PartialFields(fields) => {
                write!(f, "missing fields: {}", fields.join(", "))
            }
            FallbackCause::MissingEntry => write!(f, "entry absent from module response"),
        }
    }
}

/// A resolved result plus the reason it fell back, if it did.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub result: ClassificationResult,
    pub cause: Option<FallbackCause>,
}

impl Resolution {
    pub fn clean(result: ClassificationResult) -> Self {
        Self { result, cause: None }
    }

    pub fn fallback(cause: FallbackCause) -> Self {
        Self {
            result: ClassificationResult::no_match(),
            cause: Some(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_triple() {
        let result = ClassificationResult::no_match();
        assert_eq!(result.standards_mapping_type, "No CDE match");
        assert_eq!(result.standards_mapping_label, "No CRF match");
        assert_eq!(result.confidence_level, "No CDE match");
        assert!(result.is_no_match());
        assert_eq!(ClassificationResult::default(), result);
    }

    #[test]
    fn test_sentinel_for_field() {
        assert_eq!(ClassificationResult::sentinel_for(FIELD_MAPPING_TYPE), NO_CDE_MATCH);
        assert_eq!(ClassificationResult::sentinel_for(FIELD_MAPPING_LABEL), NO_CRF_MATCH);
        assert_eq!(ClassificationResult::sentinel_for(FIELD_CONFIDENCE), NO_CDE_MATCH);
    }
}
