use async_trait::async_trait;

use crate::llm::prompts::{build_entry_request, build_module_request, ReferenceList};
use crate::llm::resolver::{resolve_entry, resolve_module};
use crate::llm::ClassificationClient;
use crate::models::{ClassifiedEntry, EntryOutcome, FallbackCause, ModuleBatch, Resolution};

/// How a module's entries are turned into classification calls.
///
/// Implementations must return one `ClassifiedEntry` per batch entry, in
/// batch order, and must never fail: every problem becomes a fallback.
#[async_trait]
pub trait ClassificationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn classify_module(
        &self,
        client: &dyn ClassificationClient,
        batch: &ModuleBatch,
        reference: Option<&ReferenceList>,
    ) -> Vec<ClassifiedEntry>;
}

/// One request per entry, sent strictly in input order.
#[derive(Debug, Clone, Default)]
pub struct PerEntryStrategy {
    module_context: bool,
}

impl PerEntryStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Includes the results already resolved for earlier entries of the
    /// module in each prompt.
    pub fn with_module_context() -> Self {
        Self {
            module_context: true,
        }
    }
}

#[async_trait]
impl ClassificationStrategy for PerEntryStrategy {
    fn name(&self) -> &'static str {
        if self.module_context {
            "module-context"
        } else {
            "per-entry"
        }
    }

    async fn classify_module(
        &self,
        client: &dyn ClassificationClient,
        batch: &ModuleBatch,
        reference: Option<&ReferenceList>,
    ) -> Vec<ClassifiedEntry> {
        let mut classified = Vec::with_capacity(batch.len());
        let mut prior: Vec<EntryOutcome> = Vec::new();

        for (i, entry) in batch.entries.iter().enumerate() {
            let context = self.module_context.then_some(prior.as_slice());

            let resolution = match build_entry_request(entry, i + 1, reference, context) {
                Ok(request) => {
                    tracing::debug!(
                        module = %batch.module_name,
                        entry = %entry.name,
                        "Prompt: {}",
                        request.prompt
                    );
                    let raw = client.classify(&request).await;
                    if let Ok(text) = &raw {
                        tracing::debug!(
                            module = %batch.module_name,
                            entry = %entry.name,
                            "Raw response: {}",
                            text
                        );
                    }
                    resolve_entry(raw)
                }
                Err(e) => Resolution::fallback(FallbackCause::Transport(format!(
                    "request could not be built: {}",
                    e
                ))),
            };

            log_fallback(&batch.module_name, &entry.name, &resolution);

            if self.module_context {
                prior.push(EntryOutcome {
                    name: entry.name.clone(),
                    result: resolution.result.clone(),
                });
            }

            classified.push(ClassifiedEntry {
                name: entry.name.clone(),
                resolution,
            });
        }

        classified
    }
}

/// A single request covering the whole module.
#[derive(Debug, Clone, Default)]
pub struct PerModuleStrategy;

#[async_trait]
impl ClassificationStrategy for PerModuleStrategy {
    fn name(&self) -> &'static str {
        "per-module"
    }

    async fn classify_module(
        &self,
        client: &dyn ClassificationClient,
        batch: &ModuleBatch,
        reference: Option<&ReferenceList>,
    ) -> Vec<ClassifiedEntry> {
        if batch.is_empty() {
            return Vec::new();
        }

        let names = batch.entry_names();
        let resolutions = match build_module_request(batch, reference) {
            Ok(request) => {
                tracing::debug!(module = %batch.module_name, "Prompt: {}", request.prompt);
                let raw = client.classify(&request).await;
                if let Ok(text) = &raw {
                    tracing::debug!(module = %batch.module_name, "Raw response: {}", text);
                }
                resolve_module(raw, &names)
            }
            Err(e) => vec![
                Resolution::fallback(FallbackCause::Transport(format!(
                    "request could not be built: {}",
                    e
                )));
                names.len()
            ],
        };

        names
            .into_iter()
            .zip(resolutions)
            .map(|(name, resolution)| {
                log_fallback(&batch.module_name, name, &resolution);
                ClassifiedEntry {
                    name: name.to_string(),
                    resolution,
                }
            })
            .collect()
    }
}

fn log_fallback(module: &str, entry: &str, resolution: &Resolution) {
    if let Some(cause) = &resolution.cause {
        tracing::warn!(
            module = %module,
            entry = %entry,
            kind = cause.kind(),
            "Falling back: {}",
            cause
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::llm::ClassificationRequest;
    use crate::models::{ClassificationResult, Entry};
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every prompt and answers from a fixed script.
    struct ScriptedClient {
        prompts: Mutex<Vec<String>>,
        reply: fn(&ClassificationRequest) -> Result<String>,
    }

    impl ScriptedClient {
        fn new(reply: fn(&ClassificationRequest) -> Result<String>) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                reply,
            }
        }
    }

    #[async_trait]
    impl ClassificationClient for ScriptedClient {
        async fn classify(&self, request: &ClassificationRequest) -> Result<String> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            (self.reply)(request)
        }

        fn model(&self) -> &str {
            "scripted"
        }

        fn name(&self) -> &str {
            "Scripted"
        }
    }

    fn batch(names: &[&str]) -> ModuleBatch {
        ModuleBatch {
            module_name: "Demographics".to_string(),
            entries: names
                .iter()
                .map(|n| Entry::from_value("Demographics", &json!({"name": n})).unwrap())
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_per_entry_isolates_failures() {
        let client = ScriptedClient::new(|request| {
            if request.entry_names[0] == "age" {
                Err(Error::Transport("boom".into()))
            } else {
                Ok(r#"{"standards_mapping_type": "CDE", "standards_mapping_label": "Sex", "confidence_level": "High"}"#.into())
            }
        });

        let classified = PerEntryStrategy::new()
            .classify_module(&client, &batch(&["age", "sex"]), None)
            .await;

        assert_eq!(classified.len(), 2);
        assert_eq!(classified[0].name, "age");
        assert!(classified[0].resolution.result.is_no_match());
        assert_eq!(
            classified[1].resolution.result,
            ClassificationResult::new("CDE", "Sex", "High")
        );
    }

    #[tokio::test]
    async fn test_module_context_carries_prior_results() {
        let client = ScriptedClient::new(|_| {
            Ok(r#"{"standards_mapping_type": "CDE", "standards_mapping_label": "Age", "confidence_level": "Low"}"#.into())
        });

        PerEntryStrategy::with_module_context()
            .classify_module(&client, &batch(&["age", "sex"]), None)
            .await;

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("\"prior_classifications\": []"));
        assert!(prompts[1].contains("\"standards_mapping_label\": \"Age\""));
    }

    #[tokio::test]
    async fn test_per_module_makes_one_call() {
        let client = ScriptedClient::new(|_| {
            Ok(r#"{"entries": [{"name": "sex", "standards_mapping_type": "CDE", "standards_mapping_label": "Sex", "confidence_level": "High"}]}"#.into())
        });

        let classified = PerModuleStrategy
            .classify_module(&client, &batch(&["age", "sex"]), None)
            .await;

        assert_eq!(client.prompts.lock().unwrap().len(), 1);
        assert_eq!(classified[0].name, "age");
        assert_eq!(classified[0].resolution.cause, Some(FallbackCause::MissingEntry));
        assert_eq!(classified[1].resolution.result.standards_mapping_label, "Sex");
    }

    #[tokio::test]
    async fn test_per_module_skips_empty_batches() {
        let client = ScriptedClient::new(|_| Ok("{}".into()));
        let classified = PerModuleStrategy
            .classify_module(&client, &ModuleBatch::new("Empty"), None)
            .await;

        assert!(classified.is_empty());
        assert!(client.prompts.lock().unwrap().is_empty());
    }
}
