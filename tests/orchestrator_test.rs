use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use cdedetective::llm::ClassificationRequest;
use cdedetective::{
    ClassificationClient, ClassificationOrchestrator, ClassificationResult, Error,
    OrchestratorConfig, PerEntryStrategy, PerModuleStrategy, ReferenceList, Result,
};

/// Deterministic stand-in for the classifier: answers from the entry name,
/// counts calls, and tracks how many calls are in flight at once.
struct MockClassifier {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
    requests: Mutex<Vec<ClassificationRequest>>,
}

impl MockClassifier {
    fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    fn with_delay(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn reply_for(name: &str) -> Result<String> {
        match name {
            "age" => Err(Error::Transport("connection timed out".into())),
            "sex" => Ok(r#"{"standards_mapping_type":"CDE","standards_mapping_label":"Sex","confidence_level":"High"}"#.into()),
            "race" => Ok(r#"{"standards_mapping_type":"CDE","standards_mapping_label":"Race"}"#.into()),
            "garbled" => Ok("I am not sure what this field is.".into()),
            other => Ok(format!(
                r#"{{"standards_mapping_type":"CDE","standards_mapping_label":"{}","confidence_level":"Medium"}}"#,
                other
            )),
        }
    }
}

#[async_trait]
impl ClassificationClient for MockClassifier {
    async fn classify(&self, request: &ClassificationRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if request.entry_names.len() == 1 {
            return Self::reply_for(&request.entry_names[0]);
        }

        // Whole-module request: answer for every entry except "age"
        let entries: Vec<Value> = request
            .entry_names
            .iter()
            .filter(|name| name.as_str() != "age")
            .filter_map(|name| {
                let reply = Self::reply_for(name).ok()?;
                let mut value: Value = serde_json::from_str(&reply).ok()?;
                value["name"] = json!(name);
                Some(value)
            })
            .collect();
        Ok(json!({ "entries": entries }).to_string())
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock"
    }
}

fn orchestrator(client: Arc<MockClassifier>) -> ClassificationOrchestrator {
    ClassificationOrchestrator::new(client, OrchestratorConfig::default())
}

#[tokio::test]
async fn test_demographics_scenario() {
    let client = Arc::new(MockClassifier::new());
    let document = json!({"Demographics": [{"name": "age"}, {"name": "sex"}]});

    let result = orchestrator(client.clone()).run(&document).await.unwrap();

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!([{
            "module_name": "Demographics",
            "entries": [
                {
                    "name": "age",
                    "standards_mapping_type": "No CDE match",
                    "standards_mapping_label": "No CRF match",
                    "confidence_level": "No CDE match"
                },
                {
                    "name": "sex",
                    "standards_mapping_type": "CDE",
                    "standards_mapping_label": "Sex",
                    "confidence_level": "High"
                }
            ]
        }])
    );
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn test_list_input_is_rejected_before_any_call() {
    let client = Arc::new(MockClassifier::new());
    let document = json!([{"name": "age"}, {"name": "sex"}]);

    let err = orchestrator(client.clone()).run(&document).await.unwrap_err();

    assert!(matches!(err, Error::InputStructure(_)));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_entry_without_name_aborts_whole_run() {
    let client = Arc::new(MockClassifier::new());
    let document = json!({
        "Demographics": [{"name": "sex"}],
        "Pain": [{"description": "no name here"}]
    });

    let err = orchestrator(client.clone()).run(&document).await.unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_every_entry_appears_once_in_order() {
    let client = Arc::new(MockClassifier::new());
    let document = json!({
        "Demographics": [{"name": "sex"}, {"name": "age"}, {"name": "race"}, {"name": "garbled"}],
        "Pain": [{"name": "pain_intensity"}, {"name": "pain_interference"}],
        "Sleep": [{"name": "sleep_quality"}],
        "": [{"name": "orphan"}]
    });

    let (result, summary) = orchestrator(client.clone())
        .run_with_summary(&document)
        .await
        .unwrap();

    assert_eq!(result.entry_count(), 8);
    assert_eq!(result.modules.len(), 4);

    let mut seen = HashSet::new();
    for module in &result.modules {
        for entry in &module.entries {
            assert!(seen.insert((module.module_name.clone(), entry.name.clone())));
        }
    }

    let demographics: Vec<_> = result
        .module("Demographics")
        .unwrap()
        .entries
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(demographics, vec!["sex", "age", "race", "garbled"]);

    assert_eq!(
        result.get("Demographics", "race").unwrap(),
        &ClassificationResult::new("CDE", "Race", "No CDE match")
    );
    assert!(result.get("Demographics", "garbled").unwrap().is_no_match());
    assert!(result.get("ungrouped", "orphan").is_some());

    assert_eq!(summary.entries, 8);
    assert_eq!(summary.transport_failures, 1);
    assert_eq!(summary.parse_failures, 1);
    assert_eq!(summary.partial_results, 1);
    assert_eq!(summary.clean, 5);
    assert_eq!(client.calls(), 8);
}

#[tokio::test]
async fn test_runs_are_deterministic() {
    let document = json!({
        "Demographics": [{"name": "sex", "type": "string"}, {"name": "age", "units": "years"}],
        "Pain": [{"name": "pain_intensity", "scale": "0-10"}]
    });
    let reference = json!([{"cde": "Sex"}, {"cde": "Pain Intensity"}]);

    let first_client = Arc::new(MockClassifier::new());
    let first = orchestrator(first_client.clone())
        .with_reference(ReferenceList::new(reference.clone()))
        .run(&document)
        .await
        .unwrap();

    let second_client = Arc::new(MockClassifier::new());
    let second = orchestrator(second_client.clone())
        .with_reference(ReferenceList::new(reference))
        .run(&document)
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );

    let mut first_prompts: Vec<_> = first_client
        .requests
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.cache_key())
        .collect();
    let mut second_prompts: Vec<_> = second_client
        .requests
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.cache_key())
        .collect();
    first_prompts.sort();
    second_prompts.sort();
    assert_eq!(first_prompts, second_prompts);
}

#[tokio::test]
async fn test_concurrency_limit_bounds_modules_in_flight() {
    let client = Arc::new(MockClassifier::with_delay(Duration::from_millis(20)));
    let document: Value = (0..6)
        .map(|i| (format!("Module {}", i), json!([{"name": format!("field_{}", i)}])))
        .collect::<serde_json::Map<String, Value>>()
        .into();

    let config = OrchestratorConfig {
        concurrency_limit: 2,
        show_progress: false,
    };
    let result = ClassificationOrchestrator::new(client.clone(), config)
        .run(&document)
        .await
        .unwrap();

    assert_eq!(result.modules.len(), 6);
    assert!(client.max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_unbounded_fan_out_starts_every_module() {
    let client = Arc::new(MockClassifier::with_delay(Duration::from_millis(20)));
    let document: Value = (0..5)
        .map(|i| (format!("Module {}", i), json!([{"name": format!("field_{}", i)}])))
        .collect::<serde_json::Map<String, Value>>()
        .into();

    let config = OrchestratorConfig {
        concurrency_limit: 0,
        show_progress: false,
    };
    ClassificationOrchestrator::new(client.clone(), config)
        .run(&document)
        .await
        .unwrap();

    assert_eq!(client.max_in_flight.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_per_module_strategy_fills_missing_entries() {
    let client = Arc::new(MockClassifier::new());
    let document = json!({"Demographics": [{"name": "age"}, {"name": "sex"}, {"name": "race"}]});

    let result = orchestrator(client.clone())
        .with_strategy(PerModuleStrategy)
        .run(&document)
        .await
        .unwrap();

    assert_eq!(client.calls(), 1);
    let module = result.module("Demographics").unwrap();
    assert_eq!(module.entries.len(), 3);
    assert!(module.entries[0].result.is_no_match());
    assert_eq!(module.entries[1].result, ClassificationResult::new("CDE", "Sex", "High"));
    assert_eq!(
        module.entries[2].result,
        ClassificationResult::new("CDE", "Race", "No CDE match")
    );
}

#[tokio::test]
async fn test_module_context_strategy_sees_earlier_results() {
    let client = Arc::new(MockClassifier::new());
    let document = json!({"Demographics": [{"name": "sex"}, {"name": "race"}]});

    orchestrator(client.clone())
        .with_strategy(PerEntryStrategy::with_module_context())
        .run(&document)
        .await
        .unwrap();

    let requests = client.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].entry_names, vec!["race".to_string()]);
    assert!(requests[1].prompt.contains("\"standards_mapping_label\": \"Sex\""));
}

#[tokio::test]
async fn test_empty_document_yields_empty_result() {
    let client = Arc::new(MockClassifier::new());
    let result = orchestrator(client.clone()).run(&json!({})).await.unwrap();

    assert!(result.modules.is_empty());
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_similar_module_keys_stay_separate() {
    let client = Arc::new(MockClassifier::new());
    let document = json!({
        "Pain": [{"name": "score"}],
        "Pain ": [{"name": "score"}],
        "None": [{"name": "note"}]
    });

    let result = orchestrator(client.clone()).run(&document).await.unwrap();

    assert_eq!(result.modules.len(), 3);
    assert!(result.get("Pain", "score").is_some());
    assert!(result.get("Pain ", "score").is_some());
    assert!(result.get("None", "note").is_some());
    assert!(result.module("ungrouped").is_none());
    assert_eq!(client.calls(), 3);
}
